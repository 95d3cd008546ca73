use std::time::Duration;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:18443";

// Local regtest credentials, never production ones.
pub const DEFAULT_RPC_USER: &str = "test";
pub const DEFAULT_RPC_PASSWORD: &str = "test123";

pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;

/// Blocks inspected for address history.
pub const DEFAULT_ADDRESS_WINDOW: u64 = 100;
/// Blocks inspected for the recent-transactions feed.
pub const DEFAULT_TX_SCAN_DEPTH: u64 = 50;
/// Unconfirmed transactions enriched per mempool listing.
pub const DEFAULT_MEMPOOL_CAP: usize = 50;

pub const DEFAULT_RETARGET_INTERVAL: u64 = 2016;
pub const DEFAULT_TARGET_BLOCK_TIME_SECS: u64 = 600;

/// Where and how to reach the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Upper bound for a single gateway call.
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            user: DEFAULT_RPC_USER.to_string(),
            password: DEFAULT_RPC_PASSWORD.to_string(),
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
        }
    }
}

/// Cost ceilings and chain constants for the derivation engine.
///
/// There is no index behind any view: every request re-scans blocks, so the
/// scan depths below are the only thing bounding the work a request does.
/// They are also the contract for how far back history reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplorerConfig {
    pub address_window: u64,
    pub tx_scan_depth: u64,
    pub mempool_cap: usize,
    pub retarget_interval: u64,
    pub target_block_time_secs: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            address_window: DEFAULT_ADDRESS_WINDOW,
            tx_scan_depth: DEFAULT_TX_SCAN_DEPTH,
            mempool_cap: DEFAULT_MEMPOOL_CAP,
            retarget_interval: DEFAULT_RETARGET_INTERVAL,
            target_block_time_secs: DEFAULT_TARGET_BLOCK_TIME_SECS,
        }
    }
}

impl ExplorerConfig {
    pub fn with_address_window(mut self, blocks: u64) -> Self {
        self.address_window = blocks;
        self
    }

    pub fn with_tx_scan_depth(mut self, blocks: u64) -> Self {
        self.tx_scan_depth = blocks;
        self
    }

    pub fn with_mempool_cap(mut self, count: usize) -> Self {
        self.mempool_cap = count;
        self
    }

    pub fn with_retarget_interval(mut self, blocks: u64) -> Self {
        self.retarget_interval = blocks;
        self
    }

    pub fn with_target_block_time(mut self, secs: u64) -> Self {
        self.target_block_time_secs = secs;
        self
    }
}
