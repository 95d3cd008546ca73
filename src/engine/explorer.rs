use std::str::FromStr;

use bitcoin::{Amount, BlockHash, Txid};

use crate::config::ExplorerConfig;
use crate::engine::address::address_view;
use crate::engine::enricher::{enrich_transaction, TxContext};
use crate::engine::error::ExplorerError;
use crate::engine::fees::fee_recommendation;
use crate::engine::mempool::mempool_transactions;
use crate::engine::paginator::recent_transactions;
use crate::engine::retarget::{project_retarget, RetargetParams};
use crate::engine::types::{
    AddressView, BlockDetail, BlockRef, BlockSummary, EnrichedTransaction, FeeRecommendation,
    NetworkStats, RetargetProjection, SearchQuery, SearchResult, TransactionPage,
};
use crate::node::api::{NodeGateway, NodeQueries};
use crate::node::types::{BlockchainInfo, MempoolInfo, RawMempool};

/// Hashes per unit of difficulty.
const HASHES_PER_DIFFICULTY: f64 = 4_294_967_296.0;

impl SearchQuery {
    /// 64 hex chars: a txid or block hash, even when every char is a digit.
    /// Other all-digit text: a height. Anything else non-empty: an address.
    pub fn classify(text: &str) -> Result<Self, ExplorerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ExplorerError::InvalidInput("empty query".into()));
        }

        if text.len() == 64 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(SearchQuery::Hash(text.to_ascii_lowercase()));
        }

        if text.bytes().all(|b| b.is_ascii_digit()) {
            return text
                .parse()
                .map(SearchQuery::Height)
                .map_err(|_| ExplorerError::InvalidInput(format!("height out of range: {text}")));
        }

        Ok(SearchQuery::Address(text.to_string()))
    }
}

/// Upward query surface: one method per view the dashboard shows.
///
/// Holds no chain state. Every call re-reads what it needs from the node, so
/// two calls may see different tips.
pub struct Explorer<G> {
    node: G,
    config: ExplorerConfig,
}

impl<G: NodeGateway> Explorer<G> {
    pub fn new(node: G, config: ExplorerConfig) -> Self {
        Self { node, config }
    }

    pub fn node(&self) -> &G {
        &self.node
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    fn tip_height(&self) -> Result<Option<u64>, ExplorerError> {
        Ok(u64::try_from(self.node.block_count()?).ok())
    }

    // ----------------------------------------------------------------
    // Blocks
    // ----------------------------------------------------------------

    /// The `limit` most recent blocks, newest first.
    pub fn list_blocks(&self, limit: usize) -> Result<Vec<BlockSummary>, ExplorerError> {
        let Some(tip) = self.tip_height()? else {
            return Ok(Vec::new());
        };

        let mut blocks = Vec::new();
        for height in (0..=tip).rev().take(limit) {
            let hash = self
                .node
                .block_hash(height)
                .map_err(ExplorerError::lookup("block", height))?;
            let header = self
                .node
                .block_header(&hash)
                .map_err(ExplorerError::lookup("block", hash))?;
            blocks.push(BlockSummary::from(&header));
        }
        Ok(blocks)
    }

    /// Block by decimal height or 64-hex hash.
    pub fn get_block(&self, reference: &str) -> Result<BlockDetail, ExplorerError> {
        let hash = match SearchQuery::classify(reference)? {
            SearchQuery::Height(height) => self
                .node
                .block_hash(height)
                .map_err(ExplorerError::lookup("block", height))?,
            SearchQuery::Hash(hex) => BlockHash::from_str(&hex)
                .map_err(|e| ExplorerError::InvalidInput(format!("block hash {hex}: {e}")))?,
            SearchQuery::Address(other) => {
                return Err(ExplorerError::InvalidInput(format!(
                    "expected a block height or hash, got {other}"
                )))
            }
        };
        self.block_detail(&hash)
    }

    fn block_detail(&self, hash: &BlockHash) -> Result<BlockDetail, ExplorerError> {
        let block = self
            .node
            .block(hash)
            .map_err(ExplorerError::lookup("block", hash))?;
        Ok(BlockDetail::from(block))
    }

    // ----------------------------------------------------------------
    // Transactions and addresses
    // ----------------------------------------------------------------

    pub fn get_address_view(&self, address: &str) -> Result<AddressView, ExplorerError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ExplorerError::InvalidInput("empty address".into()));
        }
        address_view(&self.node, address, self.config.address_window)
    }

    pub fn list_transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage, ExplorerError> {
        recent_transactions(&self.node, self.config.tx_scan_depth, offset, limit)
    }

    /// A confirmed transaction is placed in its block; one without a block
    /// hash is treated as unconfirmed.
    pub fn get_transaction(&self, txid: &str) -> Result<EnrichedTransaction, ExplorerError> {
        let txid = Txid::from_str(txid.trim())
            .map_err(|e| ExplorerError::InvalidInput(format!("txid {txid}: {e}")))?;
        let tx = self
            .node
            .raw_transaction(&txid)
            .map_err(ExplorerError::lookup("transaction", txid))?;

        let context = match tx.blockhash {
            Some(hash) => {
                let header = self
                    .node
                    .block_header(&hash)
                    .map_err(ExplorerError::lookup("block", hash))?;
                TxContext::confirmed(
                    BlockRef {
                        height: header.height,
                        hash,
                    },
                    header.time,
                )
            }
            None => TxContext::unconfirmed(),
        };

        let enriched = enrich_transaction(&self.node, tx, context);
        log::debug!(
            "[EXPLORER] tx {} confirmed={} resolved={} fee rate {:?} sat/vB",
            enriched.txid,
            enriched.is_confirmed(),
            enriched.is_fully_resolved(),
            enriched.fee_rate()
        );
        Ok(enriched)
    }

    // ----------------------------------------------------------------
    // Mempool
    // ----------------------------------------------------------------

    pub fn list_mempool(&self) -> Result<Vec<EnrichedTransaction>, ExplorerError> {
        mempool_transactions(&self.node, self.config.mempool_cap)
    }

    pub fn list_mempool_entries(&self) -> Result<RawMempool, ExplorerError> {
        Ok(self.node.mempool_entries()?)
    }

    pub fn get_mempool_info(&self) -> Result<MempoolInfo, ExplorerError> {
        Ok(self.node.mempool_info()?)
    }

    // ----------------------------------------------------------------
    // Chain statistics
    // ----------------------------------------------------------------

    pub fn get_chain_info(&self) -> Result<BlockchainInfo, ExplorerError> {
        Ok(self.node.blockchain_info()?)
    }

    pub fn get_fee_recommendation(&self) -> FeeRecommendation {
        fee_recommendation(&self.node)
    }

    fn retarget_params(&self) -> RetargetParams {
        RetargetParams {
            interval: self.config.retarget_interval,
            target_block_time_secs: self.config.target_block_time_secs,
        }
    }

    pub fn get_retarget_projection(&self) -> Result<RetargetProjection, ExplorerError> {
        project_retarget(&self.node, self.retarget_params())
    }

    pub fn get_network_stats(&self) -> Result<NetworkStats, ExplorerError> {
        let info = self.node.blockchain_info()?;
        let retarget = self.get_retarget_projection()?;
        let block_time = self.config.target_block_time_secs.max(1) as f64;

        Ok(NetworkStats {
            difficulty: info.difficulty,
            hashrate_ths: info.difficulty * HASHES_PER_DIFFICULTY / block_time / 1e12,
            retarget,
        })
    }

    // ----------------------------------------------------------------
    // Writes
    // ----------------------------------------------------------------

    pub fn broadcast_raw_transaction(&self, tx_hex: &str) -> Result<Txid, ExplorerError> {
        let tx_hex = tx_hex.trim();
        if tx_hex.is_empty() || hex::decode(tx_hex).is_err() {
            return Err(ExplorerError::InvalidInput(
                "raw transaction must be non-empty hex".into(),
            ));
        }

        let txid = self.node.send_raw_transaction(tx_hex)?;
        log::info!("[EXPLORER] broadcast {}", txid);
        Ok(txid)
    }

    /// Pays `amount` to `address` from the node's wallet.
    pub fn send_funds(&self, address: &str, amount: Amount) -> Result<Txid, ExplorerError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ExplorerError::InvalidInput("empty address".into()));
        }
        if amount == Amount::ZERO {
            return Err(ExplorerError::InvalidInput("amount must be positive".into()));
        }

        let txid = self.node.send_to_address(address, amount)?;
        log::info!("[EXPLORER] sent {} to {} in {}", amount, address, txid);
        Ok(txid)
    }

    // ----------------------------------------------------------------
    // Search
    // ----------------------------------------------------------------

    /// A 64-hex query is tried as a transaction first, then as a block hash.
    pub fn search(&self, text: &str) -> Result<SearchResult, ExplorerError> {
        match SearchQuery::classify(text)? {
            SearchQuery::Height(height) => {
                let detail = self.get_block(&height.to_string())?;
                Ok(SearchResult::Block(Box::new(detail)))
            }
            SearchQuery::Hash(hex) => match self.get_transaction(&hex) {
                Ok(tx) => Ok(SearchResult::Transaction(Box::new(tx))),
                Err(err) if err.is_not_found() => {
                    log::debug!("[EXPLORER] {} is not a transaction, trying blocks", hex);
                    let hash = BlockHash::from_str(&hex)
                        .map_err(|e| ExplorerError::InvalidInput(format!("{hex}: {e}")))?;
                    self.block_detail(&hash)
                        .map(|detail| SearchResult::Block(Box::new(detail)))
                        .map_err(|err| match err {
                            ExplorerError::NotFound { .. } => ExplorerError::NotFound {
                                kind: "transaction or block",
                                id: hex.clone(),
                            },
                            other => other,
                        })
                }
                Err(err) => Err(err),
            },
            SearchQuery::Address(address) => {
                let view = self.get_address_view(&address)?;
                Ok(SearchResult::Address(Box::new(view)))
            }
        }
    }
}
