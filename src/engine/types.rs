//! Derived views handed to the presentation layer.
//!
//! Everything here is computed fresh per request and never cached.

use std::fmt;

use bitcoin::amount::serde::as_btc;
use bitcoin::{Amount, BlockHash, SignedAmount, Txid, Wtxid};
use serde::{Serialize, Serializer};

use crate::node::types::{BlockHeaderInfo, RawBlock, RawTransaction};

/// Position of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockRef {
    pub height: u64,
    pub hash: BlockHash,
}

// =====================================================================
// Transactions
// =====================================================================

/// Output script family, from the node's `scriptPubKey.type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    P2tr,
    P2wpkh,
    P2wsh,
    P2pkh,
    P2sh,
    P2pk,
    Multisig,
    OpReturn,
    NonStandard,
    /// Tags this crate does not know, kept verbatim.
    Other(String),
}

impl ScriptKind {
    pub fn from_node_tag(tag: &str) -> Self {
        match tag {
            "witness_v1_taproot" => ScriptKind::P2tr,
            "witness_v0_keyhash" => ScriptKind::P2wpkh,
            "witness_v0_scripthash" => ScriptKind::P2wsh,
            "pubkeyhash" => ScriptKind::P2pkh,
            "scripthash" => ScriptKind::P2sh,
            "pubkey" => ScriptKind::P2pk,
            "multisig" => ScriptKind::Multisig,
            "nulldata" => ScriptKind::OpReturn,
            "nonstandard" => ScriptKind::NonStandard,
            other => ScriptKind::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ScriptKind::P2tr => "P2TR",
            ScriptKind::P2wpkh => "P2WPKH",
            ScriptKind::P2wsh => "P2WSH",
            ScriptKind::P2pkh => "P2PKH",
            ScriptKind::P2sh => "P2SH",
            ScriptKind::P2pk => "P2PK",
            ScriptKind::Multisig => "Multisig",
            ScriptKind::OpReturn => "OP_RETURN",
            ScriptKind::NonStandard => "Non-standard",
            ScriptKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ScriptKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One input after funding-output resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EnrichedInput {
    /// Newly generated coins. Never looked up.
    Coinbase,
    Resolved {
        txid: Txid,
        vout: u32,
        address: Option<String>,
        #[serde(with = "as_btc")]
        value: Amount,
    },
    /// The funding transaction could not be fetched, or lacks the output.
    Unresolved { txid: Txid, vout: u32 },
}

impl EnrichedInput {
    pub fn is_coinbase(&self) -> bool {
        matches!(self, EnrichedInput::Coinbase)
    }

    pub fn value(&self) -> Option<Amount> {
        match self {
            EnrichedInput::Resolved { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            EnrichedInput::Resolved { address, .. } => address.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedOutput {
    pub n: u32,
    #[serde(with = "as_btc")]
    pub value: Amount,
    pub address: Option<String>,
    pub script_kind: ScriptKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    pub txid: Txid,
    pub wtxid: Wtxid,
    /// `None` while unconfirmed.
    pub block: Option<BlockRef>,
    /// Block time, or the observation time for unconfirmed transactions.
    pub time: u64,
    pub size: u64,
    pub vsize: u64,
    pub weight: u64,
    pub is_coinbase: bool,
    pub is_segwit: bool,
    pub is_rbf: bool,
    pub inputs: Vec<EnrichedInput>,
    pub outputs: Vec<EnrichedOutput>,
    #[serde(with = "as_btc")]
    pub total_input: Amount,
    #[serde(with = "as_btc")]
    pub total_output: Amount,
    /// Zero for coinbase, `None` when any input is unresolved.
    #[serde(with = "as_btc::opt")]
    pub fee: Option<Amount>,
}

impl EnrichedTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }

    pub fn is_fully_resolved(&self) -> bool {
        !self
            .inputs
            .iter()
            .any(|input| matches!(input, EnrichedInput::Unresolved { .. }))
    }

    /// sat/vB, when the fee is known.
    pub fn fee_rate(&self) -> Option<f64> {
        let fee = self.fee?;
        (self.vsize > 0).then(|| fee.to_sat() as f64 / self.vsize as f64)
    }
}

/// One page of the recent-activity feed, newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<EnrichedTransaction>,
    pub offset: usize,
    pub limit: usize,
    /// False once a page comes back short: the scan window is exhausted.
    pub has_more: bool,
}

// =====================================================================
// Addresses
// =====================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressUtxo {
    pub txid: Txid,
    pub vout: u32,
    #[serde(with = "as_btc")]
    pub value: Amount,
    pub height: u64,
    pub is_coinbase: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressActivity {
    pub txid: Txid,
    pub block_height: u64,
    pub time: u64,
    pub direction: Direction,
    /// Received minus spent by the address in this transaction.
    #[serde(with = "as_btc")]
    pub net: SignedAmount,
    /// `net` without its sign.
    #[serde(with = "as_btc")]
    pub amount: Amount,
    pub confirmations: u64,
}

/// Balance and UTXOs come from one UTXO-set snapshot and are exact.
/// History only covers `scanned_from_height..=tip_height`, so older activity
/// is missing from it even though it still counts towards the balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    pub address: String,
    #[serde(with = "as_btc")]
    pub balance: Amount,
    pub utxo_count: usize,
    pub utxos: Vec<AddressUtxo>,
    pub history: Vec<AddressActivity>,
    pub tip_height: u64,
    pub scanned_from_height: u64,
}

// =====================================================================
// Fees and difficulty
// =====================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTier {
    pub sat_per_vbyte: u64,
    /// Confirmation target asked for.
    pub target_blocks: u16,
    /// Horizon the node actually answered for; drives `eta`.
    pub estimated_blocks: u32,
    pub eta: String,
    /// False when the fallback rate was substituted.
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeRecommendation {
    pub fast: FeeTier,
    pub medium: FeeTier,
    pub slow: FeeTier,
}

impl FeeRecommendation {
    pub fn tiers(&self) -> [&FeeTier; 3] {
        [&self.fast, &self.medium, &self.slow]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetargetProjection {
    pub height: u64,
    pub retarget_interval: u64,
    pub next_retarget_height: u64,
    pub remaining_blocks: u64,
    pub progress_percent: f64,
    /// Block timestamps the estimate rests on; zero when the epoch is too young.
    pub sample_size: usize,
    pub average_block_time_secs: f64,
    pub estimated_seconds_remaining: Option<u64>,
    pub estimated_change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub difficulty: f64,
    /// TH/s implied by the difficulty at the target block time.
    pub hashrate_ths: f64,
    pub retarget: RetargetProjection,
}

// =====================================================================
// Blocks
// =====================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub height: u64,
    pub hash: BlockHash,
    pub time: u64,
    pub size: u64,
    pub weight: u64,
    pub tx_count: u64,
    pub difficulty: f64,
}

impl From<&BlockHeaderInfo> for BlockSummary {
    fn from(header: &BlockHeaderInfo) -> Self {
        Self {
            height: header.height,
            hash: header.hash,
            time: header.time,
            size: header.size,
            weight: header.weight,
            tx_count: header.n_tx,
            difficulty: header.difficulty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetail {
    #[serde(flatten)]
    pub summary: BlockSummary,
    pub version: i32,
    pub merkle_root: String,
    pub nonce: u64,
    pub bits: String,
    pub previous_block_hash: Option<BlockHash>,
    pub next_block_hash: Option<BlockHash>,
    pub transactions: Vec<RawTransaction>,
}

impl From<RawBlock> for BlockDetail {
    fn from(block: RawBlock) -> Self {
        let summary = BlockSummary {
            tx_count: block.tx.len() as u64,
            ..BlockSummary::from(&block.header)
        };
        let header = block.header;
        Self {
            summary,
            version: header.version,
            merkle_root: header.merkleroot,
            nonce: header.nonce,
            bits: header.bits,
            previous_block_hash: header.previousblockhash,
            next_block_hash: header.nextblockhash,
            transactions: block.tx,
        }
    }
}

// =====================================================================
// Search
// =====================================================================

/// What a free-text search box entry looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    Height(u64),
    /// 64 hex chars: a txid or a block hash, undecidable from the text alone.
    Hash(String),
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum SearchResult {
    Block(Box<BlockDetail>),
    Transaction(Box<EnrichedTransaction>),
    Address(Box<AddressView>),
}
