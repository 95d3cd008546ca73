//! Node responses, decoded as the node sends them.
//!
//! Field names follow the node's JSON, amounts are decoded from the node's
//! 8-decimal BTC notation into exact [`Amount`]s.

use std::collections::BTreeMap;

use bitcoin::amount::serde::as_btc;
use bitcoin::{Amount, BlockHash, OutPoint, Sequence, Txid, Wtxid};
use serde::{Deserialize, Serialize};

/// `getblock <hash> 1` (also the header part of verbosity 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockHeaderInfo {
    pub hash: BlockHash,
    pub height: u64,
    pub time: u64,
    #[serde(default)]
    pub mediantime: u64,
    pub size: u64,
    #[serde(default)]
    pub weight: u64,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub merkleroot: String,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub bits: String,
    #[serde(default)]
    pub difficulty: f64,
    #[serde(rename = "nTx", default)]
    pub n_tx: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previousblockhash: Option<BlockHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextblockhash: Option<BlockHash>,
}

/// `getblock <hash> 2`: header plus inlined transaction bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(flatten)]
    pub header: BlockHeaderInfo,
    pub tx: Vec<RawTransaction>,
}

impl RawBlock {
    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn hash(&self) -> BlockHash {
        self.header.hash
    }

    pub fn time(&self) -> u64 {
        self.header.time
    }
}

/// A verbose transaction, either inlined in a block or from `getrawtransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub txid: Txid,
    pub hash: Wtxid,
    pub size: u64,
    pub vsize: u64,
    pub weight: u64,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub locktime: u32,
    pub vin: Vec<TxInput>,
    pub vout: Vec<TxOutput>,

    // Only present on `getrawtransaction` for confirmed transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<BlockHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocktime: Option<u64>,
}

impl RawTransaction {
    pub fn is_coinbase(&self) -> bool {
        self.vin.iter().any(TxInput::is_coinbase)
    }

    /// Witness data changes the wtxid but not the txid.
    pub fn is_segwit(&self) -> bool {
        self.hash.to_raw_hash() != self.txid.to_raw_hash()
    }

    /// BIP125 signalling: any input with a sequence below `0xfffffffe`.
    pub fn signals_rbf(&self) -> bool {
        self.vin
            .iter()
            .any(|input| Sequence(input.sequence()).is_rbf())
    }

    pub fn output(&self, index: u32) -> Option<&TxOutput> {
        self.vout.get(index as usize)
    }
}

/// A transaction input: newly generated coins, or a reference to a funding output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireInput", into = "WireInput")]
pub enum TxInput {
    Coinbase { data: String, sequence: u32 },
    Spend { previous_output: OutPoint, sequence: u32 },
}

impl TxInput {
    pub fn is_coinbase(&self) -> bool {
        matches!(self, TxInput::Coinbase { .. })
    }

    pub fn previous_output(&self) -> Option<OutPoint> {
        match self {
            TxInput::Coinbase { .. } => None,
            TxInput::Spend { previous_output, .. } => Some(*previous_output),
        }
    }

    pub fn sequence(&self) -> u32 {
        match self {
            TxInput::Coinbase { sequence, .. } | TxInput::Spend { sequence, .. } => *sequence,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coinbase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    txid: Option<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vout: Option<u32>,
    #[serde(default = "final_sequence")]
    sequence: u32,
}

fn zero() -> Amount {
    Amount::ZERO
}

fn final_sequence() -> u32 {
    Sequence::MAX.0
}

impl TryFrom<WireInput> for TxInput {
    type Error = String;

    fn try_from(wire: WireInput) -> Result<Self, Self::Error> {
        match wire {
            WireInput {
                coinbase: Some(data),
                sequence,
                ..
            } => Ok(TxInput::Coinbase { data, sequence }),
            WireInput {
                txid: Some(txid),
                vout: Some(vout),
                sequence,
                ..
            } => Ok(TxInput::Spend {
                previous_output: OutPoint { txid, vout },
                sequence,
            }),
            _ => Err("input carries neither a coinbase marker nor a txid/vout reference".into()),
        }
    }
}

impl From<TxInput> for WireInput {
    fn from(input: TxInput) -> Self {
        match input {
            TxInput::Coinbase { data, sequence } => WireInput {
                coinbase: Some(data),
                txid: None,
                vout: None,
                sequence,
            },
            TxInput::Spend {
                previous_output,
                sequence,
            } => WireInput {
                coinbase: None,
                txid: Some(previous_output.txid),
                vout: Some(previous_output.vout),
                sequence,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    #[serde(with = "as_btc")]
    pub value: Amount,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKeyInfo,
}

impl TxOutput {
    pub fn address(&self) -> Option<&str> {
        self.script_pub_key.address.as_deref()
    }

    pub fn pays_to(&self, address: &str) -> bool {
        self.address() == Some(address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKeyInfo {
    /// Absent for non-standard or unparseable scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub hex: String,
}

/// `scantxoutset start ["addr(...)"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoScan {
    pub success: bool,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub unspents: Vec<ScannedUtxo>,
    #[serde(with = "as_btc", default = "zero")]
    pub total_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedUtxo {
    pub txid: Txid,
    pub vout: u32,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: String,
    #[serde(default)]
    pub desc: String,
    #[serde(with = "as_btc")]
    pub amount: Amount,
    pub height: u64,
    #[serde(default)]
    pub coinbase: bool,
}

/// `estimatesmartfee <target>`. `feerate` is BTC per kvB and missing when
/// the node lacks sample data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    #[serde(with = "as_btc::opt", default, skip_serializing_if = "Option::is_none")]
    pub feerate: Option<Amount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub blocks: u32,
}

/// `getblockchaininfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockchainInfo {
    pub chain: String,
    pub blocks: u64,
    #[serde(default)]
    pub headers: u64,
    pub bestblockhash: BlockHash,
    pub difficulty: f64,
    #[serde(default)]
    pub mediantime: u64,
    #[serde(default)]
    pub size_on_disk: u64,
    #[serde(default)]
    pub pruned: bool,
}

/// `getmempoolinfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolInfo {
    #[serde(default)]
    pub loaded: bool,
    pub size: u64,
    pub bytes: u64,
    #[serde(default)]
    pub usage: u64,
    #[serde(with = "as_btc", default = "zero")]
    pub total_fee: Amount,
    #[serde(default)]
    pub maxmempool: u64,
    #[serde(with = "as_btc", default = "zero")]
    pub mempoolminfee: Amount,
    #[serde(with = "as_btc", default = "zero")]
    pub minrelaytxfee: Amount,
    #[serde(default)]
    pub unbroadcastcount: u64,
}

/// One value of `getrawmempool true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolEntry {
    pub vsize: u64,
    pub weight: u64,
    pub time: u64,
    pub height: u64,
    pub fees: MempoolFees,
    #[serde(default)]
    pub descendantcount: u64,
    #[serde(default)]
    pub descendantsize: u64,
    #[serde(default)]
    pub ancestorcount: u64,
    #[serde(default)]
    pub ancestorsize: u64,
    #[serde(default)]
    pub depends: Vec<Txid>,
    #[serde(rename = "bip125-replaceable", default)]
    pub bip125_replaceable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MempoolFees {
    #[serde(with = "as_btc")]
    pub base: Amount,
    #[serde(with = "as_btc")]
    pub modified: Amount,
    #[serde(with = "as_btc")]
    pub ancestor: Amount,
    #[serde(with = "as_btc")]
    pub descendant: Amount,
}

pub type RawMempool = BTreeMap<Txid, MempoolEntry>;
