use std::sync::Arc;

use bitcoin::{Amount, BlockHash, Txid};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::node::error::NodeError;
use crate::node::types::{
    BlockHeaderInfo, BlockchainInfo, FeeEstimate, MempoolInfo, RawBlock, RawMempool,
    RawTransaction, UtxoScan,
};

/// Minimal node interface used by the explorer engine.
/// One synchronous request/response per call, nothing else.
pub trait NodeGateway {
    /// Sends `method` with positional `params` and returns the decoded `result`.
    ///
    /// Remote JSON-RPC errors surface as [`NodeError::Rpc`] with the node's
    /// own code and message.
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, NodeError>;
}

impl<G: NodeGateway + ?Sized> NodeGateway for &G {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, NodeError> {
        (**self).call(method, params)
    }
}

impl<G: NodeGateway + ?Sized> NodeGateway for Arc<G> {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, NodeError> {
        (**self).call(method, params)
    }
}

impl<G: NodeGateway + ?Sized> NodeGateway for Box<G> {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, NodeError> {
        (**self).call(method, params)
    }
}

/// Typed wrappers over [`NodeGateway::call`], one per remote method the
/// engine consumes. Blanket-implemented for every gateway.
pub trait NodeQueries: NodeGateway {
    fn call_as<T: DeserializeOwned>(&self, method: &str, params: &[Value]) -> Result<T, NodeError> {
        let value = self.call(method, params)?;
        serde_json::from_value(value).map_err(|e| NodeError::Decode(format!("{method}: {e}")))
    }

    /// Height of the current tip. Signed: an empty chain is guarded, not assumed away.
    fn block_count(&self) -> Result<i64, NodeError> {
        self.call_as("getblockcount", &[])
    }

    fn block_hash(&self, height: u64) -> Result<BlockHash, NodeError> {
        self.call_as("getblockhash", &[json!(height)])
    }

    fn block_header(&self, hash: &BlockHash) -> Result<BlockHeaderInfo, NodeError> {
        self.call_as("getblock", &[json!(hash), json!(1)])
    }

    /// Block with full transaction bodies inlined.
    fn block(&self, hash: &BlockHash) -> Result<RawBlock, NodeError> {
        self.call_as("getblock", &[json!(hash), json!(2)])
    }

    fn raw_transaction(&self, txid: &Txid) -> Result<RawTransaction, NodeError> {
        self.call_as("getrawtransaction", &[json!(txid), json!(true)])
    }

    /// Point-in-time UTXO set scan for one address. A scan the node reports
    /// as unsuccessful is an error, never an empty result.
    fn scan_utxos(&self, address: &str) -> Result<UtxoScan, NodeError> {
        let scan: UtxoScan = self.call_as(
            "scantxoutset",
            &[json!("start"), json!([format!("addr({address})")])],
        )?;
        if !scan.success {
            return Err(NodeError::Incomplete {
                method: "scantxoutset".into(),
            });
        }
        Ok(scan)
    }

    fn mempool_ids(&self) -> Result<Vec<Txid>, NodeError> {
        self.call_as("getrawmempool", &[json!(false)])
    }

    fn mempool_entries(&self) -> Result<RawMempool, NodeError> {
        self.call_as("getrawmempool", &[json!(true)])
    }

    fn mempool_info(&self) -> Result<MempoolInfo, NodeError> {
        self.call_as("getmempoolinfo", &[])
    }

    fn blockchain_info(&self) -> Result<BlockchainInfo, NodeError> {
        self.call_as("getblockchaininfo", &[])
    }

    fn estimate_smart_fee(&self, conf_target: u16) -> Result<FeeEstimate, NodeError> {
        self.call_as("estimatesmartfee", &[json!(conf_target)])
    }

    fn send_raw_transaction(&self, tx_hex: &str) -> Result<Txid, NodeError> {
        self.call_as("sendrawtransaction", &[json!(tx_hex)])
    }

    fn send_to_address(&self, address: &str, amount: Amount) -> Result<Txid, NodeError> {
        self.call_as("sendtoaddress", &[json!(address), json!(amount.to_btc())])
    }
}

impl<G: NodeGateway + ?Sized> NodeQueries for G {}
