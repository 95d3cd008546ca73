use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{Amount, BlockHash, OutPoint, Sequence, Txid, Wtxid};
use serde_json::{json, Value};

use crate::node::api::NodeGateway;
use crate::node::error::{
    NodeError, RPC_DESERIALIZATION_ERROR, RPC_INVALID_ADDRESS_OR_KEY, RPC_INVALID_PARAMETER,
    RPC_METHOD_NOT_FOUND, RPC_MISC_ERROR,
};

/// Regtest genesis timestamp.
pub const GENESIS_TIME: u64 = 1_296_688_602;
pub const BLOCK_SPACING_SECS: u64 = 600;
pub const GENESIS_ADDRESS: &str = "bcrt1qgenesis";
pub const REGTEST_DIFFICULTY: f64 = 4.656_542_373_906_925e-10;

const RPC_TYPE_ERROR: i64 = -3;

/// Deterministic txid for a test label.
pub fn fake_txid(label: &str) -> Txid {
    Txid::from_raw_hash(sha256d::Hash::hash(label.as_bytes()))
}

fn fake_block_hash(height: u64, time: u64) -> BlockHash {
    BlockHash::from_raw_hash(sha256d::Hash::hash(
        format!("block-{height}-{time}").as_bytes(),
    ))
}

// =====================================================================
// Scripted transactions
// =====================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MockOutput {
    pub value: Amount,
    pub address: Option<String>,
    pub script_type: String,
}

impl MockOutput {
    /// P2WPKH output paying `address`.
    pub fn to(address: &str, value: Amount) -> Self {
        Self {
            value,
            address: Some(address.to_string()),
            script_type: "witness_v0_keyhash".into(),
        }
    }

    pub fn op_return() -> Self {
        Self {
            value: Amount::ZERO,
            address: None,
            script_type: "nulldata".into(),
        }
    }

    pub fn with_script_type(mut self, script_type: &str) -> Self {
        self.script_type = script_type.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MockInput {
    Coinbase,
    Spend(OutPoint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockTx {
    pub txid: Txid,
    pub wtxid: Wtxid,
    pub inputs: Vec<MockInput>,
    pub outputs: Vec<MockOutput>,
    pub sequence: u32,
}

impl MockTx {
    pub fn coinbase(label: &str, outputs: Vec<MockOutput>) -> Self {
        Self::new(label, vec![MockInput::Coinbase], outputs)
    }

    pub fn spend(label: &str, inputs: Vec<OutPoint>, outputs: Vec<MockOutput>) -> Self {
        Self::new(
            label,
            inputs.into_iter().map(MockInput::Spend).collect(),
            outputs,
        )
    }

    fn new(label: &str, inputs: Vec<MockInput>, outputs: Vec<MockOutput>) -> Self {
        let txid = fake_txid(label);
        Self {
            txid,
            wtxid: Wtxid::from_raw_hash(txid.to_raw_hash()),
            inputs,
            outputs,
            sequence: Sequence::MAX.0,
        }
    }

    /// Gives the transaction witness data: wtxid no longer equals txid.
    pub fn segwit(mut self) -> Self {
        self.wtxid = Wtxid::from_raw_hash(sha256d::Hash::hash(
            format!("{}-witness", self.txid).as_bytes(),
        ));
        self
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn outpoint(&self, vout: u32) -> OutPoint {
        OutPoint {
            txid: self.txid,
            vout,
        }
    }

    fn size(&self) -> u64 {
        10 + 148 * self.inputs.len() as u64 + 34 * self.outputs.len() as u64
    }

    fn vsize(&self) -> u64 {
        if self.wtxid.to_raw_hash() == self.txid.to_raw_hash() {
            self.size()
        } else {
            11 + 68 * self.inputs.len() as u64 + 31 * self.outputs.len() as u64
        }
    }

    fn to_json(&self) -> Value {
        let vin: Vec<Value> = self
            .inputs
            .iter()
            .map(|input| match input {
                MockInput::Coinbase => json!({
                    "coinbase": "51",
                    "sequence": self.sequence,
                }),
                MockInput::Spend(outpoint) => json!({
                    "txid": outpoint.txid,
                    "vout": outpoint.vout,
                    "scriptSig": { "asm": "", "hex": "" },
                    "sequence": self.sequence,
                }),
            })
            .collect();

        let vout: Vec<Value> = self
            .outputs
            .iter()
            .enumerate()
            .map(|(n, output)| {
                let mut script = json!({ "asm": "", "hex": "", "type": output.script_type });
                if let Some(address) = &output.address {
                    script["address"] = json!(address);
                }
                json!({
                    "value": output.value.to_btc(),
                    "n": n,
                    "scriptPubKey": script,
                })
            })
            .collect();

        json!({
            "txid": self.txid,
            "hash": self.wtxid,
            "version": 2,
            "size": self.size(),
            "vsize": self.vsize(),
            "weight": self.vsize() * 4,
            "locktime": 0,
            "vin": vin,
            "vout": vout,
        })
    }
}

// =====================================================================
// Chain state
// =====================================================================

#[derive(Debug)]
struct MockBlock {
    hash: BlockHash,
    time: u64,
    txids: Vec<Txid>,
}

#[derive(Debug, Default)]
struct MockState {
    blocks: Vec<MockBlock>,
    /// txid -> (transaction, confirmation height)
    txs: HashMap<Txid, (MockTx, Option<u64>)>,
    mempool: Vec<Txid>,
    fee_rates: HashMap<u16, Amount>,
    failing_methods: HashSet<String>,
    failing_txids: HashSet<Txid>,
    unreachable: bool,
    scan_incomplete: bool,
    sends: u64,
    calls: Vec<String>,
}

/// Pure in-memory node for tests.
///
/// Serves node-shaped JSON for a scripted chain, so everything above the
/// gateway (decoding included) runs exactly as against a live node.
pub struct MockNode {
    state: Mutex<MockState>,
}

impl Default for MockNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNode {
    /// A chain holding only a genesis block, whose coinbase pays [`GENESIS_ADDRESS`].
    pub fn new() -> Self {
        let node = Self::empty();
        node.mine_block_at(
            GENESIS_TIME,
            vec![MockTx::coinbase(
                "genesis",
                vec![MockOutput::to(GENESIS_ADDRESS, Amount::from_int_btc(50))],
            )],
        );
        node
    }

    /// No blocks at all: `getblockcount` answers -1.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn tip_height(&self) -> Option<u64> {
        let s = self.state();
        (s.blocks.len() as u64).checked_sub(1)
    }

    /// Mines `txs` one spacing after the current tip.
    pub fn mine_block(&self, txs: Vec<MockTx>) -> BlockHash {
        let time = self
            .state()
            .blocks
            .last()
            .map(|b| b.time + BLOCK_SPACING_SECS)
            .unwrap_or(GENESIS_TIME);
        self.mine_block_at(time, txs)
    }

    pub fn mine_block_at(&self, time: u64, txs: Vec<MockTx>) -> BlockHash {
        let mut s = self.state();
        let height = s.blocks.len() as u64;
        let hash = fake_block_hash(height, time);

        let mut txids = Vec::with_capacity(txs.len());
        for tx in txs {
            txids.push(tx.txid);
            s.mempool.retain(|id| *id != tx.txid);
            s.txs.insert(tx.txid, (tx, Some(height)));
        }

        log::debug!("[MOCK] mined block {} with {} txs", height, txids.len());
        s.blocks.push(MockBlock { hash, time, txids });
        hash
    }

    /// Mines `count` transaction-less blocks, `spacing` seconds apart.
    pub fn mine_empty_blocks(&self, count: u64, spacing: u64) {
        for _ in 0..count {
            let time = self
                .state()
                .blocks
                .last()
                .map(|b| b.time + spacing)
                .unwrap_or(GENESIS_TIME);
            self.mine_block_at(time, vec![]);
        }
    }

    pub fn add_to_mempool(&self, tx: MockTx) {
        let mut s = self.state();
        s.mempool.push(tx.txid);
        s.txs.insert(tx.txid, (tx, None));
    }

    /// Fee rate answered by `estimatesmartfee <target>`, in BTC per kvB.
    pub fn set_fee_rate(&self, target: u16, rate_per_kvb: Amount) {
        self.state().fee_rates.insert(target, rate_per_kvb);
    }

    pub fn fail_method(&self, method: &str) {
        self.state().failing_methods.insert(method.to_string());
    }

    /// `getrawtransaction` for `txid` answers "not found", as for a pruned
    /// or evicted transaction.
    pub fn fail_txid(&self, txid: Txid) {
        self.state().failing_txids.insert(txid);
    }

    pub fn set_unreachable(&self, down: bool) {
        self.state().unreachable = down;
    }

    pub fn set_scan_incomplete(&self, incomplete: bool) {
        self.state().scan_incomplete = incomplete;
    }

    /// Number of calls made to `method` so far.
    pub fn calls(&self, method: &str) -> usize {
        self.state().calls.iter().filter(|m| *m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.len()
    }

    pub fn reset_calls(&self) {
        self.state().calls.clear();
    }
}

impl NodeGateway for MockNode {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, NodeError> {
        let mut s = self.state();
        s.calls.push(method.to_string());
        log::trace!("[MOCK] {} {:?}", method, params);

        if s.unreachable {
            return Err(NodeError::Unreachable("connection refused".into()));
        }
        if s.failing_methods.contains(method) {
            return Err(NodeError::rpc(RPC_MISC_ERROR, format!("{method} failed")));
        }

        match method {
            "getblockcount" => Ok(json!(s.blocks.len() as i64 - 1)),
            "getblockhash" => {
                let height = param_u64(params, 0)?;
                s.blocks
                    .get(height as usize)
                    .map(|b| json!(b.hash))
                    .ok_or_else(|| NodeError::rpc(RPC_INVALID_PARAMETER, "Block height out of range"))
            }
            "getblock" => {
                let hash = BlockHash::from_str(param_str(params, 0)?)
                    .map_err(|_| NodeError::rpc(RPC_INVALID_PARAMETER, "blockhash must be hexadecimal"))?;
                let verbosity = params.get(1).and_then(Value::as_u64).unwrap_or(1);
                s.block_json(&hash, verbosity)
            }
            "getrawtransaction" => {
                let txid = Txid::from_str(param_str(params, 0)?)
                    .map_err(|_| NodeError::rpc(RPC_INVALID_PARAMETER, "txid must be hexadecimal"))?;
                if s.failing_txids.contains(&txid) {
                    return Err(not_in_chain());
                }
                s.raw_tx_json(&txid)
            }
            "scantxoutset" => {
                let address = scan_address(params)?;
                Ok(s.scan_json(&address))
            }
            "getrawmempool" => {
                let verbose = params.first().and_then(Value::as_bool).unwrap_or(false);
                Ok(s.mempool_json(verbose))
            }
            "getmempoolinfo" => Ok(s.mempool_info_json()),
            "getblockchaininfo" => s.blockchain_info_json(),
            "estimatesmartfee" => {
                let target = param_u64(params, 0)?;
                let estimate = u16::try_from(target)
                    .ok()
                    .and_then(|t| s.fee_rates.get(&t));
                Ok(match estimate {
                    Some(rate) => json!({ "feerate": rate.to_btc(), "blocks": target }),
                    None => json!({
                        "errors": ["Insufficient data or no feerate found"],
                        "blocks": 0,
                    }),
                })
            }
            "sendrawtransaction" => {
                let bytes = hex::decode(param_str(params, 0)?)
                    .ok()
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| NodeError::rpc(RPC_DESERIALIZATION_ERROR, "TX decode failed"))?;
                Ok(json!(Txid::from_raw_hash(sha256d::Hash::hash(&bytes))))
            }
            "sendtoaddress" => {
                let address = param_str(params, 0)?.to_string();
                if !is_plausible_address(&address) {
                    return Err(NodeError::rpc(RPC_INVALID_ADDRESS_OR_KEY, "Invalid address"));
                }
                let amount = params
                    .get(1)
                    .and_then(Value::as_f64)
                    .and_then(|btc| Amount::from_btc(btc).ok())
                    .filter(|a| *a > Amount::ZERO)
                    .ok_or_else(|| NodeError::rpc(RPC_TYPE_ERROR, "Invalid amount for send"))?;
                Ok(json!(s.send(&address, amount)))
            }
            _ => Err(NodeError::rpc(RPC_METHOD_NOT_FOUND, "Method not found")),
        }
    }
}

impl MockState {
    fn tip(&self) -> u64 {
        (self.blocks.len() as u64).saturating_sub(1)
    }

    fn block_json(&self, hash: &BlockHash, verbosity: u64) -> Result<Value, NodeError> {
        let (height, block) = self
            .blocks
            .iter()
            .enumerate()
            .find(|(_, b)| b.hash == *hash)
            .ok_or_else(|| NodeError::rpc(RPC_INVALID_ADDRESS_OR_KEY, "Block not found"))?;
        let height = height as u64;

        let txs: Vec<&MockTx> = block
            .txids
            .iter()
            .filter_map(|id| self.txs.get(id).map(|(tx, _)| tx))
            .collect();
        let size = 80 + txs.iter().map(|tx| tx.size()).sum::<u64>();

        let mut value = json!({
            "hash": block.hash,
            "confirmations": self.tip() - height + 1,
            "height": height,
            "version": 0x2000_0000,
            "merkleroot": block.hash.to_string(),
            "time": block.time,
            "mediantime": block.time,
            "nonce": 0,
            "bits": "207fffff",
            "difficulty": REGTEST_DIFFICULTY,
            "nTx": block.txids.len(),
            "size": size,
            "weight": size * 4,
        });
        if height > 0 {
            value["previousblockhash"] = json!(self.blocks[height as usize - 1].hash);
        }
        if let Some(next) = self.blocks.get(height as usize + 1) {
            value["nextblockhash"] = json!(next.hash);
        }
        value["tx"] = if verbosity >= 2 {
            Value::Array(txs.iter().map(|tx| tx.to_json()).collect())
        } else {
            json!(block.txids)
        };
        Ok(value)
    }

    fn raw_tx_json(&self, txid: &Txid) -> Result<Value, NodeError> {
        let (tx, height) = self.txs.get(txid).ok_or_else(not_in_chain)?;
        let mut value = tx.to_json();
        if let Some(height) = height {
            let block = &self.blocks[*height as usize];
            value["blockhash"] = json!(block.hash);
            value["confirmations"] = json!(self.tip() - height + 1);
            value["blocktime"] = json!(block.time);
            value["time"] = json!(block.time);
        }
        Ok(value)
    }

    fn output_value(&self, outpoint: &OutPoint) -> Option<Amount> {
        self.txs
            .get(&outpoint.txid)
            .and_then(|(tx, _)| tx.outputs.get(outpoint.vout as usize))
            .map(|o| o.value)
    }

    fn scan_json(&self, address: &str) -> Value {
        if self.scan_incomplete {
            return json!({ "success": false });
        }

        let confirmed = || {
            self.blocks
                .iter()
                .enumerate()
                .flat_map(|(h, b)| b.txids.iter().map(move |id| (h as u64, id)))
                .filter_map(|(h, id)| self.txs.get(id).map(|(tx, _)| (h, tx)))
        };

        let spent: HashSet<OutPoint> = confirmed()
            .flat_map(|(_, tx)| tx.inputs.iter())
            .filter_map(|input| match input {
                MockInput::Spend(outpoint) => Some(*outpoint),
                MockInput::Coinbase => None,
            })
            .collect();

        let mut unspents = Vec::new();
        let mut total = Amount::ZERO;
        let mut seen = HashSet::new();
        for (height, tx) in confirmed() {
            for (vout, output) in tx.outputs.iter().enumerate() {
                let outpoint = tx.outpoint(vout as u32);
                if output.address.as_deref() != Some(address)
                    || spent.contains(&outpoint)
                    || !seen.insert(outpoint)
                {
                    continue;
                }
                total += output.value;
                unspents.push(json!({
                    "txid": tx.txid,
                    "vout": vout,
                    "scriptPubKey": "",
                    "desc": format!("addr({address})"),
                    "amount": output.value.to_btc(),
                    "coinbase": tx.inputs.contains(&MockInput::Coinbase),
                    "height": height,
                }));
            }
        }

        json!({
            "success": true,
            "txouts": unspents.len(),
            "height": self.tip(),
            "bestblock": self.blocks.last().map(|b| b.hash),
            "unspents": unspents,
            "total_amount": total.to_btc(),
        })
    }

    fn mempool_fee(&self, tx: &MockTx) -> Amount {
        let inputs: Amount = tx
            .inputs
            .iter()
            .filter_map(|input| match input {
                MockInput::Spend(outpoint) => self.output_value(outpoint),
                MockInput::Coinbase => None,
            })
            .sum();
        let outputs: Amount = tx.outputs.iter().map(|o| o.value).sum();
        inputs.checked_sub(outputs).unwrap_or(Amount::ZERO)
    }

    fn mempool_json(&self, verbose: bool) -> Value {
        if !verbose {
            return json!(self.mempool);
        }

        let time = self.blocks.last().map(|b| b.time).unwrap_or(GENESIS_TIME);
        let mut entries = serde_json::Map::new();
        for txid in &self.mempool {
            let Some((tx, _)) = self.txs.get(txid) else {
                continue;
            };
            let fee = self.mempool_fee(tx).to_btc();
            entries.insert(
                txid.to_string(),
                json!({
                    "vsize": tx.vsize(),
                    "weight": tx.vsize() * 4,
                    "time": time,
                    "height": self.tip(),
                    "descendantcount": 1,
                    "descendantsize": tx.vsize(),
                    "ancestorcount": 1,
                    "ancestorsize": tx.vsize(),
                    "fees": {
                        "base": fee,
                        "modified": fee,
                        "ancestor": fee,
                        "descendant": fee,
                    },
                    "depends": [],
                    "bip125-replaceable": Sequence(tx.sequence).is_rbf(),
                }),
            );
        }
        Value::Object(entries)
    }

    fn mempool_info_json(&self) -> Value {
        let txs: Vec<&MockTx> = self
            .mempool
            .iter()
            .filter_map(|id| self.txs.get(id).map(|(tx, _)| tx))
            .collect();
        let bytes: u64 = txs.iter().map(|tx| tx.vsize()).sum();
        let total_fee: Amount = txs.iter().map(|tx| self.mempool_fee(tx)).sum();

        json!({
            "loaded": true,
            "size": txs.len(),
            "bytes": bytes,
            "usage": bytes * 2,
            "total_fee": total_fee.to_btc(),
            "maxmempool": 300_000_000u64,
            "mempoolminfee": 0.00001,
            "minrelaytxfee": 0.00001,
            "unbroadcastcount": 0,
        })
    }

    fn blockchain_info_json(&self) -> Result<Value, NodeError> {
        let best = self
            .blocks
            .last()
            .ok_or_else(|| NodeError::rpc(RPC_MISC_ERROR, "no blocks"))?;
        Ok(json!({
            "chain": "regtest",
            "blocks": self.tip(),
            "headers": self.tip(),
            "bestblockhash": best.hash,
            "difficulty": REGTEST_DIFFICULTY,
            "mediantime": best.time,
            "size_on_disk": 293 * self.blocks.len() as u64,
            "pruned": false,
        }))
    }

    /// Wallet send: spends the genesis output into `address` plus change.
    fn send(&mut self, address: &str, amount: Amount) -> Txid {
        self.sends += 1;
        let funding = self
            .blocks
            .first()
            .and_then(|b| b.txids.first())
            .map(|txid| OutPoint { txid: *txid, vout: 0 })
            .unwrap_or_else(OutPoint::null);

        let mut outputs = vec![MockOutput::to(address, amount)];
        let fee = Amount::from_sat(1_000);
        if let Some(change) = Amount::from_int_btc(50).checked_sub(amount + fee) {
            outputs.push(MockOutput::to(GENESIS_ADDRESS, change));
        }

        let tx = MockTx::spend(&format!("send-{}", self.sends), vec![funding], outputs);
        let txid = tx.txid;
        self.mempool.push(txid);
        self.txs.insert(txid, (tx, None));
        txid
    }
}

fn not_in_chain() -> NodeError {
    NodeError::rpc(
        RPC_INVALID_ADDRESS_OR_KEY,
        "No such mempool or blockchain transaction",
    )
}

fn is_plausible_address(address: &str) -> bool {
    !address.is_empty() && address.chars().all(|c| c.is_ascii_alphanumeric())
}

fn param_str<'a>(params: &'a [Value], index: usize) -> Result<&'a str, NodeError> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::rpc(RPC_MISC_ERROR, format!("missing string param #{index}")))
}

fn param_u64(params: &[Value], index: usize) -> Result<u64, NodeError> {
    params
        .get(index)
        .and_then(Value::as_u64)
        .ok_or_else(|| NodeError::rpc(RPC_MISC_ERROR, format!("missing integer param #{index}")))
}

fn scan_address(params: &[Value]) -> Result<String, NodeError> {
    let descriptor = params
        .get(1)
        .and_then(Value::as_array)
        .and_then(|descs| descs.first())
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::rpc(RPC_MISC_ERROR, "missing scan objects"))?;

    descriptor
        .strip_prefix("addr(")
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|address| is_plausible_address(address))
        .map(str::to_string)
        .ok_or_else(|| NodeError::rpc(RPC_INVALID_ADDRESS_OR_KEY, "Invalid descriptor"))
}
