//! Funding-output resolution and fee derivation.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use bitcoin::{Amount, OutPoint, Txid};

use crate::engine::types::{
    BlockRef, EnrichedInput, EnrichedOutput, EnrichedTransaction, ScriptKind,
};
use crate::node::api::{NodeGateway, NodeQueries};
use crate::node::types::{RawTransaction, TxInput};

/// Where a transaction sits, as far as the caller knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub block: Option<BlockRef>,
    pub time: u64,
}

impl TxContext {
    pub fn confirmed(block: BlockRef, time: u64) -> Self {
        Self {
            block: Some(block),
            time,
        }
    }

    /// Mempool transactions have no block time; they are stamped "now".
    pub fn unconfirmed() -> Self {
        Self {
            block: None,
            time: now_secs(),
        }
    }
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Funding transactions fetched while enriching one transaction.
///
/// Lives for a single call, so several inputs spending the same parent cost
/// one round-trip. A failed fetch is remembered as `None`.
#[derive(Default)]
pub(crate) struct FundingCache {
    fetched: HashMap<Txid, Option<RawTransaction>>,
}

impl FundingCache {
    fn funding_tx<G: NodeGateway + ?Sized>(
        &mut self,
        node: &G,
        txid: Txid,
    ) -> Option<&RawTransaction> {
        self.fetched
            .entry(txid)
            .or_insert_with(|| match node.raw_transaction(&txid) {
                Ok(tx) => Some(tx),
                Err(err) => {
                    log::debug!("[ENRICH] funding tx {} unavailable: {}", txid, err);
                    None
                }
            })
            .as_ref()
    }
}

/// Resolves one input to its funding output.
///
/// Coinbase inputs are never looked up. Any failure, whether the fetch or a
/// missing output index, leaves the input `Unresolved`.
pub(crate) fn resolve_input<G: NodeGateway + ?Sized>(
    node: &G,
    cache: &mut FundingCache,
    input: &TxInput,
) -> EnrichedInput {
    let OutPoint { txid, vout } = match input {
        TxInput::Coinbase { .. } => return EnrichedInput::Coinbase,
        TxInput::Spend {
            previous_output, ..
        } => *previous_output,
    };

    match cache.funding_tx(node, txid).and_then(|funding| funding.output(vout)) {
        Some(output) => EnrichedInput::Resolved {
            txid,
            vout,
            address: output.address().map(str::to_string),
            value: output.value,
        },
        None => EnrichedInput::Unresolved { txid, vout },
    }
}

/// Enriches `tx` with resolved inputs, totals and fee.
///
/// Never fails: a node error while resolving an input only makes that input
/// unresolved, and the fee unknown.
pub fn enrich_transaction<G: NodeGateway + ?Sized>(
    node: &G,
    tx: RawTransaction,
    context: TxContext,
) -> EnrichedTransaction {
    let mut cache = FundingCache::default();
    let inputs: Vec<EnrichedInput> = tx
        .vin
        .iter()
        .map(|input| resolve_input(node, &mut cache, input))
        .collect();

    let outputs: Vec<EnrichedOutput> = tx
        .vout
        .iter()
        .map(|output| EnrichedOutput {
            n: output.n,
            value: output.value,
            address: output.address().map(str::to_string),
            script_kind: ScriptKind::from_node_tag(&output.script_pub_key.kind),
        })
        .collect();

    let is_coinbase = tx.is_coinbase();
    let total_input: Amount = inputs.iter().filter_map(EnrichedInput::value).sum();
    let total_output: Amount = outputs.iter().map(|o| o.value).sum();
    let fee = derive_fee(tx.txid, is_coinbase, &inputs, total_input, total_output);

    EnrichedTransaction {
        txid: tx.txid,
        wtxid: tx.hash,
        block: context.block,
        time: context.time,
        size: tx.size,
        vsize: tx.vsize,
        weight: tx.weight,
        is_coinbase,
        is_segwit: tx.is_segwit(),
        is_rbf: tx.signals_rbf(),
        inputs,
        outputs,
        total_input,
        total_output,
        fee,
    }
}

fn derive_fee(
    txid: Txid,
    is_coinbase: bool,
    inputs: &[EnrichedInput],
    total_input: Amount,
    total_output: Amount,
) -> Option<Amount> {
    if is_coinbase {
        return Some(Amount::ZERO);
    }

    let unresolved = inputs
        .iter()
        .filter(|input| matches!(input, EnrichedInput::Unresolved { .. }))
        .count();
    if unresolved > 0 {
        log::debug!("[ENRICH] {}: {} unresolved input(s), fee unknown", txid, unresolved);
        return None;
    }

    let fee = total_input.checked_sub(total_output);
    if fee.is_none() {
        log::warn!(
            "[ENRICH] {}: outputs {} exceed resolved inputs {}, fee unknown",
            txid,
            total_output,
            total_input
        );
    }
    fee
}
