use crate::engine::enricher::{enrich_transaction, TxContext};
use crate::engine::error::ExplorerError;
use crate::engine::types::EnrichedTransaction;
use crate::node::api::{NodeGateway, NodeQueries};

/// Enriches up to `cap` unconfirmed transactions, in the node's listing order.
///
/// A transaction that vanishes between listing and fetching (mined, evicted,
/// replaced) is skipped. Only failing to list the pool fails the call.
pub fn mempool_transactions<G: NodeGateway + ?Sized>(
    node: &G,
    cap: usize,
) -> Result<Vec<EnrichedTransaction>, ExplorerError> {
    let ids = node.mempool_ids()?;
    let total = ids.len();

    let mut transactions = Vec::with_capacity(total.min(cap));
    for txid in ids.into_iter().take(cap) {
        match node.raw_transaction(&txid) {
            Ok(tx) => transactions.push(enrich_transaction(node, tx, TxContext::unconfirmed())),
            Err(err) => log::debug!("[MEMPOOL] skipping {}: {}", txid, err),
        }
    }

    log::debug!(
        "[MEMPOOL] enriched {} of {} pooled tx (cap {})",
        transactions.len(),
        total,
        cap
    );
    Ok(transactions)
}
