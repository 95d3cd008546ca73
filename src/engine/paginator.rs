use crate::engine::enricher::{enrich_transaction, TxContext};
use crate::engine::error::ExplorerError;
use crate::engine::scanner::{ChainScan, ScanLimits};
use crate::engine::types::TransactionPage;
use crate::node::api::NodeGateway;

/// One page of recent transactions, newest first.
///
/// Every page re-walks the chain from the tip and discards the first
/// `offset` transactions; only the kept ones are enriched. Consecutive pages
/// line up as long as no block lands between the requests.
pub fn recent_transactions<G: NodeGateway + ?Sized>(
    node: &G,
    scan_depth: u64,
    offset: usize,
    limit: usize,
) -> Result<TransactionPage, ExplorerError> {
    if limit == 0 {
        return Ok(TransactionPage {
            transactions: Vec::new(),
            offset,
            limit,
            has_more: false,
        });
    }

    let limits = ScanLimits::blocks(scan_depth).with_max_transactions(offset.saturating_add(limit));
    let mut transactions = Vec::with_capacity(limit);

    for (index, scanned) in ChainScan::start(node, limits)?.enumerate() {
        let scanned = scanned?;
        if index < offset {
            continue;
        }
        let context = TxContext::confirmed(scanned.block, scanned.time);
        transactions.push(enrich_transaction(node, scanned.tx, context));
    }

    log::debug!(
        "[SCAN] page offset={} limit={} -> {} tx",
        offset,
        limit,
        transactions.len()
    );

    let has_more = transactions.len() == limit;
    Ok(TransactionPage {
        transactions,
        offset,
        limit,
        has_more,
    })
}
