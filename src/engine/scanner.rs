//! Backward block walk from the tip.
//!
//! There is no index to consult, so every history-shaped view is answered by
//! literally re-reading the most recent blocks. The walk is lazy: blocks are
//! fetched only as transactions are pulled, and a transaction limit stops the
//! walk without touching deeper blocks.

use std::collections::{HashSet, VecDeque};

use bitcoin::Txid;

use crate::engine::types::BlockRef;
use crate::node::api::{NodeGateway, NodeQueries};
use crate::node::error::NodeError;
use crate::node::types::RawTransaction;

/// Bounds of a single walk. The walk stops at whichever is reached first:
/// genesis, `max_blocks` blocks read, or `max_transactions` yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub max_blocks: u64,
    pub max_transactions: Option<usize>,
}

impl ScanLimits {
    pub fn blocks(max_blocks: u64) -> Self {
        Self {
            max_blocks,
            max_transactions: None,
        }
    }

    pub fn with_max_transactions(mut self, max: usize) -> Self {
        self.max_transactions = Some(max);
        self
    }
}

/// A transaction together with the block it was found in.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedTransaction {
    pub block: BlockRef,
    pub time: u64,
    pub tx: RawTransaction,
}

/// Lazy walk over `(block, transaction)` pairs, tip first.
///
/// Heights strictly decrease without gaps. Within one walk a txid is yielded
/// at most once; separate walks share nothing, including the tip they
/// started from.
///
/// The first node error is yielded once and ends the walk.
pub struct ChainScan<'a, G: ?Sized> {
    node: &'a G,
    limits: ScanLimits,
    tip: Option<u64>,
    next_height: Option<u64>,
    blocks_scanned: u64,
    yielded: usize,
    seen: HashSet<Txid>,
    pending: VecDeque<ScannedTransaction>,
    done: bool,
}

impl<'a, G: NodeGateway + ?Sized> ChainScan<'a, G> {
    /// Reads the tip once and prepares a walk down from it.
    pub fn start(node: &'a G, limits: ScanLimits) -> Result<Self, NodeError> {
        let tip = node.block_count()?;
        Ok(Self::from_tip(node, tip, limits))
    }

    /// Walk from a tip the caller already read. A negative tip (no blocks)
    /// yields nothing.
    pub fn from_tip(node: &'a G, tip: i64, limits: ScanLimits) -> Self {
        let tip = u64::try_from(tip).ok();
        Self {
            node,
            limits,
            tip,
            next_height: tip,
            blocks_scanned: 0,
            yielded: 0,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    pub fn tip(&self) -> Option<u64> {
        self.tip
    }

    pub fn blocks_scanned(&self) -> u64 {
        self.blocks_scanned
    }

    /// Lowest height the block limit allows this walk to reach.
    pub fn floor_height(&self) -> Option<u64> {
        let tip = self.tip?;
        let depth = self.limits.max_blocks.checked_sub(1)?;
        Some(tip.saturating_sub(depth))
    }

    fn transaction_limit_reached(&self) -> bool {
        self.limits
            .max_transactions
            .is_some_and(|max| self.yielded >= max)
    }

    /// Reads the next block down. `Ok(false)` once the walk is exhausted.
    fn load_next_block(&mut self) -> Result<bool, NodeError> {
        if self.blocks_scanned >= self.limits.max_blocks {
            return Ok(false);
        }
        let Some(height) = self.next_height else {
            return Ok(false);
        };

        let hash = self.node.block_hash(height)?;
        let block = self.node.block(&hash)?;
        self.blocks_scanned += 1;
        self.next_height = height.checked_sub(1);

        let block_ref = BlockRef { height, hash };
        let time = block.time();
        for tx in block.tx {
            if !self.seen.insert(tx.txid) {
                log::warn!("[SCAN] duplicate txid {} at height {}, skipped", tx.txid, height);
                continue;
            }
            self.pending.push_back(ScannedTransaction {
                block: block_ref,
                time,
                tx,
            });
        }
        Ok(true)
    }

    fn finish(&mut self) {
        if !self.done {
            self.done = true;
            log::debug!(
                "[SCAN] walked {} block(s) down from tip {:?}, {} tx yielded",
                self.blocks_scanned,
                self.tip,
                self.yielded
            );
        }
    }
}

impl<G: NodeGateway + ?Sized> Iterator for ChainScan<'_, G> {
    type Item = Result<ScannedTransaction, NodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.transaction_limit_reached() {
                self.finish();
                return None;
            }
            if let Some(item) = self.pending.pop_front() {
                self.yielded += 1;
                return Some(Ok(item));
            }
            match self.load_next_block() {
                Ok(true) => continue,
                Ok(false) => {
                    self.finish();
                    return None;
                }
                Err(err) => {
                    log::warn!("[SCAN] aborted at height {:?}: {}", self.next_height, err);
                    self.finish();
                    return Some(Err(err));
                }
            }
        }
    }
}
