use std::collections::HashSet;

use super::{btc, chain_with_coinbases, coinbase_to, ALICE, BOB};
use crate::engine::scanner::{ChainScan, ScanLimits};
use crate::node::mock::{MockNode, MockOutput, MockTx};

#[test]
fn walks_down_from_tip_without_gaps() {
    let node = chain_with_coinbases(6, ALICE);

    let heights: Vec<u64> = ChainScan::start(&node, ScanLimits::blocks(100))
        .unwrap()
        .map(|item| item.unwrap().block.height)
        .collect();

    assert_eq!(heights, vec![6, 5, 4, 3, 2, 1, 0]);
}

#[test]
fn block_limit_caps_the_walk() {
    let node = chain_with_coinbases(20, ALICE);
    node.reset_calls();

    let mut scan = ChainScan::start(&node, ScanLimits::blocks(5)).unwrap();
    let heights: Vec<u64> = scan.by_ref().map(|item| item.unwrap().block.height).collect();

    assert_eq!(heights, vec![20, 19, 18, 17, 16]);
    assert_eq!(scan.blocks_scanned(), 5);
    assert_eq!(scan.floor_height(), Some(16));
    assert_eq!(node.calls("getblock"), 5);
}

#[test]
fn never_descends_below_genesis() {
    let node = chain_with_coinbases(2, ALICE);

    let mut scan = ChainScan::start(&node, ScanLimits::blocks(1_000)).unwrap();
    let count = scan.by_ref().count();

    assert_eq!(count, 3);
    assert_eq!(scan.blocks_scanned(), 3);
    assert_eq!(scan.floor_height(), Some(0));
}

#[test]
fn transaction_limit_stops_before_deeper_blocks() {
    let node = MockNode::new();
    node.mine_block(vec![
        coinbase_to("cb-1", ALICE, btc(50)),
        coinbase_to("extra-1", BOB, btc(1)),
    ]);
    node.mine_block(vec![
        coinbase_to("cb-2", ALICE, btc(50)),
        coinbase_to("extra-2", BOB, btc(1)),
    ]);
    node.reset_calls();

    let limits = ScanLimits::blocks(50).with_max_transactions(3);
    let heights: Vec<u64> = ChainScan::start(&node, limits)
        .unwrap()
        .map(|item| item.unwrap().block.height)
        .collect();

    assert_eq!(heights, vec![2, 2, 1]);
    assert_eq!(node.calls("getblock"), 2, "genesis must not be fetched");
}

#[test]
fn duplicate_txids_are_yielded_once_per_scan() {
    let node = MockNode::new();
    let repeated = MockTx::coinbase("repeated", vec![MockOutput::to(ALICE, btc(1))]);
    node.mine_block(vec![repeated.clone()]);
    node.mine_block(vec![repeated.clone(), coinbase_to("cb-2", BOB, btc(50))]);

    let txids: Vec<_> = ChainScan::start(&node, ScanLimits::blocks(10))
        .unwrap()
        .map(|item| item.unwrap().tx.txid)
        .collect();

    let unique: HashSet<_> = txids.iter().collect();
    assert_eq!(unique.len(), txids.len());
    assert_eq!(txids.iter().filter(|id| **id == repeated.txid).count(), 1);

    // A fresh scan starts with an empty seen-set.
    let again = ChainScan::start(&node, ScanLimits::blocks(10)).unwrap().count();
    assert_eq!(again, txids.len());
}

#[test]
fn negative_tip_yields_nothing() {
    let node = MockNode::empty();

    let mut scan = ChainScan::start(&node, ScanLimits::blocks(10)).unwrap();

    assert_eq!(scan.tip(), None);
    assert!(scan.next().is_none());
    assert_eq!(node.calls("getblockhash"), 0);
}

#[test]
fn zero_block_limit_yields_nothing() {
    let node = chain_with_coinbases(3, ALICE);

    let mut scan = ChainScan::start(&node, ScanLimits::blocks(0)).unwrap();

    assert!(scan.next().is_none());
    assert_eq!(scan.floor_height(), None);
}

#[test]
fn node_error_is_yielded_once_and_ends_the_walk() {
    let node = chain_with_coinbases(3, ALICE);
    let mut scan = ChainScan::start(&node, ScanLimits::blocks(10)).unwrap();
    node.fail_method("getblock");

    assert!(matches!(scan.next(), Some(Err(_))));
    assert!(scan.next().is_none());
}

#[test]
fn carries_block_context() {
    let node = MockNode::new();
    let hash = node.mine_block_at(1_700_000_000, vec![coinbase_to("cb-1", ALICE, btc(50))]);

    let first = ChainScan::start(&node, ScanLimits::blocks(1))
        .unwrap()
        .next()
        .unwrap()
        .unwrap();

    assert_eq!(first.block.hash, hash);
    assert_eq!(first.block.height, 1);
    assert_eq!(first.time, 1_700_000_000);
}
