use bitcoin::SignedAmount;

use super::{btc, chain_with_coinbases, coinbase_to, ALICE, BOB, CAROL};
use crate::engine::address::address_view;
use crate::engine::error::ExplorerError;
use crate::engine::types::Direction;
use crate::node::mock::{MockNode, MockOutput, MockTx};

#[test]
fn single_coinbase_payout() {
    let node = MockNode::new();
    let payout = coinbase_to("cb-1", ALICE, btc(50));
    node.mine_block(vec![payout.clone()]);

    let view = address_view(&node, ALICE, 100).unwrap();

    assert_eq!(view.balance, btc(50));
    assert_eq!(view.utxo_count, 1);
    assert_eq!(view.utxos[0].txid, payout.txid);
    assert_eq!(view.utxos[0].height, 1);
    assert!(view.utxos[0].is_coinbase);

    assert_eq!(view.history.len(), 1);
    let entry = &view.history[0];
    assert_eq!(entry.direction, Direction::Incoming);
    assert_eq!(entry.net, SignedAmount::from_btc(50.0).unwrap());
    assert_eq!(entry.amount, btc(50));
    assert_eq!(entry.confirmations, 1);
    assert!(view.history.iter().all(|e| e.direction != Direction::Outgoing));
}

#[test]
fn spend_with_change_is_outgoing_net_of_change() {
    let node = MockNode::new();
    let funding = coinbase_to("cb-1", ALICE, btc(10));
    node.mine_block(vec![funding.clone()]);
    let spend = MockTx::spend(
        "pay-bob",
        vec![funding.outpoint(0)],
        vec![MockOutput::to(BOB, btc(6)), MockOutput::to(ALICE, btc(3))],
    );
    node.mine_block(vec![spend.clone()]);

    let view = address_view(&node, ALICE, 100).unwrap();

    assert_eq!(view.balance, btc(3));
    assert_eq!(view.utxo_count, 1);
    assert_eq!(view.tip_height, 2);

    assert_eq!(view.history.len(), 2);
    assert_eq!(view.history[0].txid, spend.txid);
    assert_eq!(view.history[0].direction, Direction::Outgoing);
    assert_eq!(view.history[0].net, SignedAmount::from_sat(-700_000_000));
    assert_eq!(view.history[0].confirmations, 1);
    assert_eq!(view.history[1].txid, funding.txid);
    assert_eq!(view.history[1].direction, Direction::Incoming);
    assert_eq!(view.history[1].confirmations, 2);

    let bob = address_view(&node, BOB, 100).unwrap();
    assert_eq!(bob.balance, btc(6));
    assert_eq!(bob.history.len(), 1);
    assert_eq!(bob.history[0].direction, Direction::Incoming);
}

#[test]
fn net_zero_activity_is_excluded() {
    let node = MockNode::new();
    let funding = coinbase_to("cb-1", ALICE, btc(5));
    node.mine_block(vec![funding.clone()]);
    // Alice pays herself the full amount; Carol funded nothing.
    node.mine_block(vec![MockTx::spend(
        "self-transfer",
        vec![funding.outpoint(0)],
        vec![MockOutput::to(ALICE, btc(5))],
    )]);

    let view = address_view(&node, ALICE, 100).unwrap();

    assert_eq!(view.history.len(), 1);
    assert_eq!(view.history[0].txid, funding.txid);
    assert_eq!(view.balance, btc(5));

    let carol = address_view(&node, CAROL, 100).unwrap();
    assert!(carol.history.is_empty());
    assert_eq!(carol.balance, btc(0));
}

#[test]
fn history_is_bounded_by_the_window_but_balance_is_not() {
    let node = MockNode::new();
    node.mine_block(vec![coinbase_to("old", ALICE, btc(1))]);
    node.mine_empty_blocks(10, 600);
    node.mine_block(vec![coinbase_to("recent", ALICE, btc(2))]);

    let view = address_view(&node, ALICE, 5).unwrap();

    assert_eq!(view.balance, btc(3));
    assert_eq!(view.utxo_count, 2);
    assert_eq!(view.history.len(), 1);
    assert_eq!(view.tip_height, 12);
    assert_eq!(view.scanned_from_height, 8);
}

#[test]
fn history_is_newest_first_by_block_time() {
    let node = MockNode::new();
    node.mine_block_at(2_000_000_000, vec![coinbase_to("late-clock", ALICE, btc(1))]);
    node.mine_block_at(1_999_999_000, vec![coinbase_to("early-clock", ALICE, btc(1))]);

    let view = address_view(&node, ALICE, 100).unwrap();

    let times: Vec<u64> = view.history.iter().map(|e| e.time).collect();
    assert_eq!(times, vec![2_000_000_000, 1_999_999_000]);
    assert_eq!(view.history[0].block_height, 1);
}

#[test]
fn failed_utxo_scan_is_a_hard_failure() {
    let node = chain_with_coinbases(3, ALICE);
    node.set_scan_incomplete(true);
    node.reset_calls();

    let err = address_view(&node, ALICE, 100).unwrap_err();

    assert!(err.is_unavailable());
    assert_eq!(node.calls("getblockhash"), 0, "history must not be walked");
}

#[test]
fn malformed_address_is_not_found() {
    let node = MockNode::new();

    let err = address_view(&node, "no such address", 100).unwrap_err();

    assert!(matches!(err, ExplorerError::NotFound { kind: "address", .. }));
}
