use bitcoin::{Amount, OutPoint, Sequence};
use serde_json::json;

use crate::node::api::{NodeGateway, NodeQueries};
use crate::node::error::{NodeError, RPC_INVALID_ADDRESS_OR_KEY, RPC_METHOD_NOT_FOUND};
use crate::node::mock::{fake_txid, MockNode, MockOutput, MockTx, GENESIS_ADDRESS};
use crate::node::rpc_client::decode_envelope;
use crate::node::types::{RawTransaction, TxInput};


fn btc(whole: u64) -> Amount {
    Amount::from_int_btc(whole)
}

#[test]
fn envelope_result_is_returned() {
    let body = r#"{"result": 101, "error": null, "id": 1}"#;
    assert_eq!(decode_envelope("getblockcount", 200, body).unwrap(), json!(101));
}

#[test]
fn envelope_error_keeps_node_code_and_message() {
    let body = r#"{"result": null, "error": {"code": -5, "message": "Block not found"}, "id": 2}"#;
    let err = decode_envelope("getblock", 500, body).unwrap_err();

    assert_eq!(err, NodeError::rpc(-5, "Block not found"));
    assert!(err.is_not_found());
    assert!(!err.is_unavailable());
}

#[test]
fn envelope_non_json_body_is_a_decode_error() {
    let err = decode_envelope("getblockcount", 502, "<html>Bad Gateway</html>").unwrap_err();
    match err {
        NodeError::Decode(msg) => assert!(msg.contains("502")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn error_classification() {
    assert!(NodeError::Unreachable("refused".into()).is_transient());
    assert!(NodeError::Unauthorized.is_unavailable());
    assert!(!NodeError::Unauthorized.is_transient());
    assert!(NodeError::rpc(-8, "Block height out of range").is_not_found());
    assert!(!NodeError::rpc(-26, "non-mandatory-script-verify-flag").is_not_found());
    assert!(!NodeError::rpc(-26, "rejected").is_unavailable());
}

#[test]
fn decodes_coinbase_and_spend_inputs() {
    let raw = json!({
        "txid": fake_txid("t"),
        "hash": fake_txid("t"),
        "size": 200,
        "vsize": 141,
        "weight": 561,
        "version": 2,
        "locktime": 0,
        "vin": [
            { "coinbase": "0101", "sequence": 4294967295u32 },
            { "txid": fake_txid("p"), "vout": 1, "scriptSig": {"asm": "", "hex": ""}, "sequence": 4294967293u32 },
        ],
        "vout": [
            { "value": 0.1, "n": 0, "scriptPubKey": { "type": "witness_v0_keyhash", "address": "bcrt1qa" } },
            { "value": 0.0, "n": 1, "scriptPubKey": { "type": "nulldata" } },
        ],
    });

    let tx: RawTransaction = serde_json::from_value(raw).unwrap();

    assert!(tx.vin[0].is_coinbase());
    assert_eq!(
        tx.vin[1].previous_output(),
        Some(OutPoint { txid: fake_txid("p"), vout: 1 })
    );
    assert!(tx.signals_rbf());
    assert!(!tx.is_segwit());
    assert_eq!(tx.vout[0].value, Amount::from_sat(10_000_000));
    assert!(tx.vout[0].pays_to("bcrt1qa"));
    assert_eq!(tx.vout[1].address(), None);
}

#[test]
fn input_without_marker_or_reference_is_rejected() {
    let err = serde_json::from_value::<TxInput>(json!({ "sequence": 1 }));
    assert!(err.is_err());
}

#[test]
fn mock_serves_a_decodable_chain() {
    let node = MockNode::new();
    let payout = MockTx::coinbase("cb-1", vec![MockOutput::to("bcrt1qa", btc(50))]);
    let hash = node.mine_block(vec![payout.clone()]);

    assert_eq!(node.block_count().unwrap(), 1);
    assert_eq!(node.block_hash(1).unwrap(), hash);

    let block = node.block(&hash).unwrap();
    assert_eq!(block.height(), 1);
    assert_eq!(block.tx.len(), 1);
    assert!(block.tx[0].is_coinbase());
    assert!(block.header.previousblockhash.is_some());

    let tx = node.raw_transaction(&payout.txid).unwrap();
    assert_eq!(tx.blockhash, Some(hash));
    assert_eq!(tx.confirmations, Some(1));
}

#[test]
fn mock_unknown_lookups_are_not_found() {
    let node = MockNode::new();

    assert!(node.block_hash(7).unwrap_err().is_not_found());
    assert!(node.raw_transaction(&fake_txid("nope")).unwrap_err().is_not_found());

    let err = node.call("getchaintips", &[]).unwrap_err();
    assert_eq!(err, NodeError::rpc(RPC_METHOD_NOT_FOUND, "Method not found"));
}

#[test]
fn mock_utxo_scan_excludes_spent_outputs() {
    let node = MockNode::new();
    let funding = MockTx::coinbase(
        "cb-1",
        vec![MockOutput::to("bcrt1qa", btc(10)), MockOutput::to("bcrt1qa", btc(5))],
    );
    node.mine_block(vec![funding.clone()]);
    node.mine_block(vec![MockTx::spend(
        "spend",
        vec![funding.outpoint(0)],
        vec![MockOutput::to("bcrt1qb", btc(9))],
    )]);

    let scan = node.scan_utxos("bcrt1qa").unwrap();
    assert_eq!(scan.unspents.len(), 1);
    assert_eq!(scan.unspents[0].vout, 1);
    assert_eq!(scan.unspents[0].height, 1);
    assert_eq!(scan.total_amount, btc(5));
}

#[test]
fn mock_incomplete_scan_is_an_error() {
    let node = MockNode::new();
    node.set_scan_incomplete(true);

    let err = node.scan_utxos(GENESIS_ADDRESS).unwrap_err();
    assert!(matches!(err, NodeError::Incomplete { .. }));
    assert!(err.is_unavailable());
}

#[test]
fn mock_rejects_malformed_address_descriptor() {
    let node = MockNode::new();
    let err = node.scan_utxos("not an address").unwrap_err();
    assert_eq!(err, NodeError::rpc(RPC_INVALID_ADDRESS_OR_KEY, "Invalid descriptor"));
}

#[test]
fn mock_fee_estimates_and_errors() {
    let node = MockNode::new();
    node.set_fee_rate(1, Amount::from_sat(2_500));

    let estimate = node.estimate_smart_fee(1).unwrap();
    assert_eq!(estimate.feerate, Some(Amount::from_sat(2_500)));
    assert_eq!(estimate.blocks, 1);

    let missing = node.estimate_smart_fee(6).unwrap();
    assert_eq!(missing.feerate, None);
    assert!(!missing.errors.is_empty());
}

#[test]
fn mock_mempool_entries_report_fees_and_rbf() {
    let node = MockNode::new();
    let funding = MockTx::coinbase("cb-1", vec![MockOutput::to("bcrt1qa", btc(1))]);
    node.mine_block(vec![funding.clone()]);

    let pending = MockTx::spend(
        "pending",
        vec![funding.outpoint(0)],
        vec![MockOutput::to("bcrt1qb", Amount::from_sat(99_990_000))],
    )
    .with_sequence(Sequence::ENABLE_RBF_NO_LOCKTIME.0);
    node.add_to_mempool(pending.clone());

    assert_eq!(node.mempool_ids().unwrap(), vec![pending.txid]);

    let entries = node.mempool_entries().unwrap();
    let entry = &entries[&pending.txid];
    assert_eq!(entry.fees.base, Amount::from_sat(10_000));
    assert!(entry.bip125_replaceable);

    let info = node.mempool_info().unwrap();
    assert_eq!(info.size, 1);
    assert_eq!(info.total_fee, Amount::from_sat(10_000));
}

#[test]
fn mock_counts_calls_and_injects_faults() {
    let node = MockNode::new();
    node.block_count().unwrap();
    node.block_count().unwrap();
    assert_eq!(node.calls("getblockcount"), 2);

    node.fail_method("getblockcount");
    assert!(node.block_count().is_err());

    node.set_unreachable(true);
    let err = node.blockchain_info().unwrap_err();
    assert!(err.is_transient());
}

#[test]
fn mock_send_to_address_lands_in_mempool() {
    let node = MockNode::new();
    let txid = node.send_to_address("bcrt1qdest", btc(2)).unwrap();

    assert_eq!(node.mempool_ids().unwrap(), vec![txid]);
    let tx = node.raw_transaction(&txid).unwrap();
    assert!(tx.vout[0].pays_to("bcrt1qdest"));
    assert_eq!(tx.vout[0].value, btc(2));
    assert_eq!(tx.blockhash, None);
}
