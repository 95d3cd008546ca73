use bitcoin::Amount;

use crate::config::ExplorerConfig;
use crate::engine::explorer::Explorer;
use crate::node::mock::{MockNode, MockOutput, MockTx};

mod address;
mod fees;
mod retarget;
mod scanner;

// =========================================================================
// Helpers
// =========================================================================

const ALICE: &str = "bcrt1qalice";
const BOB: &str = "bcrt1qbob";
const CAROL: &str = "bcrt1qcarol";

fn btc(whole: u64) -> Amount {
    Amount::from_int_btc(whole)
}

fn coinbase_to(label: &str, address: &str, value: Amount) -> MockTx {
    MockTx::coinbase(label, vec![MockOutput::to(address, value)])
}

/// Genesis plus `blocks` blocks, each holding a single coinbase to `address`.
fn chain_with_coinbases(blocks: u64, address: &str) -> MockNode {
    let node = MockNode::new();
    for height in 1..=blocks {
        node.mine_block(vec![coinbase_to(&format!("cb-{height}"), address, btc(50))]);
    }
    node
}

fn explorer(node: &MockNode) -> Explorer<&MockNode> {
    Explorer::new(node, ExplorerConfig::default())
}
