use bitcoin::Amount;

use crate::engine::fees::{fee_recommendation, format_eta, sat_per_vbyte, FALLBACK_SAT_PER_VBYTE};
use crate::node::mock::MockNode;

#[test]
fn missing_estimates_fall_back_for_every_tier() {
    let node = MockNode::new();

    let fees = fee_recommendation(&node);

    for tier in fees.tiers() {
        assert_eq!(tier.sat_per_vbyte, FALLBACK_SAT_PER_VBYTE);
        assert!(!tier.estimated);
    }
    assert_eq!(fees.fast.eta, "~10 min");
    assert_eq!(fees.medium.eta, "~30 min");
    assert_eq!(fees.slow.eta, "~1 hour");
}

#[test]
fn failing_estimate_calls_never_reach_the_caller() {
    let node = MockNode::new();
    node.fail_method("estimatesmartfee");

    let fees = fee_recommendation(&node);
    assert!(fees.tiers().iter().all(|t| t.sat_per_vbyte == FALLBACK_SAT_PER_VBYTE));

    node.set_unreachable(true);
    let fees = fee_recommendation(&node);
    assert!(fees.tiers().iter().all(|t| !t.estimated));
}

#[test]
fn estimates_are_converted_and_rounded_up() {
    let node = MockNode::new();
    node.set_fee_rate(1, Amount::from_sat(25_001));
    node.set_fee_rate(3, Amount::from_sat(2_500));
    node.set_fee_rate(6, Amount::from_sat(300));

    let fees = fee_recommendation(&node);

    assert_eq!(fees.fast.sat_per_vbyte, 26);
    assert_eq!(fees.medium.sat_per_vbyte, 3);
    assert_eq!(fees.slow.sat_per_vbyte, 1);
    assert!(fees.tiers().iter().all(|t| t.estimated));
    assert_eq!(fees.medium.target_blocks, 3);
    assert_eq!(fees.medium.estimated_blocks, 3);
}

#[test]
fn never_below_one_sat_per_vbyte() {
    assert_eq!(sat_per_vbyte(Amount::ZERO), 1);
    assert_eq!(sat_per_vbyte(Amount::from_sat(1)), 1);
    assert_eq!(sat_per_vbyte(Amount::from_sat(1_000)), 1);
    assert_eq!(sat_per_vbyte(Amount::from_sat(1_001)), 2);
    assert_eq!(sat_per_vbyte(Amount::from_sat(10_000)), 10);
}

#[test]
fn eta_formatting() {
    assert_eq!(format_eta(1), "~10 min");
    assert_eq!(format_eta(5), "~50 min");
    assert_eq!(format_eta(6), "~1 hour");
    assert_eq!(format_eta(12), "~2 hours");
    assert_eq!(format_eta(144), "~24 hours");
}
