use crate::engine::retarget::{
    project_retarget, projection_from_samples, RetargetParams, MAX_CHANGE_PERCENT,
    MIN_CHANGE_PERCENT, RETARGET_SAMPLE,
};
use crate::node::mock::MockNode;

const PARAMS: RetargetParams = RetargetParams {
    interval: 2016,
    target_block_time_secs: 600,
};

fn evenly_spaced(count: u64, spacing: u64) -> Vec<u64> {
    (0..count).map(|i| 1_700_000_000 + i * spacing).collect()
}

#[test]
fn young_epoch_gets_structure_only() {
    let projection = projection_from_samples(2016 + 5, &evenly_spaced(10, 1), PARAMS);

    assert_eq!(projection.next_retarget_height, 4032);
    assert_eq!(projection.remaining_blocks, 2011);
    assert_eq!(projection.sample_size, 0);
    assert_eq!(projection.estimated_change_percent, 0.0);
    assert_eq!(projection.average_block_time_secs, 0.0);
    assert_eq!(projection.estimated_seconds_remaining, None);
}

#[test]
fn fast_blocks_project_an_increase() {
    let projection = projection_from_samples(1000, &evenly_spaced(10, 300), PARAMS);

    assert_eq!(projection.sample_size, 10);
    assert_eq!(projection.average_block_time_secs, 300.0);
    assert_eq!(projection.estimated_change_percent, 50.0);
    assert_eq!(projection.remaining_blocks, 1016);
    assert_eq!(projection.estimated_seconds_remaining, Some(1016 * 300));
}

#[test]
fn sample_order_does_not_matter() {
    let mut samples = evenly_spaced(10, 900);
    samples.reverse();

    let projection = projection_from_samples(1000, &samples, PARAMS);

    assert_eq!(projection.estimated_change_percent, -50.0);
}

#[test]
fn change_is_clamped() {
    let slow = projection_from_samples(1000, &evenly_spaced(10, 60_000), PARAMS);
    assert_eq!(slow.estimated_change_percent, MIN_CHANGE_PERCENT);

    let stalled_clock = projection_from_samples(1000, &[1_700_000_000; 10], PARAMS);
    assert!(stalled_clock.estimated_change_percent <= MAX_CHANGE_PERCENT);
}

#[test]
fn progress_stays_within_bounds() {
    for height in [0, 1, 9, 10, 1007, 2015, 2016, 2017, 4031, 1_000_000] {
        let p = projection_from_samples(height, &evenly_spaced(10, 600), PARAMS);
        assert!((0.0..=100.0).contains(&p.progress_percent), "height {height}");
        assert!(p.next_retarget_height > height);
        assert_eq!(p.next_retarget_height % 2016, 0);
        assert!(p.estimated_change_percent >= MIN_CHANGE_PERCENT);
        assert!(p.estimated_change_percent <= MAX_CHANGE_PERCENT);
    }
}

#[test]
fn epoch_boundary_starts_a_fresh_epoch() {
    let p = projection_from_samples(4032, &[], PARAMS);

    assert_eq!(p.progress_percent, 0.0);
    assert_eq!(p.next_retarget_height, 6048);
    assert_eq!(p.remaining_blocks, 2016);
}

#[test]
fn reads_the_last_ten_block_times_from_the_node() {
    let node = MockNode::new();
    node.mine_empty_blocks(20, 300);
    node.reset_calls();

    let projection = project_retarget(&node, PARAMS).unwrap();

    assert_eq!(projection.height, 20);
    assert_eq!(projection.sample_size, RETARGET_SAMPLE as usize);
    assert_eq!(projection.estimated_change_percent, 50.0);
    assert_eq!(node.calls("getblock"), RETARGET_SAMPLE as usize);
}

#[test]
fn young_chain_does_not_sample() {
    let node = MockNode::new();
    node.mine_empty_blocks(4, 600);
    node.reset_calls();

    let projection = project_retarget(&node, PARAMS).unwrap();

    assert_eq!(projection.height, 4);
    assert_eq!(projection.estimated_change_percent, 0.0);
    assert_eq!(node.calls("getblock"), 0);
}
