//! Difficulty retarget projection from recent block timestamps.

use crate::engine::error::ExplorerError;
use crate::engine::types::RetargetProjection;
use crate::node::api::{NodeGateway, NodeQueries};

/// Timestamps sampled for the block-rate estimate. Also the minimum epoch
/// age before any estimate is made.
pub const RETARGET_SAMPLE: u64 = 10;

pub const MIN_CHANGE_PERCENT: f64 = -75.0;
pub const MAX_CHANGE_PERCENT: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetargetParams {
    pub interval: u64,
    pub target_block_time_secs: u64,
}

/// Where `height` sits in its epoch: (next retarget height, remaining, progress%).
fn epoch_position(height: u64, interval: u64) -> (u64, u64, f64) {
    let next = (height / interval + 1) * interval;
    let progress = (height % interval) as f64 / interval as f64 * 100.0;
    (next, next - height, progress.clamp(0.0, 100.0))
}

/// Builds the projection from the tip height and the timestamps of the most
/// recent blocks (any order).
///
/// An epoch younger than [`RETARGET_SAMPLE`] blocks gets only the structural
/// fields; the estimate fields stay zeroed.
pub fn projection_from_samples(
    height: u64,
    timestamps: &[u64],
    params: RetargetParams,
) -> RetargetProjection {
    let interval = params.interval.max(1);
    let (next_retarget_height, remaining_blocks, progress_percent) =
        epoch_position(height, interval);

    let mut projection = RetargetProjection {
        height,
        retarget_interval: interval,
        next_retarget_height,
        remaining_blocks,
        progress_percent,
        sample_size: 0,
        average_block_time_secs: 0.0,
        estimated_seconds_remaining: None,
        estimated_change_percent: 0.0,
    };

    if height % interval < RETARGET_SAMPLE || timestamps.len() < 2 {
        return projection;
    }

    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    let span = sorted[sorted.len() - 1] - sorted[0];
    let average = span as f64 / (sorted.len() - 1) as f64;

    let expected = params.target_block_time_secs as f64;
    let change = if expected > 0.0 {
        (expected - average) / expected * 100.0
    } else {
        0.0
    };

    projection.sample_size = sorted.len();
    projection.average_block_time_secs = average;
    projection.estimated_seconds_remaining = Some((remaining_blocks as f64 * average).round() as u64);
    projection.estimated_change_percent = change.clamp(MIN_CHANGE_PERCENT, MAX_CHANGE_PERCENT);
    projection
}

/// Reads the tip and, when the epoch is old enough, the timestamps of the
/// last [`RETARGET_SAMPLE`] blocks.
pub fn project_retarget<G: NodeGateway + ?Sized>(
    node: &G,
    params: RetargetParams,
) -> Result<RetargetProjection, ExplorerError> {
    let height = u64::try_from(node.block_count()?).unwrap_or_default();
    let interval = params.interval.max(1);

    let mut timestamps = Vec::new();
    if height % interval >= RETARGET_SAMPLE {
        for h in (height + 1 - RETARGET_SAMPLE..=height).rev() {
            let hash = node.block_hash(h)?;
            timestamps.push(node.block_header(&hash)?.time);
        }
    }

    let projection = projection_from_samples(height, &timestamps, params);
    log::debug!(
        "[RETARGET] height {} -> retarget at {}, {:.1}% through, change {:+.2}%",
        height,
        projection.next_retarget_height,
        projection.progress_percent,
        projection.estimated_change_percent
    );
    Ok(projection)
}
