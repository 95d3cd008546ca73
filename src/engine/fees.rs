use bitcoin::Amount;

use crate::engine::types::{FeeRecommendation, FeeTier};
use crate::node::api::{NodeGateway, NodeQueries};

pub const FAST_TARGET: u16 = 1;
pub const MEDIUM_TARGET: u16 = 3;
pub const SLOW_TARGET: u16 = 6;

/// Substituted when the node has no estimate: the default minimum relay fee.
pub const FALLBACK_SAT_PER_VBYTE: u64 = 1;

/// Fee advice at 1, 3 and 6 block horizons. Never fails.
pub fn fee_recommendation<G: NodeGateway + ?Sized>(node: &G) -> FeeRecommendation {
    FeeRecommendation {
        fast: fee_tier(node, FAST_TARGET),
        medium: fee_tier(node, MEDIUM_TARGET),
        slow: fee_tier(node, SLOW_TARGET),
    }
}

fn fee_tier<G: NodeGateway + ?Sized>(node: &G, target: u16) -> FeeTier {
    let estimate = match node.estimate_smart_fee(target) {
        Ok(estimate) => estimate,
        Err(err) if err.is_transient() => {
            log::warn!("[FEES] node unreachable for {} block(s) estimate: {}", target, err);
            return fallback_tier(target);
        }
        Err(err) => {
            log::error!("[FEES] estimatesmartfee({}) rejected: {}", target, err);
            return fallback_tier(target);
        }
    };

    let Some(rate) = estimate.feerate else {
        log::debug!(
            "[FEES] no estimate for {} block(s): {}",
            target,
            estimate.errors.join("; ")
        );
        return fallback_tier(target);
    };

    let blocks = if estimate.blocks > 0 {
        estimate.blocks
    } else {
        u32::from(target)
    };

    FeeTier {
        sat_per_vbyte: sat_per_vbyte(rate),
        target_blocks: target,
        estimated_blocks: blocks,
        eta: format_eta(blocks),
        estimated: true,
    }
}

fn fallback_tier(target: u16) -> FeeTier {
    FeeTier {
        sat_per_vbyte: FALLBACK_SAT_PER_VBYTE,
        target_blocks: target,
        estimated_blocks: u32::from(target),
        eta: format_eta(u32::from(target)),
        estimated: false,
    }
}

/// BTC/kvB to sat/vB, rounded up, at least 1.
pub fn sat_per_vbyte(rate_per_kvb: Amount) -> u64 {
    rate_per_kvb.to_sat().div_ceil(1000).max(1)
}

/// Ten minutes per block: "~30 min", "~1 hour", "~2 hours".
pub fn format_eta(blocks: u32) -> String {
    let minutes = u64::from(blocks) * 10;
    if minutes < 60 {
        return format!("~{minutes} min");
    }
    let hours = minutes / 60;
    format!("~{} hour{}", hours, if hours > 1 { "s" } else { "" })
}
