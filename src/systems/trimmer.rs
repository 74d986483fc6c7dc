//! Population cap enforcement
//!
//! When an entity class exceeds its cap, the trimmer deactivates the excess
//! in a bounded amount of tick-thread work. It consumes the background trim
//! plan when one is fresh, re-validating every victim against live state
//! (slots recycle between planning and execution), and falls back to a
//! synchronous sort when no plan covers the overflow.

use rustc_hash::FxHashSet;

use crate::config::EngineConfig;
use crate::metrics::ShedMetrics;
use crate::snapshot::TrimCandidate;
use crate::systems::planner::BackgroundPlanner;
use crate::systems::pool::ScratchPools;

/// Deactivate entities until `candidates` fits under `cap`
///
/// `is_important` is the live importance check; `deactivate` performs the
/// host-side removal. Returns how many entities were deactivated. Never
/// removes more than `candidates.len() - cap`, never removes an important
/// entity, never removes the same slot twice.
pub fn enforce_cap(
    candidates: &[TrimCandidate],
    cap: usize,
    planner: &BackgroundPlanner,
    pools: &ScratchPools,
    tick: u64,
    config: &EngineConfig,
    metrics: &ShedMetrics,
    mut is_important: impl FnMut(usize) -> bool,
    mut deactivate: impl FnMut(usize),
) -> usize {
    if !config.trimming {
        return 0;
    }
    let population = candidates.len();
    if population <= cap {
        return 0;
    }
    let to_remove = population - cap;

    let mut removed_slots: FxHashSet<usize> = FxHashSet::default();
    let mut removed = 0usize;

    if let Some(plan) = planner.take_trim_plan() {
        let age = tick.saturating_sub(plan.scheduled_tick);
        if age <= config.trim_plan_max_age_ticks {
            let live: FxHashSet<usize> = candidates.iter().map(|c| c.slot).collect();
            for &victim in &plan.victims {
                if removed >= to_remove {
                    break;
                }
                // Slot may have been recycled since the plan was computed
                if !live.contains(&victim) || is_important(victim) {
                    continue;
                }
                if removed_slots.insert(victim) {
                    deactivate(victim);
                    removed += 1;
                }
            }
        } else {
            tracing::debug!(age, tick, "discarding stale trim plan");
        }
    }

    // Plan absent, stale, or short: finish synchronously
    if removed < to_remove {
        let mut buf = pools.trim_candidates.acquire();
        buf.extend_from_slice(candidates);
        buf.sort_unstable_by(TrimCandidate::victim_order);
        for candidate in buf.iter() {
            if removed >= to_remove {
                break;
            }
            if candidate.important
                || removed_slots.contains(&candidate.slot)
                || is_important(candidate.slot)
            {
                continue;
            }
            removed_slots.insert(candidate.slot);
            deactivate(candidate.slot);
            removed += 1;
        }
        pools.trim_candidates.release(buf);
    }

    if removed > 0 {
        metrics.record_trimmed(removed);
        tracing::debug!(removed, population, cap, "trimmed over-cap entities");
    }
    removed
}
