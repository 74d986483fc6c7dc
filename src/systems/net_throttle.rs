//! Server-side replication throttling
//!
//! The server keeps simulating everything; what it sheds is broadcast
//! traffic. Far, non-critical entities get their state sync suppressed
//! except for a periodic keepalive so clients never drift unbounded.
//! Criticality always wins over distance: a suppressed entity that takes
//! damage or acquires a target snaps back to full sync the same tick.

use crate::config::EngineConfig;
use crate::snapshot::{AuthorityMode, EntityKind, ObserverSnapshot};
use crate::systems::importance::EntityView;
use crate::systems::observer;
use crate::systems::planner::BackgroundPlanner;

/// Outcome of a per-entity replication check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Critical state changed; sync now regardless of distance
    Force,
    /// No throttling applies; host syncs on its normal cadence
    Allow,
    /// Skip this entity's sync this tick
    Suppress,
}

/// True when the entity's state demands an immediate sync
pub fn should_force_sync(
    view: &EntityView,
    observers: &[ObserverSnapshot],
    config: &EngineConfig,
) -> bool {
    let threshold = config.net_far_distance();
    match view {
        EntityView::Npc(npc) => {
            npc.boss
                || npc.always_sync
                || npc.just_damaged
                || npc.life_regen < 0
                || npc
                    .target
                    .map(|t| npc.position.distance_sq_to(t) <= threshold * threshold)
                    .unwrap_or(false)
        }
        EntityView::Projectile(proj) => {
            proj.always_sync
                || proj.friendly
                    && proj
                        .owner
                        .map(|o| proj.position.distance_sq_to(o) <= threshold * threshold)
                        .unwrap_or(false)
                || proj.hostile && observer::is_near_any(proj.position, observers, threshold)
        }
    }
}

/// Full replication decision for one entity on the server tick
pub fn sync_decision(
    view: &EntityView,
    planner: &BackgroundPlanner,
    observers: &[ObserverSnapshot],
    authority: AuthorityMode,
    tick: u64,
    config: &EngineConfig,
) -> SyncDecision {
    if !config.net_reduction || !authority.is_server() {
        return SyncDecision::Allow;
    }
    if should_force_sync(view, observers, config) {
        return SyncDecision::Force;
    }

    let kind = match view {
        EntityView::Npc(_) => EntityKind::Npc,
        EntityView::Projectile(_) => EntityKind::Projectile,
    };
    let far = match planner.far_flags(kind) {
        Some(flags) => flags.is_far(view.slot()),
        None => observer::is_far_from_all(view.position(), observers, config.net_far_distance()),
    };
    if !far {
        return SyncDecision::Allow;
    }
    // Keepalive: even far entities sync on the coarse cadence
    if tick % config.sync_interval == 0 {
        return SyncDecision::Allow;
    }
    SyncDecision::Suppress
}
