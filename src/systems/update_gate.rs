//! Per-tick entity update gating
//!
//! Two throttles stack: far entities run on a stride (every Nth tick), and
//! when the active population exceeds the cap every remaining entity runs
//! round-robin through a per-slot skip counter. The counter bounds
//! starvation — an entity skips at most `throttle_interval - 1` consecutive
//! ticks before it is forced through.

use rustc_hash::FxHashMap;

use crate::config::EngineConfig;
use crate::snapshot::{AuthorityMode, EntityKind, ObserverSnapshot};
use crate::systems::observer;
use crate::systems::planner::BackgroundPlanner;
use crate::util::vec2::Vec2;

/// Decides, per tick and per slot, whether the host should run the entity's
/// expensive update
pub struct EntityUpdateGate {
    kind: EntityKind,
    skip_counters: FxHashMap<usize, u32>,
    /// Population throttle engaged this tick
    throttling: bool,
}

impl EntityUpdateGate {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            skip_counters: FxHashMap::default(),
            throttling: false,
        }
    }

    /// Latch this tick's population-throttle state
    ///
    /// When the population drops back under the cap all skip counters reset
    /// so every entity resumes normal cadence immediately.
    pub fn begin_tick(&mut self, active_count: usize, config: &EngineConfig) {
        let engaged = config.update_gating && active_count > config.max_active_entities;
        if self.throttling && !engaged {
            self.skip_counters.clear();
        }
        self.throttling = engaged;
    }

    /// Should the entity in `slot` run its full update this tick?
    ///
    /// Far status comes from the last published flag set; until the first
    /// set exists the synchronous classifier answers instead, so gating is
    /// correct from tick zero.
    pub fn should_update(
        &mut self,
        slot: usize,
        position: Vec2,
        observers: &[ObserverSnapshot],
        planner: &BackgroundPlanner,
        authority: AuthorityMode,
        tick: u64,
        config: &EngineConfig,
    ) -> bool {
        if !config.update_gating {
            return true;
        }
        // The server simulates for all clients and never skips
        if authority.is_server() {
            return true;
        }

        let far = match planner.far_flags(self.kind) {
            Some(flags) => flags.is_far(slot),
            None => observer::is_far_from_all(position, observers, config.far_distance_px),
        };
        if far && tick % config.far_update_interval != 0 {
            return false;
        }

        if self.throttling {
            let counter = self.skip_counters.entry(slot).or_insert(0);
            *counter += 1;
            if *counter < config.throttle_interval {
                return false;
            }
            *counter = 0;
        }
        true
    }

    /// Drop counters for slots the host no longer considers live
    pub fn retire_inactive(&mut self, live: impl Fn(usize) -> bool) {
        self.skip_counters.retain(|slot, _| live(*slot));
    }

    pub fn clear(&mut self) {
        self.skip_counters.clear();
        self.throttling = false;
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Tracked slot count, for diagnostics
    pub fn tracked(&self) -> usize {
        self.skip_counters.len()
    }
}
