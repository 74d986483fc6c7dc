//! Engine facade
//!
//! Wires the subsystems together behind one handle the host calls from its
//! tick loop. The handle owns all shedding state; the host keeps owning the
//! entities and performs the actual skips, suppressions, and removals the
//! engine decides on.

use std::sync::Arc;

use crate::config::{ConfigError, EngineConfig};
use crate::metrics::ShedMetrics;
use crate::snapshot::{
    AuthorityMode, EntityKind, EntitySnapshot, ObserverSnapshot, TrimCandidate,
};
use crate::systems::planner::BackgroundPlanner;
use crate::systems::pool::ScratchPools;
use crate::systems::pressure::{PressureGauge, StressTracker};
use crate::systems::residency::{ResidencyCache, ResourceKey};
use crate::systems::trimmer;
use crate::systems::update_gate::EntityUpdateGate;
use crate::util::vec2::Vec2;

#[cfg(feature = "net_throttle")]
use crate::systems::importance::EntityView;
#[cfg(feature = "net_throttle")]
use crate::systems::net_throttle::{self, SyncDecision};

/// One engine per world; drop it (or call [`reset`](Self::reset)) on unload
pub struct ShedEngine {
    config: EngineConfig,
    authority: AuthorityMode,
    metrics: Arc<ShedMetrics>,
    pools: Arc<ScratchPools>,
    planner: BackgroundPlanner,
    npc_gate: EntityUpdateGate,
    projectile_gate: EntityUpdateGate,
    residency: ResidencyCache,
    pressure: PressureGauge,
    stress: StressTracker,
}

impl ShedEngine {
    pub fn new(config: EngineConfig, authority: AuthorityMode) -> Result<Self, ConfigError> {
        config.validate()?;
        let metrics = Arc::new(ShedMetrics::new());
        let pools = Arc::new(ScratchPools::new());
        let planner = BackgroundPlanner::new(Arc::clone(&pools), Arc::clone(&metrics));
        let residency = ResidencyCache::new(config.residency_capacity, Arc::clone(&metrics));
        let pressure = PressureGauge::new(&config);
        tracing::info!(?authority, "shed engine initialized");
        Ok(Self {
            config,
            authority,
            metrics,
            pools,
            planner,
            npc_gate: EntityUpdateGate::new(EntityKind::Npc),
            projectile_gate: EntityUpdateGate::new(EntityKind::Projectile),
            residency,
            pressure,
            stress: StressTracker::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ShedMetrics {
        &self.metrics
    }

    pub fn planner(&self) -> &BackgroundPlanner {
        &self.planner
    }

    pub fn residency(&self) -> &ResidencyCache {
        &self.residency
    }

    pub fn stress_level(&self) -> u8 {
        self.stress.level()
    }

    /// Latch per-tick state before any decision queries
    pub fn begin_tick(
        &mut self,
        npc_count: usize,
        projectile_count: usize,
        particle_count: usize,
        heavy_scene: bool,
    ) {
        self.npc_gate.begin_tick(npc_count, &self.config);
        self.projectile_gate.begin_tick(projectile_count, &self.config);
        self.stress
            .sample(npc_count + projectile_count, particle_count, heavy_scene);
    }

    /// Ticks on which the host should snapshot state and kick background jobs
    pub fn should_schedule(&self, tick: u64) -> bool {
        tick % self.config.scheduling_cadence == 0
    }

    /// Kick a far-flag job using the distance relevant to this authority
    ///
    /// Servers consume far flags for replication decisions and classify at
    /// the replication distance; clients and single player classify at the
    /// update-gating distance.
    pub fn schedule_far_flags(
        &self,
        kind: EntityKind,
        observers: &[ObserverSnapshot],
        entities: &[EntitySnapshot],
        tick: u64,
    ) -> bool {
        let threshold = if self.authority.is_server() {
            self.config.net_far_distance()
        } else {
            self.config.far_distance_px
        };
        self.planner
            .schedule_far_flags(kind, observers, entities, threshold, tick)
    }

    /// Kick a trim-planning job when the candidate set is over cap
    pub fn schedule_trim(&self, candidates: &[TrimCandidate], tick: u64) -> bool {
        let overflow = candidates
            .len()
            .saturating_sub(self.config.effective_trim_cap());
        self.planner.schedule_trim(candidates, overflow, tick)
    }

    /// Should this entity's expensive update run this tick?
    pub fn should_update(
        &mut self,
        kind: EntityKind,
        slot: usize,
        position: Vec2,
        observers: &[ObserverSnapshot],
        tick: u64,
    ) -> bool {
        let gate = match kind {
            EntityKind::Npc => &mut self.npc_gate,
            EntityKind::Projectile => &mut self.projectile_gate,
        };
        let run = gate.should_update(
            slot,
            position,
            observers,
            &self.planner,
            self.authority,
            tick,
            &self.config,
        );
        if !run {
            self.metrics.record_update_skipped();
        }
        run
    }

    /// Replication decision for one entity (server only)
    #[cfg(feature = "net_throttle")]
    pub fn sync_decision(
        &self,
        view: &EntityView,
        observers: &[ObserverSnapshot],
        tick: u64,
    ) -> SyncDecision {
        let decision = net_throttle::sync_decision(
            view,
            &self.planner,
            observers,
            self.authority,
            tick,
            &self.config,
        );
        match (view, decision) {
            (EntityView::Npc(_), SyncDecision::Force) => self.metrics.record_npc_forced(),
            (EntityView::Npc(_), SyncDecision::Suppress) => self.metrics.record_npc_throttled(),
            (EntityView::Projectile(_), SyncDecision::Force) => {
                self.metrics.record_projectile_forced()
            }
            (EntityView::Projectile(_), SyncDecision::Suppress) => {
                self.metrics.record_projectile_throttled()
            }
            _ => {}
        }
        decision
    }

    /// Deactivate over-cap entities; see [`trimmer::enforce_cap`]
    pub fn enforce_cap(
        &self,
        candidates: &[TrimCandidate],
        tick: u64,
        is_important: impl FnMut(usize) -> bool,
        deactivate: impl FnMut(usize),
    ) -> usize {
        trimmer::enforce_cap(
            candidates,
            self.config.effective_trim_cap(),
            &self.planner,
            &self.pools,
            tick,
            &self.config,
            &self.metrics,
            is_important,
            deactivate,
        )
    }

    /// Mark a resource as used; false when tracking is disabled or the key
    /// was already resident
    pub fn touch_resource(&self, key: ResourceKey) -> bool {
        if !self.config.residency_tracking {
            return false;
        }
        self.residency.touch(key)
    }

    pub fn is_resource_resident(&self, key: ResourceKey) -> bool {
        self.residency.contains(key)
    }

    /// Host-reported memory usage sample
    pub fn record_memory_usage(&self, bytes: u64) {
        self.pressure.record_usage(bytes);
    }

    pub fn under_memory_pressure(&self) -> bool {
        self.pressure.under_pressure()
    }

    /// Roll whether to skip spawning one cosmetic particle
    #[cfg(feature = "particle_reduction")]
    pub fn should_drop_particle(&self, position: Vec2, observers: &[ObserverSnapshot]) -> bool {
        if !self.config.particle_reduction {
            return false;
        }
        let dropped =
            crate::systems::pressure::should_drop_particle(self.stress.level(), position, observers);
        if dropped {
            self.metrics
                .particles_dropped
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        dropped
    }

    /// Periodic upkeep; call once per tick after decisions
    pub fn maintain(&mut self, tick: u64) {
        self.metrics.window_report(tick, self.config.report_interval);
        if self.config.residency_tracking
            && tick > 0
            && tick % self.config.residency_cleanup_interval == 0
        {
            self.residency
                .cleanup(self.pressure.under_pressure(), self.config.pressure_trim_percent);
        }
    }

    /// Drop all derived state on world unload or authority change
    pub fn reset(&mut self) {
        self.planner.reset();
        self.npc_gate.clear();
        self.projectile_gate.clear();
        self.residency.clear();
        self.stress.reset();
        tracing::debug!("shed engine reset");
    }
}
