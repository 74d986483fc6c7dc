//! Background precompute scheduler
//!
//! Far-flag classification and trim planning are batch jobs: they read
//! snapshots copied on the tick thread, run on the rayon pool, and publish
//! whole results by pointer replacement. At most one job per kind is in
//! flight; a schedule attempt while the previous job still runs is dropped,
//! not queued, so a slow worker can never build a backlog.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use crate::metrics::ShedMetrics;
use crate::snapshot::{EntityKind, EntitySnapshot, FarFlagSet, ObserverSnapshot, TrimCandidate, TrimPlan};
use crate::systems::observer;
use crate::systems::pool::ScratchPools;

#[derive(Debug, Clone, Copy)]
enum JobKind {
    NpcFlags,
    ProjectileFlags,
    Trim,
}

#[derive(Default)]
struct FlagSlot {
    busy: AtomicBool,
    published: RwLock<Option<Arc<FarFlagSet>>>,
}

struct PlannerShared {
    npc_flags: FlagSlot,
    projectile_flags: FlagSlot,
    trim_busy: AtomicBool,
    trim_plan: Mutex<Option<TrimPlan>>,
    pools: Arc<ScratchPools>,
    metrics: Arc<ShedMetrics>,
}

impl PlannerShared {
    fn flag_slot(&self, kind: EntityKind) -> &FlagSlot {
        match kind {
            EntityKind::Npc => &self.npc_flags,
            EntityKind::Projectile => &self.projectile_flags,
        }
    }

    fn busy_flag(&self, job: JobKind) -> &AtomicBool {
        match job {
            JobKind::NpcFlags => &self.npc_flags.busy,
            JobKind::ProjectileFlags => &self.projectile_flags.busy,
            JobKind::Trim => &self.trim_busy,
        }
    }

    fn try_acquire(&self, job: JobKind) -> bool {
        self.busy_flag(job)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Releases the busy flag no matter how the job body exits
struct BusyGuard {
    shared: Arc<PlannerShared>,
    job: JobKind,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.shared.busy_flag(self.job).store(false, Ordering::Release);
    }
}

/// Owner of the in-flight jobs and their published results
pub struct BackgroundPlanner {
    shared: Arc<PlannerShared>,
}

impl BackgroundPlanner {
    pub fn new(pools: Arc<ScratchPools>, metrics: Arc<ShedMetrics>) -> Self {
        Self {
            shared: Arc::new(PlannerShared {
                npc_flags: FlagSlot::default(),
                projectile_flags: FlagSlot::default(),
                trim_busy: AtomicBool::new(false),
                trim_plan: Mutex::new(None),
                pools,
                metrics,
            }),
        }
    }

    /// Kick a far-flag batch job for one entity kind
    ///
    /// Returns false when the inputs are empty or the previous job for this
    /// kind is still running. Inputs are copied into pooled buffers before
    /// this returns; the caller's slices are not borrowed by the job.
    pub fn schedule_far_flags(
        &self,
        kind: EntityKind,
        observers: &[ObserverSnapshot],
        entities: &[EntitySnapshot],
        threshold: f32,
        tick: u64,
    ) -> bool {
        if observers.is_empty() || entities.is_empty() {
            return false;
        }
        let job = match kind {
            EntityKind::Npc => JobKind::NpcFlags,
            EntityKind::Projectile => JobKind::ProjectileFlags,
        };
        if !self.shared.try_acquire(job) {
            self.shared.metrics.jobs_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(?kind, tick, "far-flag job still in flight, dropping");
            return false;
        }

        let mut obs_buf = self.shared.pools.observers.acquire();
        obs_buf.extend_from_slice(observers);
        let mut entity_buf = self.shared.pools.entities.acquire();
        entity_buf.extend_from_slice(entities);

        let shared = Arc::clone(&self.shared);
        rayon::spawn(move || {
            let _guard = BusyGuard {
                shared: Arc::clone(&shared),
                job,
            };
            let set = compute_far_flags(&obs_buf, &entity_buf, threshold, tick);
            *shared.flag_slot(kind).published.write() = Some(Arc::new(set));
            shared.pools.observers.release(obs_buf);
            shared.pools.entities.release(entity_buf);
            shared.metrics.jobs_run.fetch_add(1, Ordering::Relaxed);
        });
        true
    }

    /// Kick a trim-planning job over a candidate snapshot
    pub fn schedule_trim(&self, candidates: &[TrimCandidate], to_remove: usize, tick: u64) -> bool {
        if candidates.is_empty() || to_remove == 0 {
            return false;
        }
        if !self.shared.try_acquire(JobKind::Trim) {
            self.shared.metrics.jobs_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(tick, "trim job still in flight, dropping");
            return false;
        }

        let mut buf = self.shared.pools.trim_candidates.acquire();
        buf.extend_from_slice(candidates);

        let shared = Arc::clone(&self.shared);
        rayon::spawn(move || {
            let _guard = BusyGuard {
                shared: Arc::clone(&shared),
                job: JobKind::Trim,
            };
            let victims = select_trim_victims(&mut buf, to_remove);
            *shared.trim_plan.lock() = Some(TrimPlan {
                victims,
                scheduled_tick: tick,
            });
            shared.pools.trim_candidates.release(buf);
            shared.metrics.jobs_run.fetch_add(1, Ordering::Relaxed);
        });
        true
    }

    /// Latest published far-flag set for `kind`, if any job has completed
    pub fn far_flags(&self, kind: EntityKind) -> Option<Arc<FarFlagSet>> {
        self.shared.flag_slot(kind).published.read().clone()
    }

    /// Published far flag for one slot; absent sets and unknown slots are
    /// not-far
    #[inline]
    pub fn is_far(&self, kind: EntityKind, slot: usize) -> bool {
        self.shared
            .flag_slot(kind)
            .published
            .read()
            .as_ref()
            .map(|set| set.is_far(slot))
            .unwrap_or(false)
    }

    /// Take the published trim plan, clearing the slot
    pub fn take_trim_plan(&self) -> Option<TrimPlan> {
        self.shared.trim_plan.lock().take()
    }

    /// A trim plan is published and waiting to be taken
    pub fn has_trim_plan(&self) -> bool {
        self.shared.trim_plan.lock().is_some()
    }

    /// Drop all published results (world unload / mode change)
    ///
    /// Jobs already in flight may still publish once afterwards; the next
    /// reset or the staleness check downstream discards their output.
    pub fn reset(&self) {
        *self.shared.npc_flags.published.write() = None;
        *self.shared.projectile_flags.published.write() = None;
        *self.shared.trim_plan.lock() = None;
    }
}

fn compute_far_flags(
    observers: &[ObserverSnapshot],
    entities: &[EntitySnapshot],
    threshold: f32,
    tick: u64,
) -> FarFlagSet {
    let max_slot = entities.iter().map(|e| e.slot).max().unwrap_or(0);
    let mut set = FarFlagSet::new(max_slot + 1, tick);
    for entity in entities {
        if observer::is_far_from_all(entity.position, observers, threshold) {
            set.mark_far(entity.slot);
        }
    }
    set
}

/// Pick up to `to_remove` victims: unimportant first, lowest remaining
/// lifetime first
fn select_trim_victims(candidates: &mut [TrimCandidate], to_remove: usize) -> SmallVec<[usize; 32]> {
    candidates.sort_unstable_by(TrimCandidate::victim_order);
    candidates
        .iter()
        .filter(|c| !c.important)
        .take(to_remove)
        .map(|c| c.slot)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec2::Vec2;
    use std::time::{Duration, Instant};

    fn planner() -> BackgroundPlanner {
        BackgroundPlanner::new(Arc::new(ScratchPools::new()), Arc::new(ShedMetrics::new()))
    }

    fn obs(x: f32) -> ObserverSnapshot {
        ObserverSnapshot {
            position: Vec2::new(x, 0.0),
        }
    }

    fn entity(slot: usize, x: f32) -> EntitySnapshot {
        EntitySnapshot {
            slot,
            position: Vec2::new(x, 0.0),
        }
    }

    fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> T {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(v) = poll() {
                return v;
            }
            assert!(Instant::now() < deadline, "background job never published");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_compute_far_flags_marks_only_far_slots() {
        let observers = [obs(0.0)];
        let entities = [entity(0, 100.0), entity(3, 5000.0), entity(7, 900.0)];
        let set = compute_far_flags(&observers, &entities, 1000.0, 42);
        assert!(!set.is_far(0));
        assert!(set.is_far(3));
        assert!(!set.is_far(7));
        // Slots with no entity stay not-far
        assert!(!set.is_far(1));
        assert_eq!(set.tick, 42);
    }

    #[test]
    fn test_select_trim_victims_prefers_unimportant_low_lifetime() {
        let mut candidates = vec![
            TrimCandidate { slot: 0, time_left: 500, important: false },
            TrimCandidate { slot: 1, time_left: 10, important: true },
            TrimCandidate { slot: 2, time_left: 50, important: false },
            TrimCandidate { slot: 3, time_left: 20, important: false },
        ];
        let victims = select_trim_victims(&mut candidates, 2);
        assert_eq!(victims.as_slice(), &[3, 2]);
    }

    #[test]
    fn test_select_trim_victims_never_picks_important() {
        let mut candidates = vec![
            TrimCandidate { slot: 0, time_left: 1, important: true },
            TrimCandidate { slot: 1, time_left: 2, important: true },
            TrimCandidate { slot: 2, time_left: 99, important: false },
        ];
        let victims = select_trim_victims(&mut candidates, 3);
        assert_eq!(victims.as_slice(), &[2]);
    }

    #[test]
    fn test_schedule_rejects_empty_inputs() {
        let p = planner();
        assert!(!p.schedule_far_flags(EntityKind::Npc, &[], &[entity(0, 0.0)], 1000.0, 0));
        assert!(!p.schedule_far_flags(EntityKind::Npc, &[obs(0.0)], &[], 1000.0, 0));
        assert!(!p.schedule_trim(&[], 5, 0));
    }

    #[test]
    fn test_far_flags_publish_end_to_end() {
        let p = planner();
        let scheduled = p.schedule_far_flags(
            EntityKind::Npc,
            &[obs(0.0)],
            &[entity(2, 5000.0), entity(4, 10.0)],
            1000.0,
            7,
        );
        assert!(scheduled);
        let set = wait_for(|| p.far_flags(EntityKind::Npc));
        assert!(set.is_far(2));
        assert!(!set.is_far(4));
        assert!(p.is_far(EntityKind::Npc, 2));
    }

    #[test]
    fn test_flag_kinds_are_independent() {
        let p = planner();
        p.schedule_far_flags(EntityKind::Projectile, &[obs(0.0)], &[entity(1, 9000.0)], 1000.0, 0);
        wait_for(|| p.far_flags(EntityKind::Projectile));
        assert!(p.far_flags(EntityKind::Npc).is_none());
        assert!(!p.is_far(EntityKind::Npc, 1));
    }

    #[test]
    fn test_trim_plan_take_clears_slot() {
        let p = planner();
        let candidates = [
            TrimCandidate { slot: 5, time_left: 3, important: false },
            TrimCandidate { slot: 6, time_left: 9, important: false },
        ];
        assert!(p.schedule_trim(&candidates, 1, 11));
        let plan = wait_for(|| p.take_trim_plan());
        assert_eq!(plan.victims.as_slice(), &[5]);
        assert_eq!(plan.scheduled_tick, 11);
        assert!(p.take_trim_plan().is_none());
    }

    #[test]
    fn test_busy_kind_drops_schedule_attempt() {
        let p = planner();
        // Hold the busy flag by hand to model a still-running job
        assert!(p.shared.try_acquire(JobKind::NpcFlags));
        let scheduled =
            p.schedule_far_flags(EntityKind::Npc, &[obs(0.0)], &[entity(0, 0.0)], 1000.0, 0);
        assert!(!scheduled);
        assert_eq!(p.shared.metrics.jobs_dropped.load(Ordering::Relaxed), 1);
        p.shared.busy_flag(JobKind::NpcFlags).store(false, Ordering::Release);
    }

    #[test]
    fn test_reset_clears_published_results() {
        let p = planner();
        p.schedule_far_flags(EntityKind::Npc, &[obs(0.0)], &[entity(0, 9000.0)], 1000.0, 0);
        wait_for(|| p.far_flags(EntityKind::Npc));
        p.reset();
        assert!(p.far_flags(EntityKind::Npc).is_none());
    }
}
