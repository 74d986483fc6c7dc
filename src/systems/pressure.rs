//! Memory pressure and sustained-stress tracking
//!
//! The host reports its own memory usage; the gauge compares it against a
//! soft limit at 75% of the configured hard threshold. The stress tracker
//! integrates per-tick load samples into a slow-moving 0..=10 score so one
//! busy tick never flips behavior, but a sustained fight does.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::EngineConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Shared memory-usage gauge
pub struct PressureGauge {
    usage_bytes: AtomicU64,
    soft_limit_bytes: u64,
    enabled: bool,
}

impl PressureGauge {
    pub fn new(config: &EngineConfig) -> Self {
        let hard = config.memory_hard_threshold_mb * BYTES_PER_MB;
        Self {
            usage_bytes: AtomicU64::new(0),
            soft_limit_bytes: hard / 4 * 3,
            enabled: config.pressure_monitoring,
        }
    }

    /// Record the host-reported usage sample
    pub fn record_usage(&self, bytes: u64) {
        self.usage_bytes.store(bytes, Ordering::Relaxed);
    }

    pub fn usage_bytes(&self) -> u64 {
        self.usage_bytes.load(Ordering::Relaxed)
    }

    /// Above the soft limit; residency cleanup and trimming bite harder
    pub fn under_pressure(&self) -> bool {
        self.enabled && self.usage_bytes.load(Ordering::Relaxed) > self.soft_limit_bytes
    }
}

// Per-sample load scoring thresholds
const ENTITY_HIGH: usize = 600;
const ENTITY_MID: usize = 400;
const PARTICLE_HIGH: usize = 600;
const PARTICLE_MID: usize = 300;
const STRESS_MAX: u8 = 10;
const STRESSED_ABOVE: u8 = 7;

/// Slow-moving load score sampled once per tick by the tick thread
#[derive(Debug, Default)]
pub struct StressTracker {
    level: u8,
}

impl StressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's load into the score
    ///
    /// `heavy_scene` is the host's own signal (boss fight, invasion). The
    /// level moves by one per tick in either direction; reaching "stressed"
    /// takes sustained load and so does recovering from it.
    pub fn sample(&mut self, entity_count: usize, particle_count: usize, heavy_scene: bool) {
        let mut score = 0u8;
        if entity_count > ENTITY_HIGH {
            score += 2;
        } else if entity_count > ENTITY_MID {
            score += 1;
        }
        if particle_count > PARTICLE_HIGH {
            score += 2;
        } else if particle_count > PARTICLE_MID {
            score += 1;
        }
        if heavy_scene {
            score += 1;
        }

        if score >= 3 {
            self.level = (self.level + 1).min(STRESS_MAX);
        } else {
            self.level = self.level.saturating_sub(1);
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_stressed(&self) -> bool {
        self.level > STRESSED_ABOVE
    }

    pub fn reset(&mut self) {
        self.level = 0;
    }
}

/// Probability of dropping one cosmetic particle at the given stress level
/// and squared distance from the nearest observer
pub fn particle_drop_chance(stress: u8, nearest_observer_dist_sq: Option<f32>) -> f32 {
    let mut chance: f32 = match stress {
        8.. => 0.8,
        5.. => 0.5,
        2.. => 0.25,
        _ => 0.0,
    };
    if let Some(dist_sq) = nearest_observer_dist_sq {
        if dist_sq > 1600.0 * 1600.0 && stress >= 5 {
            chance += 0.35;
        } else if dist_sq > 1000.0 * 1000.0 {
            chance += 0.2;
        }
    }
    chance.min(1.0)
}

#[cfg(feature = "particle_reduction")]
pub use reduction::should_drop_particle;

#[cfg(feature = "particle_reduction")]
mod reduction {
    use super::particle_drop_chance;
    use crate::snapshot::ObserverSnapshot;
    use crate::systems::observer;
    use crate::util::vec2::Vec2;

    /// Roll whether to skip spawning one cosmetic particle
    pub fn should_drop_particle(
        stress: u8,
        position: Vec2,
        observers: &[ObserverSnapshot],
    ) -> bool {
        let chance =
            particle_drop_chance(stress, observer::nearest_observer_distance_sq(position, observers));
        chance > 0.0 && rand::random::<f32>() < chance
    }
}
