//! Engine configuration
//!
//! Values only: the host owns loading/UI. `EngineConfig::default()` carries
//! the documented built-in defaults so an absent or broken config source
//! never blocks a tick. `load_or_default` reads overrides from environment
//! variables the same way the rest of the host stack configures itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("far_distance_px must be positive")]
    FarDistanceNotPositive,
    #[error("interval field `{0}` must be at least 1 tick")]
    IntervalZero(&'static str),
    #[error("trim cap `reduced` ({reduced}) exceeds `optimal` ({optimal})")]
    TrimCapsInverted { reduced: usize, optimal: usize },
    #[error("residency_capacity must be at least 1")]
    ResidencyCapacityZero,
    #[error("pressure_trim_percent must be 1-100, got {0}")]
    PressureTrimOutOfRange(u32),
}

/// All tuning knobs consumed by the shedding systems
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    // === Feature toggles ===
    /// Gate expensive per-entity updates for far/over-cap entities
    pub update_gating: bool,
    /// Suppress non-critical replication for far entities (server)
    pub net_reduction: bool,
    /// Enforce population caps by deactivating low-priority entities
    pub trimming: bool,
    /// Track texture/resource residency in the LRU cache
    pub residency_tracking: bool,
    /// React to the host's memory-pressure signal
    pub pressure_monitoring: bool,
    /// Stochastically drop particles under sustained stress
    pub particle_reduction: bool,

    // === Distance gating ===
    /// Distance (pixels) beyond which an entity is far from an observer
    pub far_distance_px: f32,
    /// Far entities update once every this many ticks
    pub far_update_interval: u64,
    /// Distance (pixels) used for replication decisions; clamped to >= 800
    pub net_far_distance_px: f32,

    // === Global update throttle ===
    /// Active-entity count above which the global throttle engages
    pub max_active_entities: usize,
    /// A throttled entity updates once its skip counter reaches this value
    pub throttle_interval: u32,

    // === Replication cadence ===
    /// Server allows suppressed-entity sync every this many ticks
    pub sync_interval: u64,

    // === Population trimming ===
    /// Cap under normal load
    pub trim_cap_optimal: usize,
    /// Cap when particle reduction is active
    pub trim_cap_reduced: usize,
    /// Discard background trim plans older than this many ticks
    pub trim_plan_max_age_ticks: u64,

    // === Residency cache ===
    /// Maximum resident markers
    pub residency_capacity: usize,
    /// Percent of entries evicted under memory pressure
    pub pressure_trim_percent: u32,
    /// Ticks between periodic cache cleanups
    pub residency_cleanup_interval: u64,

    // === Background precompute ===
    /// Ticks between background job kicks
    pub scheduling_cadence: u64,

    // === Memory pressure ===
    /// Hard memory threshold in MB; soft (pressure) threshold is 75% of this
    pub memory_hard_threshold_mb: u64,

    // === Diagnostics ===
    /// Ticks between metrics window reports
    pub report_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            update_gating: true,
            net_reduction: true,
            trimming: true,
            residency_tracking: true,
            pressure_monitoring: true,
            particle_reduction: true,
            far_distance_px: 1000.0,
            far_update_interval: 5,
            net_far_distance_px: 1600.0,
            max_active_entities: 50,
            throttle_interval: 5,
            sync_interval: 3,
            trim_cap_optimal: 300,
            trim_cap_reduced: 150,
            trim_plan_max_age_ticks: 90,
            residency_capacity: 128,
            pressure_trim_percent: 25,
            residency_cleanup_interval: 600,
            scheduling_cadence: 30,
            memory_hard_threshold_mb: 8192,
            report_interval: 300,
        }
    }
}

impl EngineConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("TICKSHED_FAR_DISTANCE_PX") {
            if let Ok(parsed) = v.parse::<f32>() {
                if parsed > 0.0 {
                    config.far_distance_px = parsed;
                } else {
                    tracing::warn!("TICKSHED_FAR_DISTANCE_PX must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid TICKSHED_FAR_DISTANCE_PX '{}', using default", v);
            }
        }

        if let Ok(v) = std::env::var("TICKSHED_MAX_ACTIVE") {
            if let Ok(parsed) = v.parse::<usize>() {
                if (10..=2000).contains(&parsed) {
                    config.max_active_entities = parsed;
                } else {
                    tracing::warn!("TICKSHED_MAX_ACTIVE must be 10-2000, using default");
                }
            } else {
                tracing::warn!("Invalid TICKSHED_MAX_ACTIVE '{}', using default", v);
            }
        }

        if let Ok(v) = std::env::var("TICKSHED_SYNC_INTERVAL") {
            if let Ok(parsed) = v.parse::<u64>() {
                if (1..=10).contains(&parsed) {
                    config.sync_interval = parsed;
                } else {
                    tracing::warn!("TICKSHED_SYNC_INTERVAL must be 1-10, using default");
                }
            } else {
                tracing::warn!("Invalid TICKSHED_SYNC_INTERVAL '{}', using default", v);
            }
        }

        if let Ok(v) = std::env::var("TICKSHED_RESIDENCY_CAPACITY") {
            if let Ok(parsed) = v.parse::<usize>() {
                if parsed >= 1 {
                    config.residency_capacity = parsed;
                } else {
                    tracing::warn!("TICKSHED_RESIDENCY_CAPACITY must be >= 1, using default");
                }
            } else {
                tracing::warn!("Invalid TICKSHED_RESIDENCY_CAPACITY '{}', using default", v);
            }
        }

        if let Ok(v) = std::env::var("TICKSHED_MEMORY_HARD_MB") {
            if let Ok(parsed) = v.parse::<u64>() {
                config.memory_hard_threshold_mb = parsed.clamp(512, 32768);
            } else {
                tracing::warn!("Invalid TICKSHED_MEMORY_HARD_MB '{}', using default", v);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.far_distance_px <= 0.0 {
            return Err(ConfigError::FarDistanceNotPositive);
        }
        if self.far_update_interval == 0 {
            return Err(ConfigError::IntervalZero("far_update_interval"));
        }
        if self.throttle_interval == 0 {
            return Err(ConfigError::IntervalZero("throttle_interval"));
        }
        if self.sync_interval == 0 {
            return Err(ConfigError::IntervalZero("sync_interval"));
        }
        if self.scheduling_cadence == 0 {
            return Err(ConfigError::IntervalZero("scheduling_cadence"));
        }
        if self.residency_cleanup_interval == 0 {
            return Err(ConfigError::IntervalZero("residency_cleanup_interval"));
        }
        if self.trim_cap_reduced > self.trim_cap_optimal {
            return Err(ConfigError::TrimCapsInverted {
                reduced: self.trim_cap_reduced,
                optimal: self.trim_cap_optimal,
            });
        }
        if self.residency_capacity == 0 {
            return Err(ConfigError::ResidencyCapacityZero);
        }
        if !(1..=100).contains(&self.pressure_trim_percent) {
            return Err(ConfigError::PressureTrimOutOfRange(self.pressure_trim_percent));
        }
        Ok(())
    }

    /// Replication distance with the original's hard floor applied
    #[inline]
    pub fn net_far_distance(&self) -> f32 {
        self.net_far_distance_px.max(800.0)
    }

    /// Effective population cap for the current particle-reduction mode
    #[inline]
    pub fn effective_trim_cap(&self) -> usize {
        if self.particle_reduction {
            self.trim_cap_reduced
        } else {
            self.trim_cap_optimal
        }
    }
}
