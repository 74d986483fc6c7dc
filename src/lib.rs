//! Tickshed
//!
//! Adaptive load shedding for tick-based game worlds. The host simulation
//! keeps owning its entities; tickshed answers, per tick, which expensive
//! work can be skipped: entity updates for far or over-cap entities,
//! replication traffic for far non-critical entities, over-cap population,
//! stale resource residency, and cosmetic particles under sustained stress.
//!
//! Distance classification and trim planning run as background batch jobs
//! over snapshots and publish whole results; every synchronous decision
//! fails open, so a missing or late result only means less shedding.
//!
//! # Features
//!
//! - `net_throttle` - Server-side replication throttling (enabled by default)
//! - `particle_reduction` - Stochastic particle dropping under stress (enabled by default)

pub mod config;
pub mod engine;
pub mod metrics;
pub mod snapshot;
pub mod systems;
pub mod util;

pub use config::{ConfigError, EngineConfig};
pub use engine::ShedEngine;
pub use snapshot::{
    AuthorityMode, EntityKind, EntitySnapshot, FarFlagSet, ObserverSnapshot, TrimCandidate,
    TrimPlan,
};
pub use systems::importance::{EntityView, NpcView, ProjectileView};
pub use systems::residency::ResourceKey;
