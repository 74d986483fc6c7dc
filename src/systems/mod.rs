//! Shedding subsystems
//!
//! Each module is usable on its own; `crate::engine::ShedEngine` wires them
//! together for hosts that want a single entry point.

pub mod importance;
#[cfg(feature = "net_throttle")]
pub mod net_throttle;
pub mod observer;
pub mod planner;
pub mod pool;
pub mod pressure;
pub mod residency;
pub mod trimmer;
pub mod update_gate;
