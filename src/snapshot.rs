//! Immutable snapshot values and published precompute results
//!
//! Snapshots are copied out of live simulation state at schedule time and
//! handed to background jobs; they never alias the host's entity tables.
//! Published results (`FarFlagSet`, `TrimPlan`) are built off-thread and
//! replaced whole — consumers never observe a partially written set.

use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::util::vec2::Vec2;

/// Entity kinds with independent flag sets and gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Npc,
    Projectile,
}

/// Who runs the simulation authoritatively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorityMode {
    SinglePlayer,
    Client,
    Server,
}

impl AuthorityMode {
    #[inline]
    pub fn is_server(&self) -> bool {
        matches!(self, AuthorityMode::Server)
    }
}

/// Position of an observer (local viewer or connected player) at schedule time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObserverSnapshot {
    pub position: Vec2,
}

/// Position of a live entity at schedule time
///
/// `slot` is the entity's index in the host's fixed-size table. Slots are
/// recycled when entities die, so a snapshot is only meaningful within the
/// scheduling cycle that produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub slot: usize,
    pub position: Vec2,
}

/// Input triple for trim planning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrimCandidate {
    pub slot: usize,
    /// Remaining lifetime in ticks; lower means older / sooner to expire
    pub time_left: i32,
    pub important: bool,
}

impl TrimCandidate {
    /// Victim selection order: important candidates sort first (selection
    /// skips them), then lowest remaining lifetime
    #[inline]
    pub fn victim_order(a: &Self, b: &Self) -> std::cmp::Ordering {
        b.important
            .cmp(&a.important)
            .then(a.time_left.cmp(&b.time_left))
    }
}

/// Dense per-slot "far from every observer" flags for one entity kind
///
/// Slots beyond `flags.len()` read as not-far (fail open). Exactly one set
/// per kind is live at a time; a republish replaces the whole set.
#[derive(Debug, Clone)]
pub struct FarFlagSet {
    flags: BitVec,
    /// Tick at which the producing job was scheduled
    pub tick: u64,
}

impl FarFlagSet {
    pub fn new(len: usize, tick: u64) -> Self {
        let mut flags = BitVec::new();
        flags.resize(len.max(1), false);
        Self { flags, tick }
    }

    #[inline]
    pub fn mark_far(&mut self, slot: usize) {
        if slot < self.flags.len() {
            self.flags.set(slot, true);
        }
    }

    /// Out-of-range slots are unknown and therefore not far
    #[inline]
    pub fn is_far(&self, slot: usize) -> bool {
        self.flags.get(slot).map(|b| *b).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn far_count(&self) -> usize {
        self.flags.count_ones()
    }
}

/// Ordered victim slots produced by a background trim job
///
/// Consumed at most once: taking the plan clears the published slot.
#[derive(Debug, Clone)]
pub struct TrimPlan {
    pub victims: SmallVec<[usize; 32]>,
    pub scheduled_tick: u64,
}
