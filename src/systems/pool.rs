//! Bounded scratch buffer pools
//!
//! Background jobs need owned copies of observer/entity state every cycle.
//! Pooling the buffers keeps steady-state scheduling allocation-free; the
//! bound keeps a burst of jobs from pinning memory forever.

use parking_lot::Mutex;

use crate::snapshot::{EntitySnapshot, ObserverSnapshot, TrimCandidate};

/// Types that can be wiped and reused by a [`ScratchPool`]
pub trait Scratch {
    fn reset(&mut self);
}

impl<T> Scratch for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl<K, V, S> Scratch for std::collections::HashMap<K, V, S> {
    fn reset(&mut self) {
        self.clear();
    }
}

/// A bounded pool of reusable scratch objects
///
/// `acquire` never fails: an empty pool falls back to `T::default()`.
/// `release` resets the object and drops it on the floor when the pool is
/// already full.
pub struct ScratchPool<T: Scratch + Default> {
    items: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Scratch + Default> ScratchPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn acquire(&self) -> T {
        match self.items.lock().pop() {
            Some(mut item) => {
                item.reset();
                item
            }
            None => T::default(),
        }
    }

    pub fn release(&self, mut item: T) {
        item.reset();
        let mut items = self.items.lock();
        if items.len() < self.capacity {
            items.push(item);
        }
    }

    /// Idle objects currently held
    pub fn idle(&self) -> usize {
        self.items.lock().len()
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

/// The scratch pools shared by the scheduling pipeline
pub struct ScratchPools {
    pub observers: ScratchPool<Vec<ObserverSnapshot>>,
    pub entities: ScratchPool<Vec<EntitySnapshot>>,
    pub trim_candidates: ScratchPool<Vec<TrimCandidate>>,
}

impl ScratchPools {
    pub fn new() -> Self {
        Self {
            observers: ScratchPool::new(50),
            entities: ScratchPool::new(50),
            trim_candidates: ScratchPool::new(30),
        }
    }

    pub fn clear(&self) {
        self.observers.clear();
        self.entities.clear();
        self.trim_candidates.clear();
    }
}

impl Default for ScratchPools {
    fn default() -> Self {
        Self::new()
    }
}
