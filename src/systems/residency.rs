//! Resource residency tracking
//!
//! An LRU set of "recently used" resource identities (textures, effect
//! assets) the host consults before paying a reload. The list is a
//! doubly-linked list over a `Vec` arena with a hash index, so touch and
//! evict are O(1) with no per-node allocation after warmup. Internally
//! locked; operations are individually atomic.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::metrics::ShedMetrics;
use std::sync::Arc;

/// Category-namespaced resource identity
///
/// Categories live in disjoint numeric ranges so one flat cache can hold
/// them all without collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey(u32);

impl ResourceKey {
    const NPC_BASE: u32 = 1_000_000;
    const PROJECTILE_BASE: u32 = 2_000_000;
    const DUST_BASE: u32 = 3_000_000;
    const GORE_BASE: u32 = 4_000_000;
    const TILE_BASE: u32 = 5_000_000;

    pub fn npc(id: u32) -> Self {
        Self(Self::NPC_BASE + id)
    }

    pub fn projectile(id: u32) -> Self {
        Self(Self::PROJECTILE_BASE + id)
    }

    pub fn dust(id: u32) -> Self {
        Self(Self::DUST_BASE + id)
    }

    pub fn gore(id: u32) -> Self {
        Self(Self::GORE_BASE + id)
    }

    pub fn tile(id: u32) -> Self {
        Self(Self::TILE_BASE + id)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

const NIL: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct Node {
    key: ResourceKey,
    prev: u32,
    next: u32,
}

#[derive(Debug)]
struct LruList {
    nodes: Vec<Node>,
    free: Vec<u32>,
    head: u32,
    tail: u32,
    index: FxHashMap<ResourceKey, u32>,
}

impl LruList {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            index: FxHashMap::default(),
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn unlink(&mut self, idx: u32) {
        let node = self.nodes[idx as usize];
        match node.prev {
            NIL => self.head = node.next,
            p => self.nodes[p as usize].next = node.next,
        }
        match node.next {
            NIL => self.tail = node.prev,
            n => self.nodes[n as usize].prev = node.prev,
        }
    }

    fn push_front(&mut self, idx: u32) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[idx as usize];
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.nodes[old_head as usize].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    /// Move to front, or insert at front. Returns true on insert.
    fn touch(&mut self, key: ResourceKey) -> bool {
        if let Some(&idx) = self.index.get(&key) {
            if self.head != idx {
                self.unlink(idx);
                self.push_front(idx);
            }
            return false;
        }
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx as usize].key = key;
                idx
            }
            None => {
                self.nodes.push(Node {
                    key,
                    prev: NIL,
                    next: NIL,
                });
                (self.nodes.len() - 1) as u32
            }
        };
        self.push_front(idx);
        self.index.insert(key, idx);
        true
    }

    /// Evict from the tail. Returns how many were actually evicted.
    fn evict_oldest(&mut self, count: usize) -> usize {
        let mut evicted = 0;
        while evicted < count && self.tail != NIL {
            let idx = self.tail;
            let key = self.nodes[idx as usize].key;
            self.unlink(idx);
            self.index.remove(&key);
            self.free.push(idx);
            evicted += 1;
        }
        evicted
    }

    fn contains(&self, key: ResourceKey) -> bool {
        self.index.contains_key(&key)
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = NIL;
        self.tail = NIL;
    }
}

/// Bounded LRU residency set shared between the tick thread and cleanup
pub struct ResidencyCache {
    list: Mutex<LruList>,
    capacity: usize,
    metrics: Arc<ShedMetrics>,
}

impl ResidencyCache {
    pub fn new(capacity: usize, metrics: Arc<ShedMetrics>) -> Self {
        Self {
            list: Mutex::new(LruList::new()),
            capacity: capacity.max(1),
            metrics,
        }
    }

    /// Mark a resource as used now
    ///
    /// Inserting past capacity immediately evicts the least recently used
    /// entries, so the cache never exceeds capacity between operations.
    /// Returns true when the key was newly inserted.
    pub fn touch(&self, key: ResourceKey) -> bool {
        use std::sync::atomic::Ordering;
        let mut list = self.list.lock();
        let inserted = list.touch(key);
        if inserted {
            self.metrics.residency_inserts.fetch_add(1, Ordering::Relaxed);
            if list.len() > self.capacity {
                let over = list.len() - self.capacity;
                let evicted = list.evict_oldest(over);
                self.metrics
                    .residency_evictions
                    .fetch_add(evicted as u64, Ordering::Relaxed);
            }
        }
        inserted
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.list.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.list.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Periodic cleanup: an over-capacity cache shrinks toward half
    /// capacity; under memory pressure a percentage of entries goes too
    pub fn cleanup(&self, under_pressure: bool, pressure_trim_percent: u32) {
        use std::sync::atomic::Ordering;
        let mut list = self.list.lock();
        let mut evicted = 0;

        if list.len() > self.capacity {
            let over = list.len() - (self.capacity - self.capacity / 2);
            evicted += list.evict_oldest(over);
        }
        if under_pressure && list.len() > 0 {
            let extra = (list.len() * pressure_trim_percent as usize / 100).max(1);
            evicted += list.evict_oldest(extra);
        }
        if evicted > 0 {
            self.metrics
                .residency_evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::debug!(evicted, remaining = list.len(), "residency cleanup");
        }
    }

    pub fn clear(&self) {
        self.list.lock().clear();
    }
}
