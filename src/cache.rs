//! Bounded, O(1) LRU cache keyed by record id.
//!
//! The teacher's own `cache.rs` implements an MVCC page-version cache keyed
//! by logical time — a different concurrency model than this single-writer
//! table needs. This LRU is instead grounded on the general bounded-cache
//! idiom visible across the retrieval pack's storage engines, implemented
//! here as a `HashMap` index over an intrusive doubly-linked list stored in
//! a slab (`Vec<Node<K, V>>`), the standard technique for O(1) get/set/evict
//! without an external crate.

use log::debug;
use rustc_hash::FxHashMap;

const NONE: usize = usize::MAX;

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Snapshot of cache occupancy, returned by [`LruCache::stats`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub utilization: f64,
}

/// Bounded map `K -> V` that evicts the least-recently-used entry once size
/// exceeds `max_size`. `max_size == 0` is tolerated: an inserted entry is
/// immediately evicted on the very next `set` (see DESIGN.md / Section 4.6
/// Open Question).
pub struct LruCache<K, V> {
    index: FxHashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    free: Vec<usize>,
    head: usize, // most-recently-used
    tail: usize, // least-recently-used
    max_size: usize,
}

impl<K, V> LruCache<K, V>
where
    K: std::hash::Hash + Eq + Clone,
{
    pub fn new(max_size: usize) -> Self {
        LruCache {
            index: FxHashMap::default(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: NONE,
            tail: NONE,
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look up `key`, marking it most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.detach(idx);
        self.push_front(idx);
        Some(&self.nodes[idx].value)
    }

    /// Insert or update `key`, moving it to most-recently-used. Evicts the
    /// LRU entry if this insert pushes size past `max_size`.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(&idx) = self.index.get(&key) {
            self.nodes[idx].value = value;
            self.detach(idx);
            self.push_front(idx);
            return;
        }
        let idx = if let Some(free_idx) = self.free.pop() {
            self.nodes[free_idx] = Node {
                key: key.clone(),
                value,
                prev: NONE,
                next: NONE,
            };
            free_idx
        } else {
            self.nodes.push(Node {
                key: key.clone(),
                value,
                prev: NONE,
                next: NONE,
            });
            self.nodes.len() - 1
        };
        self.index.insert(key, idx);
        self.push_front(idx);

        while self.index.len() > self.max_size {
            self.evict_lru();
        }
    }

    /// Remove `key`, if present.
    pub fn delete(&mut self, key: &K) -> bool {
        if let Some(idx) = self.index.remove(key) {
            self.detach(idx);
            self.free.push(idx);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = NONE;
        self.tail = NONE;
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.index.len();
        let utilization = if self.max_size == 0 {
            if size == 0 { 0.0 } else { 1.0 }
        } else {
            size as f64 / self.max_size as f64
        };
        CacheStats {
            size,
            max_size: self.max_size,
            utilization,
        }
    }

    fn evict_lru(&mut self) {
        if self.tail == NONE {
            return;
        }
        let idx = self.tail;
        let key = self.nodes[idx].key.clone();
        self.detach(idx);
        self.index.remove(&key);
        self.free.push(idx);
        debug!("cache evicted lru entry, size now {}", self.index.len());
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev != NONE {
            self.nodes[prev].next = next;
        } else if self.head == idx {
            self.head = next;
        }
        if next != NONE {
            self.nodes[next].prev = prev;
        } else if self.tail == idx {
            self.tail = prev;
        }
        self.nodes[idx].prev = NONE;
        self.nodes[idx].next = NONE;
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NONE;
        self.nodes[idx].next = self.head;
        if self.head != NONE {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NONE {
            self.tail = idx;
        }
    }
}
