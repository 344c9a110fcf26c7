//! Bounded buffer of realized views with LRU eviction
//!
//! The buffer only tracks keys. Whoever owns the views passes a `destroy`
//! callback to every mutating call and releases the evicted view's resources
//! there, so memory stays proportional to what has recently been on screen.

use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Statistics about buffer usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// Number of entries currently buffered
    pub len: usize,

    /// Current capacity
    pub capacity: usize,

    /// Number of `push` calls
    pub pushes: u64,

    /// Pushes of a key that was already buffered
    pub hits: u64,

    /// Entries evicted by `push` or `resize`
    pub evictions: u64,
}

impl BufferStats {
    /// Share of pushes that found the key already buffered (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.pushes == 0 {
            0.0
        } else {
            self.hits as f64 / self.pushes as f64
        }
    }
}

/// Ordered set of view keys with a fixed capacity
///
/// Keys are kept least recently used at the front and most recently used at
/// the back. The length never exceeds the capacity once a call returns.
///
/// # Example
///
/// ```
/// use pageflow_cache::ViewBuffer;
///
/// let mut evicted = Vec::new();
/// let mut buffer = ViewBuffer::new(2);
///
/// buffer.push(1, |key| evicted.push(key));
/// buffer.push(2, |key| evicted.push(key));
/// buffer.push(3, |key| evicted.push(key));
///
/// assert_eq!(evicted, vec![1]);
/// assert_eq!(buffer.iter().collect::<Vec<_>>(), vec![2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct ViewBuffer<K> {
    capacity: usize,
    order: VecDeque<K>,
    stats: BufferStats,
}

impl<K> ViewBuffer<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Create a buffer holding at most `capacity` keys (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            stats: BufferStats {
                capacity,
                ..Default::default()
            },
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn has(&self, key: K) -> bool {
        self.order.contains(&key)
    }

    /// Keys from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.order.iter().copied()
    }

    /// Insert `key` or move it to the most recently used position
    ///
    /// Evicted keys are handed to `destroy`, least recently used first.
    pub fn push(&mut self, key: K, mut destroy: impl FnMut(K)) {
        self.stats.pushes += 1;
        if let Some(pos) = self.order.iter().position(|&k| k == key) {
            self.stats.hits += 1;
            self.order.remove(pos);
        }
        self.order.push_back(key);

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.stats.evictions += 1;
                destroy(evicted);
            }
        }
        self.sync_stats();
    }

    /// Change the capacity, never evicting a key in `keep`
    ///
    /// Kept keys move to the most recently used end in their existing
    /// relative order. If the kept keys alone exceed `new_capacity`, the
    /// capacity is raised to fit them.
    pub fn resize(&mut self, new_capacity: usize, keep: &HashSet<K>, mut destroy: impl FnMut(K)) {
        let mut capacity = new_capacity.max(1);

        if !keep.is_empty() {
            let (kept, rest): (VecDeque<K>, VecDeque<K>) =
                self.order.drain(..).partition(|key| keep.contains(key));
            let kept_len = kept.len();
            self.order = rest;
            self.order.extend(kept);

            if kept_len > capacity {
                log::warn!(
                    "view buffer capacity {} is below the {} protected views; growing to fit",
                    capacity,
                    kept_len
                );
                capacity = kept_len;
            }
        }

        self.capacity = capacity;
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.stats.evictions += 1;
                destroy(evicted);
            }
        }
        self.sync_stats();
    }

    /// Remove `key` without destroying it; returns whether it was buffered
    pub fn remove(&mut self, key: K) -> bool {
        let Some(pos) = self.order.iter().position(|&k| k == key) else {
            return false;
        };
        self.order.remove(pos);
        self.sync_stats();
        true
    }

    /// Destroy every buffered key, least recently used first
    pub fn clear(&mut self, mut destroy: impl FnMut(K)) {
        for key in self.order.drain(..) {
            destroy(key);
        }
        self.sync_stats();
    }

    pub fn stats(&self) -> BufferStats {
        self.stats
    }

    fn sync_stats(&mut self) {
        self.stats.len = self.order.len();
        self.stats.capacity = self.capacity;
    }
}
