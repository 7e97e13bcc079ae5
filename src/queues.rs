//! Priority queues over sources and consumers (§4.3).
//!
//! `std::collections::BinaryHeap` has no decrease-key operation, so both
//! queues use the standard lazy-deletion trick: an identifier→version side
//! table tracks the current "truth" for each id, and every heap entry
//! carries the version it was pushed with. `update`/`remove` just bump the
//! side table and push a fresh entry (or nothing, for `remove`); popping
//! discards any entry whose version no longer matches the side table before
//! returning the next live one. This keeps `update` at O(log n) amortized
//! without needing the heap's internal layout to shrink eagerly.

use crate::types::{ConsumerId, SourceId};
use ordered_float::OrderedFloat;
use std::collections::BinaryHeap;

/// Max-heap of sources keyed on available capacity.
#[derive(Debug, Clone, Default)]
pub struct SourceQueue {
    heap: BinaryHeap<SourceEntry>,
    versions: indexmap::IndexMap<SourceId, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SourceEntry {
    // Derived `Ord` compares fields in declaration order, so ties on
    // `available` break deterministically on `id` rather than arbitrarily.
    available: OrderedFloat<f64>,
    id: SourceId,
    version: u64,
}

impl SourceQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update `id`'s key. Idempotent with respect to call order:
    /// the most recent call for a given id always wins.
    pub fn update(&mut self, id: impl Into<SourceId>, available: f64) {
        let id = id.into();
        let version = self.versions.entry(id.clone()).or_insert(0);
        *version += 1;
        self.heap.push(SourceEntry { available: OrderedFloat(available), id, version: *version });
    }

    /// Remove `id` from the queue. A subsequent pop will never return it
    /// until it is re-added via `update`.
    pub fn remove(&mut self, id: &str) {
        if let Some(version) = self.versions.get_mut(id) {
            *version += 1;
        }
    }

    /// Discard stale entries and pop the source with the greatest available
    /// capacity. `None` once the queue is empty.
    pub fn pop_max(&mut self) -> Option<(SourceId, f64)> {
        while let Some(top) = self.heap.peek() {
            let current = self.versions.get(&top.id).copied().unwrap_or(0);
            if top.version == current {
                let entry = self.heap.pop().unwrap();
                return Some((entry.id, entry.available.into_inner()));
            }
            self.heap.pop();
        }
        None
    }

    /// O(n) bulk rebuild from a fresh set of (id, available) pairs, discarding
    /// all prior state. Used after any event that adds/removes sources, and
    /// by the greedy reallocator to take a live snapshot before each retry
    /// (see SPEC_FULL.md §D.1).
    pub fn rebuild<I: IntoIterator<Item = (SourceId, f64)>>(items: I) -> Self {
        let mut q = Self::new();
        for (id, available) in items {
            q.update(id, available);
        }
        q
    }

    /// True if no live entries remain.
    pub fn is_empty(&mut self) -> bool {
        self.pop_max_peek().is_none()
    }

    fn pop_max_peek(&mut self) -> Option<()> {
        while let Some(top) = self.heap.peek() {
            let current = self.versions.get(&top.id).copied().unwrap_or(0);
            if top.version == current {
                return Some(());
            }
            self.heap.pop();
        }
        None
    }
}

/// Key for the consumer queue: priority ascending (1 = most important comes
/// first), then remaining demand descending. `BinaryHeap` pops the greatest
/// first, so priority is inverted here to make "most important" sort high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ConsumerKey {
    inverted_priority: std::cmp::Reverse<u32>,
    remaining: OrderedFloat<f64>,
}

impl ConsumerKey {
    fn new(priority: u32, remaining: f64) -> Self {
        Self { inverted_priority: std::cmp::Reverse(priority), remaining: OrderedFloat(remaining) }
    }

    fn priority(&self) -> u32 {
        self.inverted_priority.0
    }

    fn remaining(&self) -> f64 {
        self.remaining.into_inner()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ConsumerEntry {
    key: ConsumerKey,
    id: ConsumerId,
    version: u64,
}

/// Min-heap (by priority, then by remaining demand descending) of consumers.
#[derive(Debug, Clone, Default)]
pub struct ConsumerQueue {
    heap: BinaryHeap<ConsumerEntry>,
    versions: indexmap::IndexMap<ConsumerId, u64>,
}

impl ConsumerQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update `id`'s key.
    pub fn update(&mut self, id: impl Into<ConsumerId>, priority: u32, remaining: f64) {
        let id = id.into();
        let version = self.versions.entry(id.clone()).or_insert(0);
        *version += 1;
        self.heap.push(ConsumerEntry {
            key: ConsumerKey::new(priority, remaining),
            id,
            version: *version,
        });
    }

    /// Remove `id` from the queue.
    pub fn remove(&mut self, id: &str) {
        if let Some(version) = self.versions.get_mut(id) {
            *version += 1;
        }
    }

    /// Pop the most important, most under-served consumer.
    pub fn pop_front(&mut self) -> Option<(ConsumerId, u32, f64)> {
        while let Some(top) = self.heap.peek() {
            let current = self.versions.get(&top.id).copied().unwrap_or(0);
            if top.version == current {
                let entry = self.heap.pop().unwrap();
                return Some((entry.id, entry.key.priority(), entry.key.remaining()));
            }
            self.heap.pop();
        }
        None
    }

    /// O(n) bulk rebuild from a fresh set of (id, priority, remaining) triples.
    pub fn rebuild<I: IntoIterator<Item = (ConsumerId, u32, f64)>>(items: I) -> Self {
        let mut q = Self::new();
        for (id, priority, remaining) in items {
            q.update(id, priority, remaining);
        }
        q
    }

    /// Drain the queue into an ordered `Vec`, leaving it empty.
    pub fn drain_ordered(&mut self) -> Vec<(ConsumerId, u32, f64)> {
        let mut out = Vec::new();
        while let Some(item) = self.pop_front() {
            out.push(item);
        }
        out
    }
}
