//! Bucketed priority queue keyed by level.
//!
//! One insertion-ordered set per level. `first_queued` caches the lowest
//! non-empty bucket and only ever scans forward from a known lower bound,
//! so popping is amortised O(1) across a propagation wave.

use indexmap::IndexSet;

/// Priority queue of packed nodes, bucketed by level.
#[derive(Clone, Debug)]
pub struct LevelQueue {
    buckets: Vec<IndexSet<u64>>,
    /// Lowest non-empty bucket, or `buckets.len()` when empty.
    first_queued: usize,
}

impl LevelQueue {
    /// Create an empty queue with `level_count` buckets, each pre-sized for
    /// `capacity` nodes.
    pub fn new(level_count: usize, capacity: usize) -> Self {
        Self {
            buckets: (0..level_count)
                .map(|_| IndexSet::with_capacity(capacity))
                .collect(),
            first_queued: level_count,
        }
    }

    /// Number of buckets.
    pub fn level_count(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no node is queued.
    pub fn is_empty(&self) -> bool {
        self.first_queued >= self.buckets.len()
    }

    /// Total queued nodes across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(IndexSet::len).sum()
    }

    /// Lowest non-empty bucket, if any.
    pub fn first_level(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.first_queued)
    }

    /// Whether `node` sits in bucket `level`.
    pub fn contains(&self, node: u64, level: usize) -> bool {
        self.buckets.get(level).is_some_and(|b| b.contains(&node))
    }

    /// Add `node` to bucket `level`.
    pub fn enqueue(&mut self, node: u64, level: usize) {
        debug_assert!(
            self.buckets
                .iter()
                .enumerate()
                .all(|(i, b)| i == level || !b.contains(&node)),
            "node {node:#x} already queued in another bucket"
        );
        self.buckets[level].insert(node);
        if level < self.first_queued {
            self.first_queued = level;
        }
    }

    /// Remove `node` from bucket `level`.
    ///
    /// If that leaves the first bucket empty, the cached minimum is advanced
    /// by scanning forward, stopping at `end` (the caller knows nothing below
    /// `end` can be non-empty past this point, or is about to enqueue there).
    pub fn dequeue(&mut self, node: u64, level: usize, end: usize) {
        let bucket = &mut self.buckets[level];
        bucket.swap_remove(&node);
        if bucket.is_empty() && self.first_queued == level {
            self.advance_first(end);
        }
    }

    /// Pop a node from the lowest non-empty bucket.
    pub fn pop_first(&mut self) -> Option<u64> {
        let level = self.first_level()?;
        let bucket = &mut self.buckets[level];
        let node = bucket.pop();
        if bucket.is_empty() {
            let end = self.buckets.len();
            self.advance_first(end);
        }
        node
    }

    fn advance_first(&mut self, end: usize) {
        let start = self.first_queued + 1;
        self.first_queued = (start..end)
            .find(|&i| !self.buckets[i].is_empty())
            .unwrap_or(end);
    }
}
