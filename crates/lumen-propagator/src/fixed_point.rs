//! The [`MinFixedPoint`] trait and its queue state, [`PendingLevels`].
//!
//! A graph of `u64` nodes carries a stored level per node. Each node's
//! correct level is the minimum over its own source level and whatever its
//! neighbours pass across their edges. Mutations report the affected edges
//! through [`check_edge`](MinFixedPoint::check_edge) and friends; the
//! resulting work is drained in bounded chunks by
//! [`run_updates`](MinFixedPoint::run_updates).
//!
//! A node is *pending* while it has a computed level that differs from its
//! stored level. Pending nodes live in exactly one bucket of the
//! [`LevelQueue`], at priority `min(stored, computed)`, so every brightening
//! (decrease) is settled before the darkening it might mask.

use std::collections::HashMap;

use lumen_core::{LevelError, LEVEL_COUNT_LIMIT};

use crate::queue::LevelQueue;

/// Computed-level sentinel meaning "not queued".
pub const NO_COMPUTED_LEVEL: u8 = u8::MAX;

/// Queue and pending-level bookkeeping owned by one propagator instance.
#[derive(Clone, Debug)]
pub struct PendingLevels {
    level_count: u8,
    queue: LevelQueue,
    computed: HashMap<u64, u8>,
    has_work: bool,
}

impl PendingLevels {
    /// State for a propagator with levels `0..level_count`.
    pub fn new(level_count: usize) -> Result<Self, LevelError> {
        Self::with_capacity(level_count, 0, 0)
    }

    /// Like [`new`](Self::new), pre-sizing each bucket for `bucket_capacity`
    /// nodes and the pending map for `pending_capacity`.
    pub fn with_capacity(
        level_count: usize,
        bucket_capacity: usize,
        pending_capacity: usize,
    ) -> Result<Self, LevelError> {
        if level_count == 0 {
            return Err(LevelError::Empty);
        }
        if level_count >= LEVEL_COUNT_LIMIT {
            return Err(LevelError::TooManyLevels {
                requested: level_count,
            });
        }
        Ok(Self {
            level_count: level_count as u8,
            queue: LevelQueue::new(level_count, bucket_capacity),
            computed: HashMap::with_capacity(pending_capacity),
            has_work: false,
        })
    }

    /// Number of levels.
    pub fn level_count(&self) -> u8 {
        self.level_count
    }

    /// The darkest level, `level_count - 1`. Also means "absent".
    pub fn max_level(&self) -> u8 {
        self.level_count - 1
    }

    /// Whether any node is pending.
    pub fn has_work(&self) -> bool {
        self.has_work
    }

    /// Number of pending nodes.
    pub fn len(&self) -> usize {
        self.computed.len()
    }

    /// Whether no node is pending.
    pub fn is_empty(&self) -> bool {
        self.computed.is_empty()
    }

    /// Pending level of `node`, if queued.
    pub fn computed(&self, node: u64) -> Option<u8> {
        self.computed.get(&node).copied()
    }

    /// Read-only view of the bucket queue.
    pub fn queue(&self) -> &LevelQueue {
        &self.queue
    }

    fn computed_or_sentinel(&self, node: u64) -> u8 {
        self.computed(node).unwrap_or(NO_COMPUTED_LEVEL)
    }

    fn priority(&self, a: u8, b: u8) -> usize {
        a.min(b).min(self.max_level()) as usize
    }

    fn refresh_work(&mut self) {
        self.has_work = !self.queue.is_empty();
        debug_assert_eq!(self.queue.len(), self.computed.len());
    }
}

/// Incremental solver for a minimum fixed point over a node graph.
///
/// Implementors own a [`PendingLevels`] and provide six hooks describing
/// their graph; every algorithmic step is a provided method.
///
/// # Contract
///
/// - `level_from_neighbor(from, to, l)` must be `>= l` for real edges, so a
///   level never improves by travelling.
/// - `computed_level(node, excluded, l)` returns the minimum of `l`, the
///   node's own source level (unless `excluded` is the source) and every
///   neighbour's contribution except `excluded`'s.
/// - `set_level` is only ever called on the node being processed.
///
/// # Examples
///
/// A line of cells where light fades by one per step:
///
/// ```
/// use lumen_propagator::{MinFixedPoint, PendingLevels};
/// use lumen_core::SOURCE;
///
/// struct Line {
///     pending: PendingLevels,
///     levels: Vec<u8>,
///     source: usize,
/// }
///
/// impl MinFixedPoint for Line {
///     fn pending(&self) -> &PendingLevels { &self.pending }
///     fn pending_mut(&mut self) -> &mut PendingLevels { &mut self.pending }
///     fn is_source(&self, node: u64) -> bool { node == SOURCE }
///     fn computed_level(&mut self, node: u64, excluded: u64, level: u8) -> u8 {
///         let mut best = level;
///         if excluded != SOURCE {
///             best = best.min(self.level_from_neighbor(SOURCE, node, 0));
///         }
///         for n in [node.wrapping_sub(1), node + 1] {
///             if n != excluded && (n as usize) < self.levels.len() {
///                 let l = self.level(n);
///                 best = best.min(self.level_from_neighbor(n, node, l));
///             }
///         }
///         best
///     }
///     fn check_neighbors_after_update(&mut self, node: u64, level: u8, decreasing: bool) {
///         for n in [node.wrapping_sub(1), node + 1] {
///             if (n as usize) < self.levels.len() {
///                 self.check_neighbor(node, n, level, decreasing);
///             }
///         }
///     }
///     fn level(&mut self, node: u64) -> u8 {
///         if node == SOURCE { 0 } else { self.levels[node as usize] }
///     }
///     fn set_level(&mut self, node: u64, level: u8) {
///         self.levels[node as usize] = level;
///     }
///     fn level_from_neighbor(&mut self, from: u64, to: u64, level: u8) -> u8 {
///         if from == SOURCE {
///             if to as usize == self.source { 0 } else { 15 }
///         } else {
///             level.saturating_add(1)
///         }
///     }
/// }
///
/// let mut line = Line { pending: PendingLevels::new(16).unwrap(), levels: vec![15; 8], source: 2 };
/// line.check_edge(SOURCE, 2, 0, true);
/// line.run_updates(usize::MAX);
/// assert_eq!(line.levels, vec![2, 1, 0, 1, 2, 3, 4, 5]);
/// ```
pub trait MinFixedPoint {
    /// Queue state.
    fn pending(&self) -> &PendingLevels;

    /// Mutable queue state.
    fn pending_mut(&mut self) -> &mut PendingLevels;

    /// Whether `node` is the source sentinel, which is never relaxed.
    fn is_source(&self, node: u64) -> bool;

    /// Best level `node` can get from everything except `excluded`, capped
    /// at `level`.
    fn computed_level(&mut self, node: u64, excluded: u64, level: u8) -> u8;

    /// Call [`check_neighbor`](Self::check_neighbor) for every neighbour of
    /// `node`, which just changed from (darkening) or to (brightening)
    /// `level`.
    fn check_neighbors_after_update(&mut self, node: u64, level: u8, decreasing: bool);

    /// Stored level of `node`.
    fn level(&mut self, node: u64) -> u8;

    /// Persist `level` for `node`.
    fn set_level(&mut self, node: u64, level: u8);

    /// Level `to` receives from `from` sitting at `level`.
    fn level_from_neighbor(&mut self, from: u64, to: u64, level: u8) -> u8;

    /// Whether any node is pending.
    fn has_work(&self) -> bool {
        self.pending().has_work()
    }

    /// Number of pending nodes.
    fn queue_len(&self) -> usize {
        self.pending().len()
    }

    /// Re-derive `node` from all of its inputs.
    fn check_node(&mut self, node: u64) {
        let max = self.pending().max_level();
        self.check_edge(node, node, max, false);
    }

    /// Report that the edge `from → to` now offers `level`.
    ///
    /// `decreasing` means the offer can only have improved; otherwise `to`
    /// is recomputed from all inputs.
    fn check_edge(&mut self, from: u64, to: u64, level: u8, decreasing: bool) {
        let stored = self.level(to);
        let computed = self.pending().computed_or_sentinel(to);
        relax(self, from, to, level, stored, computed, decreasing);
        self.pending_mut().refresh_work();
    }

    /// Re-examine `to` after its neighbour `from` changed.
    ///
    /// `source_level` is `from`'s new level when brightening, or its old
    /// level when darkening. A darkening only matters if `to` was deriving
    /// its current level from `from`.
    fn check_neighbor(&mut self, from: u64, to: u64, source_level: u8, decreasing: bool) {
        let max = self.pending().max_level();
        let computed = self.pending().computed_or_sentinel(to);
        let offered = self.level_from_neighbor(from, to, source_level).min(max);
        if decreasing {
            let stored = self.level(to);
            relax(self, from, to, offered, stored, computed, true);
            return;
        }
        let unqueued = computed == NO_COMPUTED_LEVEL;
        let current = if unqueued {
            self.level(to).min(max)
        } else {
            computed
        };
        if offered == current {
            let stored = if unqueued { current } else { self.level(to) };
            relax(self, from, to, max, stored, computed, false);
        }
    }

    /// Settle up to `budget` pending nodes, lowest priority first.
    ///
    /// Returns the unused budget.
    fn run_updates(&mut self, mut budget: usize) -> usize {
        let max = self.pending().max_level();
        while budget > 0 {
            let Some(node) = self.pending_mut().queue.pop_first() else {
                break;
            };
            budget -= 1;
            let stored = self.level(node).min(max);
            let Some(computed) = self.pending_mut().computed.remove(&node) else {
                debug_assert!(false, "queued node {node:#x} has no computed level");
                continue;
            };
            if computed < stored {
                self.set_level(node, computed);
                self.check_neighbors_after_update(node, computed, true);
            } else if computed > stored {
                self.set_level(node, max);
                if computed != max {
                    let pending = self.pending_mut();
                    let priority = pending.priority(max, computed);
                    pending.queue.enqueue(node, priority);
                    pending.computed.insert(node, computed);
                }
                self.check_neighbors_after_update(node, stored, false);
            }
        }
        self.pending_mut().refresh_work();
        budget
    }

    /// Drop `node` from the queue, leaving its stored level as is.
    fn remove_from_queue(&mut self, node: u64) {
        let Some(computed) = self.pending().computed(node) else {
            return;
        };
        let stored = self.level(node);
        let pending = self.pending_mut();
        pending.computed.remove(&node);
        let level_count = pending.level_count as usize;
        let priority = pending.priority(stored, computed);
        pending.queue.dequeue(node, priority, level_count);
        pending.refresh_work();
    }

    /// Drop every pending node matching `predicate`.
    fn remove_if<F>(&mut self, mut predicate: F)
    where
        F: FnMut(u64) -> bool,
        Self: Sized,
    {
        let doomed: Vec<u64> = self
            .pending()
            .computed
            .keys()
            .copied()
            .filter(|&node| predicate(node))
            .collect();
        for node in doomed {
            self.remove_from_queue(node);
        }
    }
}

/// Move `to` to the bucket matching its new pending level, or out of the
/// queue if the new level equals the stored one.
fn relax<G: MinFixedPoint + ?Sized>(
    graph: &mut G,
    from: u64,
    to: u64,
    level: u8,
    stored: u8,
    computed: u8,
    decreasing: bool,
) {
    if graph.is_source(to) {
        return;
    }
    let max = graph.pending().max_level();
    let level = level.min(max);
    let stored = stored.min(max);
    let queued = computed != NO_COMPUTED_LEVEL;
    let computed = if queued { computed } else { stored };
    let next = if decreasing {
        computed.min(level)
    } else {
        graph.computed_level(to, from, level).min(max)
    };

    let pending = graph.pending_mut();
    let old_priority = pending.priority(stored, computed);
    if stored != next {
        let new_priority = pending.priority(stored, next);
        if queued && old_priority != new_priority {
            pending.queue.dequeue(to, old_priority, new_priority);
        }
        pending.queue.enqueue(to, new_priority);
        pending.computed.insert(to, next);
    } else if queued {
        let level_count = pending.level_count as usize;
        pending.queue.dequeue(to, old_priority, level_count);
        pending.computed.remove(&to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::SOURCE;

    /// A 1D line: node `i` neighbours `i - 1` and `i + 1`. Each step costs
    /// one level, and walls cost everything.
    struct Line {
        pending: PendingLevels,
        levels: Vec<u8>,
        sources: Vec<u8>,
        walls: Vec<bool>,
    }

    impl Line {
        fn new(len: usize, level_count: usize) -> Self {
            let max = (level_count - 1) as u8;
            Self {
                pending: PendingLevels::new(level_count).unwrap(),
                levels: vec![max; len],
                sources: vec![max; len],
                walls: vec![false; len],
            }
        }

        fn neighbours(&self, node: u64) -> impl Iterator<Item = u64> {
            let len = self.levels.len() as u64;
            [node.wrapping_sub(1), node + 1]
                .into_iter()
                .filter(move |&n| n < len)
        }

        fn set_source(&mut self, node: usize, level: u8) {
            let old = self.sources[node];
            self.sources[node] = level;
            if level < old {
                let offered = self.level_from_neighbor(SOURCE, node as u64, 0);
                self.check_edge(SOURCE, node as u64, offered, true);
            } else {
                self.check_node(node as u64);
            }
        }

        fn set_wall(&mut self, node: usize, wall: bool) {
            self.walls[node] = wall;
            self.check_node(node as u64);
            let neighbours: Vec<u64> = self.neighbours(node as u64).collect();
            for n in neighbours {
                self.check_node(n);
            }
        }

        /// Fixed point computed from scratch.
        fn expected(&self) -> Vec<u8> {
            let max = self.pending.max_level();
            let mut levels: Vec<u8> = (0..self.levels.len())
                .map(|i| if self.walls[i] { max } else { self.sources[i] })
                .collect();
            loop {
                let mut changed = false;
                for i in 0..levels.len() {
                    if self.walls[i] {
                        continue;
                    }
                    for n in [i.wrapping_sub(1), i + 1] {
                        if n < levels.len() && !self.walls[n] {
                            let offered = levels[n].saturating_add(1).min(max);
                            if offered < levels[i] {
                                levels[i] = offered;
                                changed = true;
                            }
                        }
                    }
                }
                if !changed {
                    return levels;
                }
            }
        }
    }

    impl MinFixedPoint for Line {
        fn pending(&self) -> &PendingLevels {
            &self.pending
        }

        fn pending_mut(&mut self) -> &mut PendingLevels {
            &mut self.pending
        }

        fn is_source(&self, node: u64) -> bool {
            node == SOURCE
        }

        fn computed_level(&mut self, node: u64, excluded: u64, level: u8) -> u8 {
            let mut best = level;
            if excluded != SOURCE {
                best = best.min(self.level_from_neighbor(SOURCE, node, 0));
            }
            let neighbours: Vec<u64> = self.neighbours(node).collect();
            for n in neighbours {
                if n != excluded {
                    let l = self.level(n);
                    best = best.min(self.level_from_neighbor(n, node, l));
                }
            }
            best
        }

        fn check_neighbors_after_update(&mut self, node: u64, level: u8, decreasing: bool) {
            let neighbours: Vec<u64> = self.neighbours(node).collect();
            for n in neighbours {
                self.check_neighbor(node, n, level, decreasing);
            }
        }

        fn level(&mut self, node: u64) -> u8 {
            if node == SOURCE {
                0
            } else {
                self.levels[node as usize]
            }
        }

        fn set_level(&mut self, node: u64, level: u8) {
            self.levels[node as usize] = level;
        }

        fn level_from_neighbor(&mut self, from: u64, to: u64, level: u8) -> u8 {
            let max = self.pending.max_level();
            if self.walls[to as usize] {
                return max;
            }
            if from == SOURCE {
                return level.saturating_add(self.sources[to as usize]).min(max);
            }
            if self.walls[from as usize] {
                return max;
            }
            level.saturating_add(1)
        }
    }

    #[test]
    fn rejects_oversized_level_count() {
        assert_eq!(
            PendingLevels::new(254).unwrap_err(),
            LevelError::TooManyLevels { requested: 254 }
        );
        assert_eq!(PendingLevels::new(0).unwrap_err(), LevelError::Empty);
        assert!(PendingLevels::new(253).is_ok());
    }

    #[test]
    fn chain_settles_to_distance_profile() {
        let mut line = Line::new(20, 16);
        line.set_source(0, 0);
        assert!(line.has_work());
        line.run_updates(usize::MAX);
        assert!(!line.has_work());
        for i in 0..20 {
            assert_eq!(line.levels[i], (i as u8).min(15), "node {i}");
        }
    }

    #[test]
    fn removing_source_darkens_everything() {
        let mut line = Line::new(20, 16);
        line.set_source(0, 0);
        line.run_updates(usize::MAX);
        line.set_source(0, 15);
        line.run_updates(usize::MAX);
        assert!(line.levels.iter().all(|&l| l == 15));
        assert_eq!(line.queue_len(), 0);
    }

    #[test]
    fn relighting_restores_profile() {
        let mut line = Line::new(20, 16);
        line.set_source(0, 0);
        line.run_updates(usize::MAX);
        let lit = line.levels.clone();
        line.set_source(0, 15);
        line.run_updates(usize::MAX);
        line.set_source(0, 0);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels, lit);
    }

    #[test]
    fn wall_caps_downstream_at_max() {
        let mut line = Line::new(10, 16);
        line.set_source(0, 0);
        line.run_updates(usize::MAX);
        line.set_wall(3, true);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels[2], 2);
        assert_eq!(line.levels[3], 15);
        assert_eq!(line.levels[4], 15);
        line.set_wall(3, false);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels[4], 4);
    }

    #[test]
    fn source_inside_a_wall_stays_dark() {
        let mut line = Line::new(24, 16);
        line.set_wall(20, true);
        line.run_updates(usize::MAX);
        line.set_source(20, 0);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels[20], 15);
        assert_eq!(line.levels, line.expected());
        line.set_wall(20, false);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels[20], 0);
        assert_eq!(line.levels[23], 3);
    }

    #[test]
    fn two_sources_keep_the_brighter() {
        let mut line = Line::new(12, 16);
        line.set_source(0, 0);
        line.set_source(11, 3);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels, line.expected());
        line.set_source(0, 15);
        line.run_updates(usize::MAX);
        assert_eq!(line.levels, line.expected());
        assert_eq!(line.levels[11], 3);
        assert_eq!(line.levels[0], 14);
    }

    #[test]
    fn budget_returns_remainder() {
        let mut line = Line::new(4, 16);
        line.set_source(0, 0);
        let remaining = line.run_updates(100);
        assert!(remaining < 100);
        assert!(remaining >= 96);
        assert!(!line.has_work());
    }

    #[test]
    fn zero_budget_does_nothing() {
        let mut line = Line::new(4, 16);
        line.set_source(0, 0);
        assert_eq!(line.run_updates(0), 0);
        assert!(line.has_work());
        assert_eq!(line.levels[0], 15);
    }

    #[test]
    fn remove_if_clears_matching_pending() {
        let mut line = Line::new(6, 16);
        line.set_source(0, 0);
        line.set_source(5, 0);
        assert_eq!(line.queue_len(), 2);
        line.remove_if(|node| node == 5);
        assert_eq!(line.queue_len(), 1);
        assert!(line.pending().computed(0).is_some());
        line.remove_from_queue(0);
        assert!(!line.has_work());
    }

    #[test]
    fn source_sentinel_is_never_relaxed() {
        let mut line = Line::new(3, 16);
        line.check_edge(0, SOURCE, 0, true);
        assert!(!line.has_work());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Edit {
            Source(usize, u8),
            Wall(usize, bool),
        }

        fn edit(len: usize) -> impl Strategy<Value = Edit> {
            prop_oneof![
                (0..len, 0u8..16).prop_map(|(i, l)| Edit::Source(i, l)),
                (0..len, any::<bool>()).prop_map(|(i, w)| Edit::Wall(i, w)),
            ]
        }

        fn apply(line: &mut Line, edit: &Edit) {
            match *edit {
                Edit::Source(i, l) => line.set_source(i, l),
                Edit::Wall(i, w) => line.set_wall(i, w),
            }
        }

        proptest! {
            #[test]
            fn converges_to_from_scratch_fixed_point(
                edits in prop::collection::vec(edit(24), 1..40),
            ) {
                let mut line = Line::new(24, 16);
                for e in &edits {
                    apply(&mut line, e);
                    line.run_updates(usize::MAX);
                }
                prop_assert!(!line.has_work());
                let expected = line.expected();
                prop_assert_eq!(&line.levels, &expected);
            }

            #[test]
            fn small_budgets_reach_the_same_state(
                edits in prop::collection::vec(edit(16), 1..20),
                budget in 1usize..5,
            ) {
                let mut bounded = Line::new(16, 16);
                let mut unbounded = Line::new(16, 16);
                for e in &edits {
                    apply(&mut bounded, e);
                    apply(&mut unbounded, e);
                }
                while bounded.has_work() {
                    let remaining = bounded.run_updates(budget);
                    prop_assert!(remaining <= budget);
                }
                unbounded.run_updates(usize::MAX);
                prop_assert_eq!(&bounded.levels, &unbounded.levels);
            }
        }
    }
}
