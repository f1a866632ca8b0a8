//! Incremental light propagation for one layer.
//!
//! [`LightEngine`] is a [`MinFixedPoint`] over voxels: node keys are packed
//! [`BlockPos`]es, levels are `15 - light`, and a node's inputs are its own
//! emission (via [`SOURCE`]) and its six face neighbours. Light values live
//! in the engine's [`LayerStorage`]; only voxels of sections that store
//! light are ever queued.
//!
//! # Update cycle
//!
//! ```text
//! check_block / on_block_emission_increase / update_section_status
//!        │  (queue work, never propagate)
//!        ▼
//! run_light_updates(budget)
//!   1. section tracker work          (LayerStorage::run_updates)
//!   2. reconcile sections            (release, install, validate, prime)
//!   3. voxel work                    (MinFixedPoint::run_updates)
//!   4. publish                       (LayerStorage::swap_section_map)
//! ```
//!
//! Steps 1–2 run once per cycle; if the budget runs out during step 3 the
//! next call resumes there, and nothing is published until the queue is
//! empty.

use std::sync::Arc;

use log::{debug, trace, warn};
use lumen_core::{
    block_to_section, BlockPos, DataLayer, Direction, LightLayer, LightWorld, SectionPos,
    VoxelLight, LIGHT_LEVELS, MAX_LIGHT, SECTION_MASK, SECTION_SIZE, SOURCE,
};
use lumen_propagator::{MinFixedPoint, PendingLevels};
use lumen_storage::{LayerStorage, LightReader, SectionStatus};

use crate::config::{ConfigError, LightConfig};
use crate::rules::{BlockRules, LightRules};

const MAX_LEVEL: u8 = MAX_LIGHT;

/// Light engine for the layer described by `R`.
pub struct LightEngine<R: LightRules> {
    rules: R,
    world: Arc<dyn LightWorld>,
    storage: LayerStorage,
    pending: PendingLevels,
    /// Set while a voxel pass is in progress; steps 1–2 are skipped until
    /// it completes.
    running_updates: bool,
    bulk_clear_threshold: usize,
}

impl<R: LightRules> LightEngine<R> {
    /// Build an engine reading geometry from `world`.
    pub fn new(rules: R, world: Arc<dyn LightWorld>, config: &LightConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let storage = LayerStorage::new(R::LAYER, Arc::clone(&world))?;
        let pending =
            PendingLevels::with_capacity(LIGHT_LEVELS, config.bucket_capacity, config.pending_capacity)?;
        Ok(Self {
            rules,
            world,
            storage,
            pending,
            running_updates: false,
            bulk_clear_threshold: config.bulk_clear_threshold,
        })
    }

    /// The layer this engine propagates.
    pub fn layer(&self) -> LightLayer {
        R::LAYER
    }

    /// The physics in use.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Read-only access to the section storage.
    pub fn storage(&self) -> &LayerStorage {
        &self.storage
    }

    // ── Host requests ───────────────────────────────────────────

    /// The voxel at `pos` changed: re-derive it and its six neighbours.
    pub fn check_block(&mut self, pos: BlockPos) {
        self.storage.run_all_updates();
        self.check_stored(pos);
        for dir in Direction::ALL {
            self.check_stored(pos.offset(dir));
        }
    }

    /// The world reports whether `section` contains geometry.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        self.storage.update_section_status(section, is_empty);
    }

    /// Supply (or withdraw, with `None`) persisted light for `section`.
    pub fn queue_section_data(&mut self, section: SectionPos, data: Option<DataLayer>, trusted: bool) {
        self.storage.queue_section_data(section, data, trusted);
    }

    /// Supply persisted light for `section` in its serialized form.
    ///
    /// Bytes of the wrong size are logged and dropped, along with any data
    /// already queued for the section; it is then computed from its
    /// neighbours like any freshly tracked section.
    pub fn queue_section_bytes(&mut self, section: SectionPos, bytes: &[u8], trusted: bool) {
        match DataLayer::from_bytes(bytes) {
            Ok(layer) => self.storage.queue_section_data(section, Some(layer), trusted),
            Err(err) => {
                warn!("{} light for section {section} rejected: {err}", R::LAYER);
                self.storage.queue_section_data(section, None, trusted);
            }
        }
    }

    /// Keep (or stop keeping) the light of `column`'s released sections.
    pub fn retain_data(&mut self, column: SectionPos, retain: bool) {
        self.storage.retain_data(column, retain);
    }

    // ── Driving ─────────────────────────────────────────────────

    /// Run up to `budget` units of work and publish once settled.
    ///
    /// Returns the unused budget. A unit is one section tracker node or one
    /// voxel.
    pub fn run_light_updates(&mut self, budget: usize) -> usize {
        let mut budget = budget;
        if !self.running_updates {
            if self.storage.has_work() {
                budget = self.storage.run_updates(budget);
                if budget == 0 {
                    return 0;
                }
            }
            self.mark_new_inconsistencies();
        }
        self.running_updates = true;
        if self.has_work() {
            let before = budget;
            budget = self.run_updates(budget);
            self.storage.clear_cache();
            trace!(
                "{} light processed {} voxels, {} pending",
                R::LAYER,
                before - budget,
                self.queue_len()
            );
            if budget == 0 && self.has_work() {
                return 0;
            }
        }
        self.running_updates = false;
        self.storage.swap_section_map();
        budget
    }

    /// Whether any queued, pending, or unpublished work remains.
    pub fn has_light_work(&self) -> bool {
        self.running_updates
            || self.has_work()
            || self.storage.has_work()
            || self.storage.has_inconsistencies()
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Published light value at `pos`.
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        self.storage.light_value(pos)
    }

    /// Queued or published light of `section`.
    pub fn data_layer_data(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.storage.data_layer_data(section)
    }

    /// Tracker status of `section`.
    pub fn section_status(&self, section: SectionPos) -> SectionStatus {
        self.storage.section_status(section)
    }

    /// A handle for reading published light from other threads.
    pub fn reader(&self) -> LightReader {
        self.storage.reader()
    }

    /// One-line human-readable state of `section`.
    pub fn debug_data(&self, section: SectionPos) -> String {
        self.storage.debug_data(section)
    }

    // ── Reconciliation ──────────────────────────────────────────

    fn mark_new_inconsistencies(&mut self) {
        let removed = self.storage.take_sections_to_remove();
        for &key in &removed {
            self.clear_section_nodes(key);
        }
        self.storage.discard_sections(&removed);
        for &key in &removed {
            self.check_section_borders(key, false, true);
        }

        let install = self.storage.queued_to_install();
        for &key in &install {
            self.clear_section_nodes(key);
        }
        self.storage.install_queued(&install);

        let untrusted = self.storage.take_untrusted();
        for &key in &untrusted {
            self.check_section_borders(key, true, true);
        }
        self.storage.drop_installed_queued();

        let fresh = self.storage.take_fresh_sections();
        for &key in &fresh {
            self.prime_section(key);
        }

        let exposed = self.storage.take_exposure_changes();
        for &key in &exposed {
            self.recheck_top_plane(key);
        }

        if !(removed.is_empty()
            && install.is_empty()
            && untrusted.is_empty()
            && fresh.is_empty()
            && exposed.is_empty())
        {
            debug!(
                "{} light reconciled: {} released, {} installed, {} validated, {} primed, {} exposed",
                R::LAYER,
                removed.len(),
                install.len(),
                untrusted.len(),
                fresh.len(),
                exposed.len()
            );
        }
    }

    /// Drop every queued voxel of the packed `section`.
    fn clear_section_nodes(&mut self, section: u64) {
        if self.queue_len() < self.bulk_clear_threshold {
            self.remove_if(|node| block_to_section(node) == section);
            return;
        }
        let section = SectionPos::unpack(section);
        for y in 0..SECTION_SIZE {
            for z in 0..SECTION_SIZE {
                for x in 0..SECTION_SIZE {
                    self.remove_from_queue(section.block(x, y, z).pack());
                }
            }
        }
    }

    /// Re-derive the voxels on either side of every face of `section`.
    fn check_section_borders(&mut self, section: u64, inner: bool, outer: bool) {
        for (inside, outside) in face_pairs(SectionPos::unpack(section)) {
            if inner {
                self.check_stored(inside);
            }
            if outer {
                self.check_stored(outside);
            }
        }
    }

    /// Light a section that was given a blank layer: its faces pull from the
    /// neighbours, and its own sources are queued.
    fn prime_section(&mut self, key: u64) {
        // Stored sky next to this section may have drawn on its unstored
        // value, which the blank layer replaced.
        let outer = R::LAYER == LightLayer::Sky;
        self.check_section_borders(key, true, outer);
        let section = SectionPos::unpack(key);
        for y in 0..SECTION_SIZE {
            for z in 0..SECTION_SIZE {
                for x in 0..SECTION_SIZE {
                    let pos = section.block(x, y, z);
                    if self.rules.source_level(&self.world.voxel(pos)) < MAX_LEVEL {
                        self.check_node(pos.pack());
                    }
                }
            }
        }
    }

    /// What lies above `key` changed between open sky and stored data.
    fn recheck_top_plane(&mut self, key: u64) {
        let section = SectionPos::unpack(key);
        for z in 0..SECTION_SIZE {
            for x in 0..SECTION_SIZE {
                self.check_node(section.block(x, SECTION_MASK, z).pack());
            }
        }
    }

    // ── Voxel helpers ───────────────────────────────────────────

    fn check_stored(&mut self, pos: BlockPos) {
        if self.storage.stores_light(pos.section().pack()) {
            self.check_node(pos.pack());
        }
    }

    /// Level of `pos` as an input to its neighbours, `None` when it
    /// contributes nothing.
    fn neighbour_level(&mut self, pos: BlockPos) -> Option<u8> {
        match self.storage.stored_value(pos) {
            Some(value) => Some(MAX_LEVEL - value.min(MAX_LIGHT)),
            None => self.rules.unstored_level(&self.storage, pos),
        }
    }

    /// One step of travel in `dir` from `from` into `to`.
    fn step(&self, from: &VoxelLight, to: &VoxelLight, dir: Direction, level: u8) -> u8 {
        if level >= MAX_LEVEL
            || to.opacity >= MAX_LIGHT
            || from.faces.covers(dir)
            || to.faces.covers(dir.opposite())
        {
            return MAX_LEVEL;
        }
        self.rules.attenuate(level, dir, to).min(MAX_LEVEL)
    }

    /// The first section storing light strictly below `section` in its
    /// column.
    fn first_stored_below(&self, section: SectionPos) -> Option<SectionPos> {
        let lowest = self.storage.lowest_section_y()?;
        (lowest..section.y)
            .rev()
            .map(|y| SectionPos::new(section.x, y, section.z))
            .find(|below| self.storage.updating().contains(below.pack()))
    }
}

impl LightEngine<BlockRules> {
    /// The voxel at `pos` now emits at least `emission`.
    ///
    /// Cheaper than [`check_block`](Self::check_block) when light can only
    /// have increased.
    pub fn on_block_emission_increase(&mut self, pos: BlockPos, emission: u8) {
        self.storage.run_all_updates();
        if self.storage.stores_light(pos.section().pack()) {
            let level = MAX_LEVEL - emission.min(MAX_LIGHT);
            self.check_edge(SOURCE, pos.pack(), level, true);
        }
    }
}

impl<R: LightRules> MinFixedPoint for LightEngine<R> {
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
        let pos = BlockPos::unpack(node);
        let voxel = self.world.voxel(pos);
        let mut best = level;
        if excluded != SOURCE {
            best = best.min(self.rules.source_level(&voxel));
        }
        if best == 0 {
            return 0;
        }
        for dir in Direction::ALL {
            let from = pos.offset(dir);
            if from.pack() == excluded {
                continue;
            }
            let Some(from_level) = self.neighbour_level(from) else {
                continue;
            };
            if from_level >= best {
                continue;
            }
            let from_voxel = self.world.voxel(from);
            best = best.min(self.step(&from_voxel, &voxel, dir.opposite(), from_level));
            if best == 0 {
                return 0;
            }
        }
        best
    }

    fn check_neighbors_after_update(&mut self, node: u64, level: u8, decreasing: bool) {
        let pos = BlockPos::unpack(node);
        let section = pos.section();
        for dir in Direction::ALL {
            let next = pos.offset(dir);
            let next_section = next.section();
            if next_section == section || self.storage.stores_light(next_section.pack()) {
                self.check_neighbor(node, next.pack(), level, decreasing);
            } else if dir == Direction::Down && self.rules.crosses_vertical_gaps() {
                if let Some(below) = self.first_stored_below(next_section) {
                    let target = below.block(next.x & SECTION_MASK, SECTION_MASK, next.z & SECTION_MASK);
                    self.check_neighbor(node, target.pack(), level, decreasing);
                }
            }
        }
    }

    fn level(&mut self, node: u64) -> u8 {
        if node == SOURCE {
            return 0;
        }
        self.neighbour_level(BlockPos::unpack(node)).unwrap_or(MAX_LEVEL)
    }

    fn set_level(&mut self, node: u64, level: u8) {
        let pos = BlockPos::unpack(node);
        self.storage.set_stored_value(pos, MAX_LIGHT - level.min(MAX_LEVEL));
    }

    fn level_from_neighbor(&mut self, from: u64, to: u64, level: u8) -> u8 {
        let to_pos = BlockPos::unpack(to);
        let to_voxel = self.world.voxel(to_pos);
        if from == SOURCE {
            return self.rules.source_level(&to_voxel);
        }
        let from_pos = BlockPos::unpack(from);
        let (dir, from_voxel) = match Direction::between(from_pos, to_pos) {
            Some(dir) => (dir, self.world.voxel(from_pos)),
            // Vertical jump across unstored sections: the light arrives
            // through the empty voxel directly above `to`.
            None => (Direction::Down, self.world.voxel(to_pos.offset(Direction::Up))),
        };
        self.step(&from_voxel, &to_voxel, dir, level)
    }
}

/// `(inside, outside)` voxel pairs across all six faces of `section`.
fn face_pairs(section: SectionPos) -> impl Iterator<Item = (BlockPos, BlockPos)> {
    Direction::ALL.into_iter().flat_map(move |dir| {
        (0..SECTION_SIZE).flat_map(move |a| {
            (0..SECTION_SIZE).map(move |b| {
                let (x, y, z) = match dir {
                    Direction::Down => (a, 0, b),
                    Direction::Up => (a, SECTION_MASK, b),
                    Direction::North => (a, b, 0),
                    Direction::South => (a, b, SECTION_MASK),
                    Direction::West => (0, a, b),
                    Direction::East => (SECTION_MASK, a, b),
                };
                let inside = section.block(x, y, z);
                (inside, inside.offset(dir))
            })
        })
    })
}

const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<LightEngine<BlockRules>>();
    assert::<LightEngine<crate::rules::SkyRules>>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_test_utils::MockWorld;

    fn block_engine(world: &Arc<MockWorld>) -> LightEngine<BlockRules> {
        let world: Arc<dyn LightWorld> = world.clone();
        LightEngine::new(BlockRules, world, &LightConfig::block_only()).unwrap()
    }

    fn settle<R: LightRules>(engine: &mut LightEngine<R>) {
        engine.run_light_updates(usize::MAX);
        assert!(!engine.has_light_work());
    }

    #[test]
    fn face_pairs_cover_every_face_once() {
        let pairs: Vec<_> = face_pairs(SectionPos::new(0, 0, 0)).collect();
        assert_eq!(pairs.len(), 6 * 256);
        for (inside, outside) in &pairs {
            assert_eq!(inside.section(), SectionPos::new(0, 0, 0));
            assert_ne!(outside.section(), SectionPos::new(0, 0, 0));
            assert!(Direction::between(*inside, *outside).is_some());
        }
    }

    #[test]
    fn emitter_lights_its_surroundings() {
        let world = Arc::new(MockWorld::new());
        world.set_emitter(BlockPos::new(8, 8, 8), 15);
        let mut engine = block_engine(&world);
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        settle(&mut engine);
        assert_eq!(engine.light_value(BlockPos::new(8, 8, 8)), 15);
        assert_eq!(engine.light_value(BlockPos::new(9, 8, 8)), 14);
        assert_eq!(engine.light_value(BlockPos::new(8, 8, 20)), 3);
        assert_eq!(engine.light_value(BlockPos::new(8, 8, 40)), 0);
    }

    #[test]
    fn emission_increase_is_queued_as_a_source_edge() {
        let world = Arc::new(MockWorld::new());
        let mut engine = block_engine(&world);
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        settle(&mut engine);
        let pos = BlockPos::new(3, 3, 3);
        world.set_emitter(pos, 10);
        engine.on_block_emission_increase(pos, 10);
        assert!(engine.has_light_work());
        settle(&mut engine);
        assert_eq!(engine.light_value(pos), 10);
        assert_eq!(engine.light_value(BlockPos::new(3, 3, 5)), 8);
    }

    #[test]
    fn unstored_voxels_are_never_queued() {
        let world = Arc::new(MockWorld::new());
        let mut engine = block_engine(&world);
        engine.check_block(BlockPos::new(100, 100, 100));
        engine.on_block_emission_increase(BlockPos::new(100, 100, 100), 15);
        assert_eq!(engine.queue_len(), 0);
    }

    #[test]
    fn budget_exhaustion_defers_publication() {
        let world = Arc::new(MockWorld::new());
        world.set_emitter(BlockPos::new(8, 8, 8), 15);
        let mut engine = block_engine(&world);
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        let mut budget = engine.run_light_updates(64);
        assert_eq!(budget, 0);
        assert_eq!(engine.light_value(BlockPos::new(8, 8, 8)), 0);
        while engine.has_light_work() {
            budget = engine.run_light_updates(64);
        }
        assert!(budget <= 64);
        assert_eq!(engine.light_value(BlockPos::new(8, 8, 8)), 15);
    }

    #[test]
    fn wrong_sized_bytes_are_dropped() {
        let world = Arc::new(MockWorld::new());
        let mut engine = block_engine(&world);
        let section = SectionPos::new(0, 0, 0);
        engine.queue_section_data(section, Some(DataLayer::filled(9)), true);
        engine.queue_section_bytes(section, &[0xff; 17], true);
        assert!(engine.data_layer_data(section).is_none());
    }
}
