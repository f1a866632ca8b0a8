//! Section lifecycle and light storage for one light layer.
//!
//! [`LayerStorage`] decides which sections carry a [`DataLayer`] and owns
//! both views of them: the *updating* [`LayerMap`] the engine writes, and
//! the *visible* map readers load through a [`LightReader`].
//!
//! Which sections store light is itself a min fixed point, solved by the same
//! propagator as light with three levels:
//!
//! ```text
//! 0  FullyTracked   the world reported geometry here
//! 1  LightOnly      within one section of a FullyTracked section
//! 2  NoData         everything else (no layer)
//! ```
//!
//! Level changes allocate layers immediately. Releasing them, installing
//! loaded data and re-checking section borders is deferred to
//! reconciliation, which the light engine drives because it also has to
//! edit its own queue:
//!
//! ```text
//! take_sections_to_remove ─▶ (engine clears queued voxels) ─▶ discard_sections
//! queued_to_install       ─▶ (engine clears queued voxels) ─▶ install_queued
//! take_untrusted          ─▶ (engine edge-checks)          ─▶ drop_installed_queued
//! take_fresh_sections / take_exposure_changes ─▶ (engine primes / rechecks)
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use lumen_core::{BlockPos, DataLayer, LevelError, LightLayer, LightWorld, SectionPos, SOURCE};
use lumen_propagator::{MinFixedPoint, PendingLevels};

use crate::map::LayerMap;
use crate::reader::LightReader;

/// How much of a section the storage keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SectionStatus {
    /// Geometry present; light is stored and propagated.
    FullyTracked = 0,
    /// Empty but adjacent to geometry; light is stored.
    LightOnly = 1,
    /// No layer.
    NoData = 2,
}

impl SectionStatus {
    /// Level count of the section tracker.
    pub const LEVELS: usize = 3;

    /// Status for a tracker level. Levels past the last clamp to `NoData`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::FullyTracked,
            1 => Self::LightOnly,
            _ => Self::NoData,
        }
    }

    /// Tracker level of this status.
    pub fn level(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullyTracked => f.write_str("fully tracked"),
            Self::LightOnly => f.write_str("light only"),
            Self::NoData => f.write_str("no data"),
        }
    }
}

const FULLY_TRACKED: u8 = SectionStatus::FullyTracked as u8;
const LIGHT_ONLY: u8 = SectionStatus::LightOnly as u8;
const NO_DATA: u8 = SectionStatus::NoData as u8;

/// Sparse light storage plus the section tracker for one [`LightLayer`].
pub struct LayerStorage {
    layer: LightLayer,
    world: Arc<dyn LightWorld>,
    pending: PendingLevels,

    updating: LayerMap,
    visible: Arc<ArcSwap<LayerMap>>,
    /// Initial content of every freshly tracked section.
    empty: Arc<DataLayer>,

    data_sections: HashSet<u64>,
    to_mark_data: HashSet<u64>,
    to_mark_no_data: HashSet<u64>,
    to_remove: IndexSet<u64>,

    /// Sections copied on write since the last publication.
    changed_sections: HashSet<u64>,
    /// Sections to report through `on_light_update` at the next swap.
    affected_sections: IndexSet<u64>,

    queued: IndexMap<u64, Arc<DataLayer>>,
    untrusted: IndexSet<u64>,
    retained_columns: HashSet<u64>,

    /// Sections given a blank layer that nobody has lit yet.
    fresh_sections: IndexSet<u64>,
    /// Sky sections whose top plane changed exposure.
    exposure_changes: IndexSet<u64>,
    lowest_section_y: i32,
}

impl LayerStorage {
    /// Empty storage for `layer`, reporting changes to `world`.
    pub fn new(layer: LightLayer, world: Arc<dyn LightWorld>) -> Result<Self, LevelError> {
        let mut visible = LayerMap::new();
        visible.disable_cache();
        Ok(Self {
            layer,
            world,
            pending: PendingLevels::with_capacity(SectionStatus::LEVELS, 16, 256)?,
            updating: LayerMap::new(),
            visible: Arc::new(ArcSwap::from_pointee(visible)),
            empty: Arc::new(DataLayer::new()),
            data_sections: HashSet::new(),
            to_mark_data: HashSet::new(),
            to_mark_no_data: HashSet::new(),
            to_remove: IndexSet::new(),
            changed_sections: HashSet::new(),
            affected_sections: IndexSet::new(),
            queued: IndexMap::new(),
            untrusted: IndexSet::new(),
            retained_columns: HashSet::new(),
            fresh_sections: IndexSet::new(),
            exposure_changes: IndexSet::new(),
            lowest_section_y: i32::MAX,
        })
    }

    /// The light layer stored here.
    pub fn layer(&self) -> LightLayer {
        self.layer
    }

    /// Current tracker status of `section`.
    pub fn section_status(&self, section: SectionPos) -> SectionStatus {
        SectionStatus::from_level(self.status_level(section.pack()))
    }

    /// Whether the updating map holds a layer for the packed `section`.
    pub fn stores_light(&mut self, section: u64) -> bool {
        self.updating.get(section).is_some()
    }

    /// Read-only access to the updating map.
    pub fn updating(&self) -> &LayerMap {
        &self.updating
    }

    /// Forget the updating map's cached lookups.
    pub fn clear_cache(&mut self) {
        self.updating.clear_cache();
    }

    /// Lowest section y that has ever stored sky light, if any.
    pub fn lowest_section_y(&self) -> Option<i32> {
        (self.lowest_section_y != i32::MAX).then_some(self.lowest_section_y)
    }

    // ── Voxel access (updating view) ────────────────────────────

    /// Stored value at `pos`, or `None` when its section stores no light.
    pub fn stored_value(&mut self, pos: BlockPos) -> Option<u8> {
        self.updating
            .get(pos.section().pack())
            .map(|layer| layer.get_at(pos))
    }

    /// Write `value` at `pos`. Ignored when the section stores no light.
    ///
    /// The first write to a section since the last publication detaches it
    /// from the published map.
    pub fn set_stored_value(&mut self, pos: BlockPos, value: u8) {
        let section = pos.section().pack();
        if self.changed_sections.insert(section) {
            self.updating.copy_on_write(section);
        }
        if let Some(layer) = self.updating.layer_mut(section) {
            layer.set_at(pos, value);
        }
        for touched in SectionPos::around_and_at(pos) {
            self.affected_sections.insert(touched.pack());
        }
    }

    /// Value the updating map reports at `pos`, including the sky rule for
    /// unstored sections.
    pub fn updating_light_value(&self, pos: BlockPos) -> u8 {
        self.updating.light_value(self.layer, pos)
    }

    // ── Visible view ────────────────────────────────────────────

    /// Published light value at `pos`.
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        self.visible.load().light_value(self.layer, pos)
    }

    /// Queued data for `section`, falling back to its published layer.
    pub fn data_layer_data(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        let key = section.pack();
        if let Some(queued) = self.queued.get(&key) {
            return Some(Arc::clone(queued));
        }
        self.visible.load().peek(key).cloned()
    }

    /// A handle for reading published light from other threads.
    pub fn reader(&self) -> LightReader {
        LightReader::new(self.layer, Arc::clone(&self.visible))
    }

    /// One-line human-readable state of `section`.
    pub fn debug_data(&self, section: SectionPos) -> String {
        let key = section.pack();
        let mut out = self.section_status(section).to_string();
        if self.queued.contains_key(&key) {
            out.push_str(", queued");
        }
        if self.retained_columns.contains(&section.column().pack()) {
            out.push_str(", retained");
        }
        out
    }

    // ── Host requests ───────────────────────────────────────────

    /// The world reports whether `section` contains geometry.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        let key = section.pack();
        let tracked = self.data_sections.contains(&key);
        if !tracked && !is_empty {
            self.to_mark_no_data.remove(&key);
            self.to_mark_data.insert(key);
            self.check_edge(SOURCE, key, FULLY_TRACKED, true);
        } else if tracked && is_empty {
            self.to_mark_data.remove(&key);
            self.to_mark_no_data.insert(key);
            self.check_edge(SOURCE, key, NO_DATA, false);
        } else if !tracked && is_empty && self.to_mark_data.remove(&key) {
            // Emptied again before the promotion ran.
            self.check_edge(SOURCE, key, NO_DATA, false);
        } else if tracked && !is_empty && self.to_mark_no_data.remove(&key) {
            self.check_edge(SOURCE, key, FULLY_TRACKED, true);
        }
    }

    /// Supply (or withdraw, with `None`) persisted light for `section`.
    ///
    /// Untrusted data has its borders checked once, when installed.
    pub fn queue_section_data(&mut self, section: SectionPos, data: Option<DataLayer>, trusted: bool) {
        let key = section.pack();
        match data {
            Some(layer) => {
                self.queued.insert(key, Arc::new(layer));
                if trusted {
                    self.untrusted.swap_remove(&key);
                } else {
                    self.untrusted.insert(key);
                }
            }
            None => {
                self.queued.swap_remove(&key);
            }
        }
    }

    /// Keep (or stop keeping) the light of `column`'s sections when they are
    /// released, so it can be handed back via
    /// [`data_layer_data`](Self::data_layer_data).
    pub fn retain_data(&mut self, column: SectionPos, retain: bool) {
        let key = column.column().pack();
        if retain {
            self.retained_columns.insert(key);
        } else {
            self.retained_columns.remove(&key);
        }
    }

    /// Settle all pending section status changes.
    pub fn run_all_updates(&mut self) {
        self.run_updates(usize::MAX);
    }

    /// Whether reconciliation has anything to do.
    pub fn has_inconsistencies(&self) -> bool {
        !self.to_remove.is_empty()
            || !self.fresh_sections.is_empty()
            || !self.exposure_changes.is_empty()
            || self
                .untrusted
                .iter()
                .any(|key| self.updating.contains(*key))
            || self.queued.keys().any(|key| self.updating.contains(*key))
    }

    // ── Reconciliation steps ────────────────────────────────────

    /// Sections whose tracker level dropped to `NoData`. The caller must
    /// clear their queued voxels before [`discard_sections`](Self::discard_sections).
    pub fn take_sections_to_remove(&mut self) -> Vec<u64> {
        self.to_remove.drain(..).collect()
    }

    /// Release the layers of `removed`, keeping them as queued data when
    /// their column is retained.
    pub fn discard_sections(&mut self, removed: &[u64]) {
        for &key in removed {
            let queued = self.queued.swap_remove(&key);
            let stored = self.updating.remove(key);
            let column = SectionPos::unpack(key).column().pack();
            if self.retained_columns.contains(&column) {
                if let Some(layer) = queued.or(stored) {
                    self.queued.insert(key, layer);
                }
            }
            self.fresh_sections.swap_remove(&key);
            self.exposure_changes.swap_remove(&key);
            self.changed_sections.insert(key);
        }
        self.updating.clear_cache();
        for &key in removed {
            self.on_node_removed(key);
        }
        if !removed.is_empty() {
            debug!("{} storage released {} sections", self.layer, removed.len());
        }
    }

    /// Stored sections whose queued data differs from the installed layer.
    /// The caller must clear their queued voxels before
    /// [`install_queued`](Self::install_queued).
    pub fn queued_to_install(&self) -> Vec<u64> {
        self.queued
            .iter()
            .filter(|(key, layer)| {
                self.updating
                    .peek(**key)
                    .is_some_and(|installed| !Arc::ptr_eq(installed, layer))
            })
            .map(|(key, _)| *key)
            .collect()
    }

    /// Replace the layers of `sections` with their queued data.
    pub fn install_queued(&mut self, sections: &[u64]) {
        for &key in sections {
            let Some(layer) = self.queued.get(&key).cloned() else {
                continue;
            };
            self.updating.set(key, layer);
            self.changed_sections.insert(key);
            self.fresh_sections.swap_remove(&key);
            self.mark_cube_affected(SectionPos::unpack(key));
        }
        self.updating.clear_cache();
    }

    /// Whether `section` has queued data waiting.
    pub fn is_queued(&self, section: u64) -> bool {
        self.queued.contains_key(&section)
    }

    /// Untrusted sections that now store light, consuming their flag.
    /// Flags of sections whose data is gone are dropped too.
    pub fn take_untrusted(&mut self) -> Vec<u64> {
        let mut ready = Vec::new();
        let updating = &self.updating;
        let queued = &self.queued;
        self.untrusted.retain(|&key| {
            if updating.contains(key) {
                ready.push(key);
                false
            } else {
                queued.contains_key(&key)
            }
        });
        ready
    }

    /// Forget queued data for sections that store light now.
    pub fn drop_installed_queued(&mut self) {
        let updating = &self.updating;
        self.queued.retain(|key, _| !updating.contains(*key));
    }

    /// Sections given a blank layer since the last call, still stored.
    pub fn take_fresh_sections(&mut self) -> Vec<u64> {
        let updating = &self.updating;
        self.fresh_sections
            .drain(..)
            .filter(|key| updating.contains(*key))
            .collect()
    }

    /// Sky sections whose top plane gained or lost exposure, still stored.
    pub fn take_exposure_changes(&mut self) -> Vec<u64> {
        let updating = &self.updating;
        self.exposure_changes
            .drain(..)
            .filter(|key| updating.contains(*key))
            .collect()
    }

    /// Publish the updating map if any layer changed, then report every
    /// affected section once.
    pub fn swap_section_map(&mut self) {
        if !self.changed_sections.is_empty() {
            trace!(
                "{} storage publishing {} sections ({} changed)",
                self.layer,
                self.updating.len(),
                self.changed_sections.len()
            );
            self.visible.store(Arc::new(self.updating.snapshot()));
            self.changed_sections.clear();
        }
        if self.affected_sections.is_empty() {
            return;
        }
        let affected = std::mem::take(&mut self.affected_sections);
        for key in affected {
            self.world.on_light_update(self.layer, SectionPos::unpack(key));
        }
    }

    // ── Tracker internals ───────────────────────────────────────

    fn status_level(&self, key: u64) -> u8 {
        if key == SOURCE {
            NO_DATA
        } else if self.data_sections.contains(&key) {
            FULLY_TRACKED
        } else if !self.to_remove.contains(&key) && self.updating.contains(key) {
            LIGHT_ONLY
        } else {
            NO_DATA
        }
    }

    fn level_from_source(&self, key: u64) -> u8 {
        if self.to_mark_no_data.contains(&key) {
            NO_DATA
        } else if self.data_sections.contains(&key) || self.to_mark_data.contains(&key) {
            FULLY_TRACKED
        } else {
            NO_DATA
        }
    }

    /// Queued data leaves the queue as it becomes the layer, so later
    /// writes to the layer are never mistaken for new data. Its untrusted
    /// flag stays for [`take_untrusted`](Self::take_untrusted).
    fn create_data_layer(&mut self, key: u64) -> Arc<DataLayer> {
        match self.queued.swap_remove(&key) {
            Some(layer) => layer,
            None => {
                self.fresh_sections.insert(key);
                Arc::clone(&self.empty)
            }
        }
    }

    fn mark_cube_affected(&mut self, section: SectionPos) {
        for around in section.cube() {
            self.affected_sections.insert(around.pack());
        }
    }

    fn on_node_added(&mut self, key: u64) {
        if self.layer != LightLayer::Sky {
            return;
        }
        let section = SectionPos::unpack(key);
        self.lowest_section_y = self.lowest_section_y.min(section.y);
        let column = section.column().pack();
        let old_top = self.updating.column_top(column);
        if old_top.is_some_and(|top| top > section.y) {
            return;
        }
        self.updating.set_column_top(column, section.y + 1);
        self.exposure_changes.insert(key);
        if let Some(top) = old_top {
            self.exposure_changes
                .insert(SectionPos::new(section.x, top - 1, section.z).pack());
        }
    }

    fn on_node_removed(&mut self, key: u64) {
        if self.layer != LightLayer::Sky {
            return;
        }
        let section = SectionPos::unpack(key);
        let column = section.column().pack();
        let below = (self.lowest_section_y..section.y)
            .rev()
            .map(|y| SectionPos::new(section.x, y, section.z).pack())
            .find(|candidate| self.updating.contains(*candidate));
        if self.updating.column_top(column) == Some(section.y + 1) {
            match below {
                Some(next) => self
                    .updating
                    .set_column_top(column, SectionPos::unpack(next).y + 1),
                None => self.updating.remove_column_top(column),
            }
        }
        if let Some(next) = below {
            self.exposure_changes.insert(next);
        }
    }
}

impl MinFixedPoint for LayerStorage {
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
        let centre = SectionPos::unpack(node);
        let mut best = level;
        for section in centre.cube() {
            let key = if section == centre {
                SOURCE
            } else {
                section.pack()
            };
            if key == excluded {
                continue;
            }
            let neighbour_level = self.status_level(key);
            best = best.min(self.level_from_neighbor(key, node, neighbour_level));
            if best == FULLY_TRACKED {
                return best;
            }
        }
        best
    }

    fn check_neighbors_after_update(&mut self, node: u64, level: u8, decreasing: bool) {
        let centre = SectionPos::unpack(node);
        for section in centre.cube() {
            if section != centre {
                self.check_neighbor(node, section.pack(), level, decreasing);
            }
        }
    }

    fn level(&mut self, node: u64) -> u8 {
        self.status_level(node)
    }

    fn set_level(&mut self, node: u64, level: u8) {
        let old = self.status_level(node);
        if old != FULLY_TRACKED && level == FULLY_TRACKED {
            self.data_sections.insert(node);
            self.to_mark_data.remove(&node);
        }
        if old == FULLY_TRACKED && level != FULLY_TRACKED {
            self.data_sections.remove(&node);
            self.to_mark_no_data.remove(&node);
        }
        if old >= NO_DATA && level != NO_DATA && !self.to_remove.swap_remove(&node) {
            let layer = self.create_data_layer(node);
            self.updating.set(node, layer);
            self.changed_sections.insert(node);
            self.on_node_added(node);
            self.mark_cube_affected(SectionPos::unpack(node));
        }
        if old != NO_DATA && level >= NO_DATA {
            self.to_remove.insert(node);
        }
    }

    fn level_from_neighbor(&mut self, from: u64, to: u64, level: u8) -> u8 {
        if from == SOURCE {
            self.level_from_source(to)
        } else {
            level.saturating_add(1)
        }
    }
}

const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<LayerStorage>();
};
