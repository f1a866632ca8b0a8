//! Sparse section → layer map with a tiny lookup cache.
//!
//! [`LayerMap`] is the unit of publication: the writer mutates its own map,
//! and readers get immutable clones. Layers are held by `Arc`, so a clone
//! shares every layer with its source until one side copies on write.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use lumen_core::{BlockPos, DataLayer, LightLayer, SectionPos, MAX_LIGHT};

const CACHE_SLOTS: usize = 2;
const EMPTY_SLOT: (u64, usize) = (u64::MAX, usize::MAX);

/// Light layers keyed by packed section, plus per-column sky tops.
#[derive(Clone, Debug)]
pub struct LayerMap {
    layers: IndexMap<u64, Arc<DataLayer>>,
    /// Column key → one above the highest section storing light.
    column_tops: HashMap<u64, i32>,
    /// Most recent `(section, index)` lookups, slot 0 newest. Indices are
    /// validated against the live map on every hit.
    cache: [(u64, usize); CACHE_SLOTS],
    cache_enabled: bool,
}

impl Default for LayerMap {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerMap {
    /// An empty map with caching enabled.
    pub fn new() -> Self {
        Self {
            layers: IndexMap::new(),
            column_tops: HashMap::new(),
            cache: [EMPTY_SLOT; CACHE_SLOTS],
            cache_enabled: true,
        }
    }

    /// Layer for `section`, consulting and refreshing the cache.
    pub fn get(&mut self, section: u64) -> Option<&Arc<DataLayer>> {
        let index = match self.cached_index(section) {
            Some(index) => index,
            None => {
                let index = self.layers.get_index_of(&section)?;
                if self.cache_enabled {
                    self.cache[1] = self.cache[0];
                    self.cache[0] = (section, index);
                }
                index
            }
        };
        self.layers.get_index(index).map(|(_, layer)| layer)
    }

    /// Layer for `section` without touching the cache.
    pub fn peek(&self, section: u64) -> Option<&Arc<DataLayer>> {
        self.layers.get(&section)
    }

    /// Whether `section` has a layer.
    pub fn contains(&self, section: u64) -> bool {
        self.layers.contains_key(&section)
    }

    /// Install `layer` for `section`, replacing any previous one.
    pub fn set(&mut self, section: u64, layer: Arc<DataLayer>) {
        self.layers.insert(section, layer);
    }

    /// Give `section` a private copy of its layer so that writes do not show
    /// through to any other map sharing it.
    pub fn copy_on_write(&mut self, section: u64) {
        if let Some(layer) = self.layers.get_mut(&section) {
            *layer = Arc::new(DataLayer::clone(layer));
        }
        self.clear_cache();
    }

    /// Mutable layer for `section`.
    ///
    /// A layer still shared with another map is duplicated first, so
    /// published snapshots are never written through.
    pub fn layer_mut(&mut self, section: u64) -> Option<&mut DataLayer> {
        self.layers.get_mut(&section).map(Arc::make_mut)
    }

    /// Whether the layer for `section` is shared with another map.
    pub fn is_shared(&self, section: u64) -> bool {
        self.layers
            .get(&section)
            .is_some_and(|layer| Arc::strong_count(layer) > 1)
    }

    /// Drop the layer for `section`, returning it.
    pub fn remove(&mut self, section: u64) -> Option<Arc<DataLayer>> {
        self.layers.swap_remove(&section)
    }

    /// Forget cached lookups.
    pub fn clear_cache(&mut self) {
        self.cache = [EMPTY_SLOT; CACHE_SLOTS];
    }

    /// Turn caching off for good. Published maps are shared read-only and
    /// cannot update their cache.
    pub fn disable_cache(&mut self) {
        self.clear_cache();
        self.cache_enabled = false;
    }

    /// Whether lookups through [`get`](Self::get) are cached.
    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// A copy suitable for publication: shares every layer, no cache.
    pub fn snapshot(&self) -> Self {
        let mut copy = self.clone();
        copy.disable_cache();
        copy
    }

    /// Number of stored sections.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no section is stored.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Packed keys of every stored section.
    pub fn sections(&self) -> impl Iterator<Item = u64> + '_ {
        self.layers.keys().copied()
    }

    // ── Sky columns ─────────────────────────────────────────────

    /// One above the highest section of `column` that stores light.
    pub fn column_top(&self, column: u64) -> Option<i32> {
        self.column_tops.get(&column).copied()
    }

    /// Record the top of `column`.
    pub fn set_column_top(&mut self, column: u64, top: i32) {
        self.column_tops.insert(column, top);
    }

    /// Forget `column`'s top; it no longer stores light anywhere.
    pub fn remove_column_top(&mut self, column: u64) {
        self.column_tops.remove(&column);
    }

    /// Whether `section` lies above every light-storing section of its
    /// column, i.e. under open sky.
    pub fn is_above_data(&self, section: SectionPos) -> bool {
        match self.column_top(section.column().pack()) {
            Some(top) => section.y >= top,
            None => true,
        }
    }

    // ── Lookups ─────────────────────────────────────────────────

    /// Light value of `layer` at `pos` as this map sees it.
    ///
    /// Block light outside stored sections is dark. Sky light outside stored
    /// sections is full under open sky, and otherwise continues the bottom
    /// plane of the nearest stored section above.
    pub fn light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        let section = pos.section();
        if let Some(data) = self.peek(section.pack()) {
            return data.get_at(pos);
        }
        match layer {
            LightLayer::Block => 0,
            LightLayer::Sky => self.sky_below_data(pos, section),
        }
    }

    fn sky_below_data(&self, pos: BlockPos, section: SectionPos) -> u8 {
        let Some(top) = self.column_top(section.column().pack()) else {
            return MAX_LIGHT;
        };
        let (x, _, z) = pos.local();
        (section.y + 1..top)
            .find_map(|y| self.peek(SectionPos::new(section.x, y, section.z).pack()))
            .map_or(MAX_LIGHT, |data| data.get(x, 0, z))
    }

    fn cached_index(&self, section: u64) -> Option<usize> {
        if !self.cache_enabled {
            return None;
        }
        let &(_, index) = self.cache.iter().find(|(key, _)| *key == section)?;
        match self.layers.get_index(index) {
            Some((key, _)) if *key == section => Some(index),
            _ => None,
        }
    }
}
