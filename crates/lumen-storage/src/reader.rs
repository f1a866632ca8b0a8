//! Lock-free access to published light from any thread.

use std::sync::Arc;

use arc_swap::ArcSwap;
use lumen_core::{BlockPos, DataLayer, LightLayer, SectionPos};

use crate::map::LayerMap;

/// Cloneable read handle onto the most recently published [`LayerMap`].
///
/// Each call loads the current map; hold a [`snapshot`](Self::snapshot) to
/// read several values from one consistent publication.
#[derive(Clone)]
pub struct LightReader {
    layer: LightLayer,
    visible: Arc<ArcSwap<LayerMap>>,
}

impl LightReader {
    pub(crate) fn new(layer: LightLayer, visible: Arc<ArcSwap<LayerMap>>) -> Self {
        Self { layer, visible }
    }

    /// Light layer this reader observes.
    pub fn layer(&self) -> LightLayer {
        self.layer
    }

    /// Published light value at `pos`.
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        self.visible.load().light_value(self.layer, pos)
    }

    /// Published layer of `section`.
    pub fn layer_data(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.visible.load().peek(section.pack()).cloned()
    }

    /// The current publication. Never changes under the caller.
    pub fn snapshot(&self) -> Arc<LayerMap> {
        self.visible.load_full()
    }
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<LightReader>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_follows_publications() {
        let visible = Arc::new(ArcSwap::from_pointee(LayerMap::new()));
        let reader = LightReader::new(LightLayer::Block, Arc::clone(&visible));
        let pos = BlockPos::new(1, 2, 3);
        assert_eq!(reader.light_value(pos), 0);

        let held = reader.snapshot();
        let mut next = LayerMap::new();
        let mut layer = DataLayer::new();
        layer.set_at(pos, 8);
        next.set(pos.section().pack(), Arc::new(layer));
        visible.store(Arc::new(next));

        assert_eq!(reader.light_value(pos), 8);
        assert_eq!(held.light_value(LightLayer::Block, pos), 0);
        assert!(reader.layer_data(pos.section()).is_some());
    }
}
