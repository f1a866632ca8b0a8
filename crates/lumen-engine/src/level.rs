//! Block and sky light behind one front door.

use std::sync::Arc;

use log::trace;
use lumen_core::{BlockPos, DataLayer, LightLayer, LightWorld, SectionPos};
use lumen_storage::{LightReader, SectionStatus};

use crate::config::{ConfigError, LightConfig};
use crate::engine::LightEngine;
use crate::rules::{BlockRules, SkyRules};

/// Owns the block and sky engines enabled by a [`LightConfig`] and forwards
/// world events to both.
pub struct LevelLightEngine {
    world: Arc<dyn LightWorld>,
    block: Option<LightEngine<BlockRules>>,
    sky: Option<LightEngine<SkyRules>>,
    updates_per_tick: usize,
}

impl LevelLightEngine {
    /// Build the engines `config` enables.
    pub fn new(world: Arc<dyn LightWorld>, config: &LightConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let block = if config.block_light {
            Some(LightEngine::new(BlockRules, Arc::clone(&world), config)?)
        } else {
            None
        };
        let sky = if config.sky_light {
            Some(LightEngine::new(SkyRules, Arc::clone(&world), config)?)
        } else {
            None
        };
        Ok(Self {
            world,
            block,
            sky,
            updates_per_tick: config.updates_per_tick,
        })
    }

    /// The block light engine, if enabled.
    pub fn block_engine(&self) -> Option<&LightEngine<BlockRules>> {
        self.block.as_ref()
    }

    /// The sky light engine, if enabled.
    pub fn sky_engine(&self) -> Option<&LightEngine<SkyRules>> {
        self.sky.as_ref()
    }

    /// The voxel at `pos` changed.
    pub fn check_block(&mut self, pos: BlockPos) {
        if let Some(block) = &mut self.block {
            block.check_block(pos);
        }
        if let Some(sky) = &mut self.sky {
            sky.check_block(pos);
        }
    }

    /// The voxel at `pos` now emits at least `emission`. Block light only.
    pub fn on_block_emission_increase(&mut self, pos: BlockPos, emission: u8) {
        if let Some(block) = &mut self.block {
            block.on_block_emission_increase(pos, emission);
        }
    }

    /// The world reports whether `section` contains geometry.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        if let Some(block) = &mut self.block {
            block.update_section_status(section, is_empty);
        }
        if let Some(sky) = &mut self.sky {
            sky.update_section_status(section, is_empty);
        }
    }

    /// Ask the world about `section` and update its status accordingly.
    /// Sections the world does not have count as empty.
    pub fn sync_section_status(&mut self, section: SectionPos) {
        let is_empty = !self.world.section_exists(section) || self.world.is_section_empty(section);
        self.update_section_status(section, is_empty);
    }

    /// Supply (or withdraw) persisted light of `layer` for `section`.
    pub fn queue_section_data(
        &mut self,
        layer: LightLayer,
        section: SectionPos,
        data: Option<DataLayer>,
        trusted: bool,
    ) {
        match layer {
            LightLayer::Block => {
                if let Some(block) = &mut self.block {
                    block.queue_section_data(section, data, trusted);
                }
            }
            LightLayer::Sky => {
                if let Some(sky) = &mut self.sky {
                    sky.queue_section_data(section, data, trusted);
                }
            }
        }
    }

    /// Supply persisted light of `layer` for `section` as serialized bytes.
    pub fn queue_section_bytes(
        &mut self,
        layer: LightLayer,
        section: SectionPos,
        bytes: &[u8],
        trusted: bool,
    ) {
        match layer {
            LightLayer::Block => {
                if let Some(block) = &mut self.block {
                    block.queue_section_bytes(section, bytes, trusted);
                }
            }
            LightLayer::Sky => {
                if let Some(sky) = &mut self.sky {
                    sky.queue_section_bytes(section, bytes, trusted);
                }
            }
        }
    }

    /// Keep (or stop keeping) the light of `column`'s released sections in
    /// both layers.
    pub fn retain_data(&mut self, column: SectionPos, retain: bool) {
        if let Some(block) = &mut self.block {
            block.retain_data(column, retain);
        }
        if let Some(sky) = &mut self.sky {
            sky.retain_data(column, retain);
        }
    }

    /// Run up to `budget` units of light work and return the unused budget.
    ///
    /// With both layers enabled, block light gets half the budget first and
    /// sky light the rest plus whatever block light left over; anything sky
    /// light leaves goes back to block light.
    pub fn run_updates(&mut self, budget: usize) -> usize {
        match (&mut self.block, &mut self.sky) {
            (Some(block), Some(sky)) => {
                let half = budget / 2;
                let block_left = block.run_light_updates(half);
                let sky_left = sky.run_light_updates(budget - half + block_left);
                if sky_left > 0 && block.has_light_work() {
                    block.run_light_updates(sky_left)
                } else {
                    sky_left
                }
            }
            (Some(block), None) => block.run_light_updates(budget),
            (None, Some(sky)) => sky.run_light_updates(budget),
            (None, None) => budget,
        }
    }

    /// Run one tick's worth of light work.
    pub fn tick(&mut self) -> usize {
        let left = self.run_updates(self.updates_per_tick);
        trace!("light tick used {} of {}", self.updates_per_tick - left, self.updates_per_tick);
        left
    }

    /// Whether either layer has work left.
    pub fn has_light_work(&self) -> bool {
        self.block.as_ref().is_some_and(LightEngine::has_light_work)
            || self.sky.as_ref().is_some_and(LightEngine::has_light_work)
    }

    /// Published light of `layer` at `pos`; 0 when the layer is disabled.
    pub fn light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        match layer {
            LightLayer::Block => self.block.as_ref().map_or(0, |e| e.light_value(pos)),
            LightLayer::Sky => self.sky.as_ref().map_or(0, |e| e.light_value(pos)),
        }
    }

    /// Combined brightness at `pos`: the brighter of block light and sky
    /// light dimmed by `sky_darken`.
    pub fn raw_brightness(&self, pos: BlockPos, sky_darken: u8) -> u8 {
        let sky = self.light_value(LightLayer::Sky, pos).saturating_sub(sky_darken);
        self.light_value(LightLayer::Block, pos).max(sky)
    }

    /// Queued or published light of `layer` for `section`.
    pub fn data_layer_data(&self, layer: LightLayer, section: SectionPos) -> Option<Arc<DataLayer>> {
        match layer {
            LightLayer::Block => self.block.as_ref()?.data_layer_data(section),
            LightLayer::Sky => self.sky.as_ref()?.data_layer_data(section),
        }
    }

    /// Tracker status of `section` in `layer`, `None` when the layer is
    /// disabled.
    pub fn section_status(&self, layer: LightLayer, section: SectionPos) -> Option<SectionStatus> {
        match layer {
            LightLayer::Block => self.block.as_ref().map(|e| e.section_status(section)),
            LightLayer::Sky => self.sky.as_ref().map(|e| e.section_status(section)),
        }
    }

    /// Human-readable state of `section` in every enabled layer.
    pub fn debug_data(&self, section: SectionPos) -> String {
        let mut parts = Vec::with_capacity(2);
        if let Some(block) = &self.block {
            parts.push(format!("block: {}", block.debug_data(section)));
        }
        if let Some(sky) = &self.sky {
            parts.push(format!("sky: {}", sky.debug_data(section)));
        }
        parts.join("; ")
    }

    /// A cloneable handle for reading published light from other threads.
    pub fn reader(&self) -> LevelLightReader {
        LevelLightReader {
            block: self.block.as_ref().map(LightEngine::reader),
            sky: self.sky.as_ref().map(LightEngine::reader),
        }
    }
}

/// Read-only view of both layers' published light.
#[derive(Clone)]
pub struct LevelLightReader {
    block: Option<LightReader>,
    sky: Option<LightReader>,
}

impl LevelLightReader {
    /// Published light of `layer` at `pos`; 0 when the layer is disabled.
    pub fn light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        let reader = match layer {
            LightLayer::Block => &self.block,
            LightLayer::Sky => &self.sky,
        };
        reader.as_ref().map_or(0, |r| r.light_value(pos))
    }

    /// See [`LevelLightEngine::raw_brightness`].
    pub fn raw_brightness(&self, pos: BlockPos, sky_darken: u8) -> u8 {
        let sky = self.light_value(LightLayer::Sky, pos).saturating_sub(sky_darken);
        self.light_value(LightLayer::Block, pos).max(sky)
    }

    /// The reader for `layer`, if enabled.
    pub fn layer(&self, layer: LightLayer) -> Option<&LightReader> {
        match layer {
            LightLayer::Block => self.block.as_ref(),
            LightLayer::Sky => self.sky.as_ref(),
        }
    }
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<LevelLightReader>();
    fn assert_send<T: Send>() {}
    assert_send::<LevelLightEngine>();
};
