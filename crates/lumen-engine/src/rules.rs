//! Per-layer light physics.
//!
//! A [`LightRules`] type is the only difference between the block and sky
//! engines: where light comes from, what one step costs, and what an
//! unstored neighbour contributes. Rules are stateless.
//!
//! All values here are propagator levels: `0` is full brightness,
//! [`MAX_LIGHT`] is dark.

use lumen_core::{BlockPos, Direction, LightLayer, VoxelLight, MAX_LIGHT};
use lumen_storage::LayerStorage;

/// Light physics for one [`LightLayer`].
pub trait LightRules: Send + 'static {
    /// Layer these rules propagate.
    const LAYER: LightLayer;

    /// Level a voxel has on its own, before neighbours.
    fn source_level(&self, voxel: &VoxelLight) -> u8;

    /// Level after entering `to` in direction `dir` from a neighbour at
    /// `level`. Blocking by opacity and covered faces is handled by the
    /// engine before this is called.
    fn attenuate(&self, level: u8, dir: Direction, to: &VoxelLight) -> u8;

    /// Level of `pos` when its section stores no light, or `None` if such a
    /// voxel contributes nothing.
    fn unstored_level(&self, storage: &LayerStorage, pos: BlockPos) -> Option<u8>;

    /// Whether darkening and brightening jump straight down across unstored
    /// sections to the next stored one.
    fn crosses_vertical_gaps(&self) -> bool {
        false
    }
}

/// Light emitted by voxels. Every step costs at least one level.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockRules;

impl LightRules for BlockRules {
    const LAYER: LightLayer = LightLayer::Block;

    fn source_level(&self, voxel: &VoxelLight) -> u8 {
        MAX_LIGHT - voxel.emission.min(MAX_LIGHT)
    }

    fn attenuate(&self, level: u8, _dir: Direction, to: &VoxelLight) -> u8 {
        level.saturating_add(to.opacity.max(1))
    }

    fn unstored_level(&self, _storage: &LayerStorage, _pos: BlockPos) -> Option<u8> {
        None
    }
}

/// Light from the open sky. Full-strength light falls straight down through
/// transparent voxels without loss; everything else behaves like block
/// light.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkyRules;

impl LightRules for SkyRules {
    const LAYER: LightLayer = LightLayer::Sky;

    fn source_level(&self, _voxel: &VoxelLight) -> u8 {
        MAX_LIGHT
    }

    fn attenuate(&self, level: u8, dir: Direction, to: &VoxelLight) -> u8 {
        if dir == Direction::Down && level == 0 && to.opacity == 0 {
            0
        } else {
            level.saturating_add(to.opacity.max(1))
        }
    }

    fn unstored_level(&self, storage: &LayerStorage, pos: BlockPos) -> Option<u8> {
        Some(MAX_LIGHT - storage.updating_light_value(pos).min(MAX_LIGHT))
    }

    fn crosses_vertical_gaps(&self) -> bool {
        true
    }
}
