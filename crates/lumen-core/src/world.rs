//! The narrow interface between the light engine and the voxel world.
//!
//! The engine never owns geometry. It asks a [`LightWorld`] how much a voxel
//! attenuates and emits, whether a section holds anything, and tells it when
//! a section's published light changed.

use std::fmt;

use crate::direction::Direction;
use crate::pos::{BlockPos, SectionPos};

/// Brightest light value.
pub const MAX_LIGHT: u8 = 15;
/// Number of distinct light values, and the level count of light propagators.
pub const LIGHT_LEVELS: usize = MAX_LIGHT as usize + 1;

/// Which light channel a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightLayer {
    /// Light emitted by voxels.
    Block,
    /// Light arriving from the open sky above the world.
    Sky,
}

impl fmt::Display for LightLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block => f.write_str("block"),
            Self::Sky => f.write_str("sky"),
        }
    }
}

/// Set of voxel faces fully covered by opaque geometry, one bit per
/// [`Direction`] ordinal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FaceMask(u8);

impl FaceMask {
    /// No covered faces.
    pub const NONE: Self = Self(0);
    /// All six faces covered.
    pub const ALL: Self = Self(0b11_1111);

    /// Mask with only `dir` covered.
    pub const fn of(dir: Direction) -> Self {
        Self(1 << dir as u8)
    }

    /// This mask with `dir` added.
    pub const fn with(self, dir: Direction) -> Self {
        Self(self.0 | 1 << dir as u8)
    }

    /// Whether the face towards `dir` is covered.
    pub const fn covers(self, dir: Direction) -> bool {
        self.0 & (1 << dir as u8) != 0
    }
}

/// Light-relevant properties of a single voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VoxelLight {
    /// Levels lost when light enters this voxel. [`MAX_LIGHT`] blocks it.
    pub opacity: u8,
    /// Light emitted by this voxel, `0..=15`.
    pub emission: u8,
    /// Faces whose full square is covered by the voxel's shape.
    pub faces: FaceMask,
}

impl VoxelLight {
    /// Transparent, dark, shapeless.
    pub const AIR: Self = Self {
        opacity: 0,
        emission: 0,
        faces: FaceMask::NONE,
    };

    /// Fully opaque cube.
    pub const SOLID: Self = Self {
        opacity: MAX_LIGHT,
        emission: 0,
        faces: FaceMask::ALL,
    };

    /// Transparent voxel emitting `emission`.
    pub const fn emitter(emission: u8) -> Self {
        Self {
            opacity: 0,
            emission,
            faces: FaceMask::NONE,
        }
    }

    /// Transparent-shaped voxel that attenuates by `opacity`.
    pub const fn translucent(opacity: u8) -> Self {
        Self {
            opacity,
            emission: 0,
            faces: FaceMask::NONE,
        }
    }
}

/// Geometry and notification hooks the engine needs from its host.
///
/// Implementations are queried from the single writer thread only, but the
/// engine is moved across threads, hence the bounds.
pub trait LightWorld: Send + Sync {
    /// Opacity, emission and covered faces at `pos`.
    ///
    /// Must answer for every position, loaded or not.
    fn voxel(&self, pos: BlockPos) -> VoxelLight;

    /// Whether the section is loaded at all.
    fn section_exists(&self, section: SectionPos) -> bool;

    /// Whether the section contains no geometry.
    fn is_section_empty(&self, section: SectionPos) -> bool;

    /// Published light of `section` changed.
    fn on_light_update(&self, layer: LightLayer, section: SectionPos) {
        let _ = (layer, section);
    }
}
