//! Lumen: incremental voxel light propagation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Lumen sub-crates. For most users, adding `lumen` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use lumen::prelude::*;
//!
//! // One lamp in an otherwise empty world.
//! struct Lamp;
//! impl LightWorld for Lamp {
//!     fn voxel(&self, pos: BlockPos) -> VoxelLight {
//!         if pos == BlockPos::new(8, 8, 8) {
//!             VoxelLight::emitter(14)
//!         } else {
//!             VoxelLight::AIR
//!         }
//!     }
//!     fn section_exists(&self, _section: SectionPos) -> bool {
//!         true
//!     }
//!     fn is_section_empty(&self, section: SectionPos) -> bool {
//!         section != SectionPos::new(0, 0, 0)
//!     }
//! }
//!
//! let mut engine = LevelLightEngine::new(Arc::new(Lamp), &LightConfig::block_only()).unwrap();
//! engine.sync_section_status(SectionPos::new(0, 0, 0));
//! while engine.has_light_work() {
//!     engine.tick();
//! }
//!
//! let reader = engine.reader();
//! assert_eq!(reader.light_value(LightLayer::Block, BlockPos::new(8, 8, 8)), 14);
//! assert_eq!(reader.light_value(LightLayer::Block, BlockPos::new(8, 8, 11)), 11);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `lumen-core` | Positions, directions, `DataLayer`, the `LightWorld` trait |
//! | [`propagator`] | `lumen-propagator` | Generic min-fixed-point solver and its queue |
//! | [`storage`] | `lumen-storage` | Section storage, published maps, `LightReader` |
//! | [`engine`] | `lumen-engine` | Block and sky engines, `LevelLightEngine`, configuration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`lumen-core`).
///
/// Packed [`types::BlockPos`] and [`types::SectionPos`] keys, the
/// nibble-packed [`types::DataLayer`], and the [`types::LightWorld`] trait a
/// host implements.
pub use lumen_core as types;

/// Generic min-fixed-point solver (`lumen-propagator`).
///
/// Implement [`propagator::MinFixedPoint`] to reuse the incremental solver
/// for a graph of your own.
pub use lumen_propagator as propagator;

/// Section storage and published snapshots (`lumen-storage`).
pub use lumen_storage as storage;

/// Light engines (`lumen-engine`).
///
/// [`engine::LevelLightEngine`] for both layers at once,
/// [`engine::LightEngine`] for a single layer.
pub use lumen_engine as engine;

/// Common imports for typical Lumen usage.
///
/// ```rust
/// use lumen::prelude::*;
/// ```
pub mod prelude {
    // Geometry and host interface
    pub use lumen_core::{
        BlockPos, DataLayer, Direction, FaceMask, LightLayer, LightWorld, SectionPos, VoxelLight,
        MAX_LIGHT,
    };

    // Engines and configuration
    pub use lumen_engine::{
        BlockRules, ConfigError, LevelLightEngine, LevelLightReader, LightConfig, LightEngine,
        LightRules, SkyRules,
    };

    // Readers and storage state
    pub use lumen_storage::{LightReader, SectionStatus};
}
