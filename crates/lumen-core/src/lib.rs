//! Core types for the Lumen incremental light engine.
//!
//! This crate defines the coordinate system, the packed `u64` node keys the
//! propagators operate on, the nibble-packed [`DataLayer`], and the
//! [`LightWorld`] interface through which the engine reads geometry.
//!
//! ```text
//! BlockPos ──pack──▶ u64 node key ──section()──▶ SectionPos ──pack──▶ u64 section key
//!                                                   │
//!                                                   ▼
//!                                              DataLayer (16³ nibbles)
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod error;
pub mod layer;
pub mod pos;
pub mod world;

pub use direction::Direction;
pub use error::{LayerSizeError, LevelError, LEVEL_COUNT_LIMIT};
pub use layer::{DataLayer, LAYER_BYTES, LAYER_VOLUME};
pub use pos::{block_to_section, BlockPos, SectionPos, SECTION_BITS, SECTION_MASK, SECTION_SIZE};
pub use world::{FaceMask, LightLayer, LightWorld, VoxelLight, LIGHT_LEVELS, MAX_LIGHT};

/// Reserved node key standing for "the node's own source".
///
/// Decodes to a voxel at the positive x limit of the packed range, which no
/// world places geometry at.
pub const SOURCE: u64 = i64::MAX as u64;
