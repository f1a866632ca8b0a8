//! Copy-on-write section light storage for Lumen.
//!
//! # Architecture
//!
//! ```text
//! LayerStorage (single writer)
//! ├── section tracker (MinFixedPoint, 3 levels)
//! ├── updating: LayerMap ── IndexMap<section, Arc<DataLayer>> + 2-slot cache
//! ├── queued / untrusted / retained columns
//! └── visible: Arc<ArcSwap<LayerMap>> ◀── LightReader (any thread)
//! ```
//!
//! The writer mutates `updating`; [`LayerStorage::swap_section_map`]
//! publishes an immutable clone into `visible`. Layers are shared between
//! the two by `Arc` and copied on the first write after each publication,
//! so a published map never changes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod map;
pub mod reader;
pub mod storage;

pub use map::LayerMap;
pub use reader::LightReader;
pub use storage::{LayerStorage, SectionStatus};
