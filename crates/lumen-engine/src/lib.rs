//! Block and sky light engines for Lumen.
//!
//! [`LightEngine`] runs the incremental propagator over voxels for one
//! layer, parameterised by its [`LightRules`]. [`LevelLightEngine`] owns a
//! block engine and a sky engine and splits a per-tick budget between them.
//!
//! ```text
//! LevelLightEngine
//! ├── LightEngine<BlockRules> ── LayerStorage ── visible LayerMap ──▶ LightReader
//! └── LightEngine<SkyRules>   ── LayerStorage ── visible LayerMap ──▶ LightReader
//!                                                                       │
//!                                          LevelLightReader ◀───────────┘
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod level;
pub mod rules;

pub use config::{ConfigError, LightConfig};
pub use engine::LightEngine;
pub use level::{LevelLightEngine, LevelLightReader};
pub use rules::{BlockRules, LightRules, SkyRules};
