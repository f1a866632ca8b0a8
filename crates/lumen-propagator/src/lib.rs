//! Generic incremental min-fixed-point propagator.
//!
//! Solves "each node's level is the minimum of its own source and what its
//! neighbours pass on" over an implicit graph of packed `u64` nodes, one
//! bounded chunk of work at a time. The same machinery drives the section
//! tracker (3 levels) and both light engines (16 levels).
//!
//! ```text
//! mutation ──▶ check_edge / check_node / check_neighbor
//!                    │  (relax: re-bucket at min(stored, computed))
//!                    ▼
//!              LevelQueue [0][1][2]…[n-1]   +   computed: node → level
//!                    │
//!       run_updates(budget) pops lowest bucket
//!          ├── brighter → set_level, spread decrease
//!          └── dimmer   → set dark, re-enqueue, spread increase
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fixed_point;
pub mod queue;

pub use fixed_point::{MinFixedPoint, PendingLevels, NO_COMPUTED_LEVEL};
pub use queue::LevelQueue;
