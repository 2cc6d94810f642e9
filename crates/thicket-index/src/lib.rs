//! Tree arena, spatial-height index, and query cursors for Thicket.
//!
//! Every live tree is held in one slab ([`TreeIndex`] owns it) and linked
//! into exactly one cell list of a torus grid, ordered by height:
//!
//! ```text
//! TreeIndex
//! ├── TreeArena (slots of TreeRecord + taller/shorter links, generational)
//! ├── Grid
//! │   ├── heads[cell]            shortest tree of each cell list
//! │   └── spans[cell, division]  shortest/tallest tree of each height band
//! ├── per-type division watermarks
//! └── epoch / write generation   cursor staleness and deferred writes
//! ```
//!
//! Queries come in four modes ([`QuerySpec`]) and are consumed through a
//! lazy [`TreeCursor`] that never borrows the index across steps.
//!
//! # Timestep discipline
//!
//! Killed trees leave their slot retired, not free: handles go stale at
//! once, but the slot's links stay readable until
//! [`TreeIndex::end_timestep`], which resorts, recycles, and invalidates
//! every cursor by advancing the epoch.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod arena;
pub mod config;
pub mod cursor;
mod grid;
pub mod handle;
pub mod index;
pub mod query;
pub mod record;

pub use config::{IndexConfig, IndexConfigError};
pub use cursor::{CursorIter, TreeCursor};
pub use handle::TreeHandle;
pub use index::{ResortStats, TreeIndex};
pub use query::{QuerySpec, SpeciesSet};
pub use record::{GeometryCodes, TreeRecord};
