//! The tree population for Thicket simulations.
//!
//! [`Population`] owns the attribute schema, the spatial-height index, and
//! the collaborators ([`Plot`](thicket_core::Plot),
//! [`Allometry`](thicket_core::Allometry), [`DeadTreeArchive`]). Behaviors
//! use it in two phases:
//!
//! 1. **Setup**: register the per-tree attributes they need and keep the
//!    returned codes.
//! 2. **Run**: each timestep, open cursors with [`Population::find`] or
//!    [`Population::find_str`], read and write attributes through tree
//!    handles, create and kill trees, and finally call
//!    [`Population::end_timestep`].
//!
//! Creating the first tree freezes the schema.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builtin;
pub mod config;
pub mod death;
mod lifecycle;
pub mod population;
pub mod query;

pub use builtin::{BuiltinCodes, StageCodes};
pub use config::{ConfigError, PopulationConfig, SpeciesParams};
pub use death::{DeadTree, DeadTreeArchive, DeathReason, KillOutcome, NullArchive};
pub use population::{Phase, Population, PopulationBuilder, TimestepReport};
