//! Core types and traits for the Thicket tree population store.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other Thicket crate: species ids,
//! attribute codes, life stages, error types, and the collaborator traits
//! ([`Plot`], [`Allometry`]) the store calls into.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod stage;
pub mod traits;

pub use error::{IndexError, LifecycleError, QueryError, SchemaError};
pub use id::{AttrCode, AttrKind, BoolCode, FloatCode, IntCode, SpeciesId, StringCode};
pub use stage::{TreeType, TypeMask};
pub use traits::{Allometry, Plot};

/// Small list of species ids, inline up to eight entries.
pub type SpeciesList = smallvec::SmallVec<[SpeciesId; 8]>;
