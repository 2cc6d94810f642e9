//! Attribute schema registry for Thicket tree records.
//!
//! Every tree carries four sparse, typed slot arrays (int, float, bool,
//! string) whose sizes are fixed by the schema of its (species, type) pair.
//! [`SchemaRegistry`] hands out the dense codes addressing those slots and
//! computes which slots survive a life-stage transition.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod registry;

pub use registry::{CarryOver, SchemaRegistry, TypeSchema};
