//! Plot geometry for Thicket tree populations.
//!
//! Provides [`TorusPlot`], the reference implementation of
//! [`thicket_core::Plot`]: a rectangle whose edges wrap on both axes.
//! The spatial index uses the plot for bounds checks and exact distance
//! tests; it computes cell-level bounding boxes itself.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod torus;

pub use error::PlotError;
pub use torus::{axis_offset, wrap_axis, TorusPlot};
