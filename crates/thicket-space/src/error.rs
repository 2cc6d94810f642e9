//! Error types for plot construction.

use std::fmt;

/// Errors arising from plot construction.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotError {
    /// A plot dimension is zero, negative, or not finite.
    InvalidDimension {
        /// Which axis.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension { name, value } => {
                write!(f, "plot {name} must be finite and positive, got {value}")
            }
        }
    }
}

impl std::error::Error for PlotError {}
