//! Spatial-height index geometry parameters.

use std::error::Error;
use std::fmt;

/// Geometry of the spatial-height index.
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexConfig {
    /// Edge length of a grid cell in plot units.
    ///
    /// Default: 8. Must be a power of two so cell addresses are computed
    /// with a shift.
    pub cell_length: u32,

    /// Height span of one division within a cell, in metres. Default: 1.0.
    pub height_division: f32,

    /// Tallest expected tree, in metres. Default: 60.0.
    ///
    /// Taller trees are still accepted; they share the last division.
    pub max_tree_height: f32,

    /// Resort shifts per live tree above which a resort is reported as a
    /// cost cliff. Default: 4.0.
    pub resort_warn_factor: f32,
}

impl IndexConfig {
    /// Default cell edge length.
    pub const DEFAULT_CELL_LENGTH: u32 = 8;

    /// Default division height.
    pub const DEFAULT_HEIGHT_DIVISION: f32 = 1.0;

    /// Default tallest expected tree.
    pub const DEFAULT_MAX_TREE_HEIGHT: f32 = 60.0;

    /// Largest number of height divisions per cell.
    pub const MAX_DIVISIONS: usize = u16::MAX as usize;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), IndexConfigError> {
        if self.cell_length == 0 || !self.cell_length.is_power_of_two() {
            return Err(IndexConfigError::CellLengthNotPowerOfTwo {
                value: self.cell_length,
            });
        }
        if !self.height_division.is_finite() || self.height_division <= 0.0 {
            return Err(IndexConfigError::InvalidHeightDivision {
                value: self.height_division,
            });
        }
        if !self.max_tree_height.is_finite() || self.max_tree_height <= 0.0 {
            return Err(IndexConfigError::InvalidMaxHeight {
                value: self.max_tree_height,
            });
        }
        if self.division_count() > Self::MAX_DIVISIONS {
            return Err(IndexConfigError::TooManyDivisions {
                count: self.division_count(),
            });
        }
        if !self.resort_warn_factor.is_finite() || self.resort_warn_factor < 0.0 {
            return Err(IndexConfigError::InvalidWarnFactor {
                value: self.resort_warn_factor,
            });
        }
        Ok(())
    }

    /// Height divisions per cell: enough to cover `max_tree_height`, plus
    /// the overflow division.
    pub fn division_count(&self) -> usize {
        (self.max_tree_height / self.height_division).ceil() as usize + 1
    }

    /// Shift turning a plot coordinate into a cell coordinate.
    pub fn cell_shift(&self) -> u32 {
        self.cell_length.trailing_zeros()
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cell_length: Self::DEFAULT_CELL_LENGTH,
            height_division: Self::DEFAULT_HEIGHT_DIVISION,
            max_tree_height: Self::DEFAULT_MAX_TREE_HEIGHT,
            resort_warn_factor: 4.0,
        }
    }
}

/// Errors detected by [`IndexConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum IndexConfigError {
    /// Cell length is zero or not a power of two.
    CellLengthNotPowerOfTwo {
        /// The rejected value.
        value: u32,
    },
    /// Division height is zero, negative, or not finite.
    InvalidHeightDivision {
        /// The rejected value.
        value: f32,
    },
    /// Maximum tree height is zero, negative, or not finite.
    InvalidMaxHeight {
        /// The rejected value.
        value: f32,
    },
    /// The division count does not fit the index.
    TooManyDivisions {
        /// The computed count.
        count: usize,
    },
    /// Resort warning factor is negative or not finite.
    InvalidWarnFactor {
        /// The rejected value.
        value: f32,
    },
}

impl fmt::Display for IndexConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CellLengthNotPowerOfTwo { value } => {
                write!(f, "cell_length must be a power of two, got {value}")
            }
            Self::InvalidHeightDivision { value } => {
                write!(f, "height_division must be finite and positive, got {value}")
            }
            Self::InvalidMaxHeight { value } => {
                write!(f, "max_tree_height must be finite and positive, got {value}")
            }
            Self::TooManyDivisions { count } => write!(
                f,
                "{count} height divisions exceed the maximum of {}",
                IndexConfig::MAX_DIVISIONS
            ),
            Self::InvalidWarnFactor { value } => {
                write!(f, "resort_warn_factor must be finite and >= 0, got {value}")
            }
        }
    }
}

impl Error for IndexConfigError {}
