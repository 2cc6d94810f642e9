//! Error types for the Thicket tree store.
//!
//! Organized by subsystem: schema registration, spatial indexing, query
//! construction, and lifecycle operations. All of these are setup or data
//! errors surfaced to the caller; programming-contract violations (stale
//! handles, stale cursors, out-of-range codes) panic instead.

use std::error::Error;
use std::fmt;

use crate::id::{AttrKind, SpeciesId};
use crate::stage::TreeType;

/// Errors from attribute schema registration and lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema was frozen when the run phase began.
    Frozen {
        /// Label of the rejected registration.
        label: String,
    },
    /// Species id outside the configured species list.
    UnknownSpecies {
        /// The offending species.
        species: SpeciesId,
    },
    /// A label required at setup time is not registered.
    NotFound {
        /// Attribute kind searched.
        kind: AttrKind,
        /// Label searched.
        label: String,
        /// Species searched.
        species: SpeciesId,
        /// Life stage searched.
        tree_type: TreeType,
    },
    /// Code space for one (species, type, kind) is exhausted.
    TooManyAttributes {
        /// Attribute kind.
        kind: AttrKind,
        /// Maximum number of codes.
        max: usize,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frozen { label } => {
                write!(f, "cannot register '{label}': schema is frozen")
            }
            Self::UnknownSpecies { species } => write!(f, "unknown species {species}"),
            Self::NotFound {
                kind,
                label,
                species,
                tree_type,
            } => write!(
                f,
                "{kind} attribute '{label}' not registered for species {species} {tree_type}"
            ),
            Self::TooManyAttributes { kind, max } => {
                write!(f, "more than {max} {kind} attributes registered")
            }
        }
    }
}

impl Error for SchemaError {}

/// Errors from the spatial-height index.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexError {
    /// Coordinates fall outside the plot.
    OutOfPlot {
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
    },
    /// A position or height value is NaN or infinite.
    NotFinite {
        /// Which value.
        what: &'static str,
        /// The value.
        value: f32,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfPlot { x, y } => write!(f, "point ({x}, {y}) is outside the plot"),
            Self::NotFinite { what, value } => write!(f, "{what} must be finite, got {value}"),
        }
    }
}

impl Error for IndexError {}

/// Errors from query construction and the query mini-language.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryError {
    /// A token of the query string could not be parsed.
    Parse {
        /// The offending token.
        token: String,
        /// What was wrong with it.
        reason: String,
    },
    /// Species code outside the configured species list.
    UnknownSpecies {
        /// The offending code.
        code: u32,
    },
    /// Type code that names no life stage.
    UnknownType {
        /// The offending code.
        code: u32,
    },
    /// The type list names a stage that is never indexed.
    UnindexedType {
        /// The offending stage.
        tree_type: TreeType,
    },
    /// The type criterion is empty.
    EmptyTypeMask,
    /// The species criterion is empty.
    EmptySpeciesSet,
    /// Radius is negative or not finite.
    InvalidRadius {
        /// The offending radius.
        radius: f32,
    },
    /// Minimum height is not finite.
    InvalidHeight {
        /// The offending height.
        height: f32,
    },
    /// Anchor point of a distance search is outside the plot.
    AnchorOutOfPlot {
        /// X coordinate.
        x: f32,
        /// Y coordinate.
        y: f32,
    },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { token, reason } => write!(f, "bad query token '{token}': {reason}"),
            Self::UnknownSpecies { code } => write!(f, "unknown species code {code}"),
            Self::UnknownType { code } => write!(f, "unknown type code {code}"),
            Self::UnindexedType { tree_type } => {
                write!(f, "{tree_type} trees are not indexed and cannot be searched")
            }
            Self::EmptyTypeMask => write!(f, "type criterion is empty"),
            Self::EmptySpeciesSet => write!(f, "species criterion is empty"),
            Self::InvalidRadius { radius } => {
                write!(f, "radius must be finite and non-negative, got {radius}")
            }
            Self::InvalidHeight { height } => {
                write!(f, "minimum height must be finite, got {height}")
            }
            Self::AnchorOutOfPlot { x, y } => {
                write!(f, "search anchor ({x}, {y}) is outside the plot")
            }
        }
    }
}

impl Error for QueryError {}

/// Errors from tree creation, transition, and kill.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleError {
    /// Species id outside the configured species list.
    UnknownSpecies {
        /// The offending species.
        species: SpeciesId,
    },
    /// Trees of this type cannot be created directly.
    NotCreatable {
        /// The rejected stage.
        tree_type: TreeType,
    },
    /// The requested stage change is not a legal transition.
    InvalidTransition {
        /// Current stage.
        from: TreeType,
        /// Requested stage.
        to: TreeType,
    },
    /// A size value is negative or not finite.
    InvalidSize {
        /// The offending value.
        value: f32,
    },
    /// Indexing the tree failed.
    Index(IndexError),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSpecies { species } => write!(f, "unknown species {species}"),
            Self::NotCreatable { tree_type } => {
                write!(f, "{tree_type} trees cannot be created directly")
            }
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid life-stage transition {from} -> {to}")
            }
            Self::InvalidSize { value } => {
                write!(f, "size must be finite and non-negative, got {value}")
            }
            Self::Index(e) => write!(f, "index: {e}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IndexError> for LifecycleError {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}
