//! Collaborator traits: plot geometry and allometry.
//!
//! The tree store does not own distance computation or allometric formulas.
//! It calls into implementations of these traits supplied at construction.

use crate::id::SpeciesId;

/// Geometry of the simulated plot.
///
/// The plot is a torus: it wraps at both edges, and distances are the
/// minimum over all wrapped offsets. Coordinates are in plot units
/// (metres) with `0 <= x < x_len()` and `0 <= y < y_len()`.
pub trait Plot: Send {
    /// Plot extent along X.
    fn x_len(&self) -> f32;

    /// Plot extent along Y.
    fn y_len(&self) -> f32;

    /// Torus-corrected Euclidean distance between two points.
    fn distance(&self, from_x: f32, from_y: f32, to_x: f32, to_y: f32) -> f32;

    /// Whether `(x, y)` lies inside the plot.
    fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.x_len() && y < self.y_len()
    }
}

/// Allometric relationships between a tree's size dimensions.
///
/// All diameters are in centimetres and heights in metres. Implementations
/// are species-specific and must return finite, non-negative values for
/// finite, non-negative inputs.
pub trait Allometry: Send {
    /// Height of a tree with the given diameter at breast height.
    fn height_from_dbh(&self, species: SpeciesId, dbh: f32) -> f32;

    /// Height of a tree with the given diameter at 10 cm.
    fn height_from_diam10(&self, species: SpeciesId, diam10: f32) -> f32;

    /// Diameter at breast height from diameter at 10 cm.
    fn dbh_from_diam10(&self, species: SpeciesId, diam10: f32) -> f32;

    /// Diameter at 10 cm from diameter at breast height.
    fn diam10_from_dbh(&self, species: SpeciesId, dbh: f32) -> f32;

    /// Diameter at breast height of a tree of the given height.
    fn dbh_from_height(&self, species: SpeciesId, height: f32) -> f32;

    /// Diameter at 10 cm of a tree of the given height.
    fn diam10_from_height(&self, species: SpeciesId, height: f32) -> f32;
}
