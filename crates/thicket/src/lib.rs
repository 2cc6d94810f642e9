//! Thicket: a tree population store for individual-based forest simulations.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Thicket sub-crates. For most users, adding `thicket` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use thicket::prelude::*;
//!
//! // Every dimension proportional to the diameter at 10 cm.
//! struct Proportional;
//! impl Allometry for Proportional {
//!     fn height_from_dbh(&self, _: SpeciesId, dbh: f32) -> f32 { dbh * 1.25 }
//!     fn height_from_diam10(&self, _: SpeciesId, d10: f32) -> f32 { d10 }
//!     fn dbh_from_diam10(&self, _: SpeciesId, d10: f32) -> f32 { d10 * 0.8 }
//!     fn diam10_from_dbh(&self, _: SpeciesId, dbh: f32) -> f32 { dbh * 1.25 }
//!     fn dbh_from_height(&self, _: SpeciesId, h: f32) -> f32 { h * 0.8 }
//!     fn diam10_from_height(&self, _: SpeciesId, h: f32) -> f32 { h }
//! }
//!
//! let config = PopulationConfig {
//!     species: vec![SpeciesParams::named("beech")],
//!     ..Default::default()
//! };
//! let mut population = Population::builder(config)
//!     .plot(TorusPlot::new(100.0, 100.0).unwrap())
//!     .allometry(Proportional)
//!     .build()
//!     .unwrap();
//!
//! // Setup: behaviors register what they need.
//! let vigor = population
//!     .register_float("Vigor", SpeciesId(0), TreeType::Adult)
//!     .unwrap();
//!
//! // Run: the first tree freezes the schema.
//! let tree = population
//!     .create(99.5, 50.0, SpeciesId(0), TreeType::Adult, 24.0)
//!     .unwrap();
//! population.set_float(tree, vigor, 0.8).unwrap();
//!
//! // Neighbours taller than 20 m within 3 m, across the x seam.
//! let mut cursor = population
//!     .find_str("distance=3 FROM x=1,y=50::height=20")
//!     .unwrap();
//! let found: Vec<_> = cursor.iter(&population).collect();
//! assert_eq!(found, vec![tree]);
//!
//! population.end_timestep();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `thicket-core` | IDs, life stages, errors, collaborator traits |
//! | [`space`] | `thicket-space` | The torus plot |
//! | [`schema`] | `thicket-schema` | Attribute schema registry |
//! | [`index`] | `thicket-index` | Tree records, spatial-height index, cursors |
//! | [`population`] | `thicket-population` | Population, lifecycle, query strings |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`thicket-core`).
///
/// Contains attribute codes, [`types::TreeType`], the error enums, and the
/// collaborator traits [`types::Plot`] and [`types::Allometry`].
pub use thicket_core as types;

/// Plot geometry (`thicket-space`).
pub use thicket_space as space;

/// Attribute schema registry (`thicket-schema`).
///
/// Most users reach the registry through
/// [`population::Population::register`] instead.
pub use thicket_schema as schema;

/// Tree records, the spatial-height index, and cursors (`thicket-index`).
pub use thicket_index as index;

/// The population and its lifecycle operations (`thicket-population`).
pub use thicket_population as population;

/// Common imports for typical Thicket usage.
///
/// ```rust
/// use thicket::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use thicket_core::{
        Allometry, BoolCode, FloatCode, IntCode, Plot, SpeciesId, StringCode, TreeType, TypeMask,
    };

    // Errors
    pub use thicket_core::{IndexError, LifecycleError, QueryError, SchemaError};

    // Space
    pub use thicket_space::TorusPlot;

    // Index
    pub use thicket_index::{QuerySpec, TreeCursor, TreeHandle, TreeRecord};

    // Population
    pub use thicket_population::{
        ConfigError, DeadTree, DeadTreeArchive, DeathReason, KillOutcome, Population,
        PopulationConfig, SpeciesParams,
    };
}
