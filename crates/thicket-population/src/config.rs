//! Population configuration, validation, and error types.
//!
//! [`PopulationConfig`] is the builder input for a
//! [`Population`](crate::Population). [`validate()`](PopulationConfig::validate)
//! checks structural invariants at construction.

use std::error::Error;
use std::fmt;

use thicket_core::{SchemaError, SpeciesId};
use thicket_index::{IndexConfig, IndexConfigError};

// ── SpeciesParams ──────────────────────────────────────────────────

/// Per-species life-stage thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesParams {
    /// Human-readable species name, for logs.
    pub name: String,
    /// Diameter at 10 cm of a freshly germinated seedling (cm). Default: 0.5.
    pub new_seedling_diam10: f32,
    /// Seedlings taller than this become saplings (m). Default: 1.35.
    pub max_seedling_height: f32,
    /// Saplings reaching this DBH become adults (cm). Default: 10.0.
    pub min_adult_dbh: f32,
    /// Whether harvested saplings and adults leave a stump. Default: true.
    pub makes_stumps: bool,
}

impl SpeciesParams {
    /// Parameters with defaults and the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Default for SpeciesParams {
    fn default() -> Self {
        Self {
            name: String::new(),
            new_seedling_diam10: 0.5,
            max_seedling_height: 1.35,
            min_adult_dbh: 10.0,
            makes_stumps: true,
        }
    }
}

// ── PopulationConfig ───────────────────────────────────────────────

/// Everything needed to build a population besides its collaborators.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulationConfig {
    /// One entry per species; a species id is its position here.
    pub species: Vec<SpeciesParams>,
    /// Spatial-height index geometry.
    pub index: IndexConfig,
    /// Whether adults killed by natural causes stand on as snags.
    /// Default: true.
    pub make_snags: bool,
    /// Seed of the generator used for randomized default sizes.
    /// Default: 0.
    pub seed: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            species: vec![SpeciesParams::named("species-0")],
            index: IndexConfig::default(),
            make_snags: true,
            seed: 0,
        }
    }
}

impl PopulationConfig {
    /// Largest number of species.
    pub const MAX_SPECIES: usize = u16::MAX as usize;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.species.is_empty() {
            return Err(ConfigError::NoSpecies);
        }
        if self.species.len() > Self::MAX_SPECIES {
            return Err(ConfigError::TooManySpecies {
                count: self.species.len(),
            });
        }
        for (i, params) in self.species.iter().enumerate() {
            let species = SpeciesId(i as u16);
            let checks = [
                ("new_seedling_diam10", params.new_seedling_diam10),
                ("max_seedling_height", params.max_seedling_height),
                ("min_adult_dbh", params.min_adult_dbh),
            ];
            for (field, value) in checks {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ConfigError::InvalidSpecies {
                        species,
                        reason: format!("{field} must be finite and positive, got {value}"),
                    });
                }
            }
        }
        self.index.validate().map_err(ConfigError::Index)
    }

    /// Number of configured species.
    pub fn species_count(&self) -> u16 {
        self.species.len() as u16
    }

    /// Parameters of one species.
    ///
    /// # Panics
    ///
    /// Panics if `species` is not configured.
    pub fn params(&self, species: SpeciesId) -> &SpeciesParams {
        &self.species[species.index()]
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building a population.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The species list is empty.
    NoSpecies,
    /// More species than ids can address.
    TooManySpecies {
        /// The configured count.
        count: usize,
    },
    /// A species parameter is out of range.
    InvalidSpecies {
        /// The offending species.
        species: SpeciesId,
        /// Which parameter and why.
        reason: String,
    },
    /// Index geometry is invalid.
    Index(IndexConfigError),
    /// A required collaborator was not supplied to the builder.
    MissingCollaborator {
        /// Which collaborator.
        name: &'static str,
    },
    /// Registering the built-in attributes failed.
    Schema(SchemaError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSpecies => write!(f, "at least one species is required"),
            Self::TooManySpecies { count } => write!(
                f,
                "{count} species configured, maximum is {}",
                PopulationConfig::MAX_SPECIES
            ),
            Self::InvalidSpecies { species, reason } => {
                write!(f, "species {species}: {reason}")
            }
            Self::Index(e) => write!(f, "index config: {e}"),
            Self::MissingCollaborator { name } => write!(f, "no {name} supplied"),
            Self::Schema(e) => write!(f, "built-in attributes: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Index(e) => Some(e),
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IndexConfigError> for ConfigError {
    fn from(e: IndexConfigError) -> Self {
        Self::Index(e)
    }
}

impl From<SchemaError> for ConfigError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}
