//! Population builders for tests and benchmarks.

use thicket_core::{SpeciesId, TreeType};
use thicket_index::TreeHandle;
use thicket_population::{Population, PopulationConfig, SpeciesParams};
use thicket_space::TorusPlot;

use crate::{LinearAllometry, RecordingArchive};

/// Configuration with `species` default-parameter species named
/// `species-0`, `species-1`, ...
pub fn config(species: u16) -> PopulationConfig {
    PopulationConfig {
        species: (0..species)
            .map(|i| SpeciesParams::named(format!("species-{i}")))
            .collect(),
        ..Default::default()
    }
}

/// Population on an `x_len` by `y_len` torus with [`LinearAllometry`].
///
/// # Panics
///
/// Panics if the plot or configuration is invalid.
pub fn population(x_len: f32, y_len: f32, species: u16) -> Population {
    from_config(x_len, y_len, config(species))
}

/// Population built from an explicit configuration.
pub fn from_config(x_len: f32, y_len: f32, config: PopulationConfig) -> Population {
    Population::builder(config)
        .plot(TorusPlot::new(x_len, y_len).expect("valid plot"))
        .allometry(LinearAllometry::default())
        .build()
        .expect("valid population")
}

/// Population whose killed trees land in the returned archive.
pub fn recorded(
    x_len: f32,
    y_len: f32,
    config: PopulationConfig,
) -> (Population, RecordingArchive) {
    let archive = RecordingArchive::new();
    let population = Population::builder(config)
        .plot(TorusPlot::new(x_len, y_len).expect("valid plot"))
        .allometry(LinearAllometry::default())
        .archive(archive.clone())
        .build()
        .expect("valid population");
    (population, archive)
}

/// Plant `count` adults of `dbh` cm along the diagonal, cycling species.
pub fn adult_diagonal(population: &mut Population, count: usize, dbh: f32) -> Vec<TreeHandle> {
    let x_len = population.plot().x_len();
    let y_len = population.plot().y_len();
    let species = population.species_count();
    (0..count)
        .map(|i| {
            let t = i as f32 / count as f32;
            population
                .create(
                    t * x_len,
                    t * y_len,
                    SpeciesId((i % species as usize) as u16),
                    TreeType::Adult,
                    dbh,
                )
                .expect("adult fits the plot")
        })
        .collect()
}
