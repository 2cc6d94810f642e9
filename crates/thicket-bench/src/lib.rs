//! Benchmark profiles for the Thicket tree population store.
//!
//! - [`reference_profile`]: 200x200 m plot with 10K trees
//! - [`stress_profile`]: 1000x1000 m plot with 250K trees
//! - [`populate`]: deterministic stand generation via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thicket_core::{SpeciesId, TreeType};
use thicket_index::{IndexConfig, TreeHandle};
use thicket_population::{Population, PopulationConfig, SpeciesParams};
use thicket_space::TorusPlot;
use thicket_test_utils::LinearAllometry;

/// Plot size, stand density, and index geometry of a benchmark run.
#[derive(Clone, Debug)]
pub struct StandProfile {
    pub x_len: f32,
    pub y_len: f32,
    pub trees: usize,
    pub species: u16,
    pub index: IndexConfig,
}

/// 200x200 m, 10K trees of 4 species, default index.
pub fn reference_profile() -> StandProfile {
    StandProfile {
        x_len: 200.0,
        y_len: 200.0,
        trees: 10_000,
        species: 4,
        index: IndexConfig::default(),
    }
}

/// 1000x1000 m, 250K trees of 8 species, 16 m cells.
pub fn stress_profile() -> StandProfile {
    StandProfile {
        x_len: 1000.0,
        y_len: 1000.0,
        trees: 250_000,
        species: 8,
        index: IndexConfig {
            cell_length: 16,
            ..IndexConfig::default()
        },
    }
}

/// Build a population for `profile` and plant its trees.
///
/// Stage mix is roughly 30% seedlings, 30% saplings, 35% adults, and 5%
/// snags, placed uniformly at random. The same seed always yields the same
/// stand.
pub fn populate(profile: &StandProfile, seed: u64) -> (Population, Vec<TreeHandle>) {
    let config = PopulationConfig {
        species: (0..profile.species)
            .map(|i| SpeciesParams::named(format!("species-{i}")))
            .collect(),
        index: profile.index.clone(),
        seed,
        ..Default::default()
    };
    let mut population = Population::builder(config)
        .plot(TorusPlot::new(profile.x_len, profile.y_len).expect("profile plot is valid"))
        .allometry(LinearAllometry::default())
        .build()
        .expect("profile config is valid");

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut trees = Vec::with_capacity(profile.trees);
    for _ in 0..profile.trees {
        let x = rng.gen_range(0.0..profile.x_len);
        let y = rng.gen_range(0.0..profile.y_len);
        let species = SpeciesId(rng.gen_range(0..profile.species));
        let tree_type = match rng.gen_range(0..20) {
            0..=5 => TreeType::Seedling,
            6..=11 => TreeType::Sapling,
            12..=18 => TreeType::Adult,
            _ => TreeType::Snag,
        };
        let tree = population
            .create(x, y, species, tree_type, 0.0)
            .expect("random tree fits the plot");
        trees.push(tree);
    }
    population.end_timestep();
    (population, trees)
}
