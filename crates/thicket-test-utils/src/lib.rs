//! Test utilities and fixtures for Thicket development.
//!
//! Provides a proportional [`LinearAllometry`], a [`RecordingArchive`]
//! that keeps every killed tree for inspection, and population builders in
//! [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::{Arc, Mutex, MutexGuard};

use thicket_core::{Allometry, SpeciesId};
use thicket_population::{DeadTree, DeadTreeArchive};

/// Allometry where every dimension is proportional to `Diam10`.
///
/// `Height = height_per_diam10 * Diam10` and `DBH = dbh_per_diam10 * Diam10`
/// for every species. The defaults (1.0 and 0.8) keep a fresh seedling
/// (`Diam10` 0.5) below the default seedling height limit and make a
/// sapling of DBH 8 exactly 10 m tall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearAllometry {
    pub height_per_diam10: f32,
    pub dbh_per_diam10: f32,
}

impl Default for LinearAllometry {
    fn default() -> Self {
        Self {
            height_per_diam10: 1.0,
            dbh_per_diam10: 0.8,
        }
    }
}

impl Allometry for LinearAllometry {
    fn height_from_dbh(&self, species: SpeciesId, dbh: f32) -> f32 {
        self.height_from_diam10(species, self.diam10_from_dbh(species, dbh))
    }

    fn height_from_diam10(&self, _species: SpeciesId, diam10: f32) -> f32 {
        self.height_per_diam10 * diam10
    }

    fn dbh_from_diam10(&self, _species: SpeciesId, diam10: f32) -> f32 {
        self.dbh_per_diam10 * diam10
    }

    fn diam10_from_dbh(&self, _species: SpeciesId, dbh: f32) -> f32 {
        dbh / self.dbh_per_diam10
    }

    fn dbh_from_height(&self, species: SpeciesId, height: f32) -> f32 {
        self.dbh_from_diam10(species, self.diam10_from_height(species, height))
    }

    fn diam10_from_height(&self, _species: SpeciesId, height: f32) -> f32 {
        height / self.height_per_diam10
    }
}

/// Archive that keeps every dead tree it receives.
///
/// Clones share the same storage, so a test can hand one clone to the
/// population and read the other.
#[derive(Clone, Debug, Default)]
pub struct RecordingArchive {
    dead: Arc<Mutex<Vec<DeadTree>>>,
}

impl RecordingArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// The trees archived so far, oldest first.
    pub fn dead(&self) -> MutexGuard<'_, Vec<DeadTree>> {
        self.dead.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.dead().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dead().is_empty()
    }
}

impl DeadTreeArchive for RecordingArchive {
    fn archive(&mut self, dead: DeadTree) {
        self.dead().push(dead);
    }
}

/// Install a `tracing` subscriber for tests, honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
