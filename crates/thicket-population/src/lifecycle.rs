//! Tree creation, growth, stage transitions, and death.

use rand::Rng;
use thicket_core::{Allometry, AttrKind, FloatCode, LifecycleError, SpeciesId, TreeType};
use thicket_index::{TreeHandle, TreeRecord};
use tracing::debug;

use crate::builtin::{Dimension, StageCodes};
use crate::death::{DeadTree, DeathReason, KillOutcome};
use crate::population::Population;

fn put(record: &mut TreeRecord, code: Option<FloatCode>, value: f32) {
    if let Some(code) = code {
        record.set_float(code, value.max(0.0));
    }
}

/// Recompute the size dimensions that depend on `source` for the stage
/// described by `codes`.
fn derive_sizes(
    allometry: &dyn Allometry,
    codes: &StageCodes,
    record: &mut TreeRecord,
    source: Dimension,
) {
    let species = record.species();
    match source {
        Dimension::Diam10 => {
            let Some(d10) = codes.diam10.map(|c| record.float(c)) else {
                return;
            };
            put(record, codes.geometry.height, allometry.height_from_diam10(species, d10));
            put(record, codes.dbh, allometry.dbh_from_diam10(species, d10));
        }
        Dimension::Dbh => {
            let Some(dbh) = codes.dbh.map(|c| record.float(c)) else {
                return;
            };
            put(record, codes.geometry.height, allometry.height_from_dbh(species, dbh));
            put(record, codes.diam10, allometry.diam10_from_dbh(species, dbh));
        }
        Dimension::Height => {
            let Some(height) = codes.geometry.height.map(|c| record.float(c)) else {
                return;
            };
            put(record, codes.dbh, allometry.dbh_from_height(species, height));
            put(record, codes.diam10, allometry.diam10_from_height(species, height));
        }
        Dimension::X | Dimension::Y => {}
    }
}

fn check_size(value: f32) -> Result<(), LifecycleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(LifecycleError::InvalidSize { value })
    }
}

impl Population {
    /// Plant a tree.
    ///
    /// `size` is the stage's size attribute: `Diam10` for seedlings, `DBH`
    /// for saplings, adults, and snags; it is ignored for seeds. Zero asks
    /// for a randomized default. Height and the other dimensions follow
    /// from the allometry, and a tree already past a stage threshold is
    /// promoted at once.
    ///
    /// The first call freezes the schema.
    pub fn create(
        &mut self,
        x: f32,
        y: f32,
        species: SpeciesId,
        tree_type: TreeType,
        size: f32,
    ) -> Result<TreeHandle, LifecycleError> {
        if species.0 >= self.species_count() {
            return Err(LifecycleError::UnknownSpecies { species });
        }
        if !tree_type.is_indexed() {
            return Err(LifecycleError::NotCreatable { tree_type });
        }
        check_size(size)?;
        self.begin_run();

        let codes = *self.builtins.get(species, tree_type);
        let mut record = self.blank_record(species, tree_type);
        record.set_float(codes.geometry.x, x);
        record.set_float(codes.geometry.y, y);
        if let Some(size_code) = codes.size(tree_type) {
            let size = if size == 0.0 {
                self.default_size(species, tree_type)
            } else {
                size
            };
            record.set_float(size_code, size);
            let source = if tree_type == TreeType::Seedling {
                Dimension::Diam10
            } else {
                Dimension::Dbh
            };
            derive_sizes(self.allometry.as_ref(), &codes, &mut record, source);
        }
        if let Some(dead) = codes.dead {
            record.set_int(dead, DeathReason::Natural.code());
        }

        let tree = self.index.insert(record)?;
        debug!(%tree, %species, %tree_type, x, y, "tree created");
        self.promote(tree)?;
        Ok(tree)
    }

    /// Kill a tree.
    ///
    /// - [`Remove`](DeathReason::Remove) deletes it.
    /// - [`Harvest`](DeathReason::Harvest) leaves a stump when the species
    ///   forms stumps and the tree is a sapling or adult; otherwise deletes.
    /// - Any other reason turns an adult into a snag in place (same handle,
    ///   `Dead` set to the reason, `Age` zero) when snags are enabled;
    ///   otherwise deletes.
    ///
    /// The archive receives a copy of the tree as it was before death.
    pub fn kill(
        &mut self,
        tree: TreeHandle,
        reason: DeathReason,
    ) -> Result<KillOutcome, LifecycleError> {
        let record = self.index.record(tree);
        let tree_type = record.tree_type();
        let makes_stumps = self.config.params(record.species()).makes_stumps;
        let dead = DeadTree {
            handle: tree,
            record: record.clone(),
            reason,
            timestep: self.timestep,
        };

        let outcome = match reason {
            DeathReason::Harvest
                if makes_stumps && matches!(tree_type, TreeType::Sapling | TreeType::Adult) =>
            {
                self.make_stump(tree);
                KillOutcome::Stumped
            }
            r if r.leaves_snag() && tree_type == TreeType::Adult && self.config.make_snags => {
                self.make_snag(tree, r)?;
                KillOutcome::Snagged
            }
            _ => {
                self.index.remove(tree);
                KillOutcome::Removed
            }
        };
        self.archive.archive(dead);
        debug!(%tree, %tree_type, %reason, ?outcome, "tree killed");
        Ok(outcome)
    }

    /// Move a tree to another life stage.
    ///
    /// Attributes whose label exists in both schemas are carried over;
    /// the rest are dropped. Seedlings gain a `DBH` computed from
    /// `Diam10`. The tree is relinked in the index immediately.
    ///
    /// Transitioning to [`TreeType::Stump`] removes the tree from the
    /// index and files it with this timestep's stumps; the handle is
    /// stale afterwards.
    pub fn transition(&mut self, tree: TreeHandle, to: TreeType) -> Result<(), LifecycleError> {
        let from = self.tree_type(tree);
        if !from.can_become(to) {
            return Err(LifecycleError::InvalidTransition { from, to });
        }
        if to == TreeType::Stump {
            self.make_stump(tree);
            return Ok(());
        }
        let next = self.retyped(self.index.record(tree).clone(), to);
        self.index.replace_record(tree, next)?;
        debug!(%tree, %from, %to, "tree transitioned");
        Ok(())
    }

    /// Write a size attribute.
    ///
    /// With `update_allometry` the dependent dimensions are recomputed and
    /// the tree is promoted if it crossed a threshold (seedling taller than
    /// `max_seedling_height`, sapling DBH at least `min_adult_dbh`). The
    /// tree is then repositioned, immediately when `update_now` is set.
    pub fn set_size_attribute(
        &mut self,
        tree: TreeHandle,
        code: FloatCode,
        value: f32,
        update_now: bool,
        update_allometry: bool,
    ) -> Result<(), LifecycleError> {
        check_size(value)?;
        let record = self.index.record(tree);
        let codes = *self.builtins.get(record.species(), record.tree_type());
        let record = self.index.record_mut(tree);
        record.set_float(code, value);
        let mut promoted = false;
        if update_allometry {
            if let Some(source) = codes.dimension(code) {
                derive_sizes(self.allometry.as_ref(), &codes, record, source);
            }
            promoted = self.promote(tree)?;
        }
        if !promoted {
            self.index.reposition(tree, update_now)?;
        }
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    /// Promote while the tree is past its stage threshold. Returns whether
    /// any promotion happened.
    fn promote(&mut self, tree: TreeHandle) -> Result<bool, LifecycleError> {
        let mut promoted = false;
        loop {
            let record = self.index.record(tree);
            let params = self.config.params(record.species());
            let codes = self.builtins.get(record.species(), record.tree_type());
            let next = match record.tree_type() {
                TreeType::Seedling if record.height() > params.max_seedling_height => {
                    TreeType::Sapling
                }
                TreeType::Sapling
                    if codes
                        .dbh
                        .is_some_and(|c| record.float(c) >= params.min_adult_dbh) =>
                {
                    TreeType::Adult
                }
                _ => return Ok(promoted),
            };
            self.transition(tree, next)?;
            promoted = true;
        }
    }

    /// Zeroed record sized by the current schema.
    fn blank_record(&self, species: SpeciesId, tree_type: TreeType) -> TreeRecord {
        let sizes = self
            .schema
            .schema(species, tree_type)
            .map_or([0; 4], |s| s.sizes());
        let geometry = self.builtins.get(species, tree_type).geometry;
        TreeRecord::new(species, tree_type, sizes, geometry)
    }

    /// Rebuild `record` for stage `to`, carrying matching attributes and
    /// filling in what the new stage needs.
    fn retyped(&self, record: TreeRecord, to: TreeType) -> TreeRecord {
        let species = record.species();
        let from = record.tree_type();
        let carry = AttrKind::ALL.map(|kind| self.schema.carry_over(kind, species, from, to));
        let sizes = self
            .schema
            .schema(species, to)
            .map_or([0; 4], |s| s.sizes());
        let codes = *self.builtins.get(species, to);
        let mut next = record.retyped(
            to,
            sizes,
            codes.geometry,
            [&carry[0][..], &carry[1][..], &carry[2][..], &carry[3][..]],
        );
        match (from, to) {
            (TreeType::Seed, TreeType::Seedling) => {
                if let Some(d10) = codes.diam10 {
                    next.set_float(d10, self.config.params(species).new_seedling_diam10);
                    derive_sizes(self.allometry.as_ref(), &codes, &mut next, Dimension::Diam10);
                }
            }
            (TreeType::Seedling, TreeType::Sapling) => {
                if let (Some(d10), Some(dbh)) = (codes.diam10, codes.dbh) {
                    let value = self.allometry.dbh_from_diam10(species, next.float(d10));
                    next.set_float(dbh, value.max(0.0));
                }
            }
            (_, TreeType::Snag) => {
                if let Some(age) = codes.age {
                    next.set_int(age, 0);
                }
                if let Some(dead) = codes.dead {
                    next.set_int(dead, DeathReason::Natural.code());
                }
            }
            _ => {}
        }
        next
    }

    fn make_stump(&mut self, tree: TreeHandle) {
        let record = self.index.remove(tree);
        let stump = self.retyped(record, TreeType::Stump);
        self.stumps.push(stump);
    }

    fn make_snag(&mut self, tree: TreeHandle, reason: DeathReason) -> Result<(), LifecycleError> {
        let mut snag = self.retyped(self.index.record(tree).clone(), TreeType::Snag);
        let codes = self.builtins.get(snag.species(), TreeType::Snag);
        if let Some(dead) = codes.dead {
            snag.set_int(dead, reason.code());
        }
        self.index.replace_record(tree, snag)?;
        Ok(())
    }

    /// Randomized size for `create(.., 0.0)`.
    fn default_size(&mut self, species: SpeciesId, tree_type: TreeType) -> f32 {
        let params = self.config.params(species);
        let (base, range) = match tree_type {
            TreeType::Seedling => (params.new_seedling_diam10, 0.5..1.0),
            TreeType::Sapling => (params.min_adult_dbh, 0.5..1.0),
            TreeType::Adult | TreeType::Snag => (params.min_adult_dbh, 1.0..2.0),
            TreeType::Seed | TreeType::Stump => return 0.0,
        };
        base * self.rng.gen_range(range)
    }
}
