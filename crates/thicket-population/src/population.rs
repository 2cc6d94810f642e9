//! The population: sole owner of trees, schema, and index.
//!
//! Behaviors talk to a [`Population`] only: they register attributes during
//! setup, open cursors, read and write attributes through handles, and
//! call the lifecycle operations. Position and size writes are routed
//! back into the index so it never drifts from the records.

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thicket_core::{
    Allometry, AttrCode, BoolCode, FloatCode, IntCode, LifecycleError, Plot, QueryError,
    SchemaError, SpeciesId, StringCode, TreeType, TypeMask,
};
use thicket_index::{QuerySpec, ResortStats, TreeCursor, TreeHandle, TreeIndex, TreeRecord};
use thicket_schema::SchemaRegistry;
use tracing::{debug, info};

use crate::builtin::{BuiltinCodes, Dimension};
use crate::config::{ConfigError, PopulationConfig};
use crate::death::{DeadTreeArchive, NullArchive};
use crate::query;

/// Lifecycle phase of a population.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Attributes may be registered.
    Setup,
    /// The schema is frozen.
    Running,
}

/// What [`Population::end_timestep`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimestepReport {
    /// Resort work, if deferred writes were pending.
    pub resort: Option<ResortStats>,
    /// Stumps discarded.
    pub stumps_cleared: usize,
    /// Snags whose age was advanced.
    pub snags_aged: usize,
}

// ── Builder ────────────────────────────────────────────────────────

/// Wires configuration and collaborators into a [`Population`].
///
/// # Examples
///
/// ```ignore
/// let population = Population::builder(config)
///     .plot(TorusPlot::new(100.0, 100.0)?)
///     .allometry(my_allometry)
///     .build()?;
/// ```
pub struct PopulationBuilder {
    config: PopulationConfig,
    plot: Option<Box<dyn Plot>>,
    allometry: Option<Box<dyn Allometry>>,
    archive: Box<dyn DeadTreeArchive>,
}

impl PopulationBuilder {
    /// Plot geometry. Required.
    pub fn plot(mut self, plot: impl Plot + 'static) -> Self {
        self.plot = Some(Box::new(plot));
        self
    }

    /// Allometric relationships. Required.
    pub fn allometry(mut self, allometry: impl Allometry + 'static) -> Self {
        self.allometry = Some(Box::new(allometry));
        self
    }

    /// Receiver of killed trees. Default: [`NullArchive`].
    pub fn archive(mut self, archive: impl DeadTreeArchive + 'static) -> Self {
        self.archive = Box::new(archive);
        self
    }

    /// Validate the configuration and build the population.
    ///
    /// Built-in attributes are registered here, so they take the lowest
    /// codes of every schema.
    pub fn build(self) -> Result<Population, ConfigError> {
        self.config.validate()?;
        let plot = self
            .plot
            .ok_or(ConfigError::MissingCollaborator { name: "plot" })?;
        let allometry = self
            .allometry
            .ok_or(ConfigError::MissingCollaborator { name: "allometry" })?;
        let (x_len, y_len) = (plot.x_len(), plot.y_len());
        let index = TreeIndex::new(self.config.index.clone(), plot)?;
        let mut schema = SchemaRegistry::new(self.config.species_count());
        let builtins = BuiltinCodes::register(&mut schema)?;
        info!(
            species = self.config.species.len(),
            x_len,
            y_len,
            make_snags = self.config.make_snags,
            seed = self.config.seed,
            "population created"
        );
        Ok(Population {
            rng: ChaCha8Rng::seed_from_u64(self.config.seed),
            config: self.config,
            schema,
            index,
            allometry,
            archive: self.archive,
            builtins,
            phase: Phase::Setup,
            stumps: Vec::new(),
            timestep: 0,
        })
    }
}

// ── Population ─────────────────────────────────────────────────────

/// Owner of every tree of a simulation.
pub struct Population {
    pub(crate) config: PopulationConfig,
    pub(crate) schema: SchemaRegistry,
    pub(crate) index: TreeIndex,
    pub(crate) allometry: Box<dyn Allometry>,
    pub(crate) archive: Box<dyn DeadTreeArchive>,
    pub(crate) builtins: BuiltinCodes,
    pub(crate) phase: Phase,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) stumps: Vec<TreeRecord>,
    pub(crate) timestep: u64,
}

impl Population {
    /// Start building a population from `config`.
    pub fn builder(config: PopulationConfig) -> PopulationBuilder {
        PopulationBuilder {
            config,
            plot: None,
            allometry: None,
            archive: Box::new(NullArchive),
        }
    }

    /// The configuration the population was built with.
    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of configured species.
    pub fn species_count(&self) -> u16 {
        self.config.species_count()
    }

    /// Number of timestep boundaries passed.
    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    /// The attribute schema.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Codes of the built-in attributes.
    pub fn builtins(&self) -> &BuiltinCodes {
        &self.builtins
    }

    /// The spatial-height index, read-only.
    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// The plot collaborator.
    pub fn plot(&self) -> &dyn Plot {
        self.index.plot()
    }

    /// Number of live (indexed) trees.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the population holds no live trees.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether `tree` names a live tree.
    pub fn contains(&self, tree: TreeHandle) -> bool {
        self.index.contains(tree)
    }

    /// Record of a live tree. Panics on a stale handle.
    pub fn record(&self, tree: TreeHandle) -> &TreeRecord {
        self.index.record(tree)
    }

    /// Species of a live tree.
    pub fn species(&self, tree: TreeHandle) -> SpeciesId {
        self.record(tree).species()
    }

    /// Life stage of a live tree.
    pub fn tree_type(&self, tree: TreeHandle) -> TreeType {
        self.record(tree).tree_type()
    }

    /// Stumps made this timestep. They are not indexed and vanish at the
    /// next [`end_timestep`](Self::end_timestep).
    pub fn stumps(&self) -> &[TreeRecord] {
        &self.stumps
    }

    // ── Setup ────────────────────────────────────────────────────

    /// Register a typed attribute for (species, type).
    pub fn register<C: AttrCode>(
        &mut self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<C, SchemaError> {
        self.schema.register(label, species, tree_type)
    }

    /// Register an integer attribute.
    pub fn register_int(
        &mut self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<IntCode, SchemaError> {
        self.register(label, species, tree_type)
    }

    /// Register a float attribute.
    pub fn register_float(
        &mut self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<FloatCode, SchemaError> {
        self.register(label, species, tree_type)
    }

    /// Register a boolean attribute.
    pub fn register_bool(
        &mut self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<BoolCode, SchemaError> {
        self.register(label, species, tree_type)
    }

    /// Register a string attribute.
    pub fn register_string(
        &mut self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<StringCode, SchemaError> {
        self.register(label, species, tree_type)
    }

    /// Look up an attribute code by label.
    pub fn lookup<C: AttrCode>(
        &self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Option<C> {
        self.schema.lookup(label, species, tree_type)
    }

    /// Freeze the schema and enter the run phase. Called implicitly by the
    /// first [`create`](Self::create).
    pub fn begin_run(&mut self) {
        if self.phase == Phase::Setup {
            self.schema.freeze();
            self.phase = Phase::Running;
            info!(timestep = self.timestep, "population running");
        }
    }

    // ── Attribute access ─────────────────────────────────────────

    /// Read an integer attribute.
    pub fn get_int(&self, tree: TreeHandle, code: IntCode) -> i32 {
        self.record(tree).int(code)
    }

    /// Read a float attribute.
    pub fn get_float(&self, tree: TreeHandle, code: FloatCode) -> f32 {
        self.record(tree).float(code)
    }

    /// Read a boolean attribute.
    pub fn get_bool(&self, tree: TreeHandle, code: BoolCode) -> bool {
        self.record(tree).bool(code)
    }

    /// Read a string attribute.
    pub fn get_string(&self, tree: TreeHandle, code: StringCode) -> &str {
        self.record(tree).string(code)
    }

    /// Write an integer attribute.
    pub fn set_int(&mut self, tree: TreeHandle, code: IntCode, value: i32) {
        self.index.record_mut(tree).set_int(code, value);
    }

    /// Write a boolean attribute.
    pub fn set_bool(&mut self, tree: TreeHandle, code: BoolCode, value: bool) {
        self.index.record_mut(tree).set_bool(code, value);
    }

    /// Write a string attribute.
    pub fn set_string(&mut self, tree: TreeHandle, code: StringCode, value: impl Into<String>) {
        self.index.record_mut(tree).set_string(code, value);
    }

    /// Write a float attribute.
    ///
    /// Position and size attributes go through
    /// [`set_float_with`](Self::set_float_with) with a deferred index
    /// update and allometry enabled.
    pub fn set_float(
        &mut self,
        tree: TreeHandle,
        code: FloatCode,
        value: f32,
    ) -> Result<(), LifecycleError> {
        self.set_float_with(tree, code, value, false, true)
    }

    /// Write a float attribute, choosing how position and size writes
    /// propagate.
    ///
    /// `update_now` relinks the tree in the index at once instead of at
    /// the next resort. `update_allometry` recomputes dependent size
    /// dimensions and promotes the tree if it crossed a stage threshold.
    /// Both flags are ignored for non-geometric attributes.
    pub fn set_float_with(
        &mut self,
        tree: TreeHandle,
        code: FloatCode,
        value: f32,
        update_now: bool,
        update_allometry: bool,
    ) -> Result<(), LifecycleError> {
        let record = self.record(tree);
        let codes = self.builtins.get(record.species(), record.tree_type());
        match codes.dimension(code) {
            None => {
                self.index.record_mut(tree).set_float(code, value);
                Ok(())
            }
            Some(Dimension::X | Dimension::Y) => self.set_position(tree, code, value, update_now),
            Some(_) => self.set_size_attribute(tree, code, value, update_now, update_allometry),
        }
    }

    fn set_position(
        &mut self,
        tree: TreeHandle,
        code: FloatCode,
        value: f32,
        update_now: bool,
    ) -> Result<(), LifecycleError> {
        let record = self.index.record_mut(tree);
        let old = record.float(code);
        record.set_float(code, value);
        if let Err(e) = self.index.reposition(tree, update_now) {
            self.index.record_mut(tree).set_float(code, old);
            return Err(e.into());
        }
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Open a cursor over `spec`.
    pub fn find(&self, spec: QuerySpec) -> Result<TreeCursor, QueryError> {
        if let QuerySpec::TypeSpecies { species, .. } = &spec {
            if let Some(bad) = species.iter().find(|s| s.0 >= self.species_count()) {
                return Err(QueryError::UnknownSpecies { code: bad.0 as u32 });
            }
        }
        self.index.open(spec)
    }

    /// Parse a query string and open a cursor over it.
    pub fn find_str(&self, query: &str) -> Result<TreeCursor, QueryError> {
        self.find(query::parse(query, self.species_count())?)
    }

    /// Handles of all live trees of the given stages, collected eagerly.
    pub fn collect(&self, types: TypeMask) -> Result<Vec<TreeHandle>, QueryError> {
        let mut cursor = self.find(QuerySpec::Type(types))?;
        Ok(cursor.iter(self).collect())
    }

    // ── Timestep boundary ────────────────────────────────────────

    /// Close the current timestep.
    ///
    /// Resorts the index if deferred writes are pending, discards stumps,
    /// recycles the slots of killed trees, invalidates every open cursor,
    /// and ages snags by one.
    pub fn end_timestep(&mut self) -> TimestepReport {
        let resort = self.index.end_timestep();
        let stumps_cleared = self.stumps.len();
        self.stumps.clear();
        self.timestep += 1;

        let mut snags_aged = 0;
        if let Ok(mut cursor) = self.index.open(QuerySpec::Type(TypeMask::only(TreeType::Snag))) {
            while let Some(tree) = cursor.next(&self.index) {
                let record = self.index.record(tree);
                if let Some(age) = self.builtins.get(record.species(), TreeType::Snag).age {
                    let record = self.index.record_mut(tree);
                    let next = record.int(age).saturating_add(1);
                    record.set_int(age, next);
                    snags_aged += 1;
                }
            }
        }
        debug!(
            timestep = self.timestep,
            live = self.index.len(),
            stumps_cleared,
            snags_aged,
            resorted = resort.is_some(),
            "timestep closed"
        );
        TimestepReport {
            resort,
            stumps_cleared,
            snags_aged,
        }
    }

    /// Check index invariants. Intended for tests.
    pub fn verify(&self) -> Result<(), String> {
        self.index.verify()
    }
}

impl AsRef<TreeIndex> for Population {
    fn as_ref(&self) -> &TreeIndex {
        &self.index
    }
}

impl fmt::Debug for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Population")
            .field("phase", &self.phase)
            .field("timestep", &self.timestep)
            .field("index", &self.index)
            .field("stumps", &self.stumps.len())
            .finish_non_exhaustive()
    }
}
