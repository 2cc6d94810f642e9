//! The attribute schema registry.
//!
//! Behaviors add typed per-tree attributes during setup by registering a
//! label for a (species, type) pair. Each registration returns a dense
//! code that is the only addressing mechanism used at run time.

use indexmap::IndexMap;
use smallvec::SmallVec;
use thicket_core::{AttrCode, AttrKind, SchemaError, SpeciesId, TreeType};
use tracing::{info, trace};

/// Attribute labels for one (species, type) pair, one list per kind.
///
/// The position of a label within its kind's list is its code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeSchema {
    labels: [Vec<String>; 4],
}

impl TypeSchema {
    /// Number of attributes of `kind`.
    pub fn count(&self, kind: AttrKind) -> usize {
        self.labels[kind.index()].len()
    }

    /// Labels of `kind` in code order.
    pub fn labels(&self, kind: AttrKind) -> &[String] {
        &self.labels[kind.index()]
    }

    /// Slot counts for all kinds, in [`AttrKind::ALL`] order.
    pub fn sizes(&self) -> [usize; 4] {
        [
            self.labels[0].len(),
            self.labels[1].len(),
            self.labels[2].len(),
            self.labels[3].len(),
        ]
    }

    fn lookup(&self, kind: AttrKind, label: &str) -> Option<usize> {
        // Latest registration of a duplicated label wins.
        self.labels[kind.index()].iter().rposition(|l| l == label)
    }
}

/// Source-slot to destination-slot pairs for one attribute kind.
pub type CarryOver = SmallVec<[(usize, usize); 16]>;

/// Registry of typed attribute labels per (species, type, kind).
///
/// Open for registration until [`freeze`](Self::freeze) is called when the
/// simulation enters its run phase; afterwards only lookups succeed.
///
/// # Examples
///
/// ```
/// use thicket_core::{FloatCode, SpeciesId, TreeType};
/// use thicket_schema::SchemaRegistry;
///
/// let mut reg = SchemaRegistry::new(2);
/// let light: FloatCode = reg.register("Light", SpeciesId(0), TreeType::Adult).unwrap();
/// assert_eq!(light, FloatCode(0));
/// assert_eq!(reg.lookup::<FloatCode>("Light", SpeciesId(0), TreeType::Adult), Some(light));
///
/// reg.freeze();
/// assert!(reg.register::<FloatCode>("Late", SpeciesId(0), TreeType::Adult).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct SchemaRegistry {
    species_count: u16,
    tables: IndexMap<(SpeciesId, TreeType), TypeSchema>,
    frozen: bool,
}

impl SchemaRegistry {
    /// Largest number of attributes per (species, type, kind).
    pub const MAX_CODES: usize = u16::MAX as usize;

    /// Create an empty, open registry for `species_count` species.
    pub fn new(species_count: u16) -> Self {
        let mut tables = IndexMap::with_capacity(species_count as usize * TreeType::COUNT);
        for sp in 0..species_count {
            for ty in TreeType::ALL {
                tables.insert((SpeciesId(sp), ty), TypeSchema::default());
            }
        }
        Self {
            species_count,
            tables,
            frozen: false,
        }
    }

    /// Number of species the registry was built for.
    pub fn species_count(&self) -> u16 {
        self.species_count
    }

    /// Register a typed attribute and return its code.
    ///
    /// Codes are assigned in call order starting at zero. Registering the
    /// same label twice yields two distinct codes; both stay addressable,
    /// and [`lookup`](Self::lookup) returns the later one.
    pub fn register<C: AttrCode>(
        &mut self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<C, SchemaError> {
        self.register_kind(C::KIND, label, species, tree_type)
            .map(C::from_slot)
    }

    /// Untyped form of [`register`](Self::register).
    pub fn register_kind(
        &mut self,
        kind: AttrKind,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<usize, SchemaError> {
        if self.frozen {
            return Err(SchemaError::Frozen {
                label: label.to_string(),
            });
        }
        let table = self
            .tables
            .get_mut(&(species, tree_type))
            .ok_or(SchemaError::UnknownSpecies { species })?;
        let labels = &mut table.labels[kind.index()];
        if labels.len() >= Self::MAX_CODES {
            return Err(SchemaError::TooManyAttributes {
                kind,
                max: Self::MAX_CODES,
            });
        }
        labels.push(label.to_string());
        let code = labels.len() - 1;
        trace!(%kind, label, %species, %tree_type, code, "registered attribute");
        Ok(code)
    }

    /// Register `label` for every species of `tree_type`, returning the
    /// per-species codes in species order.
    pub fn register_all_species<C: AttrCode>(
        &mut self,
        label: &str,
        tree_type: TreeType,
    ) -> Result<Vec<C>, SchemaError> {
        (0..self.species_count)
            .map(|sp| self.register(label, SpeciesId(sp), tree_type))
            .collect()
    }

    /// Look up the code of a label. Setup-time only; not for hot paths.
    pub fn lookup<C: AttrCode>(
        &self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Option<C> {
        self.lookup_kind(C::KIND, label, species, tree_type)
            .map(C::from_slot)
    }

    /// Untyped form of [`lookup`](Self::lookup).
    pub fn lookup_kind(
        &self,
        kind: AttrKind,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Option<usize> {
        self.tables.get(&(species, tree_type))?.lookup(kind, label)
    }

    /// Like [`lookup`](Self::lookup), but a missing label is an error.
    pub fn require<C: AttrCode>(
        &self,
        label: &str,
        species: SpeciesId,
        tree_type: TreeType,
    ) -> Result<C, SchemaError> {
        if species.0 >= self.species_count {
            return Err(SchemaError::UnknownSpecies { species });
        }
        self.lookup(label, species, tree_type)
            .ok_or_else(|| SchemaError::NotFound {
                kind: C::KIND,
                label: label.to_string(),
                species,
                tree_type,
            })
    }

    /// Number of attributes of `kind` registered for (species, type).
    ///
    /// Unknown species count as zero.
    pub fn count(&self, kind: AttrKind, species: SpeciesId, tree_type: TreeType) -> usize {
        self.tables
            .get(&(species, tree_type))
            .map_or(0, |t| t.count(kind))
    }

    /// The label behind a code, for diagnostics.
    pub fn label(
        &self,
        kind: AttrKind,
        species: SpeciesId,
        tree_type: TreeType,
        code: usize,
    ) -> Option<&str> {
        self.tables
            .get(&(species, tree_type))?
            .labels(kind)
            .get(code)
            .map(String::as_str)
    }

    /// The full schema of a (species, type) pair.
    pub fn schema(&self, species: SpeciesId, tree_type: TreeType) -> Option<&TypeSchema> {
        self.tables.get(&(species, tree_type))
    }

    /// Slot pairs carried forward when a tree of `species` changes from
    /// `from` to `to`.
    ///
    /// An attribute survives when its label exists in both schemas. The
    /// n-th occurrence of a duplicated label pairs with the n-th occurrence
    /// in the destination; unmatched attributes are dropped.
    pub fn carry_over(
        &self,
        kind: AttrKind,
        species: SpeciesId,
        from: TreeType,
        to: TreeType,
    ) -> CarryOver {
        let mut out = CarryOver::new();
        let (Some(src), Some(dst)) = (
            self.tables.get(&(species, from)),
            self.tables.get(&(species, to)),
        ) else {
            return out;
        };
        let src = src.labels(kind);
        let dst = dst.labels(kind);
        for (i, label) in src.iter().enumerate() {
            let occurrence = src[..i].iter().filter(|l| *l == label).count();
            let target = dst
                .iter()
                .enumerate()
                .filter(|(_, l)| *l == label)
                .nth(occurrence)
                .map(|(j, _)| j);
            if let Some(j) = target {
                out.push((i, j));
            }
        }
        out
    }

    /// Close the registry. Further registrations fail.
    pub fn freeze(&mut self) {
        if !self.frozen {
            let total: usize = self
                .tables
                .values()
                .map(|t| t.sizes().iter().sum::<usize>())
                .sum();
            info!(
                species = self.species_count,
                attributes = total,
                "attribute schema frozen"
            );
        }
        self.frozen = true;
    }

    /// Whether [`freeze`](Self::freeze) has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use thicket_core::{BoolCode, FloatCode, IntCode, StringCode};

    const SP0: SpeciesId = SpeciesId(0);
    const SP1: SpeciesId = SpeciesId(1);

    #[test]
    fn codes_are_dense_per_kind_species_type() {
        let mut reg = SchemaRegistry::new(2);
        let a: FloatCode = reg.register("a", SP0, TreeType::Adult).unwrap();
        let b: FloatCode = reg.register("b", SP0, TreeType::Adult).unwrap();
        let c: IntCode = reg.register("c", SP0, TreeType::Adult).unwrap();
        let d: FloatCode = reg.register("d", SP1, TreeType::Adult).unwrap();
        let e: FloatCode = reg.register("e", SP0, TreeType::Sapling).unwrap();
        assert_eq!((a, b), (FloatCode(0), FloatCode(1)));
        assert_eq!(c, IntCode(0));
        assert_eq!(d, FloatCode(0));
        assert_eq!(e, FloatCode(0));
        assert_eq!(reg.count(AttrKind::Float, SP0, TreeType::Adult), 2);
        assert_eq!(reg.count(AttrKind::Int, SP0, TreeType::Adult), 1);
        assert_eq!(reg.count(AttrKind::Bool, SP0, TreeType::Adult), 0);
    }

    #[test]
    fn duplicate_labels_are_kept_and_lookup_returns_latest() {
        let mut reg = SchemaRegistry::new(1);
        let first: FloatCode = reg.register("X", SP0, TreeType::Adult).unwrap();
        let second: FloatCode = reg.register("X", SP0, TreeType::Adult).unwrap();
        assert_ne!(first, second);
        assert_eq!(reg.count(AttrKind::Float, SP0, TreeType::Adult), 2);
        assert_eq!(reg.lookup("X", SP0, TreeType::Adult), Some(second));
        assert_eq!(
            reg.label(AttrKind::Float, SP0, TreeType::Adult, first.0 as usize),
            Some("X")
        );
    }

    #[test]
    fn lookup_is_kind_scoped() {
        let mut reg = SchemaRegistry::new(1);
        let _: BoolCode = reg.register("flag", SP0, TreeType::Seedling).unwrap();
        assert!(reg
            .lookup::<StringCode>("flag", SP0, TreeType::Seedling)
            .is_none());
        assert!(reg.lookup::<BoolCode>("flag", SP0, TreeType::Seedling).is_some());
    }

    #[test]
    fn frozen_registry_rejects_registration() {
        let mut reg = SchemaRegistry::new(1);
        reg.freeze();
        let err = reg
            .register::<IntCode>("late", SP0, TreeType::Adult)
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::Frozen {
                label: "late".into()
            }
        );
    }

    #[test]
    fn unknown_species_is_rejected() {
        let mut reg = SchemaRegistry::new(1);
        let err = reg
            .register::<IntCode>("x", SpeciesId(5), TreeType::Adult)
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownSpecies { species: SpeciesId(5) });
        assert!(matches!(
            reg.require::<IntCode>("x", SpeciesId(5), TreeType::Adult),
            Err(SchemaError::UnknownSpecies { .. })
        ));
        assert!(matches!(
            reg.require::<IntCode>("x", SP0, TreeType::Adult),
            Err(SchemaError::NotFound { .. })
        ));
    }

    #[test]
    fn register_all_species_returns_codes_in_species_order() {
        let mut reg = SchemaRegistry::new(3);
        let _: FloatCode = reg.register("pad", SpeciesId(1), TreeType::Adult).unwrap();
        let codes: Vec<FloatCode> = reg.register_all_species("Light", TreeType::Adult).unwrap();
        assert_eq!(codes, vec![FloatCode(0), FloatCode(1), FloatCode(0)]);
    }

    #[test]
    fn carry_over_matches_labels_and_drops_the_rest() {
        let mut reg = SchemaRegistry::new(1);
        for label in ["X", "Y", "Height", "Diam10", "Growth"] {
            reg.register_kind(AttrKind::Float, label, SP0, TreeType::Sapling)
                .unwrap();
        }
        for label in ["X", "Y", "Height", "DBH", "Growth"] {
            reg.register_kind(AttrKind::Float, label, SP0, TreeType::Adult)
                .unwrap();
        }
        let pairs = reg.carry_over(AttrKind::Float, SP0, TreeType::Sapling, TreeType::Adult);
        assert_eq!(pairs.as_slice(), &[(0, 0), (1, 1), (2, 2), (4, 4)]);
    }

    #[test]
    fn carry_over_pairs_duplicate_occurrences_in_order() {
        let mut reg = SchemaRegistry::new(1);
        for label in ["a", "dup", "dup"] {
            reg.register_kind(AttrKind::Int, label, SP0, TreeType::Seedling)
                .unwrap();
        }
        for label in ["dup", "b", "dup", "a"] {
            reg.register_kind(AttrKind::Int, label, SP0, TreeType::Sapling)
                .unwrap();
        }
        let pairs = reg.carry_over(AttrKind::Int, SP0, TreeType::Seedling, TreeType::Sapling);
        assert_eq!(pairs.as_slice(), &[(0, 3), (1, 0), (2, 2)]);
    }

    proptest! {
        #[test]
        fn codes_follow_call_order(labels in proptest::collection::vec("[a-z]{1,4}", 0..20)) {
            let mut reg = SchemaRegistry::new(1);
            for (i, label) in labels.iter().enumerate() {
                let code: StringCode = reg.register(label, SP0, TreeType::Adult).unwrap();
                prop_assert_eq!(code.0 as usize, i);
            }
            prop_assert_eq!(reg.count(AttrKind::String, SP0, TreeType::Adult), labels.len());
        }
    }
}
