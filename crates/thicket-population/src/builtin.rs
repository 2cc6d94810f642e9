//! Built-in attributes every tree carries.
//!
//! These are registered for every species before behaviors get the
//! registry, so they hold the lowest codes of each schema.

use thicket_core::{FloatCode, IntCode, SchemaError, SpeciesId, TreeType};
use thicket_index::GeometryCodes;
use thicket_schema::SchemaRegistry;

/// X coordinate (m).
pub const X: &str = "X";
/// Y coordinate (m).
pub const Y: &str = "Y";
/// Height (m).
pub const HEIGHT: &str = "Height";
/// Diameter at 10 cm (cm).
pub const DIAM10: &str = "Diam10";
/// Diameter at breast height (cm).
pub const DBH: &str = "DBH";
/// Timesteps since a snag died.
pub const AGE: &str = "Age";
/// Death reason code of a snag.
pub const DEAD: &str = "Dead";

fn float_labels(tree_type: TreeType) -> &'static [&'static str] {
    match tree_type {
        TreeType::Seed => &[X, Y],
        TreeType::Seedling => &[X, Y, HEIGHT, DIAM10],
        TreeType::Sapling => &[X, Y, HEIGHT, DIAM10, DBH],
        TreeType::Adult | TreeType::Snag => &[X, Y, HEIGHT, DBH],
        TreeType::Stump => &[X, Y, DBH],
    }
}

fn int_labels(tree_type: TreeType) -> &'static [&'static str] {
    match tree_type {
        TreeType::Snag => &[AGE, DEAD],
        _ => &[],
    }
}

/// Which built-in dimension a float code addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dimension {
    X,
    Y,
    Height,
    Diam10,
    Dbh,
}

/// Codes of the built-in attributes for one (species, type).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageCodes {
    /// Position and height codes read by the index.
    pub geometry: GeometryCodes,
    /// `Diam10`, for seedlings and saplings.
    pub diam10: Option<FloatCode>,
    /// `DBH`, for saplings, adults, snags, and stumps.
    pub dbh: Option<FloatCode>,
    /// `Age`, for snags.
    pub age: Option<IntCode>,
    /// `Dead`, for snags.
    pub dead: Option<IntCode>,
}

impl StageCodes {
    /// The size attribute `create` sets: `Diam10` for seedlings, `DBH`
    /// otherwise. Seeds have none.
    pub fn size(&self, tree_type: TreeType) -> Option<FloatCode> {
        match tree_type {
            TreeType::Seedling => self.diam10,
            _ => self.dbh,
        }
    }

    pub(crate) fn dimension(&self, code: FloatCode) -> Option<Dimension> {
        if code == self.geometry.x {
            Some(Dimension::X)
        } else if code == self.geometry.y {
            Some(Dimension::Y)
        } else if Some(code) == self.geometry.height {
            Some(Dimension::Height)
        } else if Some(code) == self.diam10 {
            Some(Dimension::Diam10)
        } else if Some(code) == self.dbh {
            Some(Dimension::Dbh)
        } else {
            None
        }
    }
}

/// Built-in codes for every (species, type).
#[derive(Clone, Debug)]
pub struct BuiltinCodes {
    table: Vec<[StageCodes; TreeType::COUNT]>,
}

impl BuiltinCodes {
    /// Register the built-in attributes for every species and collect
    /// their codes.
    pub fn register(schema: &mut SchemaRegistry) -> Result<Self, SchemaError> {
        for sp in 0..schema.species_count() {
            let species = SpeciesId(sp);
            for ty in TreeType::ALL {
                for label in float_labels(ty) {
                    schema.register::<FloatCode>(label, species, ty)?;
                }
                for label in int_labels(ty) {
                    schema.register::<IntCode>(label, species, ty)?;
                }
            }
        }
        let mut table = Vec::with_capacity(schema.species_count() as usize);
        for sp in 0..schema.species_count() {
            let species = SpeciesId(sp);
            let mut row = Vec::with_capacity(TreeType::COUNT);
            for ty in TreeType::ALL {
                let float = |label: &str| schema.lookup::<FloatCode>(label, species, ty);
                let geometry = GeometryCodes {
                    x: schema.require(X, species, ty)?,
                    y: schema.require(Y, species, ty)?,
                    height: float(HEIGHT),
                };
                row.push(StageCodes {
                    geometry,
                    diam10: float(DIAM10),
                    dbh: float(DBH),
                    age: schema.lookup(AGE, species, ty),
                    dead: schema.lookup(DEAD, species, ty),
                });
            }
            let row: [StageCodes; TreeType::COUNT] = row
                .try_into()
                .unwrap_or_else(|_| unreachable!("one entry per tree type"));
            table.push(row);
        }
        Ok(Self { table })
    }

    /// Codes for one (species, type).
    ///
    /// # Panics
    ///
    /// Panics if `species` is not configured.
    pub fn get(&self, species: SpeciesId, tree_type: TreeType) -> &StageCodes {
        &self.table[species.index()][tree_type.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_take_the_lowest_codes() {
        let mut schema = SchemaRegistry::new(2);
        let codes = BuiltinCodes::register(&mut schema).unwrap();
        let sapling = codes.get(SpeciesId(1), TreeType::Sapling);
        assert_eq!(sapling.geometry.x, FloatCode(0));
        assert_eq!(sapling.geometry.y, FloatCode(1));
        assert_eq!(sapling.geometry.height, Some(FloatCode(2)));
        assert_eq!(sapling.diam10, Some(FloatCode(3)));
        assert_eq!(sapling.dbh, Some(FloatCode(4)));

        let adult = codes.get(SpeciesId(0), TreeType::Adult);
        assert_eq!(adult.dbh, Some(FloatCode(3)));
        assert_eq!(adult.diam10, None);

        let seed = codes.get(SpeciesId(0), TreeType::Seed);
        assert_eq!(seed.geometry.height, None);
        assert_eq!(seed.size(TreeType::Seed), None);

        let snag = codes.get(SpeciesId(0), TreeType::Snag);
        assert_eq!(snag.age, Some(IntCode(0)));
        assert_eq!(snag.dead, Some(IntCode(1)));

        let stump = codes.get(SpeciesId(0), TreeType::Stump);
        assert_eq!(stump.geometry.height, None);
        assert_eq!(stump.dbh, Some(FloatCode(2)));
    }

    #[test]
    fn size_code_depends_on_stage() {
        let mut schema = SchemaRegistry::new(1);
        let codes = BuiltinCodes::register(&mut schema).unwrap();
        let seedling = codes.get(SpeciesId(0), TreeType::Seedling);
        assert_eq!(seedling.size(TreeType::Seedling), seedling.diam10);
        let sapling = codes.get(SpeciesId(0), TreeType::Sapling);
        assert_eq!(sapling.size(TreeType::Sapling), sapling.dbh);
        assert_eq!(sapling.dimension(FloatCode(3)), Some(Dimension::Diam10));
        assert_eq!(sapling.dimension(FloatCode(9)), None);
    }
}
