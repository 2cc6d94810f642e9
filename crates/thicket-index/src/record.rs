//! The tree record: identity plus four schema-sized attribute arrays.

use thicket_core::{BoolCode, FloatCode, IntCode, SpeciesId, StringCode, TreeType};

/// Float codes of the attributes the index reads to place a tree.
///
/// Set by the owner when the record is built for a (species, type) schema.
/// Types without a height (seeds, stumps) sit at height zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryCodes {
    /// Code of the `X` attribute.
    pub x: FloatCode,
    /// Code of the `Y` attribute.
    pub y: FloatCode,
    /// Code of the `Height` attribute, if the type has one.
    pub height: Option<FloatCode>,
}

/// One tree's data.
///
/// Attribute arrays are sized once from the schema and only reallocated on
/// a life-stage transition. Indexing an array with a code from another
/// schema is a contract violation and panics.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeRecord {
    species: SpeciesId,
    tree_type: TreeType,
    geometry: GeometryCodes,
    ints: Vec<i32>,
    floats: Vec<f32>,
    bools: Vec<bool>,
    strings: Vec<String>,
}

impl TreeRecord {
    /// Zero-initialized record with `sizes` slots per kind
    /// (int, float, bool, string).
    pub fn new(
        species: SpeciesId,
        tree_type: TreeType,
        sizes: [usize; 4],
        geometry: GeometryCodes,
    ) -> Self {
        Self {
            species,
            tree_type,
            geometry,
            ints: vec![0; sizes[0]],
            floats: vec![0.0; sizes[1]],
            bools: vec![false; sizes[2]],
            strings: vec![String::new(); sizes[3]],
        }
    }

    /// Empty stand-in left behind in a retired arena slot.
    pub(crate) fn placeholder() -> Self {
        let geometry = GeometryCodes {
            x: FloatCode(0),
            y: FloatCode(1),
            height: None,
        };
        Self::new(SpeciesId(0), TreeType::Seed, [0; 4], geometry)
    }

    /// Species of the tree.
    pub fn species(&self) -> SpeciesId {
        self.species
    }

    /// Life stage of the tree.
    pub fn tree_type(&self) -> TreeType {
        self.tree_type
    }

    /// Codes the index uses to read position and height.
    pub fn geometry(&self) -> GeometryCodes {
        self.geometry
    }

    /// X coordinate.
    pub fn x(&self) -> f32 {
        self.float(self.geometry.x)
    }

    /// Y coordinate.
    pub fn y(&self) -> f32 {
        self.float(self.geometry.y)
    }

    /// Height, or zero for types without one.
    pub fn height(&self) -> f32 {
        self.geometry.height.map_or(0.0, |c| self.float(c))
    }

    /// Read an integer attribute.
    pub fn int(&self, code: IntCode) -> i32 {
        match self.ints.get(code.0 as usize) {
            Some(v) => *v,
            None => self.bad_code(code, self.ints.len()),
        }
    }

    /// Read a float attribute.
    pub fn float(&self, code: FloatCode) -> f32 {
        match self.floats.get(code.0 as usize) {
            Some(v) => *v,
            None => self.bad_code(code, self.floats.len()),
        }
    }

    /// Read a boolean attribute.
    pub fn bool(&self, code: BoolCode) -> bool {
        match self.bools.get(code.0 as usize) {
            Some(v) => *v,
            None => self.bad_code(code, self.bools.len()),
        }
    }

    /// Read a string attribute.
    pub fn string(&self, code: StringCode) -> &str {
        match self.strings.get(code.0 as usize) {
            Some(v) => v,
            None => self.bad_code(code, self.strings.len()),
        }
    }

    /// Write an integer attribute.
    pub fn set_int(&mut self, code: IntCode, value: i32) {
        if let Some(v) = self.ints.get_mut(code.0 as usize) {
            *v = value;
            return;
        }
        self.bad_code(code, self.ints.len())
    }

    /// Write a float attribute.
    ///
    /// Writing a geometry attribute through this method does not move the
    /// tree in the index; the owner must reposition it.
    pub fn set_float(&mut self, code: FloatCode, value: f32) {
        if let Some(v) = self.floats.get_mut(code.0 as usize) {
            *v = value;
            return;
        }
        self.bad_code(code, self.floats.len())
    }

    /// Write a boolean attribute.
    pub fn set_bool(&mut self, code: BoolCode, value: bool) {
        if let Some(v) = self.bools.get_mut(code.0 as usize) {
            *v = value;
            return;
        }
        self.bad_code(code, self.bools.len())
    }

    /// Write a string attribute.
    pub fn set_string(&mut self, code: StringCode, value: impl Into<String>) {
        if let Some(v) = self.strings.get_mut(code.0 as usize) {
            *v = value.into();
            return;
        }
        self.bad_code(code, self.strings.len())
    }

    /// Slot counts per kind (int, float, bool, string).
    pub fn sizes(&self) -> [usize; 4] {
        [
            self.ints.len(),
            self.floats.len(),
            self.bools.len(),
            self.strings.len(),
        ]
    }

    /// Build a record of a new type, moving the listed slots across.
    ///
    /// `carry` holds `(source, destination)` slot pairs per kind in
    /// int/float/bool/string order. Every other destination slot starts
    /// zeroed; source slots not listed are dropped.
    pub fn retyped(
        mut self,
        tree_type: TreeType,
        sizes: [usize; 4],
        geometry: GeometryCodes,
        carry: [&[(usize, usize)]; 4],
    ) -> Self {
        let mut out = Self::new(self.species, tree_type, sizes, geometry);
        for &(s, d) in carry[0] {
            out.ints[d] = self.ints[s];
        }
        for &(s, d) in carry[1] {
            out.floats[d] = self.floats[s];
        }
        for &(s, d) in carry[2] {
            out.bools[d] = self.bools[s];
        }
        for &(s, d) in carry[3] {
            out.strings[d] = std::mem::take(&mut self.strings[s]);
        }
        out
    }

    fn bad_code<C: std::fmt::Display>(&self, code: C, len: usize) -> ! {
        panic!(
            "attribute {code} is not in the schema of species {} {} ({len} slots)",
            self.species, self.tree_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> GeometryCodes {
        GeometryCodes {
            x: FloatCode(0),
            y: FloatCode(1),
            height: Some(FloatCode(2)),
        }
    }

    #[test]
    fn new_record_is_zeroed() {
        let r = TreeRecord::new(SpeciesId(1), TreeType::Adult, [2, 3, 1, 1], geom());
        assert_eq!(r.int(IntCode(1)), 0);
        assert_eq!(r.float(FloatCode(2)), 0.0);
        assert!(!r.bool(BoolCode(0)));
        assert_eq!(r.string(StringCode(0)), "");
        assert_eq!(r.sizes(), [2, 3, 1, 1]);
    }

    #[test]
    fn geometry_reads_through_codes() {
        let mut r = TreeRecord::new(SpeciesId(0), TreeType::Sapling, [0, 3, 0, 0], geom());
        r.set_float(FloatCode(0), 4.0);
        r.set_float(FloatCode(1), 5.0);
        r.set_float(FloatCode(2), 6.5);
        assert_eq!((r.x(), r.y(), r.height()), (4.0, 5.0, 6.5));
    }

    #[test]
    fn heightless_type_reports_zero() {
        let g = GeometryCodes {
            height: None,
            ..geom()
        };
        let r = TreeRecord::new(SpeciesId(0), TreeType::Seed, [0, 2, 0, 0], g);
        assert_eq!(r.height(), 0.0);
    }

    #[test]
    #[should_panic(expected = "not in the schema")]
    fn out_of_schema_code_panics() {
        let r = TreeRecord::new(SpeciesId(0), TreeType::Adult, [0, 3, 0, 0], geom());
        let _ = r.float(FloatCode(9));
    }

    #[test]
    fn retyped_carries_listed_slots_only() {
        let mut r = TreeRecord::new(SpeciesId(2), TreeType::Sapling, [1, 4, 0, 1], geom());
        r.set_int(IntCode(0), 9);
        r.set_float(FloatCode(0), 1.0);
        r.set_float(FloatCode(3), 7.0);
        r.set_string(StringCode(0), "tag");
        let out = r.retyped(
            TreeType::Adult,
            [1, 3, 0, 1],
            geom(),
            [&[], &[(0, 0), (3, 2)], &[], &[(0, 0)]],
        );
        assert_eq!(out.tree_type(), TreeType::Adult);
        assert_eq!(out.species(), SpeciesId(2));
        assert_eq!(out.int(IntCode(0)), 0);
        assert_eq!(out.float(FloatCode(0)), 1.0);
        assert_eq!(out.float(FloatCode(2)), 7.0);
        assert_eq!(out.string(StringCode(0)), "tag");
    }
}
