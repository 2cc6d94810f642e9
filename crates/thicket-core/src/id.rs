//! Strongly-typed identifiers: species ids and per-kind attribute codes.

use std::fmt;

/// Identifies a tree species within a population.
///
/// Species are declared in the population configuration and numbered
/// sequentially from zero. `SpeciesId(n)` corresponds to the n-th entry of
/// the species parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(pub u16);

impl SpeciesId {
    /// Index form, for addressing per-species tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for SpeciesId {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Code of an integer attribute within one (species, type) schema.
///
/// Codes are dense, assigned in registration order from zero, and only
/// meaningful together with the species and type they were registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntCode(pub u16);

impl fmt::Display for IntCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "int#{}", self.0)
    }
}

/// Code of a float attribute within one (species, type) schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FloatCode(pub u16);

impl fmt::Display for FloatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "float#{}", self.0)
    }
}

/// Code of a boolean attribute within one (species, type) schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolCode(pub u16);

impl fmt::Display for BoolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bool#{}", self.0)
    }
}

/// Code of a string attribute within one (species, type) schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringCode(pub u16);

impl fmt::Display for StringCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "string#{}", self.0)
    }
}

/// Conversion between a typed code and its raw slot position.
///
/// Implemented by the four code newtypes so generic table code can index
/// slot arrays without knowing the kind.
pub trait AttrCode: Copy {
    /// The attribute kind this code addresses.
    const KIND: AttrKind;

    /// Slot position within the kind's array.
    fn slot(self) -> usize;

    /// Build a code from a slot position.
    fn from_slot(slot: usize) -> Self;
}

impl AttrCode for IntCode {
    const KIND: AttrKind = AttrKind::Int;
    fn slot(self) -> usize {
        self.0 as usize
    }
    fn from_slot(slot: usize) -> Self {
        Self(slot as u16)
    }
}

impl AttrCode for FloatCode {
    const KIND: AttrKind = AttrKind::Float;
    fn slot(self) -> usize {
        self.0 as usize
    }
    fn from_slot(slot: usize) -> Self {
        Self(slot as u16)
    }
}

impl AttrCode for BoolCode {
    const KIND: AttrKind = AttrKind::Bool;
    fn slot(self) -> usize {
        self.0 as usize
    }
    fn from_slot(slot: usize) -> Self {
        Self(slot as u16)
    }
}

impl AttrCode for StringCode {
    const KIND: AttrKind = AttrKind::String;
    fn slot(self) -> usize {
        self.0 as usize
    }
    fn from_slot(slot: usize) -> Self {
        Self(slot as u16)
    }
}

/// The four attribute storage kinds a tree carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrKind {
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// Boolean flag.
    Bool,
    /// Owned string, empty by default.
    String,
}

impl AttrKind {
    /// All kinds, in storage order.
    pub const ALL: [AttrKind; 4] = [Self::Int, Self::Float, Self::Bool, Self::String];

    /// Position of this kind in [`AttrKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            Self::Int => 0,
            Self::Float => 1,
            Self::Bool => 2,
            Self::String => 3,
        }
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::String => write!(f, "string"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_slot_round_trip() {
        assert_eq!(FloatCode::from_slot(7).slot(), 7);
        assert_eq!(IntCode::from_slot(0), IntCode(0));
        assert_eq!(<StringCode as AttrCode>::KIND, AttrKind::String);
    }

    #[test]
    fn kind_index_matches_all_order() {
        for (i, kind) in AttrKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn display_forms() {
        assert_eq!(SpeciesId(3).to_string(), "3");
        assert_eq!(FloatCode(2).to_string(), "float#2");
        assert_eq!(AttrKind::Bool.to_string(), "bool");
    }
}
