//! Life stages ("types") and the [`TypeMask`] bitset used by queries.

use std::fmt;

/// A tree's coarse developmental category.
///
/// The numeric codes are stable: they appear in the query mini-language
/// (`type=2,3`) and in the `Dead` attribute of snags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TreeType {
    /// Dispersed seed, height zero.
    Seed,
    /// Established seedling, sized by `Diam10`.
    Seedling,
    /// Sapling, sized by `DBH`.
    Sapling,
    /// Adult tree, sized by `DBH`.
    Adult,
    /// Harvested remains. Not indexed, lives for one timestep.
    Stump,
    /// Standing dead adult.
    Snag,
}

impl TreeType {
    /// Number of life stages.
    pub const COUNT: usize = 6;

    /// All life stages in code order.
    pub const ALL: [TreeType; Self::COUNT] = [
        Self::Seed,
        Self::Seedling,
        Self::Sapling,
        Self::Adult,
        Self::Stump,
        Self::Snag,
    ];

    /// Stable numeric code.
    pub fn code(self) -> u8 {
        match self {
            Self::Seed => 0,
            Self::Seedling => 1,
            Self::Sapling => 2,
            Self::Adult => 3,
            Self::Stump => 4,
            Self::Snag => 5,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Position in per-type tables.
    pub fn index(self) -> usize {
        self.code() as usize
    }

    /// Whether trees of this type live in the spatial-height index.
    pub fn is_indexed(self) -> bool {
        !matches!(self, Self::Stump)
    }

    /// Whether trees of this type carry a height.
    pub fn has_height(self) -> bool {
        !matches!(self, Self::Seed | Self::Stump)
    }

    /// The stage reached by growth, if any.
    pub fn next_stage(self) -> Option<Self> {
        match self {
            Self::Seed => Some(Self::Seedling),
            Self::Seedling => Some(Self::Sapling),
            Self::Sapling => Some(Self::Adult),
            Self::Adult | Self::Stump | Self::Snag => None,
        }
    }

    /// Whether `self -> to` is a legal life-stage transition.
    ///
    /// Growth moves one stage forward; adults may die into snags; saplings
    /// and adults may be cut into stumps.
    pub fn can_become(self, to: Self) -> bool {
        if self.next_stage() == Some(to) {
            return true;
        }
        matches!(
            (self, to),
            (Self::Adult, Self::Snag) | (Self::Sapling, Self::Stump) | (Self::Adult, Self::Stump)
        )
    }
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Seed => "seed",
            Self::Seedling => "seedling",
            Self::Sapling => "sapling",
            Self::Adult => "adult",
            Self::Stump => "stump",
            Self::Snag => "snag",
        };
        f.write_str(name)
    }
}

/// A set of life stages, one bit per [`TreeType`] code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeMask(u8);

impl TypeMask {
    /// The empty set.
    pub const EMPTY: TypeMask = TypeMask(0);

    /// Every stage that lives in the spatial-height index.
    pub const INDEXED: TypeMask = TypeMask(0b10_1111);

    /// Set containing exactly `ty`.
    pub fn only(ty: TreeType) -> Self {
        Self(1 << ty.code())
    }

    /// Add a stage.
    pub fn insert(&mut self, ty: TreeType) {
        self.0 |= 1 << ty.code();
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, ty: TreeType) -> Self {
        self.insert(ty);
        self
    }

    /// Membership bit-test.
    pub fn contains(self, ty: TreeType) -> bool {
        self.0 & (1 << ty.code()) != 0
    }

    /// Whether no stage is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every member is also in `other`.
    pub fn is_subset(self, other: TypeMask) -> bool {
        self.0 & !other.0 == 0
    }

    /// Members in code order.
    pub fn iter(self) -> impl Iterator<Item = TreeType> {
        TreeType::ALL.into_iter().filter(move |t| self.contains(*t))
    }

    /// Raw bits.
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl FromIterator<TreeType> for TypeMask {
    fn from_iter<I: IntoIterator<Item = TreeType>>(iter: I) -> Self {
        let mut mask = Self::EMPTY;
        for ty in iter {
            mask.insert(ty);
        }
        mask
    }
}
