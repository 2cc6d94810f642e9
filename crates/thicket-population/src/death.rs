//! Death reasons and the archive that receives dead trees.

use std::fmt;

use thicket_core::{SpeciesId, TreeType};
use thicket_index::{TreeHandle, TreeRecord};

/// Why a tree is killed.
///
/// The numeric code is stored in a snag's `Dead` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeathReason {
    /// Administrative deletion; no remains.
    Remove,
    /// Cut; saplings and adults of stump-forming species leave a stump.
    Harvest,
    /// Background mortality.
    Natural,
    /// Killed by disease.
    Disease,
    /// Killed by fire.
    Fire,
    /// Killed by insects.
    Insects,
    /// Killed by wind.
    Storm,
}

impl DeathReason {
    /// All reasons in code order.
    pub const ALL: [DeathReason; 7] = [
        Self::Remove,
        Self::Harvest,
        Self::Natural,
        Self::Disease,
        Self::Fire,
        Self::Insects,
        Self::Storm,
    ];

    /// Stable numeric code.
    pub fn code(self) -> i32 {
        match self {
            Self::Remove => 0,
            Self::Harvest => 1,
            Self::Natural => 2,
            Self::Disease => 3,
            Self::Fire => 4,
            Self::Insects => 5,
            Self::Storm => 6,
        }
    }

    /// Reason for a code, if any.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    /// Whether the tree died standing (an adult may become a snag).
    pub fn leaves_snag(self) -> bool {
        !matches!(self, Self::Remove | Self::Harvest)
    }
}

impl fmt::Display for DeathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Remove => "remove",
            Self::Harvest => "harvest",
            Self::Natural => "natural",
            Self::Disease => "disease",
            Self::Fire => "fire",
            Self::Insects => "insects",
            Self::Storm => "storm",
        };
        f.write_str(name)
    }
}

/// What became of a killed tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KillOutcome {
    /// Deleted; the handle is stale.
    Removed,
    /// Replaced by a stump for the rest of the timestep; the handle is stale.
    Stumped,
    /// Converted to a snag in place; the handle stays valid.
    Snagged,
}

/// Detached copy of a tree at the moment it was killed.
#[derive(Clone, Debug, PartialEq)]
pub struct DeadTree {
    /// Handle the tree had while alive.
    pub handle: TreeHandle,
    /// Attributes at death.
    pub record: TreeRecord,
    /// Cause of death.
    pub reason: DeathReason,
    /// Timestep of death.
    pub timestep: u64,
}

impl DeadTree {
    /// Species of the dead tree.
    pub fn species(&self) -> SpeciesId {
        self.record.species()
    }

    /// Life stage at death.
    pub fn tree_type(&self) -> TreeType {
        self.record.tree_type()
    }
}

/// Receiver of every killed tree, e.g. for mortality output.
pub trait DeadTreeArchive: Send {
    /// Take ownership of one dead tree.
    fn archive(&mut self, dead: DeadTree);
}

/// Archive that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullArchive;

impl DeadTreeArchive for NullArchive {
    fn archive(&mut self, _dead: DeadTree) {}
}
