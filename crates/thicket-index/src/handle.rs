//! Tree handles and arena slot ids.
//!
//! A [`TreeHandle`] names one tree for as long as it lives. It is
//! generation-scoped: killing a tree bumps its slot's generation, so every
//! outstanding handle to it fails the O(1) staleness check even after the
//! slot is reused for a new tree.

use std::fmt;

/// Raw arena slot index, used for the intrusive `taller`/`shorter` links.
///
/// Node ids are internal to the index and never handed to behaviors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Stable, generation-checked reference to a live tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct TreeHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl TreeHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot this handle points into.
    pub fn slot(&self) -> u32 {
        self.index
    }

    /// Slot generation when the tree was created.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn node(&self) -> NodeId {
        NodeId(self.index)
    }
}

impl fmt::Display for TreeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tree(slot={}, gen={})", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_accessors() {
        let h = TreeHandle::new(7, 3);
        assert_eq!(h.slot(), 7);
        assert_eq!(h.generation(), 3);
        assert_eq!(h.node(), NodeId(7));
        assert_eq!(h.to_string(), "Tree(slot=7, gen=3)");
    }

    #[test]
    fn handles_differ_by_generation() {
        assert_ne!(TreeHandle::new(1, 0), TreeHandle::new(1, 1));
    }
}
