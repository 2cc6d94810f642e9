//! Slab storage for tree nodes with two-phase slot reclamation.
//!
//! [`TreeArena`] owns every tree record together with its intrusive index
//! links. Killing a tree retires its slot instead of freeing it:
//!
//! - The slot generation is bumped immediately, so every [`TreeHandle`] to
//!   the dead tree fails its staleness check.
//! - The slot keeps its last `taller`/`shorter` links, so a cursor standing
//!   on the dead tree can still step to its former neighbour.
//! - At the timestep boundary, [`flush_retired`](TreeArena::flush_retired)
//!   moves retired slots to the free list. Cursors never survive that
//!   boundary, so no live cursor can reach a reused slot.

use crate::handle::{NodeId, TreeHandle};
use crate::record::TreeRecord;

/// Where a node currently sits in the spatial-height index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Place {
    /// Flat cell index.
    pub(crate) cell: u32,
    /// Height division within the cell.
    pub(crate) div: u16,
}

/// A tree record plus its index links.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) record: TreeRecord,
    pub(crate) taller: Option<NodeId>,
    pub(crate) shorter: Option<NodeId>,
    /// `None` while the tree is outside every list.
    pub(crate) place: Option<Place>,
    /// Link clock reading when the node last entered a list.
    pub(crate) linked_at: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    live: bool,
    node: Option<Node>,
}

/// Slab of tree nodes addressed by generational handles.
#[derive(Debug, Default)]
pub(crate) struct TreeArena {
    slots: Vec<Slot>,
    /// Slots safe to hand out again.
    free: Vec<u32>,
    /// Slots killed during the current timestep (links still readable).
    retired: Vec<u32>,
    live: usize,
}

impl TreeArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a record in a free slot (or a new one) and return its handle.
    pub(crate) fn alloc(&mut self, record: TreeRecord) -> TreeHandle {
        let node = Node {
            record,
            taller: None,
            shorter: None,
            place: None,
            linked_at: 0,
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.live = true;
            slot.node = Some(node);
            return TreeHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            live: true,
            node: Some(node),
        });
        TreeHandle::new(index, 0)
    }

    /// Retire a live slot. Returns its record; links and place are kept.
    ///
    /// The caller must have unlinked the node from the index first.
    pub(crate) fn retire(&mut self, handle: TreeHandle) -> TreeRecord {
        let slot = self.checked_slot_mut(handle);
        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        let node = slot
            .node
            .as_mut()
            .unwrap_or_else(|| unreachable!("live slot without node"));
        let record = std::mem::replace(&mut node.record, TreeRecord::placeholder());
        self.retired.push(handle.index);
        self.live -= 1;
        record
    }

    /// Make retired slots reusable. Call only at a timestep boundary.
    pub(crate) fn flush_retired(&mut self) -> usize {
        let count = self.retired.len();
        for index in self.retired.drain(..) {
            self.slots[index as usize].node = None;
            self.free.push(index);
        }
        count
    }

    /// Whether `handle` names a live tree.
    pub(crate) fn contains(&self, handle: TreeHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|s| s.live && s.generation == handle.generation)
    }

    /// Node behind a handle. A stale handle is a contract violation.
    pub(crate) fn get(&self, handle: TreeHandle) -> &Node {
        match self.slots.get(handle.index as usize) {
            Some(Slot {
                generation,
                live: true,
                node: Some(node),
            }) if *generation == handle.generation => node,
            _ => stale(handle),
        }
    }

    /// Mutable node behind a handle. A stale handle is a contract violation.
    pub(crate) fn get_mut(&mut self, handle: TreeHandle) -> &mut Node {
        self.checked_slot_mut(handle)
            .node
            .as_mut()
            .unwrap_or_else(|| unreachable!("live slot without node"))
    }

    /// Node by raw id, live or retired. Used for link traversal.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        self.slots[id.idx()]
            .node
            .as_ref()
            .unwrap_or_else(|| panic!("node {} was recycled while still linked", id.0))
    }

    /// Mutable node by raw id.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.idx()]
            .node
            .as_mut()
            .unwrap_or_else(|| panic!("node {} was recycled while still linked", id.0))
    }

    /// Whether the slot behind `id` holds a live tree.
    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        self.slots.get(id.idx()).is_some_and(|s| s.live)
    }

    /// Current handle for a live node id.
    pub(crate) fn handle_of(&self, id: NodeId) -> TreeHandle {
        TreeHandle::new(id.0, self.slots[id.idx()].generation)
    }

    /// Ids of all live nodes, in slot order.
    pub(crate) fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Number of live trees.
    pub(crate) fn live_count(&self) -> usize {
        self.live
    }

    /// Total slots (live, retired, and free).
    pub(crate) fn total_slots(&self) -> usize {
        self.slots.len()
    }

    /// Number of free slots available for reuse.
    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of slots retired this timestep.
    pub(crate) fn retired_count(&self) -> usize {
        self.retired.len()
    }

    fn checked_slot_mut(&mut self, handle: TreeHandle) -> &mut Slot {
        match self.slots.get_mut(handle.index as usize) {
            Some(slot) if slot.live && slot.generation == handle.generation => slot,
            _ => stale(handle),
        }
    }
}

fn stale(handle: TreeHandle) -> ! {
    panic!("{handle} does not name a live tree (stale handle or foreign population)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GeometryCodes;
    use thicket_core::{FloatCode, SpeciesId, TreeType};

    fn record() -> TreeRecord {
        let geometry = GeometryCodes {
            x: FloatCode(0),
            y: FloatCode(1),
            height: None,
        };
        TreeRecord::new(SpeciesId(0), TreeType::Seed, [0, 2, 0, 0], geometry)
    }

    #[test]
    fn alloc_creates_live_slot() {
        let mut arena = TreeArena::new();
        let h = arena.alloc(record());
        assert!(arena.contains(h));
        assert_eq!(arena.live_count(), 1);
        assert_eq!(h.generation(), 0);
    }

    #[test]
    fn retire_invalidates_handle_but_keeps_links() {
        let mut arena = TreeArena::new();
        let a = arena.alloc(record());
        let b = arena.alloc(record());
        arena.get_mut(a).taller = Some(b.node());
        arena.retire(a);
        assert!(!arena.contains(a));
        assert_eq!(arena.live_count(), 1);
        assert_eq!(arena.node(a.node()).taller, Some(b.node()));
        assert!(!arena.is_live(a.node()));
    }

    #[test]
    fn retired_slots_not_reused_before_flush() {
        let mut arena = TreeArena::new();
        let a = arena.alloc(record());
        arena.retire(a);
        let b = arena.alloc(record());
        assert_ne!(a.slot(), b.slot());
        assert_eq!(arena.total_slots(), 2);
    }

    #[test]
    fn flushed_slot_is_reused_with_new_generation() {
        let mut arena = TreeArena::new();
        let a = arena.alloc(record());
        arena.retire(a);
        assert_eq!(arena.retired_count(), 1);
        assert_eq!(arena.flush_retired(), 1);
        assert_eq!(arena.free_count(), 1);
        let b = arena.alloc(record());
        assert_eq!(a.slot(), b.slot());
        assert_ne!(a.generation(), b.generation());
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
        assert_eq!(arena.total_slots(), 1);
    }

    #[test]
    #[should_panic(expected = "does not name a live tree")]
    fn stale_handle_panics() {
        let mut arena = TreeArena::new();
        let a = arena.alloc(record());
        arena.retire(a);
        let _ = arena.get(a);
    }

    #[test]
    fn live_ids_skip_retired() {
        let mut arena = TreeArena::new();
        let a = arena.alloc(record());
        let b = arena.alloc(record());
        arena.retire(a);
        let ids: Vec<_> = arena.live_ids().collect();
        assert_eq!(ids, vec![b.node()]);
    }
}
