//! Lazy query cursors.
//!
//! A [`TreeCursor`] does not borrow the index. Each step takes the owner
//! explicitly, so a behavior can read and write trees between steps:
//!
//! ```text
//! let mut cursor = population.find(spec)?;
//! while let Some(tree) = cursor.next(&population) {
//!     population.set_float(tree, growth, 0.3);
//! }
//! ```
//!
//! Trees moved by deferred writes while a cursor is open are still found
//! at their old place; [`saw_deferred_writes`](TreeCursor::saw_deferred_writes)
//! reports whether that window was entered.
//!
//! The tree a cursor just yielded may be killed, promoted, or moved at once
//! without disturbing the walk: the cursor remembers that tree's taller
//! neighbour before handing it out. Trees linked into a list after the walk
//! began (new trees, immediate moves, promotions) are not yielded by it, so
//! a tree relinked ahead of the cursor is never seen twice.

use crate::handle::{NodeId, TreeHandle};
use crate::index::TreeIndex;
use crate::query::QuerySpec;

#[derive(Clone, Debug, PartialEq, Eq)]
enum CursorState {
    Created,
    Positioned {
        /// Position in the cell sequence.
        cell_pos: usize,
        /// Last tree visited in that cell; `None` before the first.
        current: Option<Visit>,
    },
    Exhausted,
}

/// A tree the walk stood on, as it was linked at the time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Visit {
    node: NodeId,
    linked_at: u64,
    /// Its taller neighbour in the band at the time of the visit.
    ahead: Option<NodeId>,
}

/// Cells a positioned cursor visits, plus the division band inside each.
#[derive(Clone, Debug)]
enum Plan {
    /// Every cell in x-major order.
    AllCells { count: usize, lo: u16, hi: u16 },
    /// Precomputed cells within reach of a distance anchor.
    Listed { cells: Vec<u32>, lo: u16, hi: u16 },
}

impl Plan {
    fn len(&self) -> usize {
        match self {
            Plan::AllCells { count, .. } => *count,
            Plan::Listed { cells, .. } => cells.len(),
        }
    }

    fn cell(&self, pos: usize) -> u32 {
        match self {
            Plan::AllCells { .. } => pos as u32,
            Plan::Listed { cells, .. } => cells[pos],
        }
    }

    fn band(&self) -> (u16, u16) {
        match self {
            Plan::AllCells { lo, hi, .. } | Plan::Listed { lo, hi, .. } => (*lo, *hi),
        }
    }
}

/// A lazy, restartable query over the trees of one timestep.
#[derive(Clone, Debug)]
#[must_use]
pub struct TreeCursor {
    spec: QuerySpec,
    epoch: u64,
    opened_generation: u64,
    state: CursorState,
    plan: Option<Plan>,
    /// Link clock when the walk began; later links are not yielded.
    walk_clock: u64,
}

impl TreeCursor {
    pub(crate) fn new(spec: QuerySpec, epoch: u64, write_generation: u64) -> Self {
        Self {
            spec,
            epoch,
            opened_generation: write_generation,
            state: CursorState::Created,
            plan: None,
            walk_clock: 0,
        }
    }

    /// The criteria this cursor was opened with.
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Whether the cursor has yielded its last tree.
    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Whether a timestep boundary has passed since the cursor was opened.
    pub fn is_stale<S: AsRef<TreeIndex> + ?Sized>(&self, store: &S) -> bool {
        store.as_ref().epoch() != self.epoch
    }

    /// Whether deferred size or position writes happened since the cursor
    /// was opened. Such trees may be yielded from their old place.
    pub fn saw_deferred_writes<S: AsRef<TreeIndex> + ?Sized>(&self, store: &S) -> bool {
        store.as_ref().write_generation() != self.opened_generation
    }

    /// Start over from the beginning. Criteria are not re-validated.
    pub fn restart(&mut self) {
        self.state = CursorState::Created;
        self.plan = None;
    }

    /// Next matching tree, or `None` once exhausted.
    ///
    /// # Panics
    ///
    /// Panics if called after the timestep the cursor was opened in.
    pub fn next<S: AsRef<TreeIndex> + ?Sized>(&mut self, store: &S) -> Option<TreeHandle> {
        let index = store.as_ref();
        if index.epoch() != self.epoch {
            panic!(
                "cursor opened in timestep {} used in timestep {}",
                self.epoch,
                index.epoch()
            );
        }
        loop {
            match self.state {
                CursorState::Exhausted => return None,
                CursorState::Created => self.position(index),
                CursorState::Positioned { cell_pos, current } => {
                    let Some(plan) = self.plan.as_ref() else {
                        self.state = CursorState::Exhausted;
                        continue;
                    };
                    let cell = plan.cell(cell_pos);
                    let (lo, hi) = plan.band();
                    let found = match current {
                        None => first_in_cell(index, cell, lo, hi),
                        Some(visit) => resume(index, visit, cell, hi),
                    };
                    match found {
                        Some(id) => {
                            let linked_at = index.arena.node(id).linked_at;
                            self.state = CursorState::Positioned {
                                cell_pos,
                                current: Some(Visit {
                                    node: id,
                                    linked_at,
                                    ahead: step(index, id, cell, hi),
                                }),
                            };
                            if index.arena.is_live(id)
                                && linked_at <= self.walk_clock
                                && self.matches(index, id)
                            {
                                return Some(index.arena.handle_of(id));
                            }
                        }
                        None if cell_pos + 1 < plan.len() => {
                            self.state = CursorState::Positioned {
                                cell_pos: cell_pos + 1,
                                current: None,
                            };
                        }
                        None => self.state = CursorState::Exhausted,
                    }
                }
            }
        }
    }

    /// Borrowing iterator over the remaining matches.
    pub fn iter<'a, S: AsRef<TreeIndex> + ?Sized>(&'a mut self, store: &'a S) -> CursorIter<'a> {
        CursorIter {
            cursor: self,
            index: store.as_ref(),
        }
    }

    fn position(&mut self, index: &TreeIndex) {
        let last = (index.grid.division_count() - 1) as u16;
        let cells = index.grid.cell_count();
        let plan = match &self.spec {
            QuerySpec::All => Some(Plan::AllCells {
                count: cells,
                lo: 0,
                hi: last,
            }),
            QuerySpec::Type(mask) | QuerySpec::TypeSpecies { types: mask, .. } => index
                .division_range(*mask)
                .map(|(lo, hi)| Plan::AllCells {
                    count: cells,
                    lo,
                    hi,
                }),
            QuerySpec::Distance {
                x,
                y,
                radius,
                min_height,
            } => Some(Plan::Listed {
                cells: index.grid.radius_cells(*x, *y, *radius),
                lo: index.grid.div_of(*min_height),
                hi: last,
            }),
        };
        self.state = match &plan {
            Some(p) if p.len() > 0 => CursorState::Positioned {
                cell_pos: 0,
                current: None,
            },
            _ => CursorState::Exhausted,
        };
        self.plan = plan;
        self.walk_clock = index.link_clock();
    }

    fn matches(&self, index: &TreeIndex, id: NodeId) -> bool {
        let record = &index.arena.node(id).record;
        match &self.spec {
            QuerySpec::All => true,
            QuerySpec::Type(mask) => mask.contains(record.tree_type()),
            QuerySpec::TypeSpecies { types, species } => {
                types.contains(record.tree_type()) && species.contains(record.species())
            }
            QuerySpec::Distance {
                x,
                y,
                radius,
                min_height,
            } => {
                record.height() > *min_height
                    && index.plot().distance(*x, *y, record.x(), record.y()) <= *radius
            }
        }
    }
}

/// Shortest tree of the first non-empty division in `lo..=hi`.
fn first_in_cell(index: &TreeIndex, cell: u32, lo: u16, hi: u16) -> Option<NodeId> {
    if lo == 0 {
        return index.grid.head(cell).filter(|&id| {
            index
                .arena
                .node(id)
                .place
                .is_some_and(|p| p.div <= hi)
        });
    }
    index.grid.first_span_from(cell, lo, hi).map(|s| s.shortest)
}

/// Taller neighbour of `id`, while it stays in `cell` at or below `hi`.
///
/// `id` may have been killed since it was visited; its links still lead
/// back into the list.
fn step(index: &TreeIndex, id: NodeId, cell: u32, hi: u16) -> Option<NodeId> {
    index
        .arena
        .node(id)
        .taller
        .filter(|&next| in_band(index, next, cell, hi))
}

/// Where the walk goes after `visit`.
///
/// A visited tree that was relinked since (grown, moved, promoted) no longer
/// leads back to where the walk stood, so the neighbour noted at the visit
/// takes over.
fn resume(index: &TreeIndex, visit: Visit, cell: u32, hi: u16) -> Option<NodeId> {
    if index.arena.node(visit.node).linked_at == visit.linked_at {
        step(index, visit.node, cell, hi)
    } else {
        visit.ahead.filter(|&next| in_band(index, next, cell, hi))
    }
}

fn in_band(index: &TreeIndex, id: NodeId, cell: u32, hi: u16) -> bool {
    index
        .arena
        .node(id)
        .place
        .is_some_and(|p| p.cell == cell && p.div <= hi)
}

/// Iterator adapter returned by [`TreeCursor::iter`].
pub struct CursorIter<'a> {
    cursor: &'a mut TreeCursor,
    index: &'a TreeIndex,
}

impl Iterator for CursorIter<'_> {
    type Item = TreeHandle;

    fn next(&mut self) -> Option<TreeHandle> {
        self.cursor.next(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::query::SpeciesSet;
    use crate::record::{GeometryCodes, TreeRecord};
    use std::collections::HashSet;
    use thicket_core::{FloatCode, QueryError, SpeciesId, TreeType, TypeMask};
    use thicket_space::TorusPlot;

    const GEOM: GeometryCodes = GeometryCodes {
        x: FloatCode(0),
        y: FloatCode(1),
        height: Some(FloatCode(2)),
    };

    fn index(x_len: f32, y_len: f32) -> TreeIndex {
        let config = IndexConfig {
            max_tree_height: 30.0,
            ..Default::default()
        };
        TreeIndex::new(config, Box::new(TorusPlot::new(x_len, y_len).unwrap())).unwrap()
    }

    fn plant(idx: &mut TreeIndex, sp: u16, ty: TreeType, x: f32, y: f32, h: f32) -> TreeHandle {
        let mut r = TreeRecord::new(SpeciesId(sp), ty, [0, 3, 0, 0], GEOM);
        r.set_float(FloatCode(0), x);
        r.set_float(FloatCode(1), y);
        r.set_float(FloatCode(2), h);
        idx.insert(r).unwrap()
    }

    fn collect(idx: &TreeIndex, spec: QuerySpec) -> HashSet<TreeHandle> {
        let mut cursor = idx.open(spec).unwrap();
        cursor.iter(idx).collect()
    }

    #[test]
    fn wraps_across_the_seam() {
        let mut idx = index(10.0, 10.0);
        let a = plant(&mut idx, 0, TreeType::Adult, 1.0, 1.0, 5.0);
        let b = plant(&mut idx, 0, TreeType::Adult, 1.0, 9.0, 5.0);
        let c = plant(&mut idx, 0, TreeType::Adult, 9.0, 1.0, 5.0);
        // Wrapped distances from (9.5, 0.5): 1.58, 2.12, 0.71.
        let found = collect(&idx, QuerySpec::distance(9.5, 0.5, 2.0, 0.0));
        assert!(found.contains(&a));
        assert!(found.contains(&c));
        assert!(!found.contains(&b));
    }

    #[test]
    fn min_height_is_exclusive() {
        let mut idx = index(16.0, 16.0);
        let short = plant(&mut idx, 0, TreeType::Sapling, 4.0, 4.0, 3.0);
        let tall = plant(&mut idx, 0, TreeType::Adult, 4.5, 4.0, 3.5);
        let found = collect(&idx, QuerySpec::distance(4.0, 4.0, 2.0, 3.0));
        assert_eq!(found, HashSet::from([tall]));
        assert!(!found.contains(&short));
    }

    #[test]
    fn type_and_species_filters() {
        let mut idx = index(32.0, 32.0);
        let s0 = plant(&mut idx, 0, TreeType::Sapling, 3.0, 3.0, 2.0);
        let a0 = plant(&mut idx, 0, TreeType::Adult, 20.0, 3.0, 20.0);
        let a1 = plant(&mut idx, 1, TreeType::Adult, 3.0, 25.0, 18.0);
        let seed = plant(&mut idx, 1, TreeType::Seed, 3.0, 25.0, 0.0);

        assert_eq!(collect(&idx, QuerySpec::All).len(), 4);
        assert_eq!(
            collect(&idx, QuerySpec::types([TreeType::Adult])),
            HashSet::from([a0, a1])
        );
        assert_eq!(
            collect(&idx, QuerySpec::types([TreeType::Seed, TreeType::Sapling])),
            HashSet::from([s0, seed])
        );
        let spec = QuerySpec::TypeSpecies {
            types: TypeMask::only(TreeType::Adult),
            species: SpeciesSet::from_ids([SpeciesId(1)], 2).unwrap(),
        };
        assert_eq!(collect(&idx, spec), HashSet::from([a1]));
        assert!(collect(&idx, QuerySpec::types([TreeType::Snag])).is_empty());
    }

    #[test]
    fn restart_yields_the_same_sequence() {
        let mut idx = index(24.0, 24.0);
        for i in 0..40 {
            let f = i as f32;
            plant(&mut idx, 0, TreeType::Adult, (f * 7.3) % 24.0, (f * 3.1) % 24.0, f % 13.0);
        }
        let mut cursor = idx.open(QuerySpec::distance(12.0, 12.0, 9.0, 2.0)).unwrap();
        let first: Vec<_> = cursor.iter(&idx).collect();
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.next(&idx), None);
        cursor.restart();
        let second: Vec<_> = cursor.iter(&idx).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn killing_the_current_tree_does_not_derail_the_cursor() {
        let mut idx = index(16.0, 16.0);
        let trees: Vec<_> = (0..6)
            .map(|i| plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, i as f32 * 1.5))
            .collect();
        let mut cursor = idx.open(QuerySpec::All).unwrap();
        let mut seen = Vec::new();
        while let Some(h) = cursor.next(&idx) {
            seen.push(h);
            idx.remove(h);
        }
        assert_eq!(seen, trees);
        assert!(idx.is_empty());
        idx.verify().unwrap();
    }

    #[test]
    fn relinking_the_current_tree_keeps_the_walk() {
        let mut idx = index(16.0, 16.0);
        let trees: Vec<_> = (0..5)
            .map(|i| plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, 1.0 + i as f32))
            .collect();
        let mut cursor = idx.open(QuerySpec::All).unwrap();
        let mut seen = Vec::new();
        while let Some(h) = cursor.next(&idx) {
            seen.push(h);
            // Tallest in the cell now, then out of the cell entirely.
            let height = idx.record(h).height();
            idx.record_mut(h).set_float(FloatCode(2), height + 20.0);
            idx.reposition(h, true).unwrap();
            idx.record_mut(h).set_float(FloatCode(0), 12.0);
            idx.reposition(h, true).unwrap();
        }
        assert_eq!(seen, trees);
        idx.verify().unwrap();
    }

    #[test]
    fn trees_linked_after_the_walk_began_are_skipped() {
        let mut idx = index(16.0, 16.0);
        let a = plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, 1.0);
        let b = plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, 3.0);
        let mut cursor = idx.open(QuerySpec::All).unwrap();
        assert_eq!(cursor.next(&idx), Some(a));
        let late = plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, 5.0);
        assert_eq!(cursor.next(&idx), Some(b));
        assert_eq!(cursor.next(&idx), None);

        cursor.restart();
        let again: Vec<_> = cursor.iter(&idx).collect();
        assert_eq!(again, vec![a, b, late]);
    }

    #[test]
    fn deferred_writes_are_reported() {
        let mut idx = index(16.0, 16.0);
        let a = plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, 4.0);
        let cursor = idx.open(QuerySpec::All).unwrap();
        assert!(!cursor.saw_deferred_writes(&idx));
        idx.record_mut(a).set_float(FloatCode(2), 5.0);
        idx.reposition(a, false).unwrap();
        assert!(cursor.saw_deferred_writes(&idx));
    }

    #[test]
    #[should_panic(expected = "used in timestep")]
    fn stale_cursor_panics() {
        let mut idx = index(16.0, 16.0);
        plant(&mut idx, 0, TreeType::Adult, 2.0, 2.0, 4.0);
        let mut cursor = idx.open(QuerySpec::All).unwrap();
        idx.end_timestep();
        assert!(cursor.is_stale(&idx));
        let _ = cursor.next(&idx);
    }

    #[test]
    fn open_validates() {
        let idx = index(16.0, 16.0);
        assert_eq!(
            idx.open(QuerySpec::distance(20.0, 1.0, 2.0, 0.0)).err(),
            Some(QueryError::AnchorOutOfPlot { x: 20.0, y: 1.0 })
        );
    }

    #[test]
    fn empty_index_exhausts_immediately() {
        let idx = index(16.0, 16.0);
        let mut cursor = idx.open(QuerySpec::All).unwrap();
        assert_eq!(cursor.next(&idx), None);
        assert!(cursor.is_exhausted());
    }
}
