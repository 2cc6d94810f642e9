//! The spatial-height index: every live tree in exactly one cell list.
//!
//! Each cell holds one doubly linked list of its trees in ascending height.
//! The list is partitioned into height divisions; each non-empty division
//! records its shortest and tallest member so that inserts and queries can
//! jump straight to a height band.
//!
//! Size and position writes may be applied immediately (unlink + relink) or
//! deferred. Deferred writes bump the write generation and leave the tree
//! where it was until the next [`resort`](TreeIndex::resort).

use thicket_core::{IndexError, Plot, QueryError, TreeType, TypeMask};
use tracing::{debug, trace, warn};

use crate::arena::{Place, TreeArena};
use crate::config::{IndexConfig, IndexConfigError};
use crate::cursor::TreeCursor;
use crate::grid::{Grid, Span};
use crate::handle::{NodeId, TreeHandle};
use crate::query::QuerySpec;
use crate::record::TreeRecord;

/// Work done by one [`TreeIndex::resort`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResortStats {
    /// Trees moved to a different cell or division.
    pub relocated: usize,
    /// Insertion-sort shifts performed inside divisions.
    pub shifts: usize,
    /// Live trees at the time of the resort.
    pub live: usize,
}

/// Arena-backed spatial-height index over all live, indexed trees.
pub struct TreeIndex {
    config: IndexConfig,
    plot: Box<dyn Plot>,
    pub(crate) arena: TreeArena,
    pub(crate) grid: Grid,
    /// Per-type occupied division range; conservative between resorts.
    watermarks: [Option<(u16, u16)>; TreeType::COUNT],
    epoch: u64,
    write_generation: u64,
    sorted_generation: u64,
    /// Bumped by every link; cursors skip nodes linked after their walk began.
    link_clock: u64,
}

impl TreeIndex {
    /// Build an empty index over `plot`.
    pub fn new(config: IndexConfig, plot: Box<dyn Plot>) -> Result<Self, IndexConfigError> {
        config.validate()?;
        let grid = Grid::new(&config, plot.x_len(), plot.y_len());
        let (nx, ny) = grid.dims();
        debug!(
            nx,
            ny,
            divisions = grid.division_count(),
            cell_length = config.cell_length,
            "spatial index created"
        );
        Ok(Self {
            config,
            plot,
            arena: TreeArena::new(),
            grid,
            watermarks: [None; TreeType::COUNT],
            epoch: 0,
            write_generation: 0,
            sorted_generation: 0,
            link_clock: 0,
        })
    }

    /// Geometry the index was built with.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The plot collaborator.
    pub fn plot(&self) -> &dyn Plot {
        self.plot.as_ref()
    }

    /// Number of live trees.
    pub fn len(&self) -> usize {
        self.arena.live_count()
    }

    /// Whether the index holds no trees.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `handle` names a live tree.
    pub fn contains(&self, handle: TreeHandle) -> bool {
        self.arena.contains(handle)
    }

    /// Timestep counter; cursors opened under an older epoch are stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Counter bumped by every deferred reposition.
    pub fn write_generation(&self) -> u64 {
        self.write_generation
    }

    pub(crate) fn link_clock(&self) -> u64 {
        self.link_clock
    }

    /// Whether deferred writes are waiting for a resort.
    pub fn is_dirty(&self) -> bool {
        self.write_generation != self.sorted_generation
    }

    /// Record of a live tree. Panics on a stale handle.
    pub fn record(&self, handle: TreeHandle) -> &TreeRecord {
        &self.arena.get(handle).record
    }

    /// Mutable record of a live tree. Panics on a stale handle.
    ///
    /// Writing geometry attributes through this does not move the tree;
    /// follow up with [`reposition`](Self::reposition).
    pub fn record_mut(&mut self, handle: TreeHandle) -> &mut TreeRecord {
        &mut self.arena.get_mut(handle).record
    }

    /// Handles of every live tree, in slot order.
    pub fn handles(&self) -> Vec<TreeHandle> {
        self.arena
            .live_ids()
            .map(|id| self.arena.handle_of(id))
            .collect()
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Store a record and link it into its cell list at height rank.
    ///
    /// # Panics
    ///
    /// Panics if the record's type is never indexed (stumps).
    pub fn insert(&mut self, record: TreeRecord) -> Result<TreeHandle, IndexError> {
        assert!(
            record.tree_type().is_indexed(),
            "{} trees are not indexed",
            record.tree_type()
        );
        let place = self.checked_place(&record)?;
        let tree_type = record.tree_type();
        let handle = self.arena.alloc(record);
        self.link(handle.node(), place);
        self.raise_watermark(tree_type, place.div);
        trace!(%handle, cell = place.cell, div = place.div, "tree indexed");
        Ok(handle)
    }

    /// Unlink a tree and retire its slot. Returns its record.
    ///
    /// The handle is stale afterwards; the slot's old links stay readable
    /// to cursors until the next timestep.
    pub fn remove(&mut self, handle: TreeHandle) -> TreeRecord {
        let id = handle.node();
        if self.arena.get(handle).place.is_none() {
            panic!("{handle} is not linked into the index");
        }
        self.unlink(id);
        let record = self.arena.retire(handle);
        trace!(%handle, "tree removed");
        record
    }

    /// Bring a tree's place in line with its record after a geometry write.
    ///
    /// `immediate` relinks now. Otherwise the tree stays where it is and
    /// the write generation is bumped; the next resort moves it.
    pub fn reposition(&mut self, handle: TreeHandle, immediate: bool) -> Result<(), IndexError> {
        let node = self.arena.get(handle);
        if node.place.is_none() {
            panic!("{handle} is not linked into the index");
        }
        let place = self.checked_place(&node.record)?;
        if immediate {
            let id = handle.node();
            let tree_type = node.record.tree_type();
            self.unlink(id);
            self.link(id, place);
            self.raise_watermark(tree_type, place.div);
        } else {
            self.write_generation += 1;
        }
        Ok(())
    }

    /// Swap a tree's record for a new one (a life-stage change) and relink
    /// it immediately. Returns the old record; the handle stays valid.
    pub fn replace_record(
        &mut self,
        handle: TreeHandle,
        record: TreeRecord,
    ) -> Result<TreeRecord, IndexError> {
        assert!(
            record.tree_type().is_indexed(),
            "{} trees are not indexed",
            record.tree_type()
        );
        assert!(
            self.arena.contains(handle),
            "{handle} does not name a live tree"
        );
        let place = self.checked_place(&record)?;
        let tree_type = record.tree_type();
        let id = handle.node();
        let node = self.arena.node(id);
        // Same place and height: keep the list position.
        let in_place = node.place == Some(place) && node.record.height() == record.height();
        if !in_place {
            self.unlink(id);
        }
        let old = std::mem::replace(&mut self.arena.get_mut(handle).record, record);
        if !in_place {
            self.link(id, place);
        }
        self.raise_watermark(tree_type, place.div);
        Ok(old)
    }

    /// Relocate trees whose cell or division changed, then insertion-sort
    /// every division segment and recompute the type watermarks.
    ///
    /// Relocated trees count as relinked for cursors already walking.
    /// Near-linear on nearly sorted lists; quadratic in the worst case.
    /// A resort doing more shifts than `resort_warn_factor` times the
    /// population logs a warning.
    pub fn resort(&mut self) -> ResortStats {
        let mut stats = ResortStats {
            live: self.arena.live_count(),
            ..Default::default()
        };

        let ids: Vec<NodeId> = self.arena.live_ids().collect();
        for &id in &ids {
            let node = self.arena.node(id);
            let record = &node.record;
            let want = self
                .grid
                .place_of(record.x(), record.y(), record.height());
            if node.place != Some(want) {
                self.unlink(id);
                self.link(id, want);
                stats.relocated += 1;
            }
        }

        let mut scratch: Vec<(f32, NodeId)> = Vec::new();
        for cell in 0..self.grid.cell_count() as u32 {
            if self.grid.head(cell).is_none() {
                continue;
            }
            for div in 0..self.grid.division_count() as u16 {
                if let Some(span) = self.grid.span(cell, div) {
                    stats.shifts += self.sort_segment(cell, div, span, &mut scratch);
                }
            }
        }

        self.watermarks = [None; TreeType::COUNT];
        for &id in &ids {
            let node = self.arena.node(id);
            if let Some(place) = node.place {
                self.raise_watermark(node.record.tree_type(), place.div);
            }
        }
        self.sorted_generation = self.write_generation;

        let limit = self.config.resort_warn_factor as f64 * stats.live as f64;
        if stats.shifts as f64 > limit && stats.live > 0 {
            warn!(
                shifts = stats.shifts,
                live = stats.live,
                "resort shifted far more than the population; heights changed out of order"
            );
        } else {
            debug!(
                relocated = stats.relocated,
                shifts = stats.shifts,
                live = stats.live,
                "index resorted"
            );
        }
        stats
    }

    /// Timestep boundary: resort if dirty, recycle retired slots, and
    /// advance the epoch. Every open cursor becomes stale.
    pub fn end_timestep(&mut self) -> Option<ResortStats> {
        let stats = self.is_dirty().then(|| self.resort());
        let recycled = self.arena.flush_retired();
        self.epoch += 1;
        trace!(epoch = self.epoch, recycled, "index timestep closed");
        stats
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Validate `spec` and open a cursor over it.
    pub fn open(&self, spec: QuerySpec) -> Result<TreeCursor, QueryError> {
        spec.validate(self.plot.as_ref())?;
        trace!(?spec, epoch = self.epoch, "cursor opened");
        Ok(TreeCursor::new(spec, self.epoch, self.write_generation))
    }

    /// Union of the occupied division ranges of `mask`'s types.
    pub(crate) fn division_range(&self, mask: TypeMask) -> Option<(u16, u16)> {
        mask.iter()
            .filter_map(|ty| self.watermarks[ty.index()])
            .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)))
    }

    // ── Verification ─────────────────────────────────────────────

    /// Walk every cell list and check the index invariants.
    ///
    /// Order and placement are only checked when no deferred writes are
    /// pending. Intended for tests.
    pub fn verify(&self) -> Result<(), String> {
        let strict = !self.is_dirty();
        let mut seen = 0usize;
        for cell in 0..self.grid.cell_count() as u32 {
            let mut prev: Option<NodeId> = None;
            let mut prev_height = f32::NEG_INFINITY;
            let mut prev_div: Option<u16> = None;
            let mut cursor = self.grid.head(cell);
            while let Some(id) = cursor {
                if !self.arena.is_live(id) {
                    return Err(format!("cell {cell}: retired node {} still linked", id.0));
                }
                let node = self.arena.node(id);
                if node.shorter != prev {
                    return Err(format!("cell {cell}: broken back-link at node {}", id.0));
                }
                let place = node
                    .place
                    .ok_or_else(|| format!("cell {cell}: node {} has no place", id.0))?;
                if place.cell != cell {
                    return Err(format!(
                        "cell {cell}: node {} claims cell {}",
                        id.0, place.cell
                    ));
                }
                if prev_div != Some(place.div) {
                    if prev_div.is_some_and(|d| d > place.div) {
                        return Err(format!("cell {cell}: divisions out of order"));
                    }
                    let span = self
                        .grid
                        .span(cell, place.div)
                        .ok_or_else(|| format!("cell {cell}: division {} has no span", place.div))?;
                    if span.shortest != id {
                        return Err(format!(
                            "cell {cell}: division {} span does not start at node {}",
                            place.div, id.0
                        ));
                    }
                    if let Some(p) = prev {
                        let pdiv = self.arena.node(p).place.map(|pl| pl.div);
                        if let Some(pd) = pdiv {
                            if self.grid.span(cell, pd).map(|s| s.tallest) != Some(p) {
                                return Err(format!(
                                    "cell {cell}: division {pd} span does not end at node {}",
                                    p.0
                                ));
                            }
                        }
                    }
                }
                let record = &node.record;
                if strict {
                    let want = self
                        .grid
                        .place_of(record.x(), record.y(), record.height());
                    if want != place {
                        return Err(format!("node {} is filed in the wrong place", id.0));
                    }
                    if record.height() < prev_height {
                        return Err(format!("cell {cell}: heights out of order at node {}", id.0));
                    }
                }
                match self.watermarks[record.tree_type().index()] {
                    Some((lo, hi)) if lo <= place.div && place.div <= hi => {}
                    _ => {
                        return Err(format!(
                            "node {} lies outside the {} watermark",
                            id.0,
                            record.tree_type()
                        ))
                    }
                }
                prev_height = record.height();
                prev_div = Some(place.div);
                prev = Some(id);
                seen += 1;
                if seen > self.arena.live_count() {
                    return Err(format!("cell {cell}: list does not terminate"));
                }
                cursor = node.taller;
            }
            if let (Some(p), Some(pd)) = (prev, prev_div) {
                if self.grid.span(cell, pd).map(|s| s.tallest) != Some(p) {
                    return Err(format!("cell {cell}: last division span is open"));
                }
            }
        }
        if seen != self.arena.live_count() {
            return Err(format!(
                "{seen} trees linked, {} live",
                self.arena.live_count()
            ));
        }
        let spans: usize = (0..self.grid.cell_count() as u32)
            .map(|c| {
                (0..self.grid.division_count() as u16)
                    .filter(|&d| self.grid.span(c, d).is_some())
                    .count()
            })
            .sum();
        let occupied: usize = (0..self.grid.cell_count() as u32)
            .map(|c| self.occupied_divisions(c))
            .sum();
        if spans != occupied {
            return Err(format!("{spans} spans recorded, {occupied} divisions occupied"));
        }
        Ok(())
    }

    fn occupied_divisions(&self, cell: u32) -> usize {
        let mut count = 0;
        let mut last = None;
        let mut cursor = self.grid.head(cell);
        while let Some(id) = cursor {
            let node = self.arena.node(id);
            let div = node.place.map(|p| p.div);
            if div != last {
                count += 1;
                last = div;
            }
            cursor = node.taller;
        }
        count
    }

    // ── Internals ────────────────────────────────────────────────

    fn checked_place(&self, record: &TreeRecord) -> Result<Place, IndexError> {
        let (x, y, h) = (record.x(), record.y(), record.height());
        for (what, value) in [("x", x), ("y", y), ("height", h)] {
            if !value.is_finite() {
                return Err(IndexError::NotFinite { what, value });
            }
        }
        if !self.plot.contains(x, y) {
            return Err(IndexError::OutOfPlot { x, y });
        }
        Ok(self.grid.place_of(x, y, h))
    }

    fn raise_watermark(&mut self, tree_type: TreeType, div: u16) {
        let mark = &mut self.watermarks[tree_type.index()];
        *mark = Some(match *mark {
            Some((lo, hi)) => (lo.min(div), hi.max(div)),
            None => (div, div),
        });
    }

    fn height_of(&self, id: NodeId) -> f32 {
        self.arena.node(id).record.height()
    }

    /// Splice `id` into the list of `place.cell` inside `place.div`.
    fn link(&mut self, id: NodeId, place: Place) {
        let Place { cell, div } = place;
        let height = self.height_of(id);
        let span = self.grid.span(cell, div);
        match span {
            Some(span) => {
                let low = self.height_of(span.shortest);
                let high = self.height_of(span.tallest);
                if height < low {
                    self.splice_before(id, span.shortest, cell);
                    self.grid.set_span(
                        cell,
                        div,
                        Some(Span {
                            shortest: id,
                            ..span
                        }),
                    );
                } else if height >= high {
                    self.splice_after(id, span.tallest);
                    self.grid.set_span(
                        cell,
                        div,
                        Some(Span {
                            tallest: id,
                            ..span
                        }),
                    );
                } else if height - low <= high - height {
                    // Walk up from the short end.
                    let mut at = span.shortest;
                    while let Some(next) = self.arena.node(at).taller {
                        if next == span.tallest || self.height_of(next) > height {
                            break;
                        }
                        at = next;
                    }
                    self.splice_after(id, at);
                } else {
                    // Walk down from the tall end.
                    let mut at = span.tallest;
                    while let Some(prev) = self.arena.node(at).shorter {
                        if prev == span.shortest || self.height_of(prev) <= height {
                            break;
                        }
                        at = prev;
                    }
                    self.splice_before(id, at, cell);
                }
            }
            None => {
                if let Some(below) = self.grid.span_below(cell, div) {
                    self.splice_after(id, below.tallest);
                } else if let Some(above) = self.grid.span_above(cell, div) {
                    self.splice_before(id, above.shortest, cell);
                } else {
                    let node = self.arena.node_mut(id);
                    node.shorter = None;
                    node.taller = None;
                    self.grid.set_head(cell, Some(id));
                }
                self.grid.set_span(
                    cell,
                    div,
                    Some(Span {
                        shortest: id,
                        tallest: id,
                    }),
                );
            }
        }
        self.link_clock += 1;
        let node = self.arena.node_mut(id);
        node.place = Some(place);
        node.linked_at = self.link_clock;
    }

    fn splice_after(&mut self, id: NodeId, prev: NodeId) {
        let next = self.arena.node(prev).taller;
        {
            let node = self.arena.node_mut(id);
            node.shorter = Some(prev);
            node.taller = next;
        }
        self.arena.node_mut(prev).taller = Some(id);
        if let Some(n) = next {
            self.arena.node_mut(n).shorter = Some(id);
        }
    }

    fn splice_before(&mut self, id: NodeId, next: NodeId, cell: u32) {
        let prev = self.arena.node(next).shorter;
        {
            let node = self.arena.node_mut(id);
            node.shorter = prev;
            node.taller = Some(next);
        }
        self.arena.node_mut(next).shorter = Some(id);
        match prev {
            Some(p) => self.arena.node_mut(p).taller = Some(id),
            None => self.grid.set_head(cell, Some(id)),
        }
    }

    /// Take `id` out of its list, patching neighbours, head, and span.
    ///
    /// The node keeps its own links and place so a cursor standing on it
    /// can still step to its former taller neighbour.
    fn unlink(&mut self, id: NodeId) {
        let node = self.arena.node(id);
        let Some(Place { cell, div }) = node.place else {
            return;
        };
        let (shorter, taller) = (node.shorter, node.taller);
        match shorter {
            Some(s) => self.arena.node_mut(s).taller = taller,
            None => self.grid.set_head(cell, taller),
        }
        if let Some(t) = taller {
            self.arena.node_mut(t).shorter = shorter;
        }
        if let Some(span) = self.grid.span(cell, div) {
            let span = match (span.shortest == id, span.tallest == id) {
                (true, true) => None,
                (true, false) => taller.map(|t| Span {
                    shortest: t,
                    ..span
                }),
                (false, true) => shorter.map(|s| Span {
                    tallest: s,
                    ..span
                }),
                (false, false) => Some(span),
            };
            self.grid.set_span(cell, div, span);
        }
    }

    /// Insertion-sort one division segment by height and relink it between
    /// its outer neighbours. Returns the number of shifts.
    fn sort_segment(
        &mut self,
        cell: u32,
        div: u16,
        span: Span,
        scratch: &mut Vec<(f32, NodeId)>,
    ) -> usize {
        scratch.clear();
        let mut at = Some(span.shortest);
        while let Some(id) = at {
            scratch.push((self.height_of(id), id));
            if id == span.tallest {
                break;
            }
            at = self.arena.node(id).taller;
        }

        let mut shifts = 0;
        for i in 1..scratch.len() {
            let mut j = i;
            while j > 0 && scratch[j - 1].0 > scratch[j].0 {
                scratch.swap(j - 1, j);
                j -= 1;
                shifts += 1;
            }
        }
        if shifts == 0 {
            return 0;
        }

        let outer_prev = self.arena.node(span.shortest).shorter;
        let outer_next = self.arena.node(span.tallest).taller;
        let mut prev = outer_prev;
        for &(_, id) in scratch.iter() {
            let node = self.arena.node_mut(id);
            node.shorter = prev;
            match prev {
                Some(p) => self.arena.node_mut(p).taller = Some(id),
                None => self.grid.set_head(cell, Some(id)),
            }
            prev = Some(id);
        }
        if let Some(last) = prev {
            self.arena.node_mut(last).taller = outer_next;
        }
        if let Some(n) = outer_next {
            self.arena.node_mut(n).shorter = prev;
        }
        if let (Some(&(_, first)), Some(&(_, last))) = (scratch.first(), scratch.last()) {
            self.grid.set_span(
                cell,
                div,
                Some(Span {
                    shortest: first,
                    tallest: last,
                }),
            );
        }
        shifts
    }
}

impl AsRef<TreeIndex> for TreeIndex {
    fn as_ref(&self) -> &TreeIndex {
        self
    }
}

impl std::fmt::Debug for TreeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeIndex")
            .field("config", &self.config)
            .field("live", &self.arena.live_count())
            .field("epoch", &self.epoch)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}
