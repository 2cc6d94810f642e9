//! Cell and height-division arithmetic plus the per-cell list anchors.
//!
//! The plot is cut into square cells of a power-of-two edge length, laid
//! out flat in x-major order (`flat = cx * ny + cy`). When the plot length
//! is not a multiple of the cell length the last cell along an axis is
//! short; every extent computed here uses the real bounds.

use smallvec::SmallVec;

use crate::arena::Place;
use crate::config::IndexConfig;
use crate::handle::NodeId;

/// Shortest and tallest tree of one height division within a cell list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) shortest: NodeId,
    pub(crate) tallest: NodeId,
}

/// Cells along one axis within reach of a coordinate, with their gap.
pub(crate) type AxisCells = SmallVec<[(u32, f32); 16]>;

#[derive(Debug)]
pub(crate) struct Grid {
    shift: u32,
    cell_len: f32,
    nx: u32,
    ny: u32,
    x_len: f32,
    y_len: f32,
    div_size: f32,
    ndivs: usize,
    /// Shortest tree of each cell list.
    heads: Vec<Option<NodeId>>,
    /// Division spans, flat at `cell * ndivs + div`.
    spans: Vec<Option<Span>>,
}

impl Grid {
    pub(crate) fn new(config: &IndexConfig, x_len: f32, y_len: f32) -> Self {
        let cell_len = config.cell_length as f32;
        let nx = ((x_len / cell_len).ceil() as u32).max(1);
        let ny = ((y_len / cell_len).ceil() as u32).max(1);
        let ndivs = config.division_count();
        let cells = nx as usize * ny as usize;
        Self {
            shift: config.cell_shift(),
            cell_len,
            nx,
            ny,
            x_len,
            y_len,
            div_size: config.height_division,
            ndivs,
            heads: vec![None; cells],
            spans: vec![None; cells * ndivs],
        }
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.heads.len()
    }

    pub(crate) fn division_count(&self) -> usize {
        self.ndivs
    }

    pub(crate) fn dims(&self) -> (u32, u32) {
        (self.nx, self.ny)
    }

    /// Division of a height; heights at or below zero land in division 0,
    /// heights above the configured maximum in the last one.
    pub(crate) fn div_of(&self, height: f32) -> u16 {
        if height.is_nan() || height <= 0.0 {
            return 0;
        }
        let d = (height / self.div_size).floor() as usize;
        d.min(self.ndivs - 1) as u16
    }

    fn axis_cell(&self, v: f32, n: u32) -> u32 {
        ((v as u32) >> self.shift).min(n - 1)
    }

    /// Flat cell holding the point.
    pub(crate) fn cell_of(&self, x: f32, y: f32) -> u32 {
        let cx = self.axis_cell(x, self.nx);
        let cy = self.axis_cell(y, self.ny);
        cx * self.ny + cy
    }

    pub(crate) fn place_of(&self, x: f32, y: f32, height: f32) -> Place {
        Place {
            cell: self.cell_of(x, y),
            div: self.div_of(height),
        }
    }

    pub(crate) fn head(&self, cell: u32) -> Option<NodeId> {
        self.heads[cell as usize]
    }

    pub(crate) fn set_head(&mut self, cell: u32, head: Option<NodeId>) {
        self.heads[cell as usize] = head;
    }

    pub(crate) fn span(&self, cell: u32, div: u16) -> Option<Span> {
        self.spans[self.span_slot(cell, div)]
    }

    pub(crate) fn set_span(&mut self, cell: u32, div: u16, span: Option<Span>) {
        let slot = self.span_slot(cell, div);
        self.spans[slot] = span;
    }

    fn span_slot(&self, cell: u32, div: u16) -> usize {
        cell as usize * self.ndivs + div as usize
    }

    /// First non-empty division in `lo..=hi` of a cell.
    pub(crate) fn first_span_from(&self, cell: u32, lo: u16, hi: u16) -> Option<Span> {
        (lo..=hi).find_map(|d| self.span(cell, d))
    }

    /// Nearest non-empty division strictly below `div`.
    pub(crate) fn span_below(&self, cell: u32, div: u16) -> Option<Span> {
        (0..div).rev().find_map(|d| self.span(cell, d))
    }

    /// Nearest non-empty division strictly above `div`.
    pub(crate) fn span_above(&self, cell: u32, div: u16) -> Option<Span> {
        let last = (self.ndivs - 1) as u16;
        if div >= last {
            return None;
        }
        (div + 1..=last).find_map(|d| self.span(cell, d))
    }

    /// Cells of a distance search: every cell whose rectangle comes within
    /// `radius` of the anchor on the torus.
    ///
    /// Rows are taken along Y; within a row the X reach shrinks to
    /// `sqrt(r² - gap²)` where `gap` is the row's distance from the anchor.
    pub(crate) fn radius_cells(&self, x: f32, y: f32, radius: f32) -> Vec<u32> {
        let rows = axis_candidates(y, radius, self.y_len, self.cell_len, self.ny);
        let mut cells = Vec::new();
        for &(cy, gap) in &rows {
            let reach = (radius * radius - gap * gap).max(0.0).sqrt();
            for (cx, _) in axis_candidates(x, reach, self.x_len, self.cell_len, self.nx) {
                cells.push(cx * self.ny + cy);
            }
        }
        cells.sort_unstable();
        cells
    }
}

/// Torus distance from `a` to the band `[lo, hi)`; zero inside the band.
pub(crate) fn band_gap(a: f32, lo: f32, hi: f32, len: f32) -> f32 {
    if a >= lo && a < hi {
        return 0.0;
    }
    thicket_space::axis_offset(a, lo, len).min(thicket_space::axis_offset(a, hi, len))
}

/// Cells along one axis of `n` cells whose band lies within `r` of `a`.
///
/// Walks outward from the cell holding `a` in both wrapped directions and
/// stops at the first band out of reach. When the reach covers the whole
/// axis every cell is returned.
pub(crate) fn axis_candidates(a: f32, r: f32, len: f32, cell_len: f32, n: u32) -> AxisCells {
    let band = |i: u32| {
        let lo = i as f32 * cell_len;
        let hi = (lo + cell_len).min(len);
        band_gap(a, lo, hi, len)
    };
    if 2.0 * r >= len {
        return (0..n).map(|i| (i, band(i))).collect();
    }
    let home = ((a / cell_len) as u32).min(n - 1);
    let mut out: AxisCells = SmallVec::new();
    out.push((home, 0.0));
    for dir in [1, n - 1] {
        for step in 1..n {
            let i = (home + dir * step) % n;
            if out.iter().any(|&(c, _)| c == i) {
                break;
            }
            let gap = band(i);
            if gap > r {
                break;
            }
            out.push((i, gap));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid(x_len: f32, y_len: f32, cell_length: u32) -> Grid {
        let config = IndexConfig {
            cell_length,
            max_tree_height: 10.0,
            ..Default::default()
        };
        Grid::new(&config, x_len, y_len)
    }

    #[test]
    fn short_edge_cells_are_counted() {
        let g = grid(10.0, 20.0, 8);
        assert_eq!(g.dims(), (2, 3));
        assert_eq!(g.cell_count(), 6);
        assert_eq!(g.cell_of(9.9, 19.9), 5);
        assert_eq!(g.cell_of(0.0, 8.0), 1);
        assert_eq!(g.cell_of(8.0, 0.0), 3);
    }

    #[test]
    fn divisions_clamp_at_both_ends() {
        let g = grid(16.0, 16.0, 8);
        assert_eq!(g.division_count(), 11);
        assert_eq!(g.div_of(-1.0), 0);
        assert_eq!(g.div_of(0.99), 0);
        assert_eq!(g.div_of(1.0), 1);
        assert_eq!(g.div_of(10.0), 10);
        assert_eq!(g.div_of(500.0), 10);
    }

    #[test]
    fn band_gap_wraps() {
        // Band [8, 10) on a 10-long axis; 0.5 is half a unit past its end.
        assert!((band_gap(0.5, 8.0, 10.0, 10.0) - 0.5).abs() < 1e-6);
        assert_eq!(band_gap(9.0, 8.0, 10.0, 10.0), 0.0);
        assert!((band_gap(3.0, 8.0, 10.0, 10.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn axis_candidates_cross_the_seam() {
        let cells = axis_candidates(9.5, 3.0, 10.0, 8.0, 2);
        let mut ids: Vec<u32> = cells.iter().map(|c| c.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn axis_candidates_include_boundary_cell() {
        // Anchor at 4 on a 64-long axis, reach 4: cell [8, 16) starts exactly
        // at the limit and the wrapped cell [56, 64) ends there.
        let cells = axis_candidates(4.0, 4.0, 64.0, 8.0, 8);
        let mut ids: Vec<u32> = cells.iter().map(|c| c.0).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 7]);
    }

    #[test]
    fn radius_cells_cover_whole_plot_for_huge_radius() {
        let g = grid(24.0, 24.0, 8);
        assert_eq!(g.radius_cells(3.0, 3.0, 100.0), (0..9).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn candidates_match_brute_force(
            len in 5.0f32..90.0,
            a_frac in 0.0f32..1.0,
            r in 0.0f32..50.0,
        ) {
            let cell_len = 8.0;
            let n = ((len / cell_len).ceil() as u32).max(1);
            let a = (a_frac * len).min(len - 1e-3);
            let got: std::collections::BTreeSet<u32> =
                axis_candidates(a, r, len, cell_len, n).iter().map(|c| c.0).collect();
            for i in 0..n {
                let lo = i as f32 * cell_len;
                let hi = (lo + cell_len).min(len);
                if band_gap(a, lo, hi, len) <= r {
                    prop_assert!(got.contains(&i), "cell {} missing", i);
                }
            }
        }
    }
}
