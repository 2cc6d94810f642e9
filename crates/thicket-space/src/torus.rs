//! Rectangular plot with periodic (torus) boundaries on both axes.

use crate::error::PlotError;
use thicket_core::Plot;

/// A rectangular torus plot.
///
/// Both axes wrap: a point at `x = 0.5` is `1.0` away from `x = x_len - 0.5`.
/// Distance is Euclidean over the per-axis wrapped offsets.
///
/// # Examples
///
/// ```
/// use thicket_core::Plot;
/// use thicket_space::TorusPlot;
///
/// let plot = TorusPlot::new(10.0, 10.0).unwrap();
/// // (9.5, 0.5) and (1, 1) are neighbours across the corner.
/// let d = plot.distance(9.5, 0.5, 1.0, 1.0);
/// assert!((d - (1.5f32 * 1.5 + 0.5 * 0.5).sqrt()).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TorusPlot {
    x_len: f32,
    y_len: f32,
}

impl TorusPlot {
    /// Create a plot of `x_len * y_len` plot units.
    ///
    /// Returns `Err(PlotError::InvalidDimension)` if either side is zero,
    /// negative, or not finite.
    pub fn new(x_len: f32, y_len: f32) -> Result<Self, PlotError> {
        check_dimension("x_len", x_len)?;
        check_dimension("y_len", y_len)?;
        Ok(Self { x_len, y_len })
    }

    /// Bring an arbitrary coordinate back into `[0, len)` along X.
    pub fn wrap_x(&self, x: f32) -> f32 {
        wrap_axis(x, self.x_len)
    }

    /// Bring an arbitrary coordinate back into `[0, len)` along Y.
    pub fn wrap_y(&self, y: f32) -> f32 {
        wrap_axis(y, self.y_len)
    }
}

impl Plot for TorusPlot {
    fn x_len(&self) -> f32 {
        self.x_len
    }

    fn y_len(&self) -> f32 {
        self.y_len
    }

    fn distance(&self, from_x: f32, from_y: f32, to_x: f32, to_y: f32) -> f32 {
        let dx = axis_offset(from_x, to_x, self.x_len);
        let dy = axis_offset(from_y, to_y, self.y_len);
        (dx * dx + dy * dy).sqrt()
    }
}

fn check_dimension(name: &'static str, value: f32) -> Result<(), PlotError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PlotError::InvalidDimension { name, value });
    }
    Ok(())
}

/// Shortest separation of two coordinates along a wrapped axis.
pub fn axis_offset(a: f32, b: f32, len: f32) -> f32 {
    let diff = (a - b).abs() % len;
    diff.min(len - diff)
}

/// Wrap a coordinate into `[0, len)`.
pub fn wrap_axis(val: f32, len: f32) -> f32 {
    let w = val.rem_euclid(len);
    // rem_euclid can round up to exactly `len` for tiny negative inputs.
    if w >= len {
        0.0
    } else {
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn rejects_bad_dimensions() {
        assert!(TorusPlot::new(0.0, 10.0).is_err());
        assert!(TorusPlot::new(10.0, -1.0).is_err());
        assert!(TorusPlot::new(f32::NAN, 10.0).is_err());
        assert!(TorusPlot::new(10.0, f32::INFINITY).is_err());
    }

    #[test]
    fn contains_is_half_open() {
        let p = TorusPlot::new(10.0, 5.0).unwrap();
        assert!(p.contains(0.0, 0.0));
        assert!(p.contains(9.99, 4.99));
        assert!(!p.contains(10.0, 1.0));
        assert!(!p.contains(1.0, 5.0));
        assert!(!p.contains(-0.01, 1.0));
    }

    #[test]
    fn distance_wraps_both_axes() {
        let p = TorusPlot::new(10.0, 10.0).unwrap();
        assert!((p.distance(0.5, 5.0, 9.5, 5.0) - 1.0).abs() < EPS);
        assert!((p.distance(5.0, 0.5, 5.0, 9.5) - 1.0).abs() < EPS);
        // Unwrapped separation 8 is wrapped separation 2.
        assert!((p.distance(1.0, 1.0, 1.0, 9.0) - 2.0).abs() < EPS);
    }

    #[test]
    fn distance_never_exceeds_half_diagonal() {
        let p = TorusPlot::new(10.0, 6.0).unwrap();
        let max = (5.0f32 * 5.0 + 3.0 * 3.0).sqrt();
        assert!(p.distance(0.0, 0.0, 5.0, 3.0) <= max + EPS);
    }

    #[test]
    fn wrap_axis_handles_negatives() {
        assert!((wrap_axis(-0.5, 10.0) - 9.5).abs() < EPS);
        assert!((wrap_axis(10.5, 10.0) - 0.5).abs() < EPS);
        assert!(wrap_axis(-1e-9, 10.0) < 10.0);
    }

    proptest! {
        #[test]
        fn distance_reflexive(x in 0.0f32..50.0, y in 0.0f32..30.0) {
            let p = TorusPlot::new(50.0, 30.0).unwrap();
            prop_assert!(p.distance(x, y, x, y).abs() < EPS);
        }

        #[test]
        fn distance_symmetric(
            ax in 0.0f32..50.0, ay in 0.0f32..30.0,
            bx in 0.0f32..50.0, by in 0.0f32..30.0,
        ) {
            let p = TorusPlot::new(50.0, 30.0).unwrap();
            prop_assert!((p.distance(ax, ay, bx, by) - p.distance(bx, by, ax, ay)).abs() < EPS);
        }

        #[test]
        fn distance_triangle_inequality(
            ax in 0.0f32..50.0, ay in 0.0f32..30.0,
            bx in 0.0f32..50.0, by in 0.0f32..30.0,
            cx in 0.0f32..50.0, cy in 0.0f32..30.0,
        ) {
            let p = TorusPlot::new(50.0, 30.0).unwrap();
            let dac = p.distance(ax, ay, cx, cy);
            let dab = p.distance(ax, ay, bx, by);
            let dbc = p.distance(bx, by, cx, cy);
            prop_assert!(dac <= dab + dbc + 1e-3);
        }

        #[test]
        fn distance_is_min_over_wrapped_copies(
            ax in 0.0f32..20.0, ay in 0.0f32..12.0,
            bx in 0.0f32..20.0, by in 0.0f32..12.0,
        ) {
            let p = TorusPlot::new(20.0, 12.0).unwrap();
            let mut best = f32::INFINITY;
            for kx in -1..=1 {
                for ky in -1..=1 {
                    let dx = ax - (bx + kx as f32 * 20.0);
                    let dy = ay - (by + ky as f32 * 12.0);
                    best = best.min((dx * dx + dy * dy).sqrt());
                }
            }
            prop_assert!((p.distance(ax, ay, bx, by) - best).abs() < 1e-3);
        }
    }
}
