//! One-dimensional interpolants for expected power curves.
//!
//! Builds a callable function through (median wind speed, mean power) knots.
//! Three kinds: piecewise linear, quadratic spline (C1), and natural cubic
//! spline (tridiagonal solve for the second derivatives). Out-of-range
//! queries extrapolate by extending the end segment's polynomial; the model
//! layer bounds the result with the per-turbine cap at prediction time, so
//! the interpolant itself never clamps.
//!
//! Knot sets degraded by data sparsity are handled silently: one knot gives a
//! constant function, two knots fall back to linear whatever the requested
//! kind.

use crate::config::InterpolationKind;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum InterpolateError {
    #[error("cannot interpolate over an empty knot set")]
    Empty,

    #[error("interpolation knots must be finite")]
    NonFinite,
}

/// A fitted interpolant over strictly increasing knots.
#[derive(Debug, Clone)]
pub struct Interpolator {
    kind: InterpolationKind,
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Per-knot coefficients: first derivatives for quadratic, second
    /// derivatives for cubic, unused for linear.
    coeffs: Vec<f64>,
}

impl Interpolator {
    /// Fit an interpolant of the requested kind through `(x, y)` knots.
    ///
    /// Knots are sorted by `x`; duplicate abscissae keep the first value.
    /// With fewer than three knots the kind silently degrades (constant or
    /// linear).
    pub fn new(xs: &[f64], ys: &[f64], kind: InterpolationKind) -> Result<Self, InterpolateError> {
        debug_assert_eq!(xs.len(), ys.len());
        if xs.is_empty() {
            return Err(InterpolateError::Empty);
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(InterpolateError::NonFinite);
        }

        let mut knots: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        knots.sort_by(|a, b| a.0.total_cmp(&b.0));
        knots.dedup_by(|next, prev| next.0 == prev.0);

        let xs: Vec<f64> = knots.iter().map(|&(x, _)| x).collect();
        let ys: Vec<f64> = knots.iter().map(|&(_, y)| y).collect();

        let kind = if xs.len() <= 2 && kind != InterpolationKind::Linear {
            debug!(
                knots = xs.len(),
                requested = %kind,
                "too few knots for spline interpolation, degrading to linear"
            );
            InterpolationKind::Linear
        } else {
            kind
        };

        let coeffs = match kind {
            InterpolationKind::Linear => Vec::new(),
            InterpolationKind::Quadratic => quadratic_slopes(&xs, &ys),
            InterpolationKind::Cubic => cubic_second_derivatives(&xs, &ys),
        };

        Ok(Self {
            kind,
            xs,
            ys,
            coeffs,
        })
    }

    /// Effective interpolation kind (after any sparsity degradation).
    pub fn kind(&self) -> InterpolationKind {
        self.kind
    }

    /// Number of knots the interpolant was fitted through.
    pub fn knot_count(&self) -> usize {
        self.xs.len()
    }

    /// Evaluate at `x`. Queries outside the knot range extrapolate.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }

        // Segment index: end segments extend to cover extrapolation.
        let i = self
            .xs
            .partition_point(|&knot| knot <= x)
            .saturating_sub(1)
            .min(n - 2);
        let dx = x - self.xs[i];
        let h = self.xs[i + 1] - self.xs[i];

        match self.kind {
            InterpolationKind::Linear => {
                let slope = (self.ys[i + 1] - self.ys[i]) / h;
                self.ys[i] + slope * dx
            }
            InterpolationKind::Quadratic => {
                let z = &self.coeffs;
                self.ys[i] + z[i] * dx + (z[i + 1] - z[i]) / (2.0 * h) * dx * dx
            }
            InterpolationKind::Cubic => {
                let c = &self.coeffs;
                let b = (self.ys[i + 1] - self.ys[i]) / h - h * (c[i + 1] + 2.0 * c[i]) / 3.0;
                let d = (c[i + 1] - c[i]) / (3.0 * h);
                self.ys[i] + b * dx + c[i] * dx * dx + d * dx * dx * dx
            }
        }
    }
}

/// First derivatives at the knots for a C1 quadratic spline. The first
/// segment starts with the secant slope; each subsequent knot derivative
/// follows from derivative continuity.
fn quadratic_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut z = vec![0.0; n];
    z[0] = (ys[1] - ys[0]) / (xs[1] - xs[0]);
    for i in 0..n - 1 {
        let h = xs[i + 1] - xs[i];
        z[i + 1] = 2.0 * (ys[i + 1] - ys[i]) / h - z[i];
    }
    z
}

/// Natural cubic spline second derivatives (tridiagonal solve).
fn cubic_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n < 3 {
        return vec![0.0; n];
    }

    let nm1 = n - 1;
    let mut h = vec![0.0; nm1];
    for i in 0..nm1 {
        h[i] = xs[i + 1] - xs[i];
    }

    let mut alpha = vec![0.0; nm1];
    for i in 1..nm1 {
        alpha[i] = 3.0 / h[i] * (ys[i + 1] - ys[i]) - 3.0 / h[i - 1] * (ys[i] - ys[i - 1]);
    }

    let mut l = vec![1.0; n];
    let mut mu = vec![0.0; n];
    let mut z = vec![0.0; n];
    for i in 1..nm1 {
        l[i] = 2.0 * (xs[i + 1] - xs[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }

    let mut c = vec![0.0; n];
    for j in (0..nm1).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [InterpolationKind; 3] = [
        InterpolationKind::Linear,
        InterpolationKind::Quadratic,
        InterpolationKind::Cubic,
    ];

    #[test]
    fn all_kinds_reproduce_knots() {
        let xs = [1.0, 2.0, 3.5, 5.0, 7.0];
        let ys = [0.0, 10.0, 45.0, 80.0, 95.0];
        for kind in KINDS {
            let interp = Interpolator::new(&xs, &ys, kind).expect("valid in test");
            for (&x, &y) in xs.iter().zip(ys.iter()) {
                assert!(
                    (interp.eval(x) - y).abs() < 1e-9,
                    "{kind} interpolant misses knot ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn linear_midpoints_and_extrapolation() {
        let interp =
            Interpolator::new(&[0.0, 1.0, 2.0], &[0.0, 10.0, 30.0], InterpolationKind::Linear)
                .expect("valid in test");
        assert!((interp.eval(0.5) - 5.0).abs() < 1e-12);
        assert!((interp.eval(1.5) - 20.0).abs() < 1e-12);
        // End-segment slopes continue past the range.
        assert!((interp.eval(-1.0) - -10.0).abs() < 1e-12);
        assert!((interp.eval(3.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn cubic_is_smooth_on_straight_line() {
        // A line is its own natural cubic spline.
        let xs: Vec<f64> = (0..6).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 1.0).collect();
        let interp = Interpolator::new(&xs, &ys, InterpolationKind::Cubic).expect("valid in test");
        for i in 0..=50 {
            let x = f64::from(i) * 0.1;
            assert!((interp.eval(x) - (3.0 * x + 1.0)).abs() < 1e-9);
        }
        // Extrapolation continues the end polynomial, which is the line.
        assert!((interp.eval(7.0) - 22.0).abs() < 1e-9);
    }

    #[test]
    fn quadratic_matches_hand_computed_segments() {
        // Knots of y = x^2 at x = 0, 1, 2. The derivative chain seeded with
        // the first secant gives z = [1, 1, 5].
        let interp =
            Interpolator::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 4.0], InterpolationKind::Quadratic)
                .expect("valid in test");
        // Segment [0, 1): q(dx) = dx.
        assert!((interp.eval(0.5) - 0.5).abs() < 1e-12);
        // Segment [1, 2): q(dx) = 1 + dx + 2 dx^2.
        assert!((interp.eval(1.5) - 2.0).abs() < 1e-12);
        // Extrapolation continues the last segment: x = 3 -> 1 + 2 + 8.
        assert!((interp.eval(3.0) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn sparse_knots_degrade_silently() {
        for kind in KINDS {
            let single = Interpolator::new(&[2.0], &[40.0], kind).expect("valid in test");
            assert_eq!(single.eval(0.0), 40.0);
            assert_eq!(single.eval(100.0), 40.0);

            let pair = Interpolator::new(&[0.0, 2.0], &[0.0, 20.0], kind).expect("valid in test");
            assert_eq!(pair.kind(), InterpolationKind::Linear);
            assert!((pair.eval(1.0) - 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_knots_rejected() {
        assert!(matches!(
            Interpolator::new(&[], &[], InterpolationKind::Linear),
            Err(InterpolateError::Empty)
        ));
    }

    #[test]
    fn unsorted_knots_are_sorted() {
        let interp =
            Interpolator::new(&[2.0, 0.0, 1.0], &[20.0, 0.0, 10.0], InterpolationKind::Linear)
                .expect("valid in test");
        assert!((interp.eval(0.5) - 5.0).abs() < 1e-12);
    }
}
