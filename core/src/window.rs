//! Adaptive raster window estimation.
//!
//! The window is derived from the weighted position covariance of the particle
//! set. Its extent follows the dominant principal axis:
//!
//! ```text
//! size = clamp(sigma_scale * sqrt(max(λ_max, EIGEN_FLOOR)) * (1 + crop_margin), min_window, max_window)
//! ```
//!
//! and its orientation is the angle of the dominant eigenvector. The square
//! grid always has `grid_size` cells per side, so `scale = size / grid_size`.
use nalgebra::linalg::SymmetricEigen;
use nalgebra::{Matrix2, Vector2};

use crate::particle::Particle;

/// Floor applied to both covariance eigenvalues before taking square roots.
pub const EIGEN_FLOOR: f64 = 1e-8;

/// Spatial region mapped onto the grid for a single rasterisation call.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterWindow {
    pub center: Vector2<f64>,
    /// Full side length of the square window (metres).
    pub size: f64,
    pub grid_size: usize,
    /// Cell side length, `size / grid_size`.
    pub scale: f64,
    /// Rotation whose first column is the dominant eigenvector and second the minor one.
    pub axes: Matrix2<f64>,
    pub max_eigen: f64,
    pub min_eigen: f64,
    /// Orientation of the dominant axis (radians).
    pub angle: f64,
}

impl RasterWindow {
    /// Standard deviation along the dominant axis.
    pub fn major_sigma(&self) -> f64 {
        self.max_eigen.sqrt()
    }

    pub fn minor_sigma(&self) -> f64 {
        self.min_eigen.sqrt()
    }

    /// Maps a world position to its (column, row) cell, or `None` when it falls outside the grid.
    ///
    /// With `align_axes` the offset from the center is expressed in the principal frame first.
    pub fn cell_of(&self, position: &Vector2<f64>, align_axes: bool) -> Option<(usize, usize)> {
        let mut rel = position - self.center;
        if align_axes {
            rel = self.axes.transpose() * rel;
        }
        let half = self.size / 2.0;
        let u = ((rel.x + half) / self.scale).floor();
        let v = ((rel.y + half) / self.scale).floor();
        let n = self.grid_size as f64;
        // NaN fails both comparisons and is dropped with the out-of-range particles.
        if u >= 0.0 && u < n && v >= 0.0 && v < n {
            Some((u as usize, v as usize))
        } else {
            None
        }
    }
}

/// Parameters read by the estimator; a view onto [`crate::config::RasterConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowParams {
    pub grid_size: usize,
    pub min_window: f64,
    pub max_window: f64,
    pub sigma_scale: f64,
    pub crop_margin: f64,
    pub adaptive: bool,
}

/// Weighted mean and weighted covariance of the finite particles.
///
/// Both are zero when the total weight is not positive or overflows. The mean is
/// accumulated from normalized weights so that it stays finite for any finite
/// positions; the covariance may still overflow for extreme spreads.
pub fn weighted_moments(particles: &[Particle]) -> (Vector2<f64>, Matrix2<f64>, f64) {
    let total_weight: f64 = particles
        .iter()
        .filter(|p| p.is_finite())
        .map(|p| p.weight)
        .sum();
    if !(total_weight > 0.0 && total_weight.is_finite()) {
        return (Vector2::zeros(), Matrix2::zeros(), total_weight);
    }
    let mut mean = Vector2::<f64>::zeros();
    for particle in particles.iter().filter(|p| p.is_finite()) {
        mean += particle.position * (particle.weight / total_weight);
    }
    if !(mean.x.is_finite() && mean.y.is_finite()) {
        return (Vector2::zeros(), Matrix2::zeros(), total_weight);
    }
    let mut cov = Matrix2::<f64>::zeros();
    for particle in particles.iter().filter(|p| p.is_finite()) {
        let d = particle.position - mean;
        cov += (particle.weight / total_weight) * d * d.transpose();
    }
    (mean, cov, total_weight)
}

/// Eigen-decomposition of a symmetric 2x2 covariance with the eigenvalue floor applied.
///
/// Returns `(max_eigen, min_eigen, axes)` where `axes` is a proper rotation with the
/// dominant eigenvector in its first column. A covariance that overflowed is treated
/// as an unbounded isotropic spread: both eigenvalues saturate at `f64::MAX`.
fn principal_axes(cov: &Matrix2<f64>) -> (f64, f64, Matrix2<f64>) {
    if !cov.iter().all(|v| v.is_finite()) {
        return (f64::MAX, f64::MAX, Matrix2::identity());
    }
    let symmetric = 0.5 * (cov + cov.transpose());
    let se = SymmetricEigen::new(symmetric);
    let (major, minor) = if se.eigenvalues[0] >= se.eigenvalues[1] {
        (0, 1)
    } else {
        (1, 0)
    };
    let max_eigen = se.eigenvalues[major].max(EIGEN_FLOOR);
    let min_eigen = se.eigenvalues[minor].max(EIGEN_FLOOR);
    let mut direction: Vector2<f64> = se.eigenvectors.column(major).into_owned();
    let norm = direction.norm();
    if norm.is_finite() && norm > 0.0 {
        direction /= norm;
    } else {
        direction = Vector2::x();
    }
    let perpendicular = Vector2::new(-direction.y, direction.x);
    let axes = Matrix2::from_columns(&[direction, perpendicular]);
    (max_eigen, min_eigen, axes)
}

/// Estimate the raster window for a particle set.
///
/// Pure function of the particles and `params`. An empty or weightless set yields a
/// window centered at the origin with the floor extent.
pub fn estimate_window(particles: &[Particle], params: &WindowParams) -> RasterWindow {
    let (center, cov, _) = weighted_moments(particles);
    let (max_eigen, min_eigen, axes) = principal_axes(&cov);
    let size = if params.adaptive {
        let extent = params.sigma_scale * max_eigen.sqrt() * (1.0 + params.crop_margin);
        if extent.is_nan() {
            params.max_window
        } else {
            extent.clamp(params.min_window, params.max_window)
        }
    } else {
        params.max_window
    };
    let grid_size = params.grid_size.max(1);
    RasterWindow {
        center,
        size,
        grid_size,
        scale: size / grid_size as f64,
        axes,
        max_eigen,
        min_eigen,
        angle: axes[(1, 0)].atan2(axes[(0, 0)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn params() -> WindowParams {
        WindowParams {
            grid_size: 32,
            min_window: 0.5,
            max_window: 100.0,
            sigma_scale: 6.0,
            crop_margin: 0.0,
            adaptive: true,
        }
    }

    #[test]
    fn empty_set_gives_origin_window_with_floor_size() {
        let w = estimate_window(&[], &params());
        assert_eq!(w.center, Vector2::zeros());
        assert_eq!(w.size, 0.5);
        assert_eq!(w.grid_size, 32);
        assert_approx_eq!(w.scale, 0.5 / 32.0);
        assert_eq!(w.max_eigen, EIGEN_FLOOR);
        assert_eq!(w.min_eigen, EIGEN_FLOOR);
        assert!(w.angle.is_finite());
    }

    #[test]
    fn zero_weight_set_is_treated_as_empty() {
        let particles = vec![Particle::new(5.0, 5.0, 0.0, 0.0), Particle::new(-3.0, 1.0, 0.0, 0.0)];
        let w = estimate_window(&particles, &params());
        assert_eq!(w.center, Vector2::zeros());
        assert_eq!(w.size, 0.5);
    }

    #[test]
    fn dominant_axis_follows_elongation() {
        // Spread along the diagonal y = x.
        let particles: Vec<Particle> = (-10..=10)
            .map(|i| Particle::new(i as f64 * 0.3, i as f64 * 0.3, 0.0, 1.0))
            .collect();
        let w = estimate_window(&particles, &params());
        let angle = w.angle.rem_euclid(std::f64::consts::PI);
        assert_approx_eq!(angle, std::f64::consts::FRAC_PI_4, 1e-9);
        assert!(w.max_eigen > w.min_eigen);
        assert_approx_eq!(w.axes.determinant(), 1.0, 1e-12);
        assert_approx_eq!(w.size, 6.0 * w.max_eigen.sqrt(), 1e-12);
    }

    #[test]
    fn size_is_clamped_to_max_window() {
        let particles = vec![Particle::new(-500.0, 0.0, 0.0, 1.0), Particle::new(500.0, 0.0, 0.0, 1.0)];
        let w = estimate_window(&particles, &params());
        assert_eq!(w.size, 100.0);
    }

    #[test]
    fn crop_margin_enlarges_extent() {
        let particles = vec![Particle::new(-1.0, 0.0, 0.0, 1.0), Particle::new(1.0, 0.0, 0.0, 1.0)];
        let base = estimate_window(&particles, &params());
        let mut p = params();
        p.crop_margin = 0.5;
        let grown = estimate_window(&particles, &p);
        assert_approx_eq!(grown.size, base.size * 1.5, 1e-12);
    }

    #[test]
    fn fixed_window_uses_max_extent() {
        let particles = vec![Particle::new(-1.0, 0.0, 0.0, 1.0), Particle::new(1.0, 0.0, 0.0, 1.0)];
        let mut p = params();
        p.adaptive = false;
        let w = estimate_window(&particles, &p);
        assert_eq!(w.size, 100.0);
        assert_approx_eq!(w.scale, 100.0 / 32.0);
    }

    #[test]
    fn overflowing_positions_keep_the_window_finite() {
        let far = vec![Particle::new(1e308, 0.0, 0.0, 10.0), Particle::new(1e308, 0.0, 0.0, 10.0)];
        let w = estimate_window(&far, &params());
        assert_eq!(w.center, Vector2::new(1e308, 0.0));
        assert_eq!(w.size, 0.5);

        let spread = vec![Particle::new(1e200, -1e200, 0.0, 1.0), Particle::new(-1e200, 1e200, 0.0, 1.0)];
        let w = estimate_window(&spread, &params());
        assert!(w.center.iter().all(|v| v.is_finite()));
        assert_eq!(w.size, 100.0);
        assert!(w.max_eigen.is_finite() && w.angle.is_finite());
    }

    #[test]
    fn overflowing_total_weight_is_treated_as_empty() {
        let heavy = vec![Particle::new(3.0, 0.0, 0.0, f64::MAX), Particle::new(5.0, 0.0, 0.0, f64::MAX)];
        let (mean, cov, total) = weighted_moments(&heavy);
        assert!(total.is_infinite());
        assert_eq!(mean, Vector2::zeros());
        assert_eq!(cov, Matrix2::zeros());
    }

    #[test]
    fn cell_of_center_is_middle_cell() {
        let w = estimate_window(&[Particle::new(2.0, -1.0, 0.0, 1.0)], &params());
        assert_eq!(w.cell_of(&Vector2::new(2.0, -1.0), false), Some((16, 16)));
        assert_eq!(w.cell_of(&Vector2::new(20.0, -1.0), false), None);
        assert_eq!(w.cell_of(&Vector2::new(f64::NAN, 0.0), false), None);
    }
}
