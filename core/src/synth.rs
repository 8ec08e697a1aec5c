//! Seeded synthetic particle clouds for experiments and tests.
use std::f64::consts::PI;

use nalgebra::{Matrix2, Vector2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{RasterError, Result};
use crate::particle::Particle;

/// `n` equally weighted particles uniform over `[-half_extent, half_extent]²`
/// with uniform headings. Weights sum to one.
pub fn uniform_square(n: usize, half_extent: f64, seed: u64) -> Vec<Particle> {
    let half_extent = if half_extent.is_finite() { half_extent.abs() } else { 0.0 };
    let mut rng = StdRng::seed_from_u64(seed);
    let weight = if n == 0 { 0.0 } else { 1.0 / n as f64 };
    (0..n)
        .map(|_| {
            Particle::new(
                rng.random_range(-half_extent..=half_extent),
                rng.random_range(-half_extent..=half_extent),
                rng.random_range(-PI..PI),
                weight,
            )
        })
        .collect()
}

/// Anisotropic Gaussian position cloud with a wrapped-normal heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianCloud {
    pub center: Vector2<f64>,
    /// Standard deviation along the major axis.
    pub sigma_major: f64,
    pub sigma_minor: f64,
    /// Angle of the major axis from +x (radians).
    pub orientation: f64,
    pub heading: f64,
    pub heading_std: f64,
}

impl Default for GaussianCloud {
    fn default() -> Self {
        GaussianCloud {
            center: Vector2::zeros(),
            sigma_major: 1.0,
            sigma_minor: 1.0,
            orientation: 0.0,
            heading: 0.0,
            heading_std: 0.1,
        }
    }
}

impl GaussianCloud {
    /// Position covariance `R diag(σ₁², σ₂²) Rᵀ`.
    pub fn covariance(&self) -> Matrix2<f64> {
        let (s, c) = self.orientation.sin_cos();
        let rotation = Matrix2::new(c, -s, s, c);
        let diag = Matrix2::new(self.sigma_major.powi(2), 0.0, 0.0, self.sigma_minor.powi(2));
        rotation * diag * rotation.transpose()
    }

    /// Draw `n` equally weighted particles. Every particle carries the cloud covariance.
    pub fn sample(&self, n: usize, seed: u64) -> Result<Vec<Particle>> {
        // `Normal::new` accepts a negative deviation and mirrors the draws.
        let normal = |std: f64, what: &str| {
            if !(std.is_finite() && std >= 0.0) {
                return Err(RasterError::InvalidConfig(format!(
                    "{what} must be finite and non-negative, got {std}"
                )));
            }
            Normal::new(0.0, std).map_err(|e| RasterError::InvalidConfig(format!("{what}: {e}")))
        };
        let major = normal(self.sigma_major, "sigma_major")?;
        let minor = normal(self.sigma_minor, "sigma_minor")?;
        let heading = normal(self.heading_std, "heading_std")?;

        let mut rng = StdRng::seed_from_u64(seed);
        let (s, c) = self.orientation.sin_cos();
        let covariance = self.covariance();
        let weight = if n == 0 { 0.0 } else { 1.0 / n as f64 };
        let particles = (0..n)
            .map(|_| {
                let a = major.sample(&mut rng);
                let b = minor.sample(&mut rng);
                let yaw = (self.heading + heading.sample(&mut rng) + PI).rem_euclid(2.0 * PI) - PI;
                Particle::new(
                    self.center.x + c * a - s * b,
                    self.center.y + s * a + c * b,
                    yaw,
                    weight,
                )
                .with_covariance(covariance)
            })
            .collect();
        Ok(particles)
    }
}
