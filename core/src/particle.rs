//! Weighted pose hypotheses as supplied by an upstream localization filter.
//!
//! The engine only ever borrows a particle slice for the duration of one call;
//! no particle identity survives between calls.
use nalgebra::{Matrix2, Vector2};
use std::fmt::{self, Display};

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Planar position in the world frame (metres).
    pub position: Vector2<f64>,
    /// Heading (radians).
    pub yaw: f64,
    /// Importance weight. Weights need not be normalized.
    pub weight: f64,
    /// Row-major flattened 2x2 position covariance `[xx, xy, yx, yy]`.
    pub covariance: [f64; 4],
    pub confidence: f64,
    /// Caller-defined timestamp.
    pub timestamp: i64,
    pub features: Option<Vec<f64>>,
}

impl Default for Particle {
    fn default() -> Self {
        Particle {
            position: Vector2::zeros(),
            yaw: 0.0,
            weight: 0.0,
            covariance: [0.0; 4],
            confidence: 1.0,
            timestamp: 0,
            features: None,
        }
    }
}

impl Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("x", &self.position.x)
            .field("y", &self.position.y)
            .field("yaw", &self.yaw)
            .field("weight", &self.weight)
            .field("confidence", &self.confidence)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl Particle {
    pub fn new(x: f64, y: f64, yaw: f64, weight: f64) -> Particle {
        Particle {
            position: Vector2::new(x, y),
            yaw,
            weight,
            ..Default::default()
        }
    }

    pub fn with_covariance(mut self, covariance: Matrix2<f64>) -> Particle {
        self.covariance = [
            covariance[(0, 0)],
            covariance[(0, 1)],
            covariance[(1, 0)],
            covariance[(1, 1)],
        ];
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Particle {
        self.timestamp = timestamp;
        self
    }

    pub fn covariance_matrix(&self) -> Matrix2<f64> {
        Matrix2::new(
            self.covariance[0],
            self.covariance[1],
            self.covariance[2],
            self.covariance[3],
        )
    }

    /// A particle is usable for statistics only if its position, heading and weight are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.x.is_finite()
            && self.position.y.is_finite()
            && self.yaw.is_finite()
            && self.weight.is_finite()
    }
}

/// Sum of the raw weights of all finite particles.
pub fn total_weight(particles: &[Particle]) -> f64 {
    particles
        .iter()
        .filter(|p| p.is_finite())
        .map(|p| p.weight)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covariance_round_trips_through_matrix() {
        let cov = Matrix2::new(2.0, 0.5, 0.5, 1.0);
        let p = Particle::new(1.0, 2.0, 0.3, 0.5).with_covariance(cov);
        assert_eq!(p.covariance, [2.0, 0.5, 0.5, 1.0]);
        assert_eq!(p.covariance_matrix(), cov);
    }

    #[test]
    fn total_weight_skips_non_finite() {
        let particles = vec![
            Particle::new(0.0, 0.0, 0.0, 0.25),
            Particle::new(f64::NAN, 0.0, 0.0, 0.5),
            Particle::new(1.0, 1.0, 0.0, 0.75),
        ];
        assert_eq!(total_weight(&particles), 1.0);
    }

    #[test]
    fn non_finite_heading_is_not_usable() {
        assert!(Particle::new(0.0, 0.0, 3.0, 1.0).is_finite());
        assert!(!Particle::new(0.0, 0.0, f64::NAN, 1.0).is_finite());
        assert!(!Particle::new(0.0, 0.0, 0.0, f64::NEG_INFINITY).is_finite());
    }
}
