//! One-pass binning of particles into grid cells.
//!
//! Every particle contributes to at most one cell, so the pass is O(n) in the
//! particle count and independent of the grid resolution. Cells only hold raw
//! weighted sums here; [`crate::finalize`] turns them into statistics.
use crate::particle::Particle;
use crate::window::RasterWindow;

/// Per-cell accumulator and, after finalization, per-cell statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterCell {
    pub mass: f64,
    pub count: usize,
    pub max_weight: f64,
    pub min_weight: f64,
    /// Σ w·sin(ψ)
    pub sum_sin: f64,
    /// Σ w·cos(ψ)
    pub sum_cos: f64,
    pub sum_yaw: f64,
    pub sum_yaw2: f64,
    pub sum_x: f64,
    pub sum_y: f64,
    pub sum_x2: f64,
    pub sum_y2: f64,
    pub sum_xy: f64,
    // Finalized quantities, see `finalize::finalize_cell`.
    pub mean_sin: f64,
    pub mean_cos: f64,
    pub circular_variance: f64,
    pub logdet_cov: f64,
}

impl Default for RasterCell {
    fn default() -> Self {
        RasterCell {
            mass: 0.0,
            count: 0,
            max_weight: f64::NEG_INFINITY,
            min_weight: f64::INFINITY,
            sum_sin: 0.0,
            sum_cos: 0.0,
            sum_yaw: 0.0,
            sum_yaw2: 0.0,
            sum_x: 0.0,
            sum_y: 0.0,
            sum_x2: 0.0,
            sum_y2: 0.0,
            sum_xy: 0.0,
            mean_sin: 0.0,
            mean_cos: 0.0,
            circular_variance: 1.0,
            logdet_cov: 0.0,
        }
    }
}

impl RasterCell {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mass <= 0.0
    }

    /// Add one particle's weighted contribution.
    #[inline]
    pub fn accumulate(&mut self, particle: &Particle) {
        let w = particle.weight;
        let (x, y) = (particle.position.x, particle.position.y);
        let (sin, cos) = particle.yaw.sin_cos();
        self.mass += w;
        self.count += 1;
        self.max_weight = self.max_weight.max(w);
        self.min_weight = self.min_weight.min(w);
        self.sum_sin += w * sin;
        self.sum_cos += w * cos;
        self.sum_yaw += w * particle.yaw;
        self.sum_yaw2 += w * particle.yaw * particle.yaw;
        self.sum_x += w * x;
        self.sum_y += w * y;
        self.sum_x2 += w * x * x;
        self.sum_y2 += w * y * y;
        self.sum_xy += w * x * y;
    }
}

/// Outcome of a binning pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AggregationSummary {
    pub binned: usize,
    pub dropped: usize,
    pub binned_mass: f64,
}

/// Bin `particles` into a fresh `grid_size²` cell array, row-major (row = y bin).
///
/// Particles outside the window, or with a non-finite position, heading or weight, are
/// dropped from every statistic and counted in the summary.
pub fn accumulate_cells(
    particles: &[Particle],
    window: &RasterWindow,
    align_axes: bool,
) -> (Vec<RasterCell>, AggregationSummary) {
    let n = window.grid_size;
    let mut cells = vec![RasterCell::default(); n * n];
    let mut summary = AggregationSummary::default();
    for particle in particles {
        let cell = if particle.is_finite() {
            window.cell_of(&particle.position, align_axes)
        } else {
            None
        };
        match cell {
            Some((u, v)) => {
                cells[v * n + u].accumulate(particle);
                summary.binned += 1;
                summary.binned_mass += particle.weight;
            }
            None => summary.dropped += 1,
        }
    }
    (cells, summary)
}
