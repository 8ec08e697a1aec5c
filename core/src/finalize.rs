//! Conversion of accumulated cell sums into per-cell statistics.
//!
//! For a cell with mass `m > 0` and raw sums from [`crate::aggregate`]:
//!
//! ```text
//! mean_sin = Σw·sinψ / m          mean_cos = Σw·cosψ / m
//! R        = sqrt(mean_sin² + mean_cos²)
//! circular_variance = 1 − R
//! var_x  = Σwx²/m − (Σwx/m)²      var_y = Σwy²/m − (Σwy/m)²
//! cov_xy = Σwxy/m − (Σwx/m)(Σwy/m)
//! logdet = ln(var_x·var_y − cov_xy²)   when the determinant exceeds DET_FLOOR, else 0
//! ```
//!
//! Cells without mass keep fixed defaults and never divide.
use crate::aggregate::RasterCell;

/// Determinants at or below this value are reported as a log-determinant of 0.
pub const DET_FLOOR: f64 = 1e-12;

/// Finalize a single cell in place.
pub fn finalize_cell(cell: &mut RasterCell) {
    if cell.is_empty() {
        cell.mean_sin = 0.0;
        cell.mean_cos = 0.0;
        cell.circular_variance = 1.0;
        cell.logdet_cov = 0.0;
        cell.min_weight = 0.0;
        cell.max_weight = 0.0;
        return;
    }
    let m = cell.mass;
    cell.mean_sin = cell.sum_sin / m;
    cell.mean_cos = cell.sum_cos / m;
    let resultant = (cell.mean_sin * cell.mean_sin + cell.mean_cos * cell.mean_cos).sqrt();
    cell.circular_variance = (1.0 - resultant).clamp(0.0, 1.0);

    let (var_x, var_y, cov_xy) = position_covariance(cell);
    let det = var_x * var_y - cov_xy * cov_xy;
    cell.logdet_cov = if det > DET_FLOOR { det.ln() } else { 0.0 };
}

/// Finalize every cell of a grid.
pub fn finalize_cells(cells: &mut [RasterCell]) {
    cells.iter_mut().for_each(finalize_cell);
}

/// `(var_x, var_y, cov_xy)` of the cell's particles from raw moments. Zero for empty cells.
pub fn position_covariance(cell: &RasterCell) -> (f64, f64, f64) {
    if cell.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let m = cell.mass;
    let mean_x = cell.sum_x / m;
    let mean_y = cell.sum_y / m;
    let var_x = cell.sum_x2 / m - mean_x * mean_x;
    let var_y = cell.sum_y2 / m - mean_y * mean_y;
    let cov_xy = cell.sum_xy / m - mean_x * mean_y;
    (var_x, var_y, cov_xy)
}

/// Weighted linear yaw mean and variance, `(E[ψ], E[ψ²] − E[ψ]²)`.
///
/// Only meaningful when the cell's yaws do not straddle the ±π wrap; the circular
/// statistics are the ones carried in the raster.
pub fn yaw_moments(cell: &RasterCell) -> (f64, f64) {
    if cell.is_empty() {
        return (0.0, 0.0);
    }
    let mean = cell.sum_yaw / cell.mass;
    (mean, cell.sum_yaw2 / cell.mass - mean * mean)
}
