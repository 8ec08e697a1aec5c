//! Resizing and reframing of the channel grid for consumers with other input shapes.
//!
//! Resizing is bilinear with half-pixel centres: target pixel `i` samples the
//! source at `(i + 0.5) * src / dst − 0.5`, clamped to the valid range. Only the
//! grid changes; the native cells and window stay attached to the raster.
use crate::error::{RasterError, Result};
use crate::raster::{BeliefRaster, CHANNEL_COUNT, ChannelGrid};

/// Source coordinate and interpolation pair for one target index.
#[derive(Clone, Copy, Debug)]
struct Tap {
    lower: usize,
    upper: usize,
    frac: f32,
}

fn taps(source: usize, target: usize, eps: f64) -> Vec<Tap> {
    let ratio = source as f64 / target as f64;
    let last = (source - 1) as f64;
    (0..target)
        .map(|i| {
            let x = ((i as f64 + 0.5) * ratio - 0.5).clamp(0.0, last);
            let mut lower = x.floor();
            let mut frac = x - lower;
            if frac < eps {
                frac = 0.0;
            } else if 1.0 - frac < eps {
                lower = (lower + 1.0).min(last);
                frac = 0.0;
            }
            let lower = lower as usize;
            Tap {
                lower,
                upper: (lower + 1).min(source - 1),
                frac: frac as f32,
            }
        })
        .collect()
}

/// Bilinear resize of `grid` to `height x width`.
pub fn resize_grid(grid: &ChannelGrid, height: usize, width: usize, eps: f64) -> Result<ChannelGrid> {
    if height == 0 || width == 0 || grid.height() == 0 || grid.width() == 0 {
        return Err(RasterError::InvalidDimensions { height, width });
    }
    if grid.height() == height && grid.width() == width {
        return Ok(grid.clone());
    }
    let rows = taps(grid.height(), height, eps);
    let cols = taps(grid.width(), width, eps);
    let mut out = ChannelGrid::zeros(height, width);
    let data = out.data_mut();
    for (r, row) in rows.iter().enumerate() {
        for (c, col) in cols.iter().enumerate() {
            let p00 = grid.pixel(row.lower, col.lower);
            let p01 = grid.pixel(row.lower, col.upper);
            let p10 = grid.pixel(row.upper, col.lower);
            let p11 = grid.pixel(row.upper, col.upper);
            let base = (r * width + c) * CHANNEL_COUNT;
            for ch in 0..CHANNEL_COUNT {
                let top = p00[ch] + (p01[ch] - p00[ch]) * col.frac;
                let bottom = p10[ch] + (p11[ch] - p10[ch]) * col.frac;
                data[base + ch] = top + (bottom - top) * row.frac;
            }
        }
    }
    Ok(out)
}

/// Resize the raster's grid in place. Matching dimensions leave the raster untouched.
pub fn resample_raster(raster: &mut BeliefRaster, height: usize, width: usize, eps: f64) -> Result<()> {
    if raster.height() == height && raster.width() == width {
        return Ok(());
    }
    raster.grid = resize_grid(&raster.grid, height, width, eps)?;
    Ok(())
}

/// Pad the grid with `pad` cells of `fill` on every side, then keep every `stride`-th
/// row and column starting from the first.
pub fn reframe_grid(
    grid: &ChannelGrid,
    pad: usize,
    stride: usize,
    fill: &[f32; CHANNEL_COUNT],
) -> Result<ChannelGrid> {
    if stride == 0 {
        return Err(RasterError::InvalidConfig("window stride must be at least 1".into()));
    }
    let padded_h = grid.height() + 2 * pad;
    let padded_w = grid.width() + 2 * pad;
    let out_h = padded_h.div_ceil(stride);
    let out_w = padded_w.div_ceil(stride);
    let mut out = ChannelGrid::filled(out_h, out_w, fill);
    let data = out.data_mut();
    for r in 0..out_h {
        let src_r = r * stride;
        if src_r < pad || src_r >= pad + grid.height() {
            continue;
        }
        for c in 0..out_w {
            let src_c = c * stride;
            if src_c < pad || src_c >= pad + grid.width() {
                continue;
            }
            let base = (r * out_w + c) * CHANNEL_COUNT;
            data[base..base + CHANNEL_COUNT].copy_from_slice(grid.pixel(src_r - pad, src_c - pad));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Channel;
    use assert_approx_eq::assert_approx_eq;

    fn ramp(height: usize, width: usize) -> ChannelGrid {
        let mut grid = ChannelGrid::zeros(height, width);
        for r in 0..height {
            for c in 0..width {
                for channel in Channel::ALL {
                    grid.set(r, c, channel, (r * width + c) as f32 + channel.index() as f32 * 100.0);
                }
            }
        }
        grid
    }

    #[test]
    fn same_size_is_identity() {
        let grid = ramp(3, 3);
        assert_eq!(resize_grid(&grid, 3, 3, 1e-6).expect("resize"), grid);
    }

    #[test]
    fn upsampling_preserves_constant_grid() {
        let grid = ChannelGrid::filled(2, 2, &[0.25, -0.5, 0.5, 1.0, 0.75]);
        let up = resize_grid(&grid, 5, 7, 1e-6).expect("resize");
        assert_eq!((up.height(), up.width()), (5, 7));
        for pixel in up.data().chunks_exact(CHANNEL_COUNT) {
            assert_eq!(pixel, &[0.25_f32, -0.5, 0.5, 1.0, 0.75]);
        }
    }

    #[test]
    fn downsampling_by_two_averages_blocks() {
        let grid = ramp(4, 4);
        let down = resize_grid(&grid, 2, 2, 1e-6).expect("resize");
        // Top-left block holds 0, 1, 4, 5.
        assert_approx_eq!(down.at(0, 0, Channel::Mass), 2.5_f32, 1e-5);
        assert_approx_eq!(down.at(1, 1, Channel::CircularVariance), 412.5_f32, 1e-4);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let grid = ramp(2, 2);
        assert!(matches!(
            resize_grid(&grid, 0, 4, 1e-6),
            Err(RasterError::InvalidDimensions { height: 0, width: 4 })
        ));
    }

    #[test]
    fn reframe_pads_with_fill_and_strides() {
        let grid = ramp(4, 4);
        let fill = [0.0, 0.0, 0.0, 0.0, 1.0];
        let framed = reframe_grid(&grid, 1, 2, &fill).expect("reframe");
        // Padded 6x6, every second row/col -> 3x3 sampling padded rows 0, 2, 4.
        assert_eq!((framed.height(), framed.width()), (3, 3));
        assert_eq!(framed.pixel(0, 0), &fill);
        assert_eq!(framed.at(1, 1, Channel::Mass), grid.at(1, 1, Channel::Mass));
        assert_eq!(framed.at(2, 2, Channel::Mass), grid.at(3, 3, Channel::Mass));
        assert!(reframe_grid(&grid, 0, 0, &fill).is_err());
    }

    #[test]
    fn reframe_without_pad_or_stride_is_identity() {
        let grid = ramp(3, 2);
        assert_eq!(reframe_grid(&grid, 0, 1, &[0.0; CHANNEL_COUNT]).expect("reframe"), grid);
    }
}
