//! False-color preview of a belief raster.
//!
//! Each cell becomes one HSV pixel: hue from the mean heading
//! `atan2(mean_sin, mean_cos)`, value from mass, saturation from
//! `1 − circular_variance`. Concentrated headings are vivid, dispersed ones grey.
use std::f64::consts::PI;

use crate::raster::{BeliefRaster, Channel};

/// Row-major 8-bit RGB image.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[u8; 3]>,
}

impl PreviewImage {
    pub fn get(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        if row < self.height && col < self.width {
            Some(self.pixels[row * self.width + col])
        } else {
            None
        }
    }
}

/// HSV in [0, 1]³ to 8-bit RGB.
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let s = saturation.clamp(0.0, 1.0);
    let v = value.clamp(0.0, 1.0);
    let chroma = v * s;
    let x = chroma * (1.0 - ((h % 2.0) - 1.0).abs());
    let (r, g, b) = match h as u8 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = v - chroma;
    [r, g, b].map(|component| ((component + m) * 255.0).round() as u8)
}

/// Render the raster's grid. Normalized heading channels are mapped back to
/// [-1, 1] before the hue is taken so that the angle is undistorted.
pub fn to_image(raster: &BeliefRaster) -> PreviewImage {
    let (height, width) = (raster.height(), raster.width());
    let heading = |channel: Channel, value: f32| -> f64 {
        let value = f64::from(value);
        match &raster.normalization {
            Some(bounds) => bounds[channel.index()].denormalize(value),
            None => value,
        }
    };
    let mut pixels = Vec::with_capacity(height * width);
    for row in 0..height {
        for col in 0..width {
            let sin = heading(Channel::MeanSin, raster.grid.at(row, col, Channel::MeanSin));
            let cos = heading(Channel::MeanCos, raster.grid.at(row, col, Channel::MeanCos));
            let hue = (sin.atan2(cos) + PI) / (2.0 * PI);
            let saturation = 1.0 - f64::from(raster.grid.at(row, col, Channel::CircularVariance));
            let value = f64::from(raster.grid.at(row, col, Channel::Mass));
            pixels.push(hsv_to_rgb(hue, saturation, value));
        }
    }
    PreviewImage {
        width,
        height,
        pixels,
    }
}
