//! Engine configuration and its file formats.
//!
//! A [`RasterConfig`] can be written to and read from JSON, YAML or TOML. The
//! generic [`RasterConfig::to_file`] / [`RasterConfig::from_file`] pick the format
//! from the file extension. Missing fields fall back to their defaults, so a
//! partial file only needs the settings that differ.
//!
//! ```
//! use beliefraster::config::RasterConfig;
//!
//! let cfg = RasterConfig {
//!     grid_size: 32,
//!     align_axes: true,
//!     ..Default::default()
//! };
//! assert!(cfg.validate().is_ok());
//! ```
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::normalize::ChannelBounds;
use crate::window::WindowParams;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Cells per side of the native square grid.
    pub grid_size: usize,
    /// Optional `[height, width]` the raster is resampled to after assembly.
    pub output_size: Option<[usize; 2]>,
    /// Lower clamp on the window extent (world units).
    pub min_window: f64,
    /// Upper clamp on the window extent, and the fixed extent when the window is not adaptive.
    pub max_window: f64,
    /// Window extent in standard deviations of the dominant axis.
    pub sigma_scale: f64,
    pub normalization: ChannelBounds,
    /// Advisory particle count range; violations are reported, not enforced.
    pub min_particles: usize,
    pub max_particles: usize,
    /// Fractional enlargement of the adaptive extent before clamping.
    pub crop_margin: f64,
    /// Interpolation fractions closer than this to a grid node snap to the node.
    pub resample_eps: f64,
    pub window_stride: usize,
    pub window_pad: usize,
    /// Bin particles in the principal-axis frame of the window.
    pub align_axes: bool,
    pub adaptive_window: bool,
    pub normalize: bool,
    /// Record per-channel empirical min/max on each raster.
    pub record_channel_range: bool,
    /// Emit per-channel statistics for every raster.
    pub debug: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        RasterConfig {
            grid_size: 64,
            output_size: None,
            min_window: 1.0,
            max_window: 50.0,
            sigma_scale: 6.0,
            normalization: ChannelBounds::default(),
            min_particles: 1,
            max_particles: 100_000,
            crop_margin: 0.0,
            resample_eps: 1e-6,
            window_stride: 1,
            window_pad: 0,
            align_axes: false,
            adaptive_window: true,
            normalize: true,
            record_channel_range: false,
            debug: false,
        }
    }
}

impl RasterConfig {
    /// Check every setting; the engine only ever holds a validated configuration.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(RasterError::InvalidConfig("grid_size must be at least 1".into()));
        }
        if let Some([height, width]) = self.output_size
            && (height == 0 || width == 0)
        {
            return Err(RasterError::InvalidDimensions { height, width });
        }
        if !(self.min_window.is_finite() && self.min_window > 0.0) {
            return Err(RasterError::InvalidConfig(format!(
                "min_window must be positive, got {}",
                self.min_window
            )));
        }
        if !self.max_window.is_finite() || self.max_window < self.min_window {
            return Err(RasterError::InvalidConfig(format!(
                "max_window {} must be finite and at least min_window {}",
                self.max_window, self.min_window
            )));
        }
        if !(self.sigma_scale.is_finite() && self.sigma_scale > 0.0) {
            return Err(RasterError::InvalidConfig(format!(
                "sigma_scale must be positive, got {}",
                self.sigma_scale
            )));
        }
        if self.min_particles > self.max_particles {
            return Err(RasterError::InvalidConfig(format!(
                "min_particles {} exceeds max_particles {}",
                self.min_particles, self.max_particles
            )));
        }
        if !(self.crop_margin.is_finite() && self.crop_margin >= 0.0) {
            return Err(RasterError::InvalidConfig(format!(
                "crop_margin must be non-negative, got {}",
                self.crop_margin
            )));
        }
        if !(self.resample_eps.is_finite() && (0.0..0.5).contains(&self.resample_eps)) {
            return Err(RasterError::InvalidConfig(format!(
                "resample_eps must lie in [0, 0.5), got {}",
                self.resample_eps
            )));
        }
        if self.window_stride == 0 {
            return Err(RasterError::InvalidConfig("window_stride must be at least 1".into()));
        }
        self.normalization.validate()
    }

    pub fn window_params(&self) -> WindowParams {
        WindowParams {
            grid_size: self.grid_size,
            min_window: self.min_window,
            max_window: self.max_window,
            sigma_scale: self.sigma_scale,
            crop_margin: self.crop_margin,
            adaptive: self.adaptive_window,
        }
    }

    /// Write the configuration to a JSON file (pretty-printed).
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }

    pub fn from_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(io::Error::other)
    }

    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = serde_yaml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(file).map_err(io::Error::other)
    }

    pub fn to_toml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = toml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }

    pub fn from_toml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut s = String::new();
        File::open(path)?.read_to_string(&mut s)?;
        toml::from_str(&s).map_err(io::Error::other)
    }

    /// Generic write: format chosen by extension (.json/.yaml/.yml/.toml).
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => self.to_json(p)?,
            Some("yaml") | Some("yml") => self.to_yaml(p)?,
            Some("toml") => self.to_toml(p)?,
            _ => return Err(RasterError::UnsupportedFormat(p.display().to_string())),
        }
        Ok(())
    }

    /// Generic read: format chosen by extension (.json/.yaml/.yml/.toml).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let config = match extension(p).as_deref() {
            Some("json") => Self::from_json(p)?,
            Some("yaml") | Some("yml") => Self::from_yaml(p)?,
            Some("toml") => Self::from_toml(p)?,
            _ => return Err(RasterError::UnsupportedFormat(p.display().to_string())),
        };
        Ok(config)
    }

    /// Read and validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::from_file(path)?;
        config.validate()?;
        Ok(config)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}
