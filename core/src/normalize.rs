//! Per-channel rescaling of the raster into [0, 1].
//!
//! Each channel reads its own `[min, max]` bound when one is configured and falls
//! back to a global default pair otherwise:
//!
//! ```text
//! v' = clamp((v − min) / (max − min + ε), 0, 1),   ε = 1e-8
//! ```
//!
//! The ε keeps the degenerate `min == max` case finite. Non-finite inputs map to
//! the nearest end of the interval (`NaN` maps to 0).
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::raster::{BeliefRaster, CHANNEL_COUNT, Channel};

pub const NORMALIZATION_EPS: f64 = 1e-8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Bounds {
        Bounds { min, max }
    }

    pub fn validate(&self, channel: &'static str) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(RasterError::InvalidBounds {
                channel,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let scaled = (value - self.min) / (self.max - self.min + NORMALIZATION_EPS);
        if scaled.is_nan() {
            0.0
        } else {
            scaled.clamp(0.0, 1.0)
        }
    }

    /// Inverse of [`Bounds::normalize`] for values that were not clamped.
    #[inline]
    pub fn denormalize(&self, value: f64) -> f64 {
        value * (self.max - self.min + NORMALIZATION_EPS) + self.min
    }
}

/// Global default bound plus optional per-channel overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelBounds {
    /// Used for every channel without its own bound.
    pub default: Bounds,
    pub mass: Option<Bounds>,
    pub mean_sin: Option<Bounds>,
    pub mean_cos: Option<Bounds>,
    pub logdet_cov: Option<Bounds>,
    pub circular_variance: Option<Bounds>,
}

impl Default for ChannelBounds {
    fn default() -> Self {
        ChannelBounds {
            default: Bounds::new(0.0, 1.0),
            mass: Some(Bounds::new(0.0, 1.0)),
            mean_sin: Some(Bounds::new(-1.0, 1.0)),
            mean_cos: Some(Bounds::new(-1.0, 1.0)),
            logdet_cov: Some(Bounds::new(-15.0, 5.0)),
            circular_variance: Some(Bounds::new(0.0, 1.0)),
        }
    }
}

impl ChannelBounds {
    /// Bounds with only the global pair set.
    pub fn uniform(default: Bounds) -> ChannelBounds {
        ChannelBounds {
            default,
            mass: None,
            mean_sin: None,
            mean_cos: None,
            logdet_cov: None,
            circular_variance: None,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<Bounds> {
        match channel {
            Channel::Mass => self.mass,
            Channel::MeanSin => self.mean_sin,
            Channel::MeanCos => self.mean_cos,
            Channel::LogDetCov => self.logdet_cov,
            Channel::CircularVariance => self.circular_variance,
        }
    }

    pub fn set(&mut self, channel: Channel, bounds: Option<Bounds>) {
        let slot = match channel {
            Channel::Mass => &mut self.mass,
            Channel::MeanSin => &mut self.mean_sin,
            Channel::MeanCos => &mut self.mean_cos,
            Channel::LogDetCov => &mut self.logdet_cov,
            Channel::CircularVariance => &mut self.circular_variance,
        };
        *slot = bounds;
    }

    /// The bound actually applied to `channel`.
    pub fn resolve(&self, channel: Channel) -> Bounds {
        self.get(channel).unwrap_or(self.default)
    }

    pub fn resolved(&self) -> [Bounds; CHANNEL_COUNT] {
        Channel::ALL.map(|channel| self.resolve(channel))
    }

    pub fn validate(&self) -> Result<()> {
        self.default.validate("default")?;
        for channel in Channel::ALL {
            if let Some(bounds) = self.get(channel) {
                bounds.validate(channel.name())?;
            }
        }
        Ok(())
    }
}

/// Normalize every channel of `raster` in place.
///
/// The applied bounds are recorded on the raster; a raster that already carries
/// bounds is left untouched and `false` is returned.
pub fn normalize_raster(raster: &mut BeliefRaster, bounds: &ChannelBounds) -> bool {
    if raster.normalization.is_some() {
        return false;
    }
    let resolved = bounds.resolved();
    for (index, value) in raster.grid.data_mut().iter_mut().enumerate() {
        let channel_bounds = &resolved[index % CHANNEL_COUNT];
        *value = channel_bounds.normalize(f64::from(*value)) as f32;
    }
    raster.normalization = Some(resolved);
    true
}
