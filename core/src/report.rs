//! Summary statistics of raster channels for diagnostics.
use std::fmt::{self, Display};

use crate::error::{RasterError, Result};
use crate::raster::{BeliefRaster, Channel};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelStats {
    pub channel: Channel,
    pub mean: f64,
    /// Upper median of the sorted values.
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Display for ChannelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<18} mean={:.6} median={:.6} min={:.6} max={:.6}",
            self.channel.name(),
            self.mean,
            self.median,
            self.min,
            self.max
        )
    }
}

/// Statistics for one channel, addressed by index as downstream tools do.
pub fn channel_stats(raster: &BeliefRaster, channel: usize) -> Result<ChannelStats> {
    let channel = Channel::from_index(channel).ok_or(RasterError::ChannelOutOfRange(channel))?;
    Ok(stats_for(raster, channel))
}

pub fn stats_for(raster: &BeliefRaster, channel: Channel) -> ChannelStats {
    let mut values: Vec<f64> = raster.grid.channel_values(channel).map(f64::from).collect();
    if values.is_empty() {
        return ChannelStats {
            channel,
            mean: 0.0,
            median: 0.0,
            min: 0.0,
            max: 0.0,
        };
    }
    values.sort_by(f64::total_cmp);
    ChannelStats {
        channel,
        mean: values.iter().sum::<f64>() / values.len() as f64,
        median: values[values.len() / 2],
        min: values[0],
        max: values[values.len() - 1],
    }
}

/// Statistics for every channel, in channel order.
pub fn report(raster: &BeliefRaster) -> Vec<ChannelStats> {
    Channel::ALL
        .iter()
        .map(|&channel| stats_for(raster, channel))
        .collect()
}
