//! The belief raster: a flat `(row, column, channel)` grid plus its metadata.
//!
//! The channel layout is part of the public contract shared with downstream
//! consumers and must not be reordered:
//!
//! | index | channel              |
//! |-------|----------------------|
//! | 0     | mass                 |
//! | 1     | mean sin(yaw)        |
//! | 2     | mean cos(yaw)        |
//! | 3     | covariance log-det   |
//! | 4     | circular variance    |
use crate::aggregate::RasterCell;
use crate::error::{RasterError, Result};
use crate::normalize::Bounds;
use crate::window::RasterWindow;

pub const CHANNEL_COUNT: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Mass = 0,
    MeanSin = 1,
    MeanCos = 2,
    LogDetCov = 3,
    CircularVariance = 4,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Mass,
        Channel::MeanSin,
        Channel::MeanCos,
        Channel::LogDetCov,
        Channel::CircularVariance,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Channel> {
        Channel::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Channel::Mass => "mass",
            Channel::MeanSin => "mean_sin",
            Channel::MeanCos => "mean_cos",
            Channel::LogDetCov => "logdet_cov",
            Channel::CircularVariance => "circular_variance",
        }
    }

    /// Value carried by a cell that received no particle mass.
    pub fn empty_value(self) -> f64 {
        match self {
            Channel::CircularVariance => 1.0,
            _ => 0.0,
        }
    }

    /// Read this channel from a finalized cell.
    pub fn value(self, cell: &RasterCell) -> f64 {
        match self {
            Channel::Mass => cell.mass,
            Channel::MeanSin => cell.mean_sin,
            Channel::MeanCos => cell.mean_cos,
            Channel::LogDetCov => cell.logdet_cov,
            Channel::CircularVariance => cell.circular_variance,
        }
    }
}

/// Dense `height x width x CHANNEL_COUNT` grid stored in one contiguous arena.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelGrid {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl ChannelGrid {
    pub fn zeros(height: usize, width: usize) -> ChannelGrid {
        ChannelGrid {
            height,
            width,
            data: vec![0.0; height * width * CHANNEL_COUNT],
        }
    }

    /// Grid filled with one value per channel.
    pub fn filled(height: usize, width: usize, fill: &[f32; CHANNEL_COUNT]) -> ChannelGrid {
        let mut data = Vec::with_capacity(height * width * CHANNEL_COUNT);
        for _ in 0..height * width {
            data.extend_from_slice(fill);
        }
        ChannelGrid {
            height,
            width,
            data,
        }
    }

    pub fn from_vec(height: usize, width: usize, data: Vec<f32>) -> Result<ChannelGrid> {
        if data.len() != height * width * CHANNEL_COUNT {
            return Err(RasterError::ChannelCountMismatch {
                expected: height * width * CHANNEL_COUNT,
                actual: data.len(),
            });
        }
        Ok(ChannelGrid {
            height,
            width,
            data,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        CHANNEL_COUNT
    }

    #[inline]
    fn offset(&self, row: usize, col: usize, channel: usize) -> usize {
        debug_assert!(row < self.height && col < self.width && channel < CHANNEL_COUNT);
        (row * self.width + col) * CHANNEL_COUNT + channel
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize, channel: Channel) -> f32 {
        self.data[self.offset(row, col, channel.index())]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, channel: Channel, value: f32) {
        let offset = self.offset(row, col, channel.index());
        self.data[offset] = value;
    }

    /// All channel values of one pixel.
    pub fn pixel(&self, row: usize, col: usize) -> &[f32] {
        let start = self.offset(row, col, 0);
        &self.data[start..start + CHANNEL_COUNT]
    }

    /// Values of one channel in row-major order.
    pub fn channel_values(&self, channel: Channel) -> impl Iterator<Item = f32> + '_ {
        self.data
            .iter()
            .skip(channel.index())
            .step_by(CHANNEL_COUNT)
            .copied()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// Output of one rasterisation call.
#[derive(Clone, Debug, PartialEq)]
pub struct BeliefRaster {
    pub grid: ChannelGrid,
    pub window: RasterWindow,
    /// Finalized cells at the native `grid_size x grid_size` resolution.
    pub cells: Vec<RasterCell>,
    /// Bounds the grid was normalized with, if it has been normalized.
    pub normalization: Option<[Bounds; CHANNEL_COUNT]>,
    /// Empirical per-channel minimum over `grid` as returned, after any
    /// normalization and resampling (diagnostic only).
    pub channel_min: Vec<f64>,
    /// Empirical per-channel maximum over `grid` (diagnostic only).
    pub channel_max: Vec<f64>,
}

impl BeliefRaster {
    /// Pack finalized cells into the five-channel grid.
    pub fn assemble(window: RasterWindow, cells: Vec<RasterCell>) -> BeliefRaster {
        let n = window.grid_size;
        debug_assert_eq!(cells.len(), n * n);
        let mut grid = ChannelGrid::zeros(n, n);
        for (index, cell) in cells.iter().enumerate() {
            let (row, col) = (index / n, index % n);
            for channel in Channel::ALL {
                grid.set(row, col, channel, channel.value(cell) as f32);
            }
        }
        BeliefRaster {
            grid,
            window,
            cells,
            normalization: None,
            channel_min: Vec::new(),
            channel_max: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn channels(&self) -> usize {
        CHANNEL_COUNT
    }

    pub fn is_normalized(&self) -> bool {
        self.normalization.is_some()
    }

    /// Native cell at grid coordinates.
    pub fn cell(&self, row: usize, col: usize) -> Option<&RasterCell> {
        let n = self.window.grid_size;
        if row < n && col < n {
            self.cells.get(row * n + col)
        } else {
            None
        }
    }

    /// Recompute the empirical per-channel min/max over the current grid.
    pub fn update_channel_range(&mut self) {
        let mut minima = vec![f64::INFINITY; CHANNEL_COUNT];
        let mut maxima = vec![f64::NEG_INFINITY; CHANNEL_COUNT];
        for pixel in self.grid.data().chunks_exact(CHANNEL_COUNT) {
            for (c, &value) in pixel.iter().enumerate() {
                minima[c] = minima[c].min(f64::from(value));
                maxima[c] = maxima[c].max(f64::from(value));
            }
        }
        self.channel_min = minima;
        self.channel_max = maxima;
    }

    /// The per-channel values a zero-mass cell carries in this raster's current scale.
    pub fn empty_pixel(&self) -> [f32; CHANNEL_COUNT] {
        Channel::ALL.map(|channel| {
            let value = channel.empty_value();
            match &self.normalization {
                Some(bounds) => bounds[channel.index()].normalize(value) as f32,
                None => value as f32,
            }
        })
    }
}
