//! Error type for the fallible surfaces of the crate.
//!
//! Rasterisation itself never fails: degenerate particle sets are absorbed by
//! the numeric guards in [`crate::window`], [`crate::finalize`] and
//! [`crate::normalize`]. Errors only come from configuration, file I/O and
//! caller-supplied dimensions or channel indices.
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid bounds for {channel}: min {min} is greater than max {max}")]
    InvalidBounds {
        channel: &'static str,
        min: f64,
        max: f64,
    },

    #[error("Invalid raster dimensions {height}x{width}")]
    InvalidDimensions { height: usize, width: usize },

    #[error("Channel index {0} out of range")]
    ChannelOutOfRange(usize),

    #[error("Expected {expected} channel values, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    #[error("Unsupported configuration file extension: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, RasterError>;
