//! Structured diagnostics emitted by the rasteriser.
//!
//! The engine never writes to a global logger directly. It hands [`RasterEvent`]s
//! to an injected [`DiagnosticSink`]; [`LogSink`] forwards them to the `log`
//! facade, [`CaptureSink`] keeps them in memory.
use std::fmt::{self, Display};
use std::sync::{Mutex, PoisonError};

use log::Level;

use crate::report::ChannelStats;

#[derive(Clone, Debug, PartialEq)]
pub enum RasterEvent {
    WindowEstimated {
        center: [f64; 2],
        size: f64,
        angle: f64,
        max_eigen: f64,
        min_eigen: f64,
    },
    ParticlesBinned {
        binned: usize,
        dropped: usize,
        binned_mass: f64,
        total_weight: f64,
    },
    /// Advisory only; the particles are still rasterised.
    ParticleCountOutOfRange { count: usize, min: usize, max: usize },
    Normalized { applied: bool },
    ChannelStats(ChannelStats),
    Resampled {
        from: (usize, usize),
        to: (usize, usize),
    },
    /// The configured output size could not be applied; the raster keeps its native grid.
    ResampleSkipped { to: (usize, usize), reason: String },
    ConfigUpdated { setting: &'static str },
}

impl RasterEvent {
    /// Severity used when the event is forwarded to `log`.
    pub fn level(&self) -> Level {
        match self {
            RasterEvent::ParticleCountOutOfRange { .. } | RasterEvent::ResampleSkipped { .. } => Level::Warn,
            RasterEvent::ConfigUpdated { .. } => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl Display for RasterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterEvent::WindowEstimated {
                center,
                size,
                angle,
                max_eigen,
                min_eigen,
            } => write!(
                f,
                "window center=({:.4}, {:.4}) size={:.4} angle={:.4} eigen=[{:.3e}, {:.3e}]",
                center[0], center[1], size, angle, max_eigen, min_eigen
            ),
            RasterEvent::ParticlesBinned {
                binned,
                dropped,
                binned_mass,
                total_weight,
            } => write!(
                f,
                "binned {binned} particles ({dropped} outside window), mass {binned_mass:.6} of {total_weight:.6}"
            ),
            RasterEvent::ParticleCountOutOfRange { count, min, max } => {
                write!(f, "particle count {count} outside [{min}, {max}]")
            }
            RasterEvent::Normalized { applied: true } => write!(f, "raster normalized"),
            RasterEvent::Normalized { applied: false } => {
                write!(f, "raster already normalized, skipped")
            }
            RasterEvent::ChannelStats(stats) => write!(f, "{stats}"),
            RasterEvent::Resampled { from, to } => {
                write!(f, "resampled {}x{} -> {}x{}", from.0, from.1, to.0, to.1)
            }
            RasterEvent::ResampleSkipped { to, reason } => {
                write!(f, "resample to {}x{} skipped: {reason}", to.0, to.1)
            }
            RasterEvent::ConfigUpdated { setting } => write!(f, "updated {setting}"),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: &RasterEvent);
}

/// Forwards events to the `log` facade under the `beliefraster` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn record(&self, event: &RasterEvent) {
        log::log!(target: "beliefraster", event.level(), "{event}");
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: &RasterEvent) {}
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CaptureSink {
    events: Mutex<Vec<RasterEvent>>,
}

impl CaptureSink {
    pub fn new() -> CaptureSink {
        CaptureSink::default()
    }

    pub fn events(&self) -> Vec<RasterEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<RasterEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl DiagnosticSink for CaptureSink {
    fn record(&self, event: &RasterEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
