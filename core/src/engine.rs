//! The rasterisation engine handle.
//!
//! [`BeliefRasteriser`] owns the configuration and runs the whole pipeline
//!
//! ```text
//! particles -> window -> cells -> finalized cells -> raster -> normalized raster
//! ```
//!
//! under one exclusive lock. Setters take the same lock, so a call never observes
//! a half-applied configuration. Each setter validates a candidate copy before
//! committing it; on error the previous configuration stays in force.
//!
//! ```
//! use beliefraster::config::RasterConfig;
//! use beliefraster::engine::BeliefRasteriser;
//! use beliefraster::particle::Particle;
//!
//! let engine = BeliefRasteriser::new(RasterConfig { grid_size: 16, ..Default::default() })
//!     .expect("valid configuration");
//! let particles = vec![Particle::new(0.0, 0.0, 0.0, 0.5), Particle::new(0.2, 0.1, 0.1, 0.5)];
//! let raster = engine.rasterise(&particles);
//! assert_eq!((raster.height(), raster.width(), raster.channels()), (16, 16, 5));
//! ```
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::aggregate::{RasterCell, accumulate_cells};
use crate::config::RasterConfig;
use crate::diagnostics::{DiagnosticSink, LogSink, RasterEvent};
use crate::error::Result;
use crate::finalize::finalize_cells;
use crate::normalize::{self, Bounds};
use crate::particle::{Particle, total_weight};
use crate::raster::{BeliefRaster, CHANNEL_COUNT, Channel, ChannelGrid};
use crate::report::{self, ChannelStats};
use crate::resample;
use crate::visualize::{self, PreviewImage};
use crate::window::{RasterWindow, estimate_window};

struct EngineState {
    config: RasterConfig,
    /// Configuration at construction, restored by [`BeliefRasteriser::reset`].
    initial: RasterConfig,
}

pub struct BeliefRasteriser {
    state: Mutex<EngineState>,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for BeliefRasteriser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeliefRasteriser")
            .field("config", &self.lock().config)
            .finish_non_exhaustive()
    }
}

impl BeliefRasteriser {
    /// Engine reporting diagnostics through the `log` facade.
    pub fn new(config: RasterConfig) -> Result<BeliefRasteriser> {
        BeliefRasteriser::with_sink(config, Arc::new(LogSink))
    }

    pub fn with_sink(config: RasterConfig, sink: Arc<dyn DiagnosticSink>) -> Result<BeliefRasteriser> {
        config.validate()?;
        Ok(BeliefRasteriser {
            state: Mutex::new(EngineState {
                initial: config.clone(),
                config,
            }),
            sink,
        })
    }

    // The state is plain data that is only replaced wholesale, so a poisoned lock
    // still guards a valid configuration.
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RasterEvent) {
        self.sink.record(&event);
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> RasterConfig {
        self.lock().config.clone()
    }

    /// Run the full pipeline on one particle set.
    ///
    /// Never fails: empty or weightless sets, particles outside the window and
    /// non-finite particles all produce a well-defined raster.
    pub fn rasterise(&self, particles: &[Particle]) -> BeliefRaster {
        let state = self.lock();
        let config = &state.config;

        let count = particles.len();
        if count < config.min_particles || count > config.max_particles {
            self.emit(RasterEvent::ParticleCountOutOfRange {
                count,
                min: config.min_particles,
                max: config.max_particles,
            });
        }

        let window = self.window_for(particles, config);
        let cells = self.cells_for(particles, &window, config);
        let mut raster = BeliefRaster::assemble(window, cells);
        if config.normalize {
            let applied = normalize::normalize_raster(&mut raster, &config.normalization);
            self.emit(RasterEvent::Normalized { applied });
        }
        if let Some([height, width]) = config.output_size
            && let Err(e) = self.resample_with(&mut raster, height, width, config.resample_eps)
        {
            // Validation rejects zero output dimensions; keep the native grid if that ever slips.
            self.emit(RasterEvent::ResampleSkipped {
                to: (height, width),
                reason: e.to_string(),
            });
        }
        if config.record_channel_range {
            raster.update_channel_range();
        }
        if config.debug {
            for stats in report::report(&raster) {
                self.emit(RasterEvent::ChannelStats(stats));
            }
        }
        raster
    }

    fn window_for(&self, particles: &[Particle], config: &RasterConfig) -> RasterWindow {
        let window = estimate_window(particles, &config.window_params());
        self.emit(RasterEvent::WindowEstimated {
            center: [window.center.x, window.center.y],
            size: window.size,
            angle: window.angle,
            max_eigen: window.max_eigen,
            min_eigen: window.min_eigen,
        });
        window
    }

    fn cells_for(&self, particles: &[Particle], window: &RasterWindow, config: &RasterConfig) -> Vec<RasterCell> {
        let (mut cells, summary) = accumulate_cells(particles, window, config.align_axes);
        self.emit(RasterEvent::ParticlesBinned {
            binned: summary.binned,
            dropped: summary.dropped,
            binned_mass: summary.binned_mass,
            total_weight: total_weight(particles),
        });
        finalize_cells(&mut cells);
        cells
    }

    fn resample_with(&self, raster: &mut BeliefRaster, height: usize, width: usize, eps: f64) -> Result<()> {
        let from = (raster.height(), raster.width());
        resample::resample_raster(raster, height, width, eps)?;
        if from != (height, width) {
            self.emit(RasterEvent::Resampled {
                from,
                to: (height, width),
            });
        }
        Ok(())
    }

    /// Window estimate alone, with the current configuration.
    pub fn compute_window(&self, particles: &[Particle]) -> RasterWindow {
        let state = self.lock();
        self.window_for(particles, &state.config)
    }

    /// Bin and finalize `particles` into cells of `window`.
    pub fn fill_cells(&self, particles: &[Particle], window: &RasterWindow) -> Vec<RasterCell> {
        let state = self.lock();
        self.cells_for(particles, window, &state.config)
    }

    /// Normalize with the configured bounds. Returns `false` when the raster was
    /// already normalized and has been left untouched.
    pub fn normalize_raster(&self, raster: &mut BeliefRaster) -> bool {
        let state = self.lock();
        let applied = normalize::normalize_raster(raster, &state.config.normalization);
        self.emit(RasterEvent::Normalized { applied });
        applied
    }

    /// Resize the raster's grid to `height x width` using the configured snapping epsilon.
    pub fn resample_window(&self, raster: &mut BeliefRaster, height: usize, width: usize) -> Result<()> {
        let eps = self.lock().config.resample_eps;
        self.resample_with(raster, height, width, eps)
    }

    /// Pad and stride the raster's grid by the configured `window_pad` and `window_stride`.
    pub fn reframe(&self, raster: &BeliefRaster) -> Result<ChannelGrid> {
        let (pad, stride) = {
            let state = self.lock();
            (state.config.window_pad, state.config.window_stride)
        };
        resample::reframe_grid(&raster.grid, pad, stride, &raster.empty_pixel())
    }

    pub fn update_channel_range(&self, raster: &mut BeliefRaster) {
        raster.update_channel_range();
    }

    pub fn to_image(&self, raster: &BeliefRaster) -> PreviewImage {
        visualize::to_image(raster)
    }

    pub fn channel_stats(&self, raster: &BeliefRaster, channel: usize) -> Result<ChannelStats> {
        let stats = report::channel_stats(raster, channel)?;
        self.emit(RasterEvent::ChannelStats(stats));
        Ok(stats)
    }

    fn update<F>(&self, setting: &'static str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut RasterConfig),
    {
        {
            let mut state = self.lock();
            let mut candidate = state.config.clone();
            apply(&mut candidate);
            candidate.validate()?;
            state.config = candidate;
        }
        self.emit(RasterEvent::ConfigUpdated { setting });
        Ok(())
    }

    /// Global bounds used by every channel without its own.
    pub fn set_normalization(&self, min: f64, max: f64) -> Result<()> {
        self.update("normalization", |c| c.normalization.default = Bounds::new(min, max))
    }

    pub fn set_window_params(&self, grid_size: usize, min_window: f64, max_window: f64, sigma_scale: f64) -> Result<()> {
        self.update("window_params", |c| {
            c.grid_size = grid_size;
            c.min_window = min_window;
            c.max_window = max_window;
            c.sigma_scale = sigma_scale;
        })
    }

    pub fn set_alignment(&self, align_axes: bool) -> Result<()> {
        self.update("align_axes", |c| c.align_axes = align_axes)
    }

    pub fn set_adaptive(&self, adaptive: bool) -> Result<()> {
        self.update("adaptive_window", |c| c.adaptive_window = adaptive)
    }

    pub fn set_crop_margin(&self, margin: f64) -> Result<()> {
        self.update("crop_margin", |c| c.crop_margin = margin)
    }

    pub fn set_resample_eps(&self, eps: f64) -> Result<()> {
        self.update("resample_eps", |c| c.resample_eps = eps)
    }

    pub fn set_window_stride(&self, stride: usize) -> Result<()> {
        self.update("window_stride", |c| c.window_stride = stride)
    }

    pub fn set_window_pad(&self, pad: usize) -> Result<()> {
        self.update("window_pad", |c| c.window_pad = pad)
    }

    pub fn set_output_size(&self, output_size: Option<[usize; 2]>) -> Result<()> {
        self.update("output_size", |c| c.output_size = output_size)
    }

    pub fn set_particle_limits(&self, min: usize, max: usize) -> Result<()> {
        self.update("particle_limits", |c| {
            c.min_particles = min;
            c.max_particles = max;
        })
    }

    /// Per-channel bounds for all five channels, in channel order.
    pub fn set_channel_limits(&self, mins: [f64; CHANNEL_COUNT], maxs: [f64; CHANNEL_COUNT]) -> Result<()> {
        self.update("channel_limits", |c| {
            for channel in Channel::ALL {
                let i = channel.index();
                c.normalization.set(channel, Some(Bounds::new(mins[i], maxs[i])));
            }
        })
    }

    fn set_limits(&self, setting: &'static str, channel: Channel, min: f64, max: f64) -> Result<()> {
        self.update(setting, |c| c.normalization.set(channel, Some(Bounds::new(min, max))))
    }

    pub fn set_mass_limits(&self, min: f64, max: f64) -> Result<()> {
        self.set_limits("mass_limits", Channel::Mass, min, max)
    }

    pub fn set_sin_limits(&self, min: f64, max: f64) -> Result<()> {
        self.set_limits("sin_limits", Channel::MeanSin, min, max)
    }

    pub fn set_cos_limits(&self, min: f64, max: f64) -> Result<()> {
        self.set_limits("cos_limits", Channel::MeanCos, min, max)
    }

    pub fn set_logdet_limits(&self, min: f64, max: f64) -> Result<()> {
        self.set_limits("logdet_limits", Channel::LogDetCov, min, max)
    }

    pub fn set_cvar_limits(&self, min: f64, max: f64) -> Result<()> {
        self.set_limits("cvar_limits", Channel::CircularVariance, min, max)
    }

    pub fn set_normalize(&self, normalize: bool) -> Result<()> {
        self.update("normalize", |c| c.normalize = normalize)
    }

    pub fn set_debug(&self, debug: bool) -> Result<()> {
        self.update("debug", |c| c.debug = debug)
    }

    /// Restore the configuration the engine was constructed with.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.config = state.initial.clone();
        }
        self.emit(RasterEvent::ConfigUpdated { setting: "reset" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CaptureSink;
    use crate::error::RasterError;

    fn engine(config: RasterConfig) -> (BeliefRasteriser, Arc<CaptureSink>) {
        let sink = Arc::new(CaptureSink::new());
        let engine = BeliefRasteriser::with_sink(config, sink.clone()).expect("valid config");
        (engine, sink)
    }

    #[test]
    fn rejected_setter_keeps_previous_config() {
        let (engine, sink) = engine(RasterConfig::default());
        let before = engine.config();
        assert!(matches!(
            engine.set_logdet_limits(5.0, -5.0),
            Err(RasterError::InvalidBounds { channel: "logdet_cov", .. })
        ));
        assert!(engine.set_window_stride(0).is_err());
        assert_eq!(engine.config(), before);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn reset_restores_construction_config() {
        let (engine, _) = engine(RasterConfig {
            grid_size: 8,
            ..Default::default()
        });
        engine.set_window_params(32, 2.0, 10.0, 3.0).expect("valid");
        engine.set_alignment(true).expect("valid");
        assert_eq!(engine.config().grid_size, 32);
        engine.reset();
        assert_eq!(engine.config().grid_size, 8);
        assert!(!engine.config().align_axes);
    }

    #[test]
    fn channel_limits_fill_the_bound_table() {
        let (engine, _) = engine(RasterConfig::default());
        engine
            .set_channel_limits([0.0, -2.0, -2.0, -10.0, 0.0], [2.0, 2.0, 2.0, 0.0, 0.5])
            .expect("valid");
        let bounds = engine.config().normalization.resolved();
        assert_eq!(bounds[Channel::LogDetCov.index()], Bounds::new(-10.0, 0.0));
        assert_eq!(bounds[Channel::CircularVariance.index()], Bounds::new(0.0, 0.5));
    }

    #[test]
    fn particle_limits_only_warn() {
        let (engine, sink) = engine(RasterConfig {
            grid_size: 4,
            min_particles: 3,
            ..Default::default()
        });
        let raster = engine.rasterise(&[Particle::new(0.0, 0.0, 0.0, 1.0)]);
        assert!(sink.events().iter().any(|e| matches!(
            e,
            RasterEvent::ParticleCountOutOfRange { count: 1, min: 3, .. }
        )));
        let mass: f32 = raster.grid.channel_values(Channel::Mass).sum();
        assert!(mass > 0.0);
    }

    #[test]
    fn output_size_resamples_after_normalization() {
        let (engine, sink) = engine(RasterConfig {
            grid_size: 8,
            output_size: Some([12, 6]),
            ..Default::default()
        });
        let raster = engine.rasterise(&[Particle::new(0.0, 0.0, 0.0, 1.0)]);
        assert_eq!((raster.height(), raster.width()), (12, 6));
        assert_eq!(raster.cells.len(), 64);
        assert!(raster.is_normalized());
        assert!(sink.events().contains(&RasterEvent::Resampled {
            from: (8, 8),
            to: (12, 6)
        }));
    }

    #[test]
    fn debug_reports_every_channel() {
        let (engine, sink) = engine(RasterConfig {
            grid_size: 4,
            debug: true,
            ..Default::default()
        });
        engine.rasterise(&[Particle::new(0.0, 0.0, 0.0, 1.0)]);
        let stats = sink
            .events()
            .iter()
            .filter(|e| matches!(e, RasterEvent::ChannelStats(_)))
            .count();
        assert_eq!(stats, CHANNEL_COUNT);
    }

    #[test]
    fn reframe_uses_configured_pad_and_stride() {
        let (engine, _) = engine(RasterConfig {
            grid_size: 4,
            window_pad: 1,
            window_stride: 2,
            ..Default::default()
        });
        let raster = engine.rasterise(&[Particle::new(0.0, 0.0, 0.0, 1.0)]);
        let framed = engine.reframe(&raster).expect("reframe");
        assert_eq!((framed.height(), framed.width()), (3, 3));
        // Padding carries the normalized empty-cell values.
        assert_eq!(framed.pixel(0, 0), &raster.empty_pixel());
    }
}
