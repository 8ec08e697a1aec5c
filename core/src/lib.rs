//! Belief rasterisation for particle-based pose estimates
//!
//! This crate compresses a robot's pose belief, given as a weighted particle set from an upstream
//! localization filter, into a fixed-size multi-channel grid (a "belief raster") that downstream
//! planners and schedulers can consume as a tensor. It does not localize, plan or learn; it only
//! summarizes a particle distribution spatially and in heading.
//!
//! This crate is primarily built off of the following dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): weighted covariance and its symmetric eigendecomposition.
//! - [`serde`](https://crates.io/crates/serde) with JSON, YAML and TOML backends: engine configuration files.
//! - [`csv`](https://crates.io/crates/csv): particle input and raster output.
//! - [`rand`](https://crates.io/crates/rand) and [`rand_distr`](https://crates.io/crates/rand_distr): seeded synthetic particle clouds.
//! - [`log`](https://crates.io/crates/log): diagnostics, via an injectable sink.
//!
//! ## Crate overview
//!
//! - [window]: adaptive window estimation from the weighted particle covariance.
//! - [aggregate]: single-pass binning of particles into per-cell sufficient statistics.
//! - [finalize]: circular mean and variance, and the position covariance log-determinant per cell.
//! - [raster]: the five-channel grid and its metadata.
//! - [normalize]: per-channel rescaling into [0, 1].
//! - [resample], [visualize], [report]: resizing and reframing, false-color preview, channel statistics.
//! - [engine]: [`engine::BeliefRasteriser`], the handle that runs the pipeline and owns the configuration.
//! - [config], [error], [diagnostics], [io], [synth]: configuration files, errors, diagnostic sinks,
//!   CSV I/O and synthetic clouds.
//!
//! ## Pipeline
//!
//! For a particle set $\{(p_i, \psi_i, w_i)\}$ the engine computes:
//!
//! 1. The weighted mean $\mu$ and covariance $\Sigma$ of the positions. The eigenvalues of $\Sigma$
//!    are floored at $10^{-8}$ and the window extent is
//!    $s = \mathrm{clamp}(k \sqrt{\lambda_{max}} (1 + m), s_{min}, s_{max})$ for sigma scale $k$ and
//!    crop margin $m$.
//! 2. For each particle the cell $(u, v) = \lfloor (p_i - \mu + s/2) / (s/n) \rfloor$ on an
//!    $n \times n$ grid (optionally after rotating $p_i - \mu$ into the principal axes). Particles
//!    outside the grid are dropped from every statistic.
//! 3. Per cell, with mass $m = \sum w_i$: mean sine and cosine of heading, circular variance
//!    $1 - \sqrt{\bar s^2 + \bar c^2}$, and $\ln \det$ of the position covariance from raw moments.
//! 4. Channel-wise normalization $v' = \mathrm{clamp}((v - a)/(b - a + 10^{-8}), 0, 1)$.
//!
//! Channel order is fixed: mass, mean sin, mean cos, log-determinant, circular variance.
//!
//! ```
//! use beliefraster::config::RasterConfig;
//! use beliefraster::engine::BeliefRasteriser;
//! use beliefraster::raster::Channel;
//! use beliefraster::synth::GaussianCloud;
//!
//! let engine = BeliefRasteriser::new(RasterConfig { grid_size: 32, ..Default::default() }).unwrap();
//! let particles = GaussianCloud::default().sample(1_000, 42).unwrap();
//! let raster = engine.rasterise(&particles);
//! let mass: f32 = raster.grid.channel_values(Channel::Mass).sum();
//! assert!(mass <= 1.0 + 1e-4);
//! ```
pub mod aggregate;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod finalize;
pub mod io;
pub mod normalize;
pub mod particle;
pub mod raster;
pub mod report;
pub mod resample;
pub mod synth;
pub mod visualize;
pub mod window;

pub use config::RasterConfig;
pub use engine::BeliefRasteriser;
pub use error::{RasterError, Result};
pub use particle::Particle;
pub use raster::{BeliefRaster, Channel};
