//! RASTER SIM: command line front end for the belief rasterisation engine.
//!
//! The program reads particle sets from CSV files, rasterises each one with a shared
//! [`BeliefRasteriser`], and writes the five-channel grid back out as CSV. It can also
//! generate synthetic particle clouds and write a default configuration file.
//!
//! Engine settings come from a configuration file (TOML/JSON/YAML) passed with
//! `--config`; a few common settings can be overridden per run with flags.

mod common;
#[cfg(feature = "plotting")]
mod plotting;

use beliefraster::io::{read_particles, write_particles, write_raster_csv};
use beliefraster::report;
use beliefraster::synth::{GaussianCloud, uniform_square};
use beliefraster::{BeliefRasteriser, RasterConfig};
use clap::{Args, Parser, Subcommand};
use common::{ensure_parent, init_logger, output_file, particle_files, prepare_output_dir};
use log::{error, info};
use nalgebra::Vector2;
use rayon::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const LONG_ABOUT: &str = "RASTER SIM: rasterise weighted particle beliefs into five-channel grids.

Each input CSV holds one particle set with the columns
  x,y,yaw,weight,cov_xx,cov_xy,cov_yx,cov_yy,confidence,timestamp
and produces <name>_raster.csv with one row per grid cell:
  row,col,mass,mean_sin,mean_cos,logdet_cov,circular_variance

Engine settings are read from --config (TOML/JSON/YAML) when given, otherwise defaults are used.";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Rasterise particle beliefs into multi-channel grids.", long_about = LONG_ABOUT)]
struct Cli {
    /// Engine configuration file (TOML/JSON/YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Process multiple input files in parallel
    #[arg(long, global = true)]
    parallel: bool,
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Rasterise one particle CSV file or every CSV file in a directory
    Rasterise(RasteriseArgs),
    /// Generate a synthetic particle cloud
    Synth(SynthArgs),
    /// Write the default engine configuration to a file
    Config(ConfigArgs),
}

#[derive(Args, Clone, Debug)]
struct RasteriseArgs {
    /// Particle CSV file or directory of CSV files
    #[arg(short, long)]
    input: PathBuf,
    /// Output directory
    #[arg(short, long)]
    output: PathBuf,
    /// Override the grid size
    #[arg(long)]
    grid_size: Option<usize>,
    /// Bin particles in the principal-axis frame
    #[arg(long)]
    align_axes: bool,
    /// Keep raw channel values instead of normalizing
    #[arg(long)]
    raw: bool,
    /// Log per-channel statistics of every raster
    #[arg(long)]
    stats: bool,
    /// Write a false-color PNG preview next to each raster
    #[cfg(feature = "plotting")]
    #[arg(long)]
    preview: bool,
    /// Pixels per cell in the preview
    #[cfg(feature = "plotting")]
    #[arg(long, default_value_t = 8)]
    preview_scale: u32,
}

#[derive(Args, Clone, Debug)]
struct SynthArgs {
    /// Output particle CSV file
    #[arg(short, long)]
    output: PathBuf,
    /// Number of particles
    #[arg(short = 'n', long, default_value_t = 1000)]
    particles: usize,
    /// Random seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Draw uniformly over a square of this half-extent instead of a Gaussian
    #[arg(long)]
    uniform: Option<f64>,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    center_x: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    center_y: f64,
    /// Standard deviation along the major axis
    #[arg(long, default_value_t = 1.0)]
    sigma_major: f64,
    #[arg(long, default_value_t = 1.0)]
    sigma_minor: f64,
    /// Major axis angle from +x (radians)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    orientation: f64,
    /// Mean heading (radians)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    heading: f64,
    #[arg(long, default_value_t = 0.1)]
    heading_std: f64,
}

#[derive(Args, Clone, Debug)]
struct ConfigArgs {
    /// Output configuration file (.toml/.json/.yaml)
    #[arg(short, long)]
    output: PathBuf,
}

fn load_config(path: Option<&PathBuf>) -> Result<RasterConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Ok(RasterConfig::load(path)?)
        }
        None => Ok(RasterConfig::default()),
    }
}

/// Rasterise a single particle file and write its outputs.
fn process_file(
    input: &Path,
    output: &Path,
    engine: &BeliefRasteriser,
    args: &RasteriseArgs,
) -> Result<(), Box<dyn Error>> {
    let particles = read_particles(input)?;
    info!("Read {} particles from {}", particles.len(), input.display());
    let raster = engine.rasterise(&particles);

    let raster_path = output_file(input, output, "_raster.csv");
    write_raster_csv(&raster, &raster_path)?;
    info!(
        "Wrote {}x{} raster (window size {:.3}) to {}",
        raster.height(),
        raster.width(),
        raster.window.size,
        raster_path.display()
    );

    if args.stats {
        for stats in report::report(&raster) {
            info!("{}: {}", input.display(), stats);
        }
    }

    #[cfg(feature = "plotting")]
    if args.preview {
        let preview_path = output_file(input, output, "_preview.png");
        plotting::write_preview(&engine.to_image(&raster), &preview_path, args.preview_scale)?;
        info!("Wrote preview to {}", preview_path.display());
    }
    Ok(())
}

fn run_rasterise(args: &RasteriseArgs, mut config: RasterConfig, parallel: bool) -> Result<(), Box<dyn Error>> {
    if let Some(grid_size) = args.grid_size {
        config.grid_size = grid_size;
    }
    if args.align_axes {
        config.align_axes = true;
    }
    if args.raw {
        config.normalize = false;
    }
    let engine = BeliefRasteriser::new(config)?;

    let csv_files = particle_files(&args.input)?;
    prepare_output_dir(&args.output)?;
    let is_multiple = csv_files.len() > 1;
    if is_multiple {
        info!("Processing {} CSV files from directory", csv_files.len());
    }

    if parallel && is_multiple {
        info!("Running in parallel mode");
        let errors = Mutex::new(Vec::new());
        csv_files.par_iter().for_each(|input_file| {
            if let Err(e) = process_file(input_file, &args.output, &engine, args) {
                error!("Error processing {}: {}", input_file.display(), e);
                errors
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((input_file.clone(), e.to_string()));
            }
        });
        let errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        if !errors.is_empty() {
            for (file, err) in &errors {
                error!("  {}: {}", file.display(), err);
            }
            return Err(format!("{} file(s) failed to process", errors.len()).into());
        }
    } else {
        let mut failures = 0usize;
        for input_file in &csv_files {
            if let Err(e) = process_file(input_file, &args.output, &engine, args) {
                if !is_multiple {
                    return Err(e);
                }
                failures += 1;
                error!("Error processing {}: {}", input_file.display(), e);
            }
        }
        if failures > 0 {
            return Err(format!("{failures} file(s) failed to process").into());
        }
    }
    Ok(())
}

fn run_synth(args: &SynthArgs) -> Result<(), Box<dyn Error>> {
    let seed = args.seed.unwrap_or_else(rand::random);
    let particles = match args.uniform {
        Some(half_extent) => uniform_square(args.particles, half_extent, seed),
        None => GaussianCloud {
            center: Vector2::new(args.center_x, args.center_y),
            sigma_major: args.sigma_major,
            sigma_minor: args.sigma_minor,
            orientation: args.orientation,
            heading: args.heading,
            heading_std: args.heading_std,
        }
        .sample(args.particles, seed)?,
    };
    ensure_parent(&args.output)?;
    write_particles(&particles, &args.output)?;
    info!(
        "Wrote {} particles (seed {}) to {}",
        particles.len(),
        seed,
        args.output.display()
    );
    Ok(())
}

fn run_config(args: &ConfigArgs, config: RasterConfig) -> Result<(), Box<dyn Error>> {
    config.to_file(&args.output)?;
    info!("Wrote configuration to {}", args.output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, cli.log_file.as_ref())?;
    let config = load_config(cli.config.as_ref())?;

    match &cli.command {
        Command::Rasterise(args) => run_rasterise(args, config, cli.parallel),
        Command::Synth(args) => run_synth(args),
        Command::Config(args) => run_config(args, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beliefraster::io::RasterCellRecord;

    fn rasterise_args(input: PathBuf, output: PathBuf) -> RasteriseArgs {
        match Cli::try_parse_from([
            "raster-sim",
            "rasterise",
            "--input",
            input.to_str().unwrap_or_default(),
            "--output",
            output.to_str().unwrap_or_default(),
            "--grid-size",
            "8",
        ]) {
            Ok(Cli {
                command: Command::Rasterise(args),
                ..
            }) => args,
            _ => panic!("rasterise arguments should parse"),
        }
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "raster-sim",
            "synth",
            "--output",
            "cloud.csv",
            "-n",
            "50",
            "--heading",
            "-1.5",
            "--parallel",
            "--log-level",
            "debug",
        ])
        .expect("valid arguments");
        assert!(cli.parallel);
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Synth(args) => {
                assert_eq!(args.particles, 50);
                assert_eq!(args.heading, -1.5);
                assert!(args.seed.is_none());
            }
            _ => panic!("expected synth"),
        }
    }

    #[test]
    fn synth_then_rasterise_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        for (name, seed) in [("a.csv", 1), ("b.csv", 2)] {
            run_synth(&SynthArgs {
                output: input.join(name),
                particles: 200,
                seed: Some(seed),
                uniform: None,
                center_x: 1.0,
                center_y: -2.0,
                sigma_major: 1.5,
                sigma_minor: 0.5,
                orientation: 0.3,
                heading: 0.0,
                heading_std: 0.2,
            })
            .expect("synth");
        }

        let args = rasterise_args(input.clone(), output.clone());
        run_rasterise(&args, RasterConfig::default(), true).expect("rasterise");

        for stem in ["a", "b"] {
            let path = output.join(format!("{stem}_raster.csv"));
            let mut rdr = csv::Reader::from_path(&path).expect("raster csv");
            let rows: Vec<RasterCellRecord> = rdr
                .deserialize()
                .collect::<Result<_, _>>()
                .expect("rows");
            assert_eq!(rows.len(), 64);
            assert!(rows.iter().all(|r| (0.0..=1.0).contains(&r.mass)));
        }
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().expect("temp dir");
        let args = rasterise_args(dir.path().join("missing.csv"), dir.path().join("out"));
        assert!(run_rasterise(&args, RasterConfig::default(), false).is_err());
    }

    #[test]
    fn synth_rejects_negative_spread() {
        let dir = tempfile::tempdir().expect("temp dir");
        let output = dir.path().join("cloud.csv");
        let cli = Cli::try_parse_from([
            "raster-sim",
            "synth",
            "--output",
            output.to_str().unwrap_or_default(),
            "--sigma-minor=-1",
        ])
        .expect("valid arguments");
        match cli.command {
            Command::Synth(args) => assert!(run_synth(&args).is_err()),
            _ => panic!("expected synth"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn config_command_writes_loadable_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("raster.yaml");
        run_config(&ConfigArgs { output: path.clone() }, RasterConfig::default()).expect("write");
        let loaded = load_config(Some(&path)).expect("load");
        assert_eq!(loaded, RasterConfig::default());
    }
}
