//! CSV input of particle sets and CSV output of rasters.
//!
//! Particle files carry one particle per row with the header
//! `x,y,yaw,weight,cov_xx,cov_xy,cov_yx,cov_yy,confidence,timestamp`. The
//! covariance, confidence and timestamp columns may be left empty.
use std::io;
use std::path::Path;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::particle::Particle;
use crate::raster::{BeliefRaster, Channel};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub x: f64,
    pub y: f64,
    /// Heading in radians
    pub yaw: f64,
    pub weight: f64,
    #[serde(default)]
    pub cov_xx: Option<f64>,
    #[serde(default)]
    pub cov_xy: Option<f64>,
    #[serde(default)]
    pub cov_yx: Option<f64>,
    #[serde(default)]
    pub cov_yy: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl From<&Particle> for ParticleRecord {
    fn from(p: &Particle) -> Self {
        ParticleRecord {
            x: p.position.x,
            y: p.position.y,
            yaw: p.yaw,
            weight: p.weight,
            cov_xx: Some(p.covariance[0]),
            cov_xy: Some(p.covariance[1]),
            cov_yx: Some(p.covariance[2]),
            cov_yy: Some(p.covariance[3]),
            confidence: Some(p.confidence),
            timestamp: Some(p.timestamp),
        }
    }
}

impl From<ParticleRecord> for Particle {
    fn from(r: ParticleRecord) -> Self {
        Particle {
            position: Vector2::new(r.x, r.y),
            yaw: r.yaw,
            weight: r.weight,
            covariance: [
                r.cov_xx.unwrap_or(0.0),
                r.cov_xy.unwrap_or(0.0),
                r.cov_yx.unwrap_or(0.0),
                r.cov_yy.unwrap_or(0.0),
            ],
            confidence: r.confidence.unwrap_or(1.0),
            timestamp: r.timestamp.unwrap_or(0),
            features: None,
        }
    }
}

/// Reads a particle CSV file.
pub fn read_particles<P: AsRef<Path>>(path: P) -> Result<Vec<Particle>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut particles = Vec::new();
    for result in rdr.deserialize() {
        let record: ParticleRecord = result?;
        particles.push(record.into());
    }
    Ok(particles)
}

/// Writes particles to CSV. Feature vectors are not persisted.
pub fn write_particles<P: AsRef<Path>>(particles: &[Particle], path: P) -> io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for particle in particles {
        writer.serialize(ParticleRecord::from(particle))?;
    }
    writer.flush()?;
    Ok(())
}

/// One pixel of a raster grid in long format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterCellRecord {
    pub row: usize,
    pub col: usize,
    pub mass: f32,
    pub mean_sin: f32,
    pub mean_cos: f32,
    pub logdet_cov: f32,
    pub circular_variance: f32,
}

impl RasterCellRecord {
    pub fn from_raster(raster: &BeliefRaster) -> Vec<RasterCellRecord> {
        let grid = &raster.grid;
        let mut records = Vec::with_capacity(grid.height() * grid.width());
        for row in 0..grid.height() {
            for col in 0..grid.width() {
                records.push(RasterCellRecord {
                    row,
                    col,
                    mass: grid.at(row, col, Channel::Mass),
                    mean_sin: grid.at(row, col, Channel::MeanSin),
                    mean_cos: grid.at(row, col, Channel::MeanCos),
                    logdet_cov: grid.at(row, col, Channel::LogDetCov),
                    circular_variance: grid.at(row, col, Channel::CircularVariance),
                });
            }
        }
        records
    }
}

/// Writes every pixel of the raster grid as one CSV row.
pub fn write_raster_csv<P: AsRef<Path>>(raster: &BeliefRaster, path: P) -> io::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in RasterCellRecord::from_raster(raster) {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
