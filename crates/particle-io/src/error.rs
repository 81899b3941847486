//! Error types for NetCDF file adapters.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing particle files.
#[derive(Error, Debug)]
pub enum ParticleIoError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying NetCDF library error
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Missing required variable or dimension
    #[error("missing required data: {0}")]
    MissingData(String),

    /// Unrecognized grid dimension names in the topography file
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Results file exists and overwrite was not requested
    #[error("results file {0} already exists (use --overwrite)")]
    ExistingOutput(PathBuf),

    /// Grid/results dimension or coordinate-length mismatch
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error propagated from the grid core
    #[error(transparent)]
    Grid(#[from] particle_grid::GridError),
}

/// Result type for particle file operations.
pub type IoResult<T> = Result<T, ParticleIoError>;
