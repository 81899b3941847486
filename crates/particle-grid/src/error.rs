//! Error types for grid binning and aggregation.

use thiserror::Error;

/// Errors that can occur while building grids or binning particles.
#[derive(Error, Debug)]
pub enum GridError {
    /// Invalid grid configuration (bad edge vectors, bad resolution).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unrecognized particle stratification key.
    #[error("unknown grouping key: {0} (expected all, id or state)")]
    InvalidGroup(String),

    /// Positions and group keys (or coordinates) disagree in length.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
}

/// Result type for grid operations.
pub type GridResult<T> = Result<T, GridError>;
