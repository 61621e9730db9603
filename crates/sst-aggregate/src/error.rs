//! Error types for SST aggregation.

use sst_common::SstError;
use thiserror::Error;

/// Errors that can occur while aggregating SST products.
///
/// Empty cells, zero weight sums and unsupported LUT resolutions are not
/// errors; they show up as NaN in the result vectors.
#[derive(Error, Debug)]
pub enum AggregationError {
    /// A precondition on an argument was violated.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An accumulator that only takes unit weights was given another weight.
    #[error("illegal weight {weight}: {accumulator} only accepts a weight of 1.0")]
    IllegalWeight {
        accumulator: &'static str,
        weight: f64,
    },

    /// A grid required by the product type is missing.
    #[error("missing grid: {0}")]
    MissingGrid(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Coverage lookup table error.
    #[error("lookup table error: {0}")]
    Lut(String),

    /// The source provider failed to deliver grids.
    #[error("source error: {0}")]
    Source(String),

    /// Geometry, region mask or region list error.
    #[error(transparent)]
    Common(#[from] SstError),
}

impl AggregationError {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a MissingGrid error.
    pub fn missing_grid(name: impl Into<String>) -> Self {
        Self::MissingGrid(name.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a Lut error.
    pub fn lut(msg: impl Into<String>) -> Self {
        Self::Lut(msg.into())
    }

    /// Create a Source error.
    pub fn source_failed(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}

impl From<std::io::Error> for AggregationError {
    fn from(err: std::io::Error) -> Self {
        Self::Common(SstError::from(err))
    }
}

impl From<serde_yaml::Error> for AggregationError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregationError>;
