//! Error types shared by the SST aggregation crates.

use thiserror::Error;

/// Result type alias using SstError.
pub type SstResult<T> = Result<T, SstError>;

/// Errors raised by grid geometry, region masks and region lists.
///
/// Numerically undefined results (empty cells, zero weights, unsupported
/// LUT resolutions) are never reported through this type; they surface
/// as NaN samples instead.
#[derive(Debug, Error)]
pub enum SstError {
    // === Precondition Errors ===
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),

    #[error("Grid definitions do not match: {0}")]
    GridMismatch(String),

    // === Format Errors ===
    #[error("Region {region}: illegal mask format in line {line}, column {column}: {message}")]
    MaskFormat {
        region: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Illegal region entry {entry}: {message}")]
    RegionList { entry: usize, message: String },

    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(String),
}

impl SstError {
    /// Create an InvalidArgument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an OutOfRange error.
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        Self::OutOfRange(msg.into())
    }

    /// Create a MaskFormat error for the given region, line and column.
    pub fn mask_format(
        region: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::MaskFormat {
            region: region.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a RegionList error for the 1-based entry number.
    pub fn region_list(entry: usize, message: impl Into<String>) -> Self {
        Self::RegionList {
            entry,
            message: message.into(),
        }
    }

    /// True for errors caused by malformed text input.
    pub fn is_format_error(&self) -> bool {
        matches!(self, SstError::MaskFormat { .. } | SstError::RegionList { .. })
    }
}

impl From<std::io::Error> for SstError {
    fn from(err: std::io::Error) -> Self {
        SstError::Io(err.to_string())
    }
}
