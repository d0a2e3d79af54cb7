//! Error types for grid definitions.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Errors raised while defining or comparing raster grids.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("Invalid grid specification: {0}")]
    InvalidSpec(String),

    #[error("Grid data length {actual} does not match shape {rows}x{cols}")]
    DataLength {
        rows: usize,
        cols: usize,
        actual: usize,
    },

    /// A grid does not share the shape/transform an index map was built against.
    #[error("Grid mismatch: expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
}

impl GridError {
    /// Create an InvalidSpec error.
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }
}
