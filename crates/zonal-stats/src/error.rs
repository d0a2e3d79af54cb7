//! Error types for zonal aggregation.

use thiserror::Error;
use zonal_common::{GridError, TimeParseError};

/// Errors that can occur while mapping polygons and aggregating grids.
#[derive(Error, Debug)]
pub enum ZonalError {
    /// Invalid run configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A grid does not share the shape/transform the index map was built on.
    #[error("configuration error: {context}: {source}")]
    GridMismatch {
        context: String,
        #[source]
        source: GridError,
    },

    /// Crop/translate produced an index outside the grid. Always a bug.
    #[error(
        "internal consistency failure: polygon {polygon} mapped to cell ({row}, {col}) \
         outside a {rows}x{cols} grid"
    )]
    IndexOutOfBounds {
        polygon: usize,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A slice filename carries no parsable date token.
    #[error("cannot order slice '{file}': {reason}")]
    InvalidDateToken { file: String, reason: String },

    /// The set of slices cannot form a time series.
    #[error("invalid time slices: {0}")]
    InvalidSlices(String),

    /// The polygon set could not be read or is inconsistent.
    #[error("invalid polygon set: {0}")]
    Polygons(String),

    /// Grid definition error.
    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    /// NetCDF read error.
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf_parser::NetCdfError),

    /// Output encoding error.
    #[error("output error: {0}")]
    Output(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZonalError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a GridMismatch error with context describing the offending grid.
    pub fn grid_mismatch(context: impl Into<String>, source: GridError) -> Self {
        Self::GridMismatch {
            context: context.into(),
            source,
        }
    }

    /// Create an InvalidDateToken error.
    pub fn invalid_date_token(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidDateToken {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a Polygons error.
    pub fn polygons(msg: impl Into<String>) -> Self {
        Self::Polygons(msg.into())
    }
}

impl From<TimeParseError> for ZonalError {
    fn from(err: TimeParseError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ZonalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Polygons(format!("JSON error: {}", err))
    }
}

impl From<parquet::errors::ParquetError> for ZonalError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Result type for zonal aggregation operations.
pub type Result<T> = std::result::Result<T, ZonalError>;
