//! Common types shared across the raster2polygon crates.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{GridError, GridResult};
pub use grid::{CropWindow, GeoTransform, Grid, GridSpec, BOUNDS_EPSILON};
pub use time::{Cadence, Period, TimeParseError};
