//! NetCDF reader for gridded climate layers.
//!
//! Reads one named variable from a NetCDF-4 (or classic) file into a
//! [`zonal_common::Grid`], deriving the affine transform from the file's
//! longitude/latitude coordinate variables.
//!
//! # Layout expectations
//!
//! The layer variable's trailing dimensions must be `(latitude, longitude)`.
//! Any leading dimensions (typically a `time` axis holding a single step)
//! must have length 1. Coordinate variables must be evenly spaced; whether a
//! coordinate marks a cell's north-west corner or its center is chosen with
//! [`CoordinateAnchor`]. Grids stored south-up are flipped on load so row 0
//! is always the northernmost row.
//!
//! CF packing attributes are honoured: `_FillValue` and `missing_value`
//! become NaN, then `scale_factor` and `add_offset` are applied.

pub mod error;
pub mod native;

pub use error::{NetCdfError, NetCdfResult};
pub use native::{load_layer, silence_hdf5_errors, LayerOptions};

use serde::{Deserialize, Serialize};
use zonal_common::GeoTransform;

/// Largest deviation of a coordinate from its regular position, as a
/// fraction of the step. Loose enough for single-precision axes.
const SPACING_TOLERANCE: f64 = 1e-2;

/// Where in a cell its coordinate values sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateAnchor {
    /// Coordinates are the north-west corner of each cell.
    #[default]
    Corner,
    /// Coordinates are cell centers.
    Center,
}

impl std::str::FromStr for CoordinateAnchor {
    type Err = NetCdfError;

    fn from_str(s: &str) -> NetCdfResult<Self> {
        match s.to_lowercase().as_str() {
            "corner" => Ok(CoordinateAnchor::Corner),
            "center" => Ok(CoordinateAnchor::Center),
            other => Err(NetCdfError::InvalidFormat(format!(
                "unknown coordinate anchor '{}', expected corner or center",
                other
            ))),
        }
    }
}

/// Derive a north-up transform from coordinate arrays.
///
/// Returns the transform and whether the latitude axis runs south to north
/// (in which case the data rows must be flipped).
pub fn transform_from_coordinates(
    lon: &[f64],
    lat: &[f64],
    anchor: CoordinateAnchor,
) -> NetCdfResult<(GeoTransform, bool)> {
    let dlon = uniform_step(lon, "longitude")?;
    let dlat = uniform_step(lat, "latitude")?;

    if dlon <= 0.0 {
        return Err(NetCdfError::InvalidFormat(
            "longitude coordinates must increase eastward".to_string(),
        ));
    }

    let south_up = dlat > 0.0;
    let dlat = dlat.abs();
    let north = if south_up { lat[lat.len() - 1] } else { lat[0] };

    let transform = match anchor {
        CoordinateAnchor::Corner => GeoTransform::new(lon[0], north, dlon, dlat),
        CoordinateAnchor::Center => GeoTransform::from_first_center(lon[0], north, dlon, dlat),
    };
    Ok((transform, south_up))
}

fn uniform_step(coords: &[f64], axis: &str) -> NetCdfResult<f64> {
    if coords.len() < 2 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} axis needs at least 2 points to infer the cell size, got {}",
            axis,
            coords.len()
        )));
    }

    let first = coords[0];
    let step = (coords[coords.len() - 1] - first) / (coords.len() - 1) as f64;
    if step == 0.0 || !step.is_finite() {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} axis has a zero or non-finite step",
            axis
        )));
    }

    let irregular = coords
        .iter()
        .enumerate()
        .any(|(i, &c)| (c - (first + step * i as f64)).abs() > SPACING_TOLERANCE * step.abs());
    if irregular {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} axis is not evenly spaced",
            axis
        )));
    }

    Ok(step)
}

/// Convert packed raw values to physical values, mapping fill values to NaN.
pub fn unpack_values(
    raw: Vec<f32>,
    fill_values: &[f32],
    scale_factor: f32,
    add_offset: f32,
) -> Vec<f32> {
    let identity = scale_factor == 1.0 && add_offset == 0.0;
    raw.into_iter()
        .map(|val| {
            if fill_values.iter().any(|&fill| val == fill) {
                f32::NAN
            } else if identity {
                val
            } else {
                val * scale_factor + add_offset
            }
        })
        .collect()
}

/// Reverse the row order of a row-major buffer in place.
pub fn flip_rows(values: &mut [f32], rows: usize, cols: usize) {
    for row in 0..rows / 2 {
        let (top, bottom) = values.split_at_mut((rows - 1 - row) * cols);
        top[row * cols..(row + 1) * cols].swap_with_slice(&mut bottom[..cols]);
    }
}
