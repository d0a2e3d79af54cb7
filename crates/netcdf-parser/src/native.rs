//! Native NetCDF reading using the netcdf library.

use std::path::Path;
use std::sync::Once;

use tracing::debug;
use zonal_common::{Grid, GridSpec};

use crate::error::{NetCdfError, NetCdfResult};
use crate::{flip_rows, transform_from_coordinates, unpack_values, CoordinateAnchor};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This function disables that output by calling
/// H5Eset_auto2 with null handlers. It only needs to be called once per process,
/// but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Which variables of a file make up a layer grid.
#[derive(Debug, Clone)]
pub struct LayerOptions {
    /// Data variable to read (e.g. "PM25")
    pub layer: String,
    /// Longitude coordinate variable / dimension name
    pub longitude_dim: String,
    /// Latitude coordinate variable / dimension name
    pub latitude_dim: String,
    /// Position of the coordinate values within their cells
    pub anchor: CoordinateAnchor,
}

impl LayerOptions {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            longitude_dim: "lon".to_string(),
            latitude_dim: "lat".to_string(),
            anchor: CoordinateAnchor::default(),
        }
    }

    pub fn with_anchor(mut self, anchor: CoordinateAnchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// Load one layer of a NetCDF file as a north-up [`Grid`].
pub fn load_layer<P: AsRef<Path>>(path: P, options: &LayerOptions) -> NetCdfResult<Grid> {
    let path = path.as_ref();
    silence_hdf5_errors();

    let nc_file = netcdf::open(path).map_err(|e| {
        NetCdfError::InvalidFormat(format!("Failed to open NetCDF {}: {}", path.display(), e))
    })?;

    let lon = read_coordinate(&nc_file, &options.longitude_dim)?;
    let lat = read_coordinate(&nc_file, &options.latitude_dim)?;

    let var = nc_file
        .variable(&options.layer)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", options.layer)))?;

    check_layer_dimensions(&var, options, lat.len(), lon.len())?;

    let raw: Vec<f32> = var.get_values(..).map_err(|e| {
        NetCdfError::InvalidFormat(format!("Failed to read {}: {}", options.layer, e))
    })?;

    let scale_factor = get_f32_attr(&var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0);
    let fill_values: Vec<f32> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| get_f32_attr(&var, name))
        .collect();

    let (transform, south_up) = transform_from_coordinates(&lon, &lat, options.anchor)?;
    let (rows, cols) = (lat.len(), lon.len());

    let mut values = unpack_values(raw, &fill_values, scale_factor, add_offset);
    if south_up {
        flip_rows(&mut values, rows, cols);
    }

    debug!(
        path = %path.display(),
        layer = %options.layer,
        rows,
        cols,
        south_up,
        "Loaded NetCDF layer"
    );

    let spec = GridSpec::new(rows, cols, transform)?;
    Ok(Grid::new(spec, values)?)
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_coordinate(nc_file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = nc_file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate variable", name)))?;
    var.get_values(..)
        .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))
}

/// The layer must end in (lat, lon) with every leading dimension of length 1.
fn check_layer_dimensions(
    var: &netcdf::Variable,
    options: &LayerOptions,
    rows: usize,
    cols: usize,
) -> NetCdfResult<()> {
    let dims = var.dimensions();
    let names: Vec<String> = dims.iter().map(|d| d.name()).collect();

    if dims.len() < 2 {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} must have at least 2 dimensions, found {:?}",
            options.layer, names
        )));
    }

    let (leading, spatial) = dims.split_at(dims.len() - 2);
    if spatial[0].name() != options.latitude_dim || spatial[1].name() != options.longitude_dim {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} must be laid out as (..., {}, {}), found {:?}",
            options.layer, options.latitude_dim, options.longitude_dim, names
        )));
    }
    if spatial[0].len() != rows || spatial[1].len() != cols {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} shape does not match its coordinate variables",
            options.layer
        )));
    }
    if let Some(dim) = leading.iter().find(|d| d.len() != 1) {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has {} steps along '{}'; one time slice per file is expected",
            options.layer,
            dim.len(),
            dim.name()
        )));
    }

    Ok(())
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Read a numeric attribute as f32, whatever its stored numeric type.
fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let value = || var.attribute_value(name)?.ok();

    f32::try_from(value()?)
        .ok()
        .or_else(|| f64::try_from(value()?).ok().map(|v| v as f32))
        .or_else(|| i16::try_from(value()?).ok().map(f32::from))
        .or_else(|| i32::try_from(value()?).ok().map(|v| v as f32))
}
