//! Grid specifications and raster data for regular lon/lat grids.
//!
//! Rows grow downward (decreasing latitude) and columns grow rightward
//! (increasing longitude). The transform origin is the top-left corner of
//! the top-left cell.

use crate::{BoundingBox, GridError, GridResult};
use serde::{Deserialize, Serialize};

/// Expansion applied to the right/bottom edge of a crop window so boundary
/// cells are not dropped by floating-point rounding.
pub const BOUNDS_EPSILON: f64 = 1e-12;

/// Relative tolerance used when comparing transforms of two grids.
const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Affine mapping between (row, col) indices and (lon, lat) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Longitude of the left edge of column 0
    pub origin_lon: f64,
    /// Latitude of the top edge of row 0
    pub origin_lat: f64,
    /// Cell width (positive)
    pub dlon: f64,
    /// Cell height (positive, rows go north to south)
    pub dlat: f64,
}

impl GeoTransform {
    pub fn new(origin_lon: f64, origin_lat: f64, dlon: f64, dlat: f64) -> Self {
        Self {
            origin_lon,
            origin_lat,
            dlon,
            dlat,
        }
    }

    /// Build a transform from the coordinates of the first cell center.
    pub fn from_first_center(lon: f64, lat: f64, dlon: f64, dlat: f64) -> Self {
        Self::new(lon - dlon / 2.0, lat + dlat / 2.0, dlon, dlat)
    }

    /// Geographic bounds of a single cell.
    pub fn cell_bounds(&self, row: usize, col: usize) -> BoundingBox {
        let left = self.origin_lon + self.dlon * col as f64;
        let top = self.origin_lat - self.dlat * row as f64;
        BoundingBox::new(left, top - self.dlat, left + self.dlon, top)
    }

    /// Center of a single cell as (lon, lat).
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_lon + self.dlon * (col as f64 + 0.5),
            self.origin_lat - self.dlat * (row as f64 + 0.5),
        )
    }

    /// Index of the cell enclosing (x, y), which may lie outside any grid.
    pub fn cell_containing(&self, x: f64, y: f64) -> (i64, i64) {
        let row = ((self.origin_lat - y) / self.dlat).floor() as i64;
        let col = ((x - self.origin_lon) / self.dlon).floor() as i64;
        (row, col)
    }

    /// Compare two transforms with a small relative tolerance.
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        close(self.origin_lon, other.origin_lon)
            && close(self.origin_lat, other.origin_lat)
            && close(self.dlon, other.dlon)
            && close(self.dlat, other.dlat)
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TRANSFORM_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Shape and transform of a raster grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of rows (H)
    pub rows: usize,
    /// Number of columns (W)
    pub cols: usize,
    pub transform: GeoTransform,
}

impl GridSpec {
    /// Create a validated grid specification.
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> GridResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(GridError::invalid_spec(format!(
                "grid shape must be non-empty, got {}x{}",
                rows, cols
            )));
        }
        let t = &transform;
        if !(t.dlon.is_finite() && t.dlon > 0.0 && t.dlat.is_finite() && t.dlat > 0.0) {
            return Err(GridError::invalid_spec(format!(
                "cell size must be positive, got dlon={} dlat={}",
                t.dlon, t.dlat
            )));
        }
        if !(t.origin_lon.is_finite() && t.origin_lat.is_finite()) {
            return Err(GridError::invalid_spec("grid origin must be finite"));
        }

        Ok(Self {
            rows,
            cols,
            transform,
        })
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Always false for a validated spec.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Geographic extent covered by the grid.
    pub fn extent(&self) -> BoundingBox {
        let t = &self.transform;
        BoundingBox::new(
            t.origin_lon,
            t.origin_lat - t.dlat * self.rows as f64,
            t.origin_lon + t.dlon * self.cols as f64,
            t.origin_lat,
        )
    }

    /// Check that a (row, col) pair addresses a cell of this grid.
    pub fn contains_index(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Compute the crop window of cells covering `bbox`.
    ///
    /// Indices are clamped to the grid, so the window is always valid and
    /// contains at least one cell, even for boxes entirely outside the grid.
    pub fn crop_window(&self, bbox: &BoundingBox) -> CropWindow {
        let t = &self.transform;
        let max_row = self.rows - 1;
        let max_col = self.cols - 1;

        let start_row = clamp_index(((t.origin_lat - bbox.max_y) / t.dlat).floor(), max_row);
        let end_row = clamp_index(((t.origin_lat - bbox.min_y) / t.dlat).ceil(), max_row);
        let start_col = clamp_index(((bbox.min_x - t.origin_lon) / t.dlon).floor(), max_col);
        let end_col = clamp_index(((bbox.max_x - t.origin_lon) / t.dlon).ceil(), max_col);

        let bounds = BoundingBox::new(
            t.origin_lon + t.dlon * start_col as f64,
            t.origin_lat - t.dlat * end_row as f64 - BOUNDS_EPSILON,
            t.origin_lon + t.dlon * end_col as f64 + BOUNDS_EPSILON,
            t.origin_lat - t.dlat * start_row as f64,
        );

        CropWindow {
            start_row,
            end_row,
            start_col,
            end_col,
            bounds,
        }
    }

    /// Fail unless `other` has the same shape and transform as this spec.
    pub fn ensure_matches(&self, other: &GridSpec) -> GridResult<()> {
        if self.rows == other.rows
            && self.cols == other.cols
            && self.transform.approx_eq(&other.transform)
        {
            return Ok(());
        }

        Err(GridError::Mismatch {
            expected: self.describe(),
            found: other.describe(),
        })
    }

    fn describe(&self) -> String {
        let t = &self.transform;
        format!(
            "{}x{} grid at ({}, {}) with cells {}x{}",
            self.rows, self.cols, t.origin_lon, t.origin_lat, t.dlon, t.dlat
        )
    }
}

fn clamp_index(value: f64, max: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= max as f64 {
        max
    } else {
        value as usize
    }
}

/// Inclusive window of grid cells with its geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
    /// Left/top edges match the window; right/bottom are expanded by [`BOUNDS_EPSILON`].
    pub bounds: BoundingBox,
}

impl CropWindow {
    /// Number of rows in the window.
    pub fn rows(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    /// Number of columns in the window.
    pub fn cols(&self) -> usize {
        self.end_col - self.start_col + 1
    }
}

/// A 2-D field of `f32` samples on a regular grid. No-data cells hold NaN.
#[derive(Debug, Clone)]
pub struct Grid {
    spec: GridSpec,
    /// Row-major values, row 0 northernmost.
    values: Vec<f32>,
}

impl Grid {
    /// Create a grid, validating that `values` matches the spec's shape.
    pub fn new(spec: GridSpec, values: Vec<f32>) -> GridResult<Self> {
        if values.len() != spec.len() {
            return Err(GridError::DataLength {
                rows: spec.rows,
                cols: spec.cols,
                actual: values.len(),
            });
        }
        Ok(Self { spec, values })
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at (row, col), or None outside the grid.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if !self.spec.contains_index(row, col) {
            return None;
        }
        Some(self.values[row * self.spec.cols + col])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_spec(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(rows, cols, GeoTransform::new(0.0, 0.0, 1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_crop_window_for_aligned_box() {
        let spec = unit_spec(4, 4);
        let window = spec.crop_window(&BoundingBox::new(0.0, -2.0, 2.0, 0.0));

        assert_eq!((window.start_row, window.end_row), (0, 2));
        assert_eq!((window.start_col, window.end_col), (0, 2));
        assert_eq!(window.bounds.min_x, 0.0);
        assert_eq!(window.bounds.max_y, 0.0);
        assert!(window.bounds.min_y < -2.0);
        assert!(window.bounds.max_x > 2.0);
    }

    #[test]
    fn test_crop_window_outside_grid_is_clamped() {
        let spec = unit_spec(4, 4);
        let window = spec.crop_window(&BoundingBox::new(10.0, 5.0, 12.0, 7.0));

        assert_eq!((window.start_row, window.end_row), (0, 0));
        assert_eq!((window.start_col, window.end_col), (3, 3));
        assert_eq!(window.rows(), 1);
        assert_eq!(window.cols(), 1);
    }

    #[test]
    fn test_cell_containing_and_center() {
        let t = GeoTransform::new(-100.0, 50.0, 0.5, 0.25);
        assert_eq!(t.cell_containing(-99.9, 49.9), (0, 0));
        assert_eq!(t.cell_containing(-101.0, 49.9), (0, -2));

        let (lon, lat) = t.cell_center(2, 3);
        assert!((lon - (-98.25)).abs() < 1e-12);
        assert!((lat - 49.375).abs() < 1e-12);
    }

    #[test]
    fn test_from_first_center() {
        let t = GeoTransform::from_first_center(-124.995, 49.995, 0.01, 0.01);
        assert!((t.origin_lon - (-125.0)).abs() < 1e-9);
        assert!((t.origin_lat - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_ensure_matches() {
        let a = unit_spec(4, 4);
        let b = unit_spec(4, 4);
        let c = unit_spec(4, 5);
        let d = GridSpec::new(4, 4, GeoTransform::new(0.5, 0.0, 1.0, 1.0)).unwrap();

        assert!(a.ensure_matches(&b).is_ok());
        assert!(matches!(a.ensure_matches(&c), Err(GridError::Mismatch { .. })));
        assert!(matches!(a.ensure_matches(&d), Err(GridError::Mismatch { .. })));
    }

    #[test]
    fn test_invalid_specs_rejected() {
        assert!(GridSpec::new(0, 4, GeoTransform::new(0.0, 0.0, 1.0, 1.0)).is_err());
        assert!(GridSpec::new(4, 4, GeoTransform::new(0.0, 0.0, -1.0, 1.0)).is_err());
        assert!(GridSpec::new(4, 4, GeoTransform::new(f64::NAN, 0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_grid_length_checked() {
        let spec = unit_spec(2, 2);
        assert!(Grid::new(spec, vec![1.0; 3]).is_err());

        let grid = Grid::new(spec, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(grid.get(1, 0), Some(3.0));
        assert_eq!(grid.get(2, 0), None);
    }
}
