//! Grid generators with predictable, verifiable values.
//!
//! All generators return north-up grids: row 0 is the northernmost row and
//! the origin is the top-left corner.

use zonal_common::{GeoTransform, Grid, GridSpec};

/// Values of the 4x4 reference scenario, row-major:
///
/// ```text
///  1   2   3   4
///  5 NaN   7   8
///  9  10  11  12
/// 13  14  15  16
/// ```
pub fn scenario_4x4_values() -> Vec<f32> {
    let mut values: Vec<f32> = (1..=16).map(|v| v as f32).collect();
    values[5] = f32::NAN;
    values
}

/// The 4x4 scenario grid: origin (0, 0), 1x1 cells, extent [0, 4] x [-4, 0].
pub fn scenario_4x4_grid() -> Grid {
    let spec = GridSpec::new(4, 4, GeoTransform::new(0.0, 0.0, 1.0, 1.0))
        .expect("valid 4x4 spec");
    Grid::new(spec, scenario_4x4_values()).expect("16 values")
}

/// Creates a grid where each cell holds `row * 1000 + col`.
///
/// This makes it easy to verify which cells a reduction touched.
///
/// # Example
///
/// ```
/// use test_utils::create_indexed_grid;
///
/// let grid = create_indexed_grid(3, 5, (0.0, 0.0), 1.0);
/// assert_eq!(grid.get(0, 4), Some(4.0));
/// assert_eq!(grid.get(2, 1), Some(2001.0));
/// ```
pub fn create_indexed_grid(rows: usize, cols: usize, origin: (f64, f64), cell: f64) -> Grid {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            data.push((row * 1000 + col) as f32);
        }
    }
    grid_with_values(rows, cols, origin, cell, data)
}

/// Creates a grid with PM2.5-like values in µg/m³.
///
/// Values rise smoothly from ~2 in the north-west to ~20 in the south-east.
pub fn create_pm25_grid(rows: usize, cols: usize, origin: (f64, f64), cell: f64) -> Grid {
    let mut data = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        for col in 0..cols {
            let y = row as f32 / rows.max(1) as f32;
            let x = col as f32 / cols.max(1) as f32;
            data.push(2.0 + 9.0 * x + 9.0 * y);
        }
    }
    grid_with_values(rows, cols, origin, cell, data)
}

/// Creates a grid filled with a single value.
pub fn create_constant_grid(rows: usize, cols: usize, origin: (f64, f64), cell: f64, value: f32) -> Grid {
    grid_with_values(rows, cols, origin, cell, vec![value; rows * cols])
}

/// Builds a grid with square cells from raw row-major values.
///
/// Panics when the values do not fill the grid.
pub fn grid_with_values(
    rows: usize,
    cols: usize,
    origin: (f64, f64),
    cell: f64,
    values: Vec<f32>,
) -> Grid {
    let spec = GridSpec::new(rows, cols, GeoTransform::new(origin.0, origin.1, cell, cell))
        .expect("valid grid spec");
    Grid::new(spec, values).expect("values fill the grid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_grid() {
        let grid = scenario_4x4_grid();
        assert_eq!(grid.get(0, 0), Some(1.0));
        assert!(grid.get(1, 1).map_or(false, f32::is_nan));
        assert_eq!(grid.get(3, 3), Some(16.0));
    }

    #[test]
    fn test_pm25_grid_range() {
        let grid = create_pm25_grid(10, 10, (-100.0, 40.0), 0.1);
        let min = grid.values().iter().cloned().fold(f32::INFINITY, f32::min);
        let max = grid.values().iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        assert!(min >= 2.0 && max <= 20.0);
    }
}
