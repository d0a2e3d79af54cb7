//! Tests for mapping bounding boxes onto grid crop windows.

use zonal_common::{BoundingBox, GeoTransform, GridSpec, BOUNDS_EPSILON};

fn conus_like() -> GridSpec {
    // 0.01 degree grid, top-left corner at (-125, 50)
    GridSpec::new(2500, 5900, GeoTransform::new(-125.0, 50.0, 0.01, 0.01)).unwrap()
}

// ============================================================================
// Window arithmetic
// ============================================================================

#[test]
fn test_window_floor_and_ceil() {
    let spec = conus_like();
    let window = spec.crop_window(&BoundingBox::new(-100.005, 39.995, -99.985, 40.015));

    // rows: floor((50 - 40.015) / 0.01) = 998, ceil((50 - 39.995) / 0.01) = 1001
    assert_eq!(window.start_row, 998);
    assert_eq!(window.end_row, 1001);
    // cols: floor(24.995 / 0.01) = 2499, ceil(25.015 / 0.01) = 2502
    assert_eq!(window.start_col, 2499);
    assert_eq!(window.end_col, 2502);
}

#[test]
fn test_window_bounds_are_expanded_on_right_and_bottom() {
    let spec = conus_like();
    let window = spec.crop_window(&BoundingBox::new(-100.0, 40.0, -99.0, 41.0));
    let t = &spec.transform;

    let exact_right = t.origin_lon + t.dlon * window.end_col as f64;
    let exact_bottom = t.origin_lat - t.dlat * window.end_row as f64;

    assert!((window.bounds.max_x - (exact_right + BOUNDS_EPSILON)).abs() < 1e-15);
    assert!((window.bounds.min_y - (exact_bottom - BOUNDS_EPSILON)).abs() < 1e-12);
    assert_eq!(
        window.bounds.min_x,
        t.origin_lon + t.dlon * window.start_col as f64
    );
    assert_eq!(
        window.bounds.max_y,
        t.origin_lat - t.dlat * window.start_row as f64
    );
}

#[test]
fn test_window_clamps_to_grid_edges() {
    let spec = conus_like();
    let window = spec.crop_window(&BoundingBox::new(-180.0, -90.0, 180.0, 90.0));

    assert_eq!(window.start_row, 0);
    assert_eq!(window.end_row, spec.rows - 1);
    assert_eq!(window.start_col, 0);
    assert_eq!(window.end_col, spec.cols - 1);
    assert_eq!(window.rows(), spec.rows);
    assert_eq!(window.cols(), spec.cols);
}

#[test]
fn test_degenerate_box_gives_single_cell_window() {
    let spec = GridSpec::new(4, 4, GeoTransform::new(0.0, 0.0, 1.0, 1.0)).unwrap();
    let window = spec.crop_window(&BoundingBox::new(1.5, -1.5, 1.5, -1.5));

    assert_eq!((window.start_row, window.end_row), (1, 2));
    assert_eq!((window.start_col, window.end_col), (1, 2));
}

#[test]
fn test_extent() {
    let spec = conus_like();
    let extent = spec.extent();
    assert!((extent.min_x - (-125.0)).abs() < 1e-9);
    assert!((extent.max_x - (-66.0)).abs() < 1e-9);
    assert!((extent.min_y - 25.0).abs() < 1e-9);
    assert!((extent.max_y - 50.0).abs() < 1e-9);
}
