//! Common polygon fixtures.

use geo::{polygon, Coord, MultiPoint, Point, Polygon, Rect};
use serde_json::{json, Value};

/// Common bounding boxes as (min_lon, min_lat, max_lon, max_lat).
pub mod bbox {
    /// Extent of the 4x4 scenario grid
    pub const SCENARIO_4X4: (f64, f64, f64, f64) = (0.0, -4.0, 4.0, 0.0);

    /// Well outside the scenario grid
    pub const OUTSIDE: (f64, f64, f64, f64) = (10.0, 10.0, 12.0, 12.0);
}

/// Axis-aligned rectangle polygon.
pub fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }).to_polygon()
}

/// Rectangle polygon from a `bbox` constant.
pub fn bbox_polygon(bbox: (f64, f64, f64, f64)) -> Polygon<f64> {
    rect_polygon(bbox.0, bbox.1, bbox.2, bbox.3)
}

/// Scenario polygon P1: box over rows 0-1, cols 0-1 of the 4x4 grid.
pub fn scenario_p1() -> Polygon<f64> {
    rect_polygon(0.0, -2.0, 2.0, 0.0)
}

/// Scenario point P2 at the center of the 4x4 grid.
pub fn scenario_p2() -> Point<f64> {
    Point::new(2.0, -2.0)
}

/// Right triangle with legs of length `size` at the top-left of the origin.
pub fn corner_triangle(size: f64) -> Polygon<f64> {
    polygon![
        (x: 0.0, y: 0.0),
        (x: size, y: 0.0),
        (x: 0.0, y: -size),
        (x: 0.0, y: 0.0),
    ]
}

/// Points at the centers of the given cells of a unit grid anchored at (0, 0).
pub fn unit_cell_centers(cells: &[(usize, usize)]) -> MultiPoint<f64> {
    MultiPoint::new(
        cells
            .iter()
            .map(|&(row, col)| Point::new(col as f64 + 0.5, -(row as f64) - 0.5))
            .collect(),
    )
}

/// A GeoJSON FeatureCollection with one Polygon feature per rectangle.
///
/// Each feature gets a string `idvar` property from `ids`.
pub fn rect_feature_collection(idvar: &str, ids: &[&str], rects: &[(f64, f64, f64, f64)]) -> String {
    let features: Vec<Value> = ids
        .iter()
        .zip(rects)
        .map(|(id, &(x0, y0, x1, y1))| {
            json!({
                "type": "Feature",
                "properties": { idvar: id },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]],
                },
            })
        })
        .collect();

    json!({ "type": "FeatureCollection", "features": features }).to_string()
}
