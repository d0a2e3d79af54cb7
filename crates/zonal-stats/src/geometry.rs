//! Zone geometries and the point-to-box fallback.

use std::borrow::Cow;

use geo::{BoundingRect, Coord, MultiPoint, MultiPolygon, Rect};
use zonal_common::{BoundingBox, GeoTransform};

/// Fraction of the smaller cell side by which a point box is shrunk inward.
pub const POINT_BOX_SHRINK: f64 = 0.01;

/// Geometry of a zone.
///
/// Zero-area point geometries cannot be rasterized directly, so they are kept
/// as their own variant and turned into cell boxes against a target grid.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneGeometry {
    /// Polygon or multipolygon footprint.
    Polygon(MultiPolygon<f64>),
    /// Point or multipoint locations.
    Point(MultiPoint<f64>),
}

impl ZoneGeometry {
    /// Bounding box of the raw geometry, None when it has no coordinates.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let rect = match self {
            ZoneGeometry::Polygon(polygons) => polygons.bounding_rect(),
            ZoneGeometry::Point(points) => points.bounding_rect(),
        }?;
        Some(rect_to_bbox(&rect))
    }

    /// Polygonal footprint to rasterize against a grid with `transform`.
    pub fn footprint(&self, transform: &GeoTransform) -> Cow<'_, MultiPolygon<f64>> {
        match self {
            ZoneGeometry::Polygon(polygons) => Cow::Borrowed(polygons),
            ZoneGeometry::Point(points) => Cow::Owned(box_points(points, transform)),
        }
    }
}

impl From<geo::Polygon<f64>> for ZoneGeometry {
    fn from(polygon: geo::Polygon<f64>) -> Self {
        ZoneGeometry::Polygon(MultiPolygon::new(vec![polygon]))
    }
}

impl From<MultiPolygon<f64>> for ZoneGeometry {
    fn from(polygons: MultiPolygon<f64>) -> Self {
        ZoneGeometry::Polygon(polygons)
    }
}

impl From<geo::Point<f64>> for ZoneGeometry {
    fn from(point: geo::Point<f64>) -> Self {
        ZoneGeometry::Point(MultiPoint::new(vec![point]))
    }
}

/// Replace each point with the box of its enclosing grid cell.
///
/// The box is shrunk by [`POINT_BOX_SHRINK`] of the smaller cell side so it
/// lies strictly inside the cell: it overlaps that cell only and contains
/// the cell center.
pub fn box_points(points: &MultiPoint<f64>, transform: &GeoTransform) -> MultiPolygon<f64> {
    let buffer = POINT_BOX_SHRINK * transform.dlon.min(transform.dlat);

    let boxes = points
        .iter()
        .map(|point| {
            let (row, col) = transform.cell_containing(point.x(), point.y());
            let left = transform.origin_lon + transform.dlon * col as f64;
            let top = transform.origin_lat - transform.dlat * row as f64;
            let cell = BoundingBox::new(left, top - transform.dlat, left + transform.dlon, top)
                .shrink(buffer);
            bbox_to_rect(&cell).to_polygon()
        })
        .collect();

    MultiPolygon::new(boxes)
}

pub(crate) fn rect_to_bbox(rect: &Rect<f64>) -> BoundingBox {
    BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
}

pub(crate) fn bbox_to_rect(bbox: &BoundingBox) -> Rect<f64> {
    Rect::new(
        Coord {
            x: bbox.min_x,
            y: bbox.min_y,
        },
        Coord {
            x: bbox.max_x,
            y: bbox.max_y,
        },
    )
}
