//! GeoJSON types for polygon sets and result exports.
//!
//! Only the geometry types a zone can have are modelled: Point, MultiPoint,
//! Polygon and MultiPolygon. Positions keep any extra ordinates on input but
//! only longitude/latitude are used.
//!
//! See: <https://datatracker.ietf.org/doc/html/rfc7946>

use geo::{Coord, LineString, MultiPoint, MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ZonalError};
use crate::geometry::ZoneGeometry;

/// A position: `[longitude, latitude, ...]`.
pub type Position = Vec<f64>;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// Null geometries are allowed by GeoJSON.
    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: Some(geometry),
            properties: Some(Map::new()),
        }
    }

    /// Set one property.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }
}

/// GeoJSON geometry types accepted as zones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Position,
    },

    MultiPoint {
        coordinates: Vec<Position>,
    },

    /// Linear rings; the first is the exterior, the rest are holes.
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },

    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
}

impl Geometry {
    /// Convert to a zone geometry.
    pub fn to_zone(&self) -> Result<ZoneGeometry> {
        Ok(match self {
            Geometry::Point { coordinates } => {
                ZoneGeometry::Point(MultiPoint::new(vec![Point::from(coord(coordinates)?)]))
            }
            Geometry::MultiPoint { coordinates } => ZoneGeometry::Point(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|p| coord(p).map(Point::from))
                    .collect::<Result<_>>()?,
            )),
            Geometry::Polygon { coordinates } => {
                ZoneGeometry::Polygon(MultiPolygon::new(vec![polygon(coordinates)?]))
            }
            Geometry::MultiPolygon { coordinates } => ZoneGeometry::Polygon(MultiPolygon::new(
                coordinates
                    .iter()
                    .map(|rings| polygon(rings))
                    .collect::<Result<_>>()?,
            )),
        })
    }

    /// Convert a zone geometry back to GeoJSON.
    pub fn from_zone(zone: &ZoneGeometry) -> Self {
        match zone {
            ZoneGeometry::Point(points) if points.0.len() == 1 => Geometry::Point {
                coordinates: vec![points.0[0].x(), points.0[0].y()],
            },
            ZoneGeometry::Point(points) => Geometry::MultiPoint {
                coordinates: points.iter().map(|p| vec![p.x(), p.y()]).collect(),
            },
            ZoneGeometry::Polygon(polygons) if polygons.0.len() == 1 => Geometry::Polygon {
                coordinates: rings(&polygons.0[0]),
            },
            ZoneGeometry::Polygon(polygons) => Geometry::MultiPolygon {
                coordinates: polygons.iter().map(rings).collect(),
            },
        }
    }
}

fn coord(position: &[f64]) -> Result<Coord<f64>> {
    match position {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(ZonalError::polygons(format!(
            "position needs at least 2 ordinates, got {}",
            position.len()
        ))),
    }
}

fn ring(positions: &[Position]) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>]) -> Result<geo::Polygon<f64>> {
    let (exterior, holes) = rings
        .split_first()
        .ok_or_else(|| ZonalError::polygons("polygon has no exterior ring"))?;
    Ok(geo::Polygon::new(
        ring(exterior)?,
        holes.iter().map(|h| ring(h)).collect::<Result<_>>()?,
    ))
}

fn rings(polygon: &geo::Polygon<f64>) -> Vec<Vec<Position>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ls| ls.coords().map(|c| vec![c.x, c.y]).collect())
        .collect()
}
