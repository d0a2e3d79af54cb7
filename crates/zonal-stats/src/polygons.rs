//! Loading polygon sets from GeoJSON.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Result, ZonalError};
use crate::geojson::FeatureCollection;
use crate::geometry::ZoneGeometry;
use crate::types::Polygon;

/// Read a polygon set, taking each id from the `idvar` property.
pub fn read_polygons(path: &Path, idvar: &str) -> Result<Vec<Polygon>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ZonalError::polygons(format!("cannot read {}: {}", path.display(), e))
    })?;
    let polygons = parse_feature_collection(&text, idvar)?;

    info!(path = %path.display(), polygons = polygons.len(), idvar, "Loaded polygon set");
    Ok(polygons)
}

/// Parse a FeatureCollection into polygons, in feature order.
///
/// Ids must be present and unique. Features with a null geometry are kept with
/// an empty footprint so the output still lists them.
pub fn parse_feature_collection(text: &str, idvar: &str) -> Result<Vec<Polygon>> {
    let collection: FeatureCollection = serde_json::from_str(text)?;
    if collection.type_ != "FeatureCollection" {
        return Err(ZonalError::polygons(format!(
            "expected a FeatureCollection, found '{}'",
            collection.type_
        )));
    }

    let mut seen = HashSet::with_capacity(collection.features.len());
    let mut polygons = Vec::with_capacity(collection.features.len());

    for (i, feature) in collection.features.iter().enumerate() {
        let id = match feature.property(idvar) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(ZonalError::polygons(format!(
                    "feature {}: id property '{}' must be a string or number, got {}",
                    i, idvar, other
                )))
            }
            None => {
                return Err(ZonalError::polygons(format!(
                    "feature {} has no '{}' property",
                    i, idvar
                )))
            }
        };

        if !seen.insert(id.clone()) {
            return Err(ZonalError::polygons(format!("duplicate polygon id '{}'", id)));
        }

        let geometry = match &feature.geometry {
            Some(geometry) => geometry
                .to_zone()
                .map_err(|e| ZonalError::polygons(format!("feature '{}': {}", id, e)))?,
            None => {
                warn!(id = %id, "Feature has no geometry");
                ZoneGeometry::Polygon(geo::MultiPolygon::new(vec![]))
            }
        };

        polygons.push(Polygon::new(id, geometry));
    }

    Ok(polygons)
}
