//! GeoJSON export of one period, for inspection in mapping tools.

use std::path::Path;

use serde_json::Value;
use tracing::info;
use zonal_common::Period;

use super::{ensure_parent, WriteResult};
use crate::error::{Result, ZonalError};
use crate::geojson::{Feature, FeatureCollection, Geometry};
use crate::types::{Polygon, StatTable};

/// Write the values of `period` joined to the polygon geometries.
///
/// Polygons are emitted in polygon-set order with properties `id_column`,
/// `period` and the layer value (null for NaN).
pub fn write_geojson(
    table: &StatTable,
    polygons: &[Polygon],
    period: Period,
    id_column: &str,
    path: &Path,
) -> Result<WriteResult> {
    let mut values = vec![f64::NAN; polygons.len()];
    for record in table.for_period(period) {
        let slot = values.get_mut(record.polygon_index).ok_or_else(|| {
            ZonalError::Output(format!(
                "record for polygon {} outside a set of {}",
                record.polygon_index,
                polygons.len()
            ))
        })?;
        *slot = record.value;
    }

    let mut collection = FeatureCollection::new();
    for (polygon, value) in polygons.iter().zip(values) {
        let value = if value.is_nan() {
            Value::Null
        } else {
            Value::from(value)
        };
        collection = collection.with_feature(
            Feature::new(Geometry::from_zone(&polygon.geometry))
                .with_property(id_column, polygon.id.to_string())
                .with_property("period", period.to_string())
                .with_property(table.layer.as_str(), value),
        );
    }

    ensure_parent(path)?;
    let body = serde_json::to_vec(&collection)
        .map_err(|e| ZonalError::Output(format!("cannot encode GeoJSON: {}", e)))?;
    std::fs::write(path, &body)?;

    info!(path = %path.display(), period = %period, features = polygons.len(), "Wrote GeoJSON export");

    Ok(WriteResult {
        path: path.to_path_buf(),
        rows: polygons.len(),
        bytes: body.len() as u64,
    })
}
