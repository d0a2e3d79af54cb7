//! Validated, immutable run configuration.

use serde::{Deserialize, Serialize};
use zonal_common::Cadence;

use crate::aggregate::{NoData, Statistic, ZonalAggregator};
use crate::error::{Result, ZonalError};
use crate::rasterize::RasterizeMode;

/// Opt-in parallelism. Results are identical with either switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Rasterize polygons on the rayon pool.
    pub polygons: bool,
    /// Load and aggregate slices on the rayon pool.
    pub slices: bool,
}

/// Everything that determines the output of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Polygon set identifier, e.g. "county" or "zcta".
    pub polygon_name: String,
    /// Vintage of the polygon set used for this run.
    pub shapefile_vintage: i32,
    pub year: i32,
    pub cadence: Cadence,
    /// Variable aggregated, also the value column name.
    pub layer: String,
    pub mode: RasterizeMode,
    pub statistic: Statistic,
    pub nodata: NoData,
    pub parallel: ParallelConfig,
}

impl AggregationConfig {
    /// Check the configuration before anything is read.
    pub fn validate(&self) -> Result<()> {
        if self.polygon_name.trim().is_empty() {
            return Err(ZonalError::config("polygon_name must not be empty"));
        }
        if self.layer.trim().is_empty() {
            return Err(ZonalError::config("layer must not be empty"));
        }
        if !(1..=9999).contains(&self.year) {
            return Err(ZonalError::config(format!(
                "year {} is outside 1..=9999",
                self.year
            )));
        }
        if let Some(sentinel) = self.nodata.sentinel {
            if !sentinel.is_finite() {
                return Err(ZonalError::config(
                    "nodata sentinel must be finite; NaN is always treated as no-data",
                ));
            }
        }
        Ok(())
    }

    pub fn aggregator(&self) -> ZonalAggregator {
        ZonalAggregator::new(self.statistic, self.nodata)
    }
}
