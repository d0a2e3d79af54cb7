//! NaN-aware reduction of grid samples over cached index sets.

use serde::{Deserialize, Serialize};
use zonal_common::Grid;

use crate::error::{Result, ZonalError};
use crate::index_map::IndexMap;
use crate::types::CellIndexSet;

/// Statistic computed over the valid samples of a polygon.
///
/// Every statistic sees the same sample set: covered cells that are not no-data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Arithmetic mean
    #[default]
    Mean,
    Min,
    Max,
    Sum,
    /// Number of valid samples (0 rather than NaN when none)
    Count,
}

/// Decides whether a sample is missing.
///
/// NaN is always no-data; an optional sentinel adds one more value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NoData {
    pub sentinel: Option<f32>,
}

impl NoData {
    pub fn with_sentinel(sentinel: f32) -> Self {
        Self {
            sentinel: Some(sentinel),
        }
    }

    #[inline]
    pub fn is_nodata(&self, value: f32) -> bool {
        value.is_nan() || self.sentinel == Some(value)
    }
}

/// Running summary of valid samples.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, value: f32) {
        let v = f64::from(value);
        self.count += 1;
        self.sum += v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn finish(&self, statistic: Statistic) -> f64 {
        if self.count == 0 {
            return match statistic {
                Statistic::Count => 0.0,
                _ => f64::NAN,
            };
        }
        match statistic {
            Statistic::Mean => self.sum / self.count as f64,
            Statistic::Min => self.min,
            Statistic::Max => self.max,
            Statistic::Sum => self.sum,
            Statistic::Count => self.count as f64,
        }
    }
}

/// Computes one statistic per polygon for a grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZonalAggregator {
    statistic: Statistic,
    nodata: NoData,
}

impl ZonalAggregator {
    pub fn new(statistic: Statistic, nodata: NoData) -> Self {
        Self { statistic, nodata }
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// One value per polygon, in index-map order.
    ///
    /// The grid must share the index map's shape and transform. Polygons with
    /// no covered cells or only no-data samples yield NaN (0 for `Count`).
    pub fn aggregate(&self, grid: &Grid, index_map: &IndexMap) -> Result<Vec<f64>> {
        index_map
            .ensure_compatible(grid.spec())
            .map_err(|e| ZonalError::grid_mismatch("grid cannot reuse the polygon index map", e))?;

        Ok(index_map
            .sets()
            .iter()
            .map(|set| self.reduce(grid, set))
            .collect())
    }

    /// Reduce the samples of one index set. `set` must come from a map
    /// already checked against `grid`.
    fn reduce(&self, grid: &Grid, set: &CellIndexSet) -> f64 {
        let cols = grid.spec().cols;
        let values = grid.values();

        let mut acc = Accumulator::new();
        for (row, col) in set.iter() {
            let value = values[row * cols + col];
            if !self.nodata.is_nodata(value) {
                acc.push(value);
            }
        }
        acc.finish(self.statistic)
    }
}
