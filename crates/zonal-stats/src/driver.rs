//! Time-series driver: one index map, many grids.
//!
//! The driver owns no grids. Slices are pulled from a [`SliceSource`] one at
//! a time, reduced with the shared [`IndexMap`], and dropped before the next
//! one is loaded, so peak memory is one grid plus the index map.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, info_span};
use zonal_common::{Grid, Period};

use crate::aggregate::ZonalAggregator;
use crate::error::{Result, ZonalError};
use crate::index_map::IndexMap;
use crate::types::{Polygon, StatRecord, StatTable, TimeSlice};

/// Something that can hand out grids by period.
pub trait SliceSource: Sync {
    /// Periods available from this source, in any order.
    fn periods(&self) -> Vec<Period>;

    /// Load the grid for `period`.
    fn load(&self, period: &Period) -> Result<Cow<'_, Grid>>;
}

/// Slices already resident in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySlices {
    slices: Vec<TimeSlice>,
}

impl InMemorySlices {
    pub fn new(slices: Vec<TimeSlice>) -> Self {
        Self { slices }
    }

    pub fn push(&mut self, slice: TimeSlice) {
        self.slices.push(slice);
    }
}

impl SliceSource for InMemorySlices {
    fn periods(&self) -> Vec<Period> {
        self.slices.iter().map(|s| s.period).collect()
    }

    fn load(&self, period: &Period) -> Result<Cow<'_, Grid>> {
        self.slices
            .iter()
            .find(|s| s.period == *period)
            .map(|s| Cow::Borrowed(&s.grid))
            .ok_or_else(|| ZonalError::InvalidSlices(format!("no slice for period {}", period)))
    }
}

/// Applies an aggregator to every slice of a source.
pub struct TimeSeriesDriver<'a> {
    index_map: &'a IndexMap,
    polygons: &'a [Polygon],
    aggregator: ZonalAggregator,
    parallel: bool,
}

impl<'a> TimeSeriesDriver<'a> {
    /// `polygons` must be the set `index_map` was built from.
    pub fn new(
        index_map: &'a IndexMap,
        polygons: &'a [Polygon],
        aggregator: ZonalAggregator,
    ) -> Result<Self> {
        if index_map.len() != polygons.len() {
            return Err(ZonalError::config(format!(
                "index map covers {} polygons but {} were supplied",
                index_map.len(),
                polygons.len()
            )));
        }
        Ok(Self {
            index_map,
            polygons,
            aggregator,
            parallel: false,
        })
    }

    /// Process slices on the rayon pool. Holds one grid per worker thread.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Aggregate every slice and return the combined table.
    ///
    /// The result is independent of the order in which the source lists its
    /// periods and of whether slices run in parallel.
    pub fn run(&self, source: &dyn SliceSource, layer: &str) -> Result<StatTable> {
        let periods = ordered_periods(source.periods())?;
        let cadence = periods[0].cadence();

        let span = info_span!("time_series", layer, cadence = %cadence, slices = periods.len());
        let _guard = span.enter();
        let started = Instant::now();

        let per_slice: Vec<(Period, Vec<f64>)> = if self.parallel {
            periods
                .par_iter()
                .map(|period| self.run_slice(source, period).map(|values| (*period, values)))
                .collect::<Result<Vec<_>>>()?
        } else {
            let mut out = Vec::with_capacity(periods.len());
            for period in &periods {
                out.push((*period, self.run_slice(source, period)?));
            }
            out
        };

        let mut table = StatTable::new(layer, cadence);
        for (period, values) in per_slice {
            for (i, (polygon, value)) in self.polygons.iter().zip(values).enumerate() {
                table.push(StatRecord {
                    polygon_id: polygon.id.clone(),
                    polygon_index: i,
                    period,
                    value,
                });
            }
        }
        table.sort();

        info!(
            records = table.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Time series aggregated"
        );

        Ok(table)
    }

    fn run_slice(&self, source: &dyn SliceSource, period: &Period) -> Result<Vec<f64>> {
        let grid = source.load(period)?;
        let values = self
            .aggregator
            .aggregate(&grid, self.index_map)
            .map_err(|e| match e {
                ZonalError::GridMismatch { context, source } => ZonalError::GridMismatch {
                    context: format!("slice {}: {}", period, context),
                    source,
                },
                other => other,
            })?;

        let valid = values.iter().filter(|v| !v.is_nan()).count();
        info!(period = %period, polygons = values.len(), valid, "Aggregated slice");
        Ok(values)
    }
}

/// Sort periods ascending, rejecting empty, duplicate or mixed-cadence sets.
fn ordered_periods(periods: Vec<Period>) -> Result<Vec<Period>> {
    let first = periods
        .first()
        .ok_or_else(|| ZonalError::InvalidSlices("no time slices to aggregate".to_string()))?;
    let cadence = first.cadence();

    if let Some(other) = periods.iter().find(|p| p.cadence() != cadence) {
        return Err(ZonalError::InvalidSlices(format!(
            "mixed cadences: {} is {} but {} is {}",
            first,
            cadence,
            other,
            other.cadence()
        )));
    }

    let mut seen = BTreeSet::new();
    for period in &periods {
        if !seen.insert(*period) {
            return Err(ZonalError::InvalidSlices(format!(
                "more than one slice for period {}",
                period
            )));
        }
    }

    Ok(seen.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u32) -> Period {
        Period::Month {
            year: 2015,
            month: m,
        }
    }

    #[test]
    fn test_ordered_periods_sorts() {
        let sorted = ordered_periods(vec![month(3), month(1), month(2)]).unwrap();
        assert_eq!(sorted, vec![month(1), month(2), month(3)]);
    }

    #[test]
    fn test_ordered_periods_rejects_bad_sets() {
        assert!(matches!(
            ordered_periods(vec![]),
            Err(ZonalError::InvalidSlices(_))
        ));
        assert!(matches!(
            ordered_periods(vec![month(1), month(1)]),
            Err(ZonalError::InvalidSlices(_))
        ));
        assert!(matches!(
            ordered_periods(vec![month(1), Period::Year(2015)]),
            Err(ZonalError::InvalidSlices(_))
        ));
    }
}
