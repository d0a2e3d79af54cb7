//! Core types for zonal aggregation.

use std::sync::Arc;

use zonal_common::{Cadence, Grid, Period};

use crate::geometry::ZoneGeometry;

/// A zone to aggregate over: unique identifier plus geometry.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub id: Arc<str>,
    pub geometry: ZoneGeometry,
}

impl Polygon {
    pub fn new(id: impl Into<Arc<str>>, geometry: ZoneGeometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// Cells of one grid covered by one polygon, as parallel row/column arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellIndexSet {
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl CellIndexSet {
    /// An index set covering no cells.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(rows: Vec<usize>, cols: Vec<usize>) -> Self {
        debug_assert_eq!(rows.len(), cols.len());
        Self { rows, cols }
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate (row, col) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }
}

/// One raster grid labelled with the period it represents.
#[derive(Debug, Clone)]
pub struct TimeSlice {
    pub period: Period,
    pub grid: Grid,
}

impl TimeSlice {
    pub fn new(period: Period, grid: Grid) -> Self {
        Self { period, grid }
    }
}

/// One row of the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub polygon_id: Arc<str>,
    /// Position of the polygon in its polygon set.
    pub polygon_index: usize,
    pub period: Period,
    /// Statistic value; NaN when the polygon has no valid samples.
    pub value: f64,
}

/// All statistic records of one run.
#[derive(Debug, Clone)]
pub struct StatTable {
    /// Name of the aggregated layer, used as the value column name.
    pub layer: String,
    pub cadence: Cadence,
    records: Vec<StatRecord>,
}

impl StatTable {
    pub fn new(layer: impl Into<String>, cadence: Cadence) -> Self {
        Self {
            layer: layer.into(),
            cadence,
            records: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: StatRecord) {
        self.records.push(record);
    }

    /// Group rows by polygon (in polygon-set order), ascending period within each polygon.
    pub fn sort(&mut self) {
        self.records
            .sort_by(|a, b| (a.polygon_index, a.period).cmp(&(b.polygon_index, b.period)));
    }

    pub fn records(&self) -> &[StatRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct periods present in the table, ascending.
    pub fn periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self.records.iter().map(|r| r.period).collect();
        periods.sort();
        periods.dedup();
        periods
    }

    /// Records for a single period, in table order.
    pub fn for_period(&self, period: Period) -> impl Iterator<Item = &StatRecord> {
        self.records.iter().filter(move |r| r.period == period)
    }
}
