//! Reusable polygon → cell index maps.
//!
//! Rasterizing every polygon is the dominant cost of a run, so it is done
//! once against a reference grid and reused for every time slice that shares
//! the reference grid's shape and transform.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, instrument};
use zonal_common::{Grid, GridResult, GridSpec};

use crate::error::Result;
use crate::rasterize::{rasterize_geometry, RasterizeMode};
use crate::types::{CellIndexSet, Polygon};

/// Interval (in polygons) between progress events on the sequential path.
const PROGRESS_INTERVAL: usize = 1000;

/// Per-polygon cell index sets bound to the grid they were built against.
#[derive(Debug, Clone)]
pub struct IndexMap {
    spec: GridSpec,
    mode: RasterizeMode,
    sets: Vec<CellIndexSet>,
}

impl IndexMap {
    /// Spec of the reference grid.
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn mode(&self) -> RasterizeMode {
        self.mode
    }

    /// Index sets in polygon order.
    pub fn sets(&self) -> &[CellIndexSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of polygons covering at least one cell.
    pub fn covered(&self) -> usize {
        self.sets.iter().filter(|s| !s.is_empty()).count()
    }

    /// Fail unless `spec` has the reference grid's shape and transform.
    pub fn ensure_compatible(&self, spec: &GridSpec) -> GridResult<()> {
        self.spec.ensure_matches(spec)
    }
}

/// Builds an [`IndexMap`] for a polygon set.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexMapBuilder {
    mode: RasterizeMode,
    parallel: bool,
}

impl IndexMapBuilder {
    pub fn new(mode: RasterizeMode) -> Self {
        Self {
            mode,
            parallel: false,
        }
    }

    /// Rasterize polygons on the rayon pool. Results are identical either way.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Rasterize every polygon against `reference`, preserving input order.
    #[instrument(skip_all, fields(polygons = polygons.len(), mode = ?self.mode, parallel = self.parallel))]
    pub fn build(&self, polygons: &[Polygon], reference: &Grid) -> Result<IndexMap> {
        let spec = *reference.spec();
        let started = Instant::now();

        let sets = if self.parallel {
            polygons
                .par_iter()
                .enumerate()
                .map(|(i, polygon)| rasterize_geometry(i, &polygon.geometry, &spec, self.mode))
                .collect::<Result<Vec<_>>>()?
        } else {
            let mut sets = Vec::with_capacity(polygons.len());
            for (i, polygon) in polygons.iter().enumerate() {
                sets.push(rasterize_geometry(i, &polygon.geometry, &spec, self.mode)?);
                if (i + 1) % PROGRESS_INTERVAL == 0 {
                    debug!(done = i + 1, total = polygons.len(), "Mapping polygons to raster cells");
                }
            }
            sets
        };

        let map = IndexMap {
            spec,
            mode: self.mode,
            sets,
        };

        info!(
            polygons = map.len(),
            covered = map.covered(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built polygon index map"
        );

        Ok(map)
    }
}
