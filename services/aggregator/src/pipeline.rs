//! Aggregation pipeline for one polygon set, year and cadence.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, info_span, warn};
use zonal_common::Period;

use netcdf_parser::load_layer;
use zonal_stats::{
    discover_slices, read_polygons, write_geojson, write_parquet, IndexMapBuilder,
    InMemorySlices, NetCdfSlices, SliceSource, TimeSeriesDriver, TimeSlice,
};

use crate::config::{RunPlan, SliceInput};

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub polygons: usize,
    pub covered: usize,
    pub slices: usize,
    pub rows: usize,
    pub output_file: PathBuf,
    pub plot_file: Option<PathBuf>,
}

/// Main aggregation pipeline.
pub struct AggregationPipeline {
    plan: RunPlan,
}

impl AggregationPipeline {
    pub fn new(plan: RunPlan) -> Self {
        Self { plan }
    }

    /// Run the pipeline end to end and write its outputs.
    pub fn run(&self) -> Result<RunSummary> {
        let cfg = &self.plan.aggregation;
        let span = info_span!(
            "aggregation_run",
            polygon_name = %cfg.polygon_name,
            year = cfg.year,
            cadence = %cfg.cadence
        );
        let _guard = span.enter();
        let started = Instant::now();

        info!(
            vintage = cfg.shapefile_vintage,
            path = %self.plan.shapefile.path.display(),
            "Loading polygon set"
        );
        let polygons = read_polygons(&self.plan.shapefile.path, &self.plan.shapefile.idvar)
            .with_context(|| format!("Failed to load polygons for '{}'", cfg.polygon_name))?;

        let source = self.open_slices()?;
        let periods = source.periods();
        let first = periods
            .iter()
            .min()
            .copied()
            .with_context(|| "No input slices found")?;
        if let Some(other) = periods.iter().find(|p| p.year() != cfg.year) {
            warn!(period = %other, year = cfg.year, "Slice outside the configured year");
        }

        info!("Mapping polygons to raster cells");
        let index_map = {
            let reference = source
                .load(&first)
                .with_context(|| format!("Failed to load reference grid for {}", first))?;
            IndexMapBuilder::new(cfg.mode)
                .parallel(cfg.parallel.polygons)
                .build(&polygons, &reference)?
        };

        info!(slices = periods.len(), "Computing zonal stats for each period");
        let table = TimeSeriesDriver::new(&index_map, &polygons, cfg.aggregator())?
            .parallel(cfg.parallel.slices)
            .run(source.as_ref(), &cfg.layer)?;

        let written = write_parquet(&table, &cfg.polygon_name, &self.plan.output_file)
            .with_context(|| format!("Failed to write {}", self.plan.output_file.display()))?;

        let plot_file = match &self.plan.plot_dir {
            Some(dir) => {
                let path = dir.join(format!(
                    "{}_{}_{}.geojson",
                    self.plan.prefix,
                    cfg.polygon_name,
                    compact_period(&first)
                ));
                write_geojson(&table, &polygons, first, &cfg.polygon_name, &path)?;
                Some(path)
            }
            None => None,
        };

        let summary = RunSummary {
            polygons: polygons.len(),
            covered: index_map.covered(),
            slices: periods.len(),
            rows: written.rows,
            output_file: written.path,
            plot_file,
        };

        info!(
            polygons = summary.polygons,
            covered = summary.covered,
            slices = summary.slices,
            rows = summary.rows,
            output = %summary.output_file.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregation completed"
        );

        Ok(summary)
    }

    fn open_slices(&self) -> Result<Box<dyn SliceSource>> {
        let cfg = &self.plan.aggregation;
        match &self.plan.input {
            SliceInput::Yearly(path) => {
                info!(path = %path.display(), "Loading yearly grid");
                let grid = load_layer(path, &self.plan.layer_options)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok(Box::new(InMemorySlices::new(vec![TimeSlice::new(
                    Period::Year(cfg.year),
                    grid,
                )])))
            }
            SliceInput::Directory { dir, token_index } => {
                let files = discover_slices(dir, cfg.cadence, *token_index)
                    .with_context(|| format!("Failed to list slices in {}", dir.display()))?;
                info!(dir = %dir.display(), files = files.len(), "Found slice files");
                Ok(Box::new(NetCdfSlices::new(
                    files,
                    self.plan.layer_options.clone(),
                )))
            }
        }
    }
}

/// Period as it appears in slice file names: `2015`, `201503`, `20150301`.
fn compact_period(period: &Period) -> String {
    period.to_string().replace('-', "")
}
