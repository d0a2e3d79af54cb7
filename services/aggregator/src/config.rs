//! Aggregator run plan.

use std::path::PathBuf;

use netcdf_parser::LayerOptions;
use zonal_stats::AggregationConfig;

/// Where the polygon set of a run is read from.
#[derive(Debug, Clone)]
pub struct ShapefileSource {
    pub idvar: String,
    pub path: PathBuf,
}

/// Where the grids of a run come from.
#[derive(Debug, Clone)]
pub enum SliceInput {
    /// One file for the whole year.
    Yearly(PathBuf),
    /// Every slice file in a directory, ordered by the date token in its name.
    Directory { dir: PathBuf, token_index: usize },
}

/// Fully resolved configuration of one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub aggregation: AggregationConfig,
    pub shapefile: ShapefileSource,
    pub layer_options: LayerOptions,
    pub input: SliceInput,
    pub output_file: PathBuf,
    /// Set when a GeoJSON export of the first period is requested
    pub plot_dir: Option<PathBuf>,
    pub prefix: String,
}
