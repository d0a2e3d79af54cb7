//! Configuration loader for the aggregator
//!
//! Loads and validates the run configuration YAML file. Supports environment
//! variable substitution using ${VAR} and ${VAR:-default} syntax.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use netcdf_parser::{CoordinateAnchor, LayerOptions};
use zonal_common::Cadence;
use zonal_stats::{
    AggregationConfig, NoData, ParallelConfig, RasterizeMode, Statistic, DEFAULT_DATE_TOKEN_INDEX,
};

use crate::config::{RunPlan, ShapefileSource, SliceInput};

// ============================================================================
// Run Configuration (config.yaml)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// Polygon set identifier, a key of `shapefiles`
    pub polygon_name: String,
    pub year: i32,
    pub temporal_freq: Cadence,
    /// Variable read from the input files
    pub layer: String,
    #[serde(default)]
    pub mode: RasterizeMode,
    #[serde(default)]
    pub statistic: Statistic,
    /// Extra no-data sentinel; NaN is always no-data
    #[serde(default)]
    pub nodata: Option<f32>,
    #[serde(default)]
    pub plot_output: bool,
    #[serde(default)]
    pub parallel: ParallelConfig,
    /// Polygon set name -> vintage year -> file
    pub shapefiles: BTreeMap<String, BTreeMap<i32, ShapefileConfig>>,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapefileConfig {
    /// Feature property holding the polygon id
    pub idvar: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub base_dir: PathBuf,
    /// File name of the yearly grid; `{year}` is substituted
    pub yearly_file: String,
    #[serde(default = "default_longitude_dim")]
    pub longitude_dim: String,
    #[serde(default = "default_latitude_dim")]
    pub latitude_dim: String,
    /// Whether coordinate values are cell corners or cell centers
    #[serde(default)]
    pub coordinates: CoordinateAnchor,
    /// `_`-separated field of the file stem holding the date token
    #[serde(default = "default_date_token_index")]
    pub date_token_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Directory for GeoJSON exports when `plot_output` is set
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_longitude_dim() -> String {
    "lon".to_string()
}

fn default_latitude_dim() -> String {
    "lat".to_string()
}

fn default_date_token_index() -> usize {
    DEFAULT_DATE_TOKEN_INDEX
}

fn default_prefix() -> String {
    "ushap".to_string()
}

fn default_plot_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub year: Option<i32>,
    pub temporal_freq: Option<Cadence>,
    pub log_level: Option<String>,
}

// ============================================================================
// Loading
// ============================================================================

/// Load, override and validate the run configuration.
pub fn load_config<P: AsRef<Path>>(path: P, overrides: &Overrides) -> Result<FileConfig> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Failed to parse config from {:?}", path.as_ref()))?;

    if let Some(year) = overrides.year {
        config.year = year;
    }
    if let Some(cadence) = overrides.temporal_freq {
        config.temporal_freq = cadence;
    }
    if let Some(level) = &overrides.log_level {
        config.logging.level = level.to_lowercase();
    }

    validate_config(&config)?;

    Ok(config)
}

/// Parse YAML text after environment substitution.
pub fn parse_config(content: &str) -> Result<FileConfig> {
    let expanded = expand_env_vars(content)?;
    let config: FileConfig = serde_yaml::from_str(&expanded)?;
    Ok(config)
}

/// Expand environment variables in the format ${VAR} or ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::new();
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            let value = resolve_var_expr(&var_expr)?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

// ============================================================================
// Validation
// ============================================================================

fn validate_config(config: &FileConfig) -> Result<()> {
    let vintages = config.shapefiles.get(&config.polygon_name).with_context(|| {
        format!(
            "polygon_name '{}' has no shapefiles entry. Configured: {:?}",
            config.polygon_name,
            config.shapefiles.keys().collect::<Vec<_>>()
        )
    })?;
    anyhow::ensure!(
        !vintages.is_empty(),
        "shapefiles.{} lists no vintages",
        config.polygon_name
    );
    for (vintage, shapefile) in vintages {
        anyhow::ensure!(
            !shapefile.idvar.is_empty(),
            "shapefiles.{}.{}.idvar cannot be empty",
            config.polygon_name,
            vintage
        );
    }

    anyhow::ensure!(
        config.input.yearly_file.contains("{year}"),
        "input.yearly_file must contain a {{year}} placeholder: {}",
        config.input.yearly_file
    );
    anyhow::ensure!(!config.output.prefix.is_empty(), "output.prefix cannot be empty");

    // Validate logging level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    anyhow::ensure!(
        valid_levels.contains(&config.logging.level.as_str()),
        "Invalid log level: {}. Must be one of: {:?}",
        config.logging.level,
        valid_levels
    );

    // Validate logging format
    let valid_formats = ["json", "pretty"];
    anyhow::ensure!(
        valid_formats.contains(&config.logging.format.as_str()),
        "Invalid log format: {}. Must be one of: {:?}",
        config.logging.format,
        valid_formats
    );

    Ok(())
}

// ============================================================================
// Conversion to Run Plan
// ============================================================================

/// Latest vintage not after `year`, or the earliest vintage if all are later.
pub fn available_shapefile_year(year: i32, vintages: &[i32]) -> Option<i32> {
    vintages
        .iter()
        .copied()
        .filter(|&v| v <= year)
        .max()
        .or_else(|| vintages.iter().copied().min())
}

impl FileConfig {
    /// Resolve vintages and paths into a validated run plan.
    pub fn to_run_plan(&self) -> Result<RunPlan> {
        let vintages = self
            .shapefiles
            .get(&self.polygon_name)
            .with_context(|| format!("polygon_name '{}' is not configured", self.polygon_name))?;
        let years: Vec<i32> = vintages.keys().copied().collect();
        let vintage = available_shapefile_year(self.year, &years)
            .with_context(|| format!("no shapefile vintages for '{}'", self.polygon_name))?;
        let shapefile = vintages
            .get(&vintage)
            .with_context(|| format!("shapefile vintage {} missing", vintage))?;

        let aggregation = AggregationConfig {
            polygon_name: self.polygon_name.clone(),
            shapefile_vintage: vintage,
            year: self.year,
            cadence: self.temporal_freq,
            layer: self.layer.clone(),
            mode: self.mode,
            statistic: self.statistic,
            nodata: NoData {
                sentinel: self.nodata,
            },
            parallel: self.parallel,
        };
        aggregation.validate()?;

        let year_dir = self
            .input
            .base_dir
            .join(self.temporal_freq.as_str())
            .join(self.year.to_string());
        let input = match self.temporal_freq {
            Cadence::Yearly => SliceInput::Yearly(
                year_dir.join(
                    self.input
                        .yearly_file
                        .replace("{year}", &self.year.to_string()),
                ),
            ),
            Cadence::Monthly | Cadence::Daily => SliceInput::Directory {
                dir: year_dir,
                token_index: self.input.date_token_index,
            },
        };

        let layer_options = LayerOptions {
            layer: self.layer.clone(),
            longitude_dim: self.input.longitude_dim.clone(),
            latitude_dim: self.input.latitude_dim.clone(),
            anchor: self.input.coordinates,
        };

        Ok(RunPlan {
            aggregation,
            shapefile: ShapefileSource {
                idvar: shapefile.idvar.clone(),
                path: shapefile.path.clone(),
            },
            layer_options,
            input,
            output_file: zonal_stats::output_path(
                &self.output.base_dir,
                self.temporal_freq,
                &self.polygon_name,
                &self.output.prefix,
                self.year,
            ),
            plot_dir: self.plot_output.then(|| self.output.plot_dir.clone()),
            prefix: self.output.prefix.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
