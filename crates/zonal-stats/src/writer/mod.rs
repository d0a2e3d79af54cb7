//! Persisting statistic tables.

mod geojson_writer;
mod parquet_writer;

use std::path::{Path, PathBuf};

use zonal_common::Cadence;

pub use geojson_writer::write_geojson;
pub use parquet_writer::{pandas_metadata, write_parquet};

/// Summary of a completed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResult {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// `<base_dir>/<cadence>/<polygon_name>/<prefix>_<year>.parquet`
pub fn output_path(
    base_dir: &Path,
    cadence: Cadence,
    polygon_name: &str,
    prefix: &str,
    year: i32,
) -> PathBuf {
    base_dir
        .join(cadence.as_str())
        .join(polygon_name)
        .join(format!("{}_{}.parquet", prefix, year))
}

pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
