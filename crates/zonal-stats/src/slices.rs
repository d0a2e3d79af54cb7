//! Discovery and loading of per-period NetCDF slices.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use netcdf_parser::{load_layer, LayerOptions};
use tracing::debug;
use zonal_common::{Cadence, Grid, Period};

use crate::driver::SliceSource;
use crate::error::{Result, ZonalError};

/// Default position of the date token in an `_`-separated file stem,
/// e.g. `USHAP_PM25_monthly_201503.nc`.
pub const DEFAULT_DATE_TOKEN_INDEX: usize = 3;

/// A slice file and the period parsed from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceFile {
    pub period: Period,
    pub path: PathBuf,
}

/// Parse the period of a slice file from its name.
pub fn period_from_filename(path: &Path, cadence: Cadence, token_index: usize) -> Result<Period> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .ok_or_else(|| ZonalError::invalid_date_token(&file, "file has no name"))?;

    let token = stem.split('_').nth(token_index).ok_or_else(|| {
        ZonalError::invalid_date_token(
            &file,
            format!("expected a date token at '_' field {}", token_index),
        )
    })?;

    Period::from_token(token, cadence).map_err(|e| ZonalError::invalid_date_token(&file, e))
}

/// List the slices of one directory, ordered by period.
///
/// Only regular, non-hidden files directly inside `dir` are considered. Every
/// one of them must carry a valid date token.
pub fn discover_slices(dir: &Path, cadence: Cadence, token_index: usize) -> Result<Vec<SliceFile>> {
    let mut slices = Vec::new();

    for entry in walkdir::WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ZonalError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("cannot list {}: {}", dir.display(), e),
            ))
        })?;

        if !entry.file_type().is_file() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let period = period_from_filename(entry.path(), cadence, token_index)?;
        debug!(path = %entry.path().display(), period = %period, "Found slice");
        slices.push(SliceFile {
            period,
            path: entry.into_path(),
        });
    }

    slices.sort_by(|a, b| a.period.cmp(&b.period).then_with(|| a.path.cmp(&b.path)));
    Ok(slices)
}

/// Slices read lazily from NetCDF files.
#[derive(Debug, Clone)]
pub struct NetCdfSlices {
    files: Vec<SliceFile>,
    options: LayerOptions,
}

impl NetCdfSlices {
    pub fn new(files: Vec<SliceFile>, options: LayerOptions) -> Self {
        Self { files, options }
    }

    pub fn files(&self) -> &[SliceFile] {
        &self.files
    }
}

impl SliceSource for NetCdfSlices {
    fn periods(&self) -> Vec<Period> {
        self.files.iter().map(|f| f.period).collect()
    }

    fn load(&self, period: &Period) -> Result<Cow<'_, Grid>> {
        let file = self
            .files
            .iter()
            .find(|f| f.period == *period)
            .ok_or_else(|| ZonalError::InvalidSlices(format!("no slice for period {}", period)))?;
        Ok(Cow::Owned(load_layer(&file.path, &self.options)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_utils::{temp_test_dir, touch_files};

    #[test]
    fn test_period_from_filename() {
        let p = period_from_filename(
            Path::new("/data/USHAP_PM25_monthly_201503.nc"),
            Cadence::Monthly,
            DEFAULT_DATE_TOKEN_INDEX,
        )
        .unwrap();
        assert_eq!(p, Period::Month { year: 2015, month: 3 });

        let err = period_from_filename(
            Path::new("USHAP_PM25_monthly.nc"),
            Cadence::Monthly,
            DEFAULT_DATE_TOKEN_INDEX,
        )
        .unwrap_err();
        assert!(matches!(err, ZonalError::InvalidDateToken { .. }));
    }

    #[test]
    fn test_discover_slices_orders_and_skips_hidden() {
        let dir = temp_test_dir();
        touch_files(
            dir.path(),
            &[
                "USHAP_PM25_daily_20150103.nc",
                "USHAP_PM25_daily_20150101.nc",
                "USHAP_PM25_daily_20150102.nc",
                ".USHAP_PM25_daily_x.nc",
            ],
        );
        fs::create_dir(dir.path().join("nested")).unwrap();

        let slices = discover_slices(dir.path(), Cadence::Daily, DEFAULT_DATE_TOKEN_INDEX).unwrap();
        let days: Vec<String> = slices.iter().map(|s| s.period.to_string()).collect();
        assert_eq!(days, vec!["2015-01-01", "2015-01-02", "2015-01-03"]);
    }

    #[test]
    fn test_discover_slices_rejects_bad_token() {
        let dir = temp_test_dir();
        touch_files(dir.path(), &["USHAP_PM25_daily_2015XX01.nc"]);

        let err = discover_slices(dir.path(), Cadence::Daily, DEFAULT_DATE_TOKEN_INDEX).unwrap_err();
        assert!(matches!(err, ZonalError::InvalidDateToken { .. }));
    }
}
