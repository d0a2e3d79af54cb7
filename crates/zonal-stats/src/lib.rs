//! Zonal statistics of gridded climate data over polygon sets
//!
//! This crate computes a per-polygon, per-period summary statistic of a
//! raster variable. Polygons are mapped to the grid cells they cover once,
//! and that mapping is reused for every time slice. It provides:
//!
//! - **Index maps**: polygon → cell index sets built against a reference grid
//! - **Two coverage policies**: all-touched or cell-center-inside
//! - **Streaming time series**: one slice grid resident at a time
//! - **Parquet output**: pandas-compatible tables keyed by polygon id
//!
//! # Architecture
//!
//! ```text
//! GeoJSON polygons        reference Grid
//!      │                        │
//!      └──────────┬─────────────┘
//!                 ▼
//!      IndexMapBuilder::build
//!                 │  (per polygon: bbox ─► crop window ─► mask ─► cells)
//!                 ▼
//!             IndexMap ◄──────────── shared read-only
//!                 │
//!                 ▼
//!      TimeSeriesDriver::run(SliceSource)
//!                 │
//!                 ├─► load slice N ─► check shape/transform
//!                 │                       │
//!                 │                       └─► ZonalAggregator::aggregate
//!                 │
//!                 └─► sort by (polygon, period)
//!                          │
//!                          ▼
//!                     StatTable ─► write_parquet / write_geojson
//! ```
//!
//! # Example
//!
//! ```ignore
//! use zonal_stats::{IndexMapBuilder, RasterizeMode, TimeSeriesDriver, ZonalAggregator};
//!
//! let map = IndexMapBuilder::new(RasterizeMode::AllTouched).build(&polygons, &reference)?;
//! let driver = TimeSeriesDriver::new(&map, &polygons, ZonalAggregator::default())?;
//! let table = driver.run(&slices, "PM25")?;
//! ```

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod error;
pub mod geojson;
pub mod geometry;
pub mod index_map;
pub mod polygons;
pub mod rasterize;
pub mod slices;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use aggregate::{NoData, Statistic, ZonalAggregator};
pub use config::{AggregationConfig, ParallelConfig};
pub use driver::{InMemorySlices, SliceSource, TimeSeriesDriver};
pub use error::{Result, ZonalError};
pub use geometry::{box_points, ZoneGeometry, POINT_BOX_SHRINK};
pub use index_map::{IndexMap, IndexMapBuilder};
pub use polygons::{parse_feature_collection, read_polygons};
pub use rasterize::{rasterize_geometry, RasterizeMode};
pub use slices::{discover_slices, period_from_filename, NetCdfSlices, SliceFile, DEFAULT_DATE_TOKEN_INDEX};
pub use types::{CellIndexSet, Polygon, StatRecord, StatTable, TimeSlice};
pub use writer::{output_path, write_geojson, write_parquet, WriteResult};
