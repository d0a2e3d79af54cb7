//! Parquet and GeoJSON output.

use std::fs::File;

use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use test_utils::{rect_feature_collection, scenario_4x4_grid, temp_test_dir};
use zonal_common::{Cadence, Period};
use zonal_stats::{
    output_path, parse_feature_collection, write_geojson, write_parquet, IndexMapBuilder,
    InMemorySlices, RasterizeMode, TimeSeriesDriver, TimeSlice, ZonalAggregator,
};

fn two_county_table(periods: Vec<Period>) -> (Vec<zonal_stats::Polygon>, zonal_stats::StatTable) {
    let json = rect_feature_collection(
        "GEOID",
        &["01001", "01003"],
        &[(0.0, -2.0, 2.0, 0.0), (10.0, 10.0, 11.0, 11.0)],
    );
    let polygons = parse_feature_collection(&json, "GEOID").unwrap();
    let grid = scenario_4x4_grid();
    let map = IndexMapBuilder::new(RasterizeMode::AllTouched)
        .build(&polygons, &grid)
        .unwrap();

    let slices = InMemorySlices::new(
        periods
            .into_iter()
            .map(|p| TimeSlice::new(p, grid.clone()))
            .collect(),
    );
    let table = TimeSeriesDriver::new(&map, &polygons, ZonalAggregator::default())
        .unwrap()
        .run(&slices, "PM25")
        .unwrap();
    (polygons, table)
}

fn monthly_table() -> (Vec<zonal_stats::Polygon>, zonal_stats::StatTable) {
    two_county_table((1..=2).map(|m| Period::Month { year: 2015, month: m }).collect())
}

fn read_rows(path: &std::path::Path) -> Vec<Row> {
    let reader = SerializedFileReader::new(File::open(path).unwrap()).unwrap();
    reader.get_row_iter(None).unwrap().map(|row| row.unwrap()).collect()
}

fn fields(row: &Row) -> Vec<Field> {
    row.get_column_iter().map(|(_, field)| field.clone()).collect()
}

#[test]
fn test_parquet_schema_rows_and_pandas_index() {
    let (_, table) = monthly_table();
    let dir = temp_test_dir();
    let path = output_path(dir.path(), Cadence::Monthly, "county", "ushap", 2015);

    let result = write_parquet(&table, "county", &path).unwrap();
    assert_eq!(result.rows, 4);
    assert!(path.exists());
    assert!(result.bytes > 0);

    let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
    let meta = reader.metadata().file_metadata();
    assert_eq!(meta.num_rows(), 4);

    let names: Vec<&str> = meta
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name())
        .collect();
    assert_eq!(names, vec!["county", "year", "month", "PM25"]);

    let pandas = meta
        .key_value_metadata()
        .and_then(|kv| kv.iter().find(|e| e.key == "pandas"))
        .and_then(|e| e.value.clone())
        .unwrap();
    let pandas: serde_json::Value = serde_json::from_str(&pandas).unwrap();
    assert_eq!(pandas["index_columns"][0], "county");
}

#[test]
fn test_parquet_rows_round_trip_with_nulls() {
    let (_, table) = monthly_table();
    let dir = temp_test_dir();
    let path = dir.path().join("ushap_2015.parquet");
    write_parquet(&table, "county", &path).unwrap();

    let rows: Vec<Vec<Field>> = read_rows(&path).iter().map(fields).collect();
    assert_eq!(rows.len(), 4);

    let expected = [("01001", 1), ("01001", 2), ("01003", 1), ("01003", 2)];
    for (row, (id, month)) in rows.iter().zip(expected) {
        assert_eq!(row[0], Field::Str(id.to_string()));
        assert_eq!(row[1], Field::Long(2015));
        assert_eq!(row[2], Field::Long(month));
    }

    // Covered polygon keeps its mean, the outside polygon is null
    for row in &rows[..2] {
        match row[3] {
            Field::Double(pm) => assert!((pm - 8.0 / 3.0).abs() < 1e-12),
            ref other => panic!("expected a value, got {:?}", other),
        }
    }
    assert!(rows[2..].iter().all(|row| row[3] == Field::Null));
}

#[test]
fn test_daily_parquet_date_column() {
    let day = |d| Period::Day(chrono::NaiveDate::from_ymd_opt(2015, 1, d).unwrap());
    let (_, table) = two_county_table(vec![day(2), day(1)]);
    let dir = temp_test_dir();
    let path = output_path(dir.path(), Cadence::Daily, "county", "ushap", 2015);
    write_parquet(&table, "county", &path).unwrap();

    let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
    let names: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["county", "date", "PM25"]);

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 4);
    let dates: Vec<i32> = rows
        .iter()
        .map(|row| match fields(row)[1] {
            Field::Date(days) => days,
            ref other => panic!("expected a date, got {:?}", other),
        })
        .collect();
    // 2015-01-01 is day 16436 of the Unix epoch
    assert_eq!(dates, vec![16436, 16437, 16436, 16437]);

    assert_eq!(fields(&rows[3])[2], Field::Null);
}

#[test]
fn test_geojson_export_first_period() {
    let (polygons, table) = monthly_table();
    let dir = temp_test_dir();
    let path = dir.path().join("plots").join("ushap_county_201501.geojson");

    let first = table.periods()[0];
    let result = write_geojson(&table, &polygons, first, "county", &path).unwrap();
    assert_eq!(result.rows, 2);

    let text = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let features = value["features"].as_array().unwrap();
    assert_eq!(features[0]["properties"]["county"], "01001");
    assert_eq!(features[0]["properties"]["period"], "2015-01");
    let pm = features[0]["properties"]["PM25"].as_f64().unwrap();
    assert!((pm - 8.0 / 3.0).abs() < 1e-4);
    assert!(features[1]["properties"]["PM25"].is_null());

    // The export parses back as a polygon set
    let reparsed = zonal_stats::parse_feature_collection(&text, "county").unwrap();
    assert_eq!(reparsed.len(), 2);
}
