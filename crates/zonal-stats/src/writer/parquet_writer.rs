//! Parquet output compatible with pandas `read_parquet`.
//!
//! The polygon id column is declared as the DataFrame index through the
//! `pandas` key/value metadata entry, and NaN statistics are stored as nulls.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use parquet::basic::{Compression, LogicalType, Repetition, Type as PhysicalType};
use parquet::data_type::{ByteArray, ByteArrayType, DoubleType, Int32Type, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::format::KeyValue;
use parquet::schema::types::{Type, TypePtr};
use serde_json::{json, Value};
use tracing::info;
use zonal_common::{Cadence, Period};

use super::{ensure_parent, WriteResult};
use crate::error::{Result, ZonalError};
use crate::types::{StatRecord, StatTable};

/// Maximum rows per row group.
const ROW_GROUP_SIZE: usize = 1 << 20;

/// Column layout for a cadence, excluding the id column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeriodColumn {
    Year,
    Month,
    Date,
}

impl PeriodColumn {
    fn name(&self) -> &'static str {
        match self {
            PeriodColumn::Year => "year",
            PeriodColumn::Month => "month",
            PeriodColumn::Date => "date",
        }
    }

    fn pandas_type(&self) -> (&'static str, &'static str) {
        match self {
            PeriodColumn::Year | PeriodColumn::Month => ("int64", "int64"),
            PeriodColumn::Date => ("date", "object"),
        }
    }
}

fn period_columns(cadence: Cadence) -> &'static [PeriodColumn] {
    match cadence {
        Cadence::Yearly => &[PeriodColumn::Year],
        Cadence::Monthly => &[PeriodColumn::Year, PeriodColumn::Month],
        Cadence::Daily => &[PeriodColumn::Date],
    }
}

fn schema(table: &StatTable, id_column: &str) -> Result<TypePtr> {
    let mut fields: Vec<TypePtr> = Vec::new();

    fields.push(Arc::new(
        Type::primitive_type_builder(id_column, PhysicalType::BYTE_ARRAY)
            .with_repetition(Repetition::REQUIRED)
            .with_logical_type(Some(LogicalType::String))
            .build()?,
    ));

    for column in period_columns(table.cadence) {
        let field = match column {
            PeriodColumn::Year | PeriodColumn::Month => {
                Type::primitive_type_builder(column.name(), PhysicalType::INT64)
                    .with_repetition(Repetition::REQUIRED)
                    .build()?
            }
            PeriodColumn::Date => Type::primitive_type_builder(column.name(), PhysicalType::INT32)
                .with_repetition(Repetition::REQUIRED)
                .with_logical_type(Some(LogicalType::Date))
                .build()?,
        };
        fields.push(Arc::new(field));
    }

    fields.push(Arc::new(
        Type::primitive_type_builder(&table.layer, PhysicalType::DOUBLE)
            .with_repetition(Repetition::OPTIONAL)
            .build()?,
    ));

    Ok(Arc::new(
        Type::group_type_builder("schema").with_fields(fields).build()?,
    ))
}

/// The `pandas` metadata entry naming `id_column` as the index.
pub fn pandas_metadata(table: &StatTable, id_column: &str) -> Value {
    let column = |name: &str, pandas_type: &str, numpy_type: &str| {
        json!({
            "name": name,
            "field_name": name,
            "pandas_type": pandas_type,
            "numpy_type": numpy_type,
            "metadata": Value::Null,
        })
    };

    let mut columns = vec![column(id_column, "unicode", "object")];
    for c in period_columns(table.cadence) {
        let (pandas_type, numpy_type) = c.pandas_type();
        columns.push(column(c.name(), pandas_type, numpy_type));
    }
    columns.push(column(&table.layer, "float64", "float64"));

    json!({
        "index_columns": [id_column],
        "column_indexes": [],
        "columns": columns,
        "creator": {"library": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")},
        "pandas_version": "2.0.0",
    })
}

fn days_since_epoch(period: &Period) -> i32 {
    match period {
        Period::Day(date) => date.signed_duration_since(NaiveDateTime::UNIX_EPOCH.date()).num_days() as i32,
        _ => 0,
    }
}

fn write_row_group(
    writer: &mut SerializedFileWriter<File>,
    table: &StatTable,
    records: &[StatRecord],
) -> Result<()> {
    let columns = period_columns(table.cadence);
    let mut row_group = writer.next_row_group()?;
    let mut index = 0usize;

    while let Some(mut column) = row_group.next_column()? {
        match index {
            0 => {
                let ids: Vec<ByteArray> = records
                    .iter()
                    .map(|r| ByteArray::from(r.polygon_id.as_bytes().to_vec()))
                    .collect();
                column.typed::<ByteArrayType>().write_batch(&ids, None, None)?;
            }
            i if i <= columns.len() => match columns[i - 1] {
                PeriodColumn::Year => {
                    let values: Vec<i64> = records.iter().map(|r| i64::from(r.period.year())).collect();
                    column.typed::<Int64Type>().write_batch(&values, None, None)?;
                }
                PeriodColumn::Month => {
                    let values: Vec<i64> = records
                        .iter()
                        .map(|r| i64::from(r.period.month().unwrap_or(0)))
                        .collect();
                    column.typed::<Int64Type>().write_batch(&values, None, None)?;
                }
                PeriodColumn::Date => {
                    let values: Vec<i32> = records.iter().map(|r| days_since_epoch(&r.period)).collect();
                    column.typed::<Int32Type>().write_batch(&values, None, None)?;
                }
            },
            _ => {
                let values: Vec<f64> = records
                    .iter()
                    .map(|r| r.value)
                    .filter(|v| !v.is_nan())
                    .collect();
                let def_levels: Vec<i16> = records
                    .iter()
                    .map(|r| if r.value.is_nan() { 0 } else { 1 })
                    .collect();
                column
                    .typed::<DoubleType>()
                    .write_batch(&values, Some(&def_levels), None)?;
            }
        }
        column.close()?;
        index += 1;
    }

    row_group.close()?;
    Ok(())
}

/// Write `table` to `path`, creating parent directories as needed.
///
/// `id_column` names the polygon id column (the polygon set name).
pub fn write_parquet(table: &StatTable, id_column: &str, path: &Path) -> Result<WriteResult> {
    if period_columns(table.cadence)
        .iter()
        .any(|c| c.name() == table.layer || c.name() == id_column)
        || table.layer == id_column
    {
        return Err(ZonalError::Output(format!(
            "column names collide: id '{}', layer '{}'",
            id_column, table.layer
        )));
    }
    if let Some(r) = table.records().iter().find(|r| r.period.cadence() != table.cadence) {
        return Err(ZonalError::Output(format!(
            "record period {} does not match table cadence {}",
            r.period, table.cadence
        )));
    }

    ensure_parent(path)?;

    let metadata = pandas_metadata(table, id_column).to_string();
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![KeyValue::new("pandas".to_string(), metadata)]))
        .build();

    let file = File::create(path)?;
    let mut writer = SerializedFileWriter::new(file, schema(table, id_column)?, Arc::new(props))?;

    for chunk in table.records().chunks(ROW_GROUP_SIZE) {
        write_row_group(&mut writer, table, chunk)?;
    }
    writer.close()?;

    let bytes = std::fs::metadata(path)?.len();
    info!(
        path = %path.display(),
        rows = table.len(),
        bytes,
        "Wrote parquet output"
    );

    Ok(WriteResult {
        path: path.to_path_buf(),
        rows: table.len(),
        bytes,
    })
}
