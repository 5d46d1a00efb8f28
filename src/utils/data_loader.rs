//! Data loading utilities

use crate::error::{PipelineError, Result, Stage};
use crate::table::{ColumnKind, RecordTable, Value};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Loads survey exports into a [`RecordTable`]
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows used to infer column types
    infer_schema_length: Option<usize>,
    /// Field separator
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(10_000),
            delimiter: b',',
        }
    }

    /// Set the number of rows scanned for type inference (`None` scans all)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Set the field separator
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<RecordTable> {
        let path = path.as_ref();
        let start = Instant::now();
        let file = File::open(path).map_err(|e| {
            PipelineError::schema(Stage::Load, format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default().with_separator(self.delimiter);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()?;

        let table = dataframe_to_table(&df)?;
        info!(
            path = %path.display(),
            rows = table.n_rows(),
            columns = table.n_cols(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded data"
        );
        Ok(table)
    }
}

/// Convert a polars frame into a record table.
///
/// Nulls, NaN and empty strings become [`Value::Missing`]. Columns of types
/// other than numbers, booleans and strings are read as text. Column kinds
/// follow the frame's dtypes, so a text column stays categorical even when
/// none of its values survive a later filter.
pub fn dataframe_to_table(df: &DataFrame) -> Result<RecordTable> {
    let mut columns = Vec::with_capacity(df.width());
    let mut kinds = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();
        if let Some(kind) = dtype_kind(series.dtype()) {
            kinds.push((name.clone(), kind));
        }
        columns.push((name, series_values(series)?));
    }

    if columns.is_empty() {
        return RecordTable::new(Vec::new(), Vec::new());
    }
    let mut table = RecordTable::from_columns(columns)?;
    for (name, kind) in kinds {
        table = table.with_kind(&name, kind)?;
    }
    Ok(table)
}

/// Kind declared by a dtype; `None` for all-null columns
fn dtype_kind(dtype: &DataType) -> Option<ColumnKind> {
    match dtype {
        DataType::Null => None,
        DataType::Boolean => Some(ColumnKind::Boolean),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => Some(ColumnKind::Numeric),
        _ => Some(ColumnKind::Categorical),
    }
}

fn series_values(series: &Series) -> Result<Vec<Value>> {
    let values = match series.dtype() {
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Missing, Value::Boolean))
            .collect(),
        DataType::String => text_values(series.str()?),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => {
            let cast = series.cast(&DataType::Float64)?;
            float_values(cast.f64()?)
        }
        DataType::Null => vec![Value::Missing; series.len()],
        _ => {
            let cast = series.cast(&DataType::String)?;
            text_values(cast.str()?)
        }
    };
    Ok(values)
}

fn float_values(ca: &Float64Chunked) -> Vec<Value> {
    ca.into_iter()
        .map(|v| v.map_or(Value::Missing, Value::numeric))
        .collect()
}

fn text_values(ca: &StringChunked) -> Vec<Value> {
    ca.into_iter()
        .map(|v| match v {
            Some(s) if !s.is_empty() => Value::text(s),
            _ => Value::Missing,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "id,age,hasLand,literacy").unwrap();
        writeln!(file, "1,34,हाँ,Literate").unwrap();
        writeln!(file, "2,,नहीं,").unwrap();
        drop(file);

        let table = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column_names()[1], "age");
        assert_eq!(table.value(0, 1), &Value::Numeric(34.0));
        assert!(table.value(1, 1).is_missing());
        assert_eq!(table.value(0, 2), &Value::from("हाँ"));
        assert!(table.value(1, 3).is_missing());
    }

    #[test]
    fn test_text_column_stays_categorical_without_rows() {
        let df = DataFrame::new(vec![
            Column::new("age".into(), vec![-1.0, -2.0]),
            Column::new("eduType".into(), vec!["Formal", "Other"]),
        ])
        .unwrap();
        let table = dataframe_to_table(&df).unwrap();
        let empty = table.select_rows(&[]);
        assert_eq!(empty.column_kind(0), ColumnKind::Numeric);
        assert_eq!(empty.column_kind(1), ColumnKind::Categorical);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = DataLoader::new().load_csv("/nonexistent/input.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Schema { stage: Stage::Load, .. }));
    }

    #[test]
    fn test_dataframe_conversion() {
        let df = DataFrame::new(vec![
            Column::new("flag".into(), vec![Some(true), None]),
            Column::new("score".into(), vec![Some(1.5), Some(f64::NAN)]),
        ])
        .unwrap();
        let table = dataframe_to_table(&df).unwrap();
        assert_eq!(table.value(0, 0), &Value::Boolean(true));
        assert!(table.value(1, 0).is_missing());
        assert!(table.value(1, 1).is_missing());
    }
}
