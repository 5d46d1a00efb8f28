//! Column sanitizer: drops unused columns, duplicate rows and invalid ages

use crate::error::{PipelineError, Result, Stage};
use crate::table::{ColumnRole, RecordTable, Value};
use std::collections::HashSet;
use tracing::{debug, info};

/// Remove `columns_to_drop`, then exact-duplicate rows (first occurrence
/// kept), then rows whose `age_column` holds a negative number.
///
/// Every named column must exist. Repeated names in the drop list are
/// collapsed. Rows with a missing age are kept. An empty result is valid.
pub fn sanitize(
    table: &RecordTable,
    columns_to_drop: &[String],
    age_column: &str,
) -> Result<RecordTable> {
    let mut result = drop_columns(table, columns_to_drop)?;
    let n_input = result.n_rows();

    result = drop_duplicate_rows(&result);
    let n_deduplicated = result.n_rows();

    result = drop_negative_ages(&result, age_column)?;

    info!(
        rows_in = n_input,
        duplicates_removed = n_input - n_deduplicated,
        invalid_age_removed = n_deduplicated - result.n_rows(),
        columns = result.n_cols(),
        "Sanitized record table"
    );
    Ok(result)
}

/// Remove the named columns; fails if any is absent
pub fn drop_columns(table: &RecordTable, columns: &[String]) -> Result<RecordTable> {
    let mut unique: Vec<&str> = Vec::with_capacity(columns.len());
    for name in columns {
        if !unique.contains(&name.as_str()) {
            unique.push(name.as_str());
        }
    }

    if let Some(absent) = unique.iter().find(|n| table.column_index(n).is_none()) {
        return Err(PipelineError::schema(
            Stage::Sanitize,
            format!("cannot drop column '{}': not in input schema", absent),
        ));
    }

    let keep: Vec<String> = table
        .column_names()
        .iter()
        .filter(|name| !unique.contains(&name.as_str()))
        .cloned()
        .collect();

    debug!(dropped = unique.len(), kept = keep.len(), "Dropping columns");
    table.select_columns(&keep, Stage::Sanitize)
}

/// Remove rows identical to an earlier row, keeping the first occurrence
pub fn drop_duplicate_rows(table: &RecordTable) -> RecordTable {
    let mut seen: HashSet<&[Value]> = HashSet::with_capacity(table.n_rows());
    let keep: Vec<usize> = (0..table.n_rows())
        .filter(|&pos| seen.insert(table.row(pos)))
        .collect();
    table.select_rows(&keep)
}

/// Remove rows whose age is a negative number
pub fn drop_negative_ages(table: &RecordTable, age_column: &str) -> Result<RecordTable> {
    let age_idx = table.require_column(age_column, Stage::Sanitize)?;

    let mut keep = Vec::with_capacity(table.n_rows());
    for (pos, (row_id, row)) in table.rows().enumerate() {
        match &row[age_idx] {
            Value::Numeric(age) if *age < 0.0 => {
                debug!(row = %row_id, age = *age, "Removing row with negative age");
            }
            Value::Text(raw) => {
                return Err(PipelineError::schema(
                    Stage::Sanitize,
                    format!(
                        "column '{}' must be numeric, row {} holds '{}'",
                        age_column, row_id, raw
                    ),
                ));
            }
            _ => keep.push(pos),
        }
    }
    Ok(table.select_rows(&keep))
}

/// Mark identifier columns and the label column; every named column must exist
pub fn assign_roles(
    table: &RecordTable,
    id_columns: &[String],
    label_column: Option<&str>,
) -> Result<RecordTable> {
    let mut result = table.clone();
    for name in id_columns {
        result.set_role(name, ColumnRole::Id, Stage::Sanitize)?;
    }
    if let Some(label) = label_column {
        if id_columns.iter().any(|id| id == label) {
            return Err(PipelineError::schema(
                Stage::Sanitize,
                format!("column '{}' cannot be both identifier and label", label),
            ));
        }
        result.set_role(label, ColumnRole::Label, Stage::Sanitize)?;
    }
    if !id_columns.is_empty() || label_column.is_some() {
        debug!(ids = ?id_columns, label = ?label_column, "Assigned column roles");
    }
    Ok(result)
}

/// Split a table into feature columns and the values of its `Label` column
pub fn separate_label_feature(table: &RecordTable) -> Result<(RecordTable, Vec<Value>)> {
    let label_column = table.schema().label().ok_or_else(|| {
        PipelineError::schema(Stage::Sanitize, "table has no label column")
    })?;
    let label_idx = table.require_column(label_column, Stage::Sanitize)?;
    let labels = table.column_values(label_idx).cloned().collect();
    let features = drop_columns(table, &[label_column.to_string()])?;
    Ok((features, labels))
}
