//! Zero-variance column detection

use crate::error::{Result, Stage};
use crate::table::{ColumnKind, RecordTable};
use tracing::{debug, info};

/// Sample standard deviation (ddof = 1) of a numeric or boolean column,
/// skipping missing values. `None` for text columns and for columns with
/// fewer than two observed values.
pub fn column_std(table: &RecordTable, idx: usize) -> Option<f64> {
    if table.column_kind(idx) == ColumnKind::Categorical {
        return None;
    }
    let observed: Vec<f64> = table.column_values(idx).filter_map(|v| v.as_f64()).collect();
    if observed.len() < 2 {
        return None;
    }

    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let variance = observed.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Numeric and boolean columns whose observed values are all identical
pub fn zero_variance_columns(table: &RecordTable) -> Vec<String> {
    table
        .column_names()
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            let Some(std) = column_std(table, *idx) else {
                return false;
            };
            // Compare values directly; rounding in the mean can leave a tiny std
            let mut observed = table.column_values(*idx).filter_map(|v| v.as_f64());
            let first = observed.next();
            let constant = observed.all(|v| Some(v) == first);
            if constant {
                debug!(column = %name, std, "Zero standard deviation");
            }
            constant
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Remove every zero-variance column
pub fn drop_zero_variance(table: &RecordTable) -> Result<RecordTable> {
    let dropped = zero_variance_columns(table);
    let keep: Vec<String> = table
        .column_names()
        .iter()
        .filter(|name| !dropped.contains(name))
        .cloned()
        .collect();

    info!(dropped = ?dropped, kept = keep.len(), "Variance filter applied");
    table.select_columns(&keep, Stage::VarianceFilter)
}
