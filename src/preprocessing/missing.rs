//! Missing-value analysis and the diagnostic report it persists

use crate::error::{Result, Stage, PipelineError};
use crate::table::RecordTable;
use parking_lot::Mutex;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Missing-value count of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub count: usize,
}

/// Result of scanning a table for missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingReport {
    /// Whether any cell is missing
    pub has_missing: bool,
    /// Columns with at least one missing value, in schema order
    pub columns_with_missing: Vec<MissingCount>,
    /// Every column with its count, in schema order
    pub all_columns: Vec<MissingCount>,
}

impl MissingReport {
    /// Names of the columns with at least one missing value
    pub fn column_names(&self) -> Vec<String> {
        self.columns_with_missing.iter().map(|c| c.column.clone()).collect()
    }
}

/// Append-only destination for the missing-value diagnostic
pub trait DiagnosticSink: Send + Sync {
    fn record_missing_counts(&self, counts: &[MissingCount]) -> Result<()>;
}

/// Writes the report as CSV with `columns` and `missing values count` headers
#[derive(Debug, Clone)]
pub struct CsvDiagnosticSink {
    path: PathBuf,
}

impl CsvDiagnosticSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for CsvDiagnosticSink {
    fn record_missing_counts(&self, counts: &[MissingCount]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let names: Vec<String> = counts.iter().map(|c| c.column.clone()).collect();
        let values: Vec<u64> = counts.iter().map(|c| c.count as u64).collect();
        let mut df = DataFrame::new(vec![
            Column::new("columns".into(), names),
            Column::new("missing values count".into(), values),
        ])?;

        let mut file = File::create(&self.path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;

        debug!(path = %self.path.display(), columns = counts.len(), "Wrote missing-value report");
        Ok(())
    }
}

/// Keeps every recorded report in memory
#[derive(Debug, Default)]
pub struct MemoryDiagnosticSink {
    reports: Mutex<Vec<Vec<MissingCount>>>,
}

impl MemoryDiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Vec<MissingCount>> {
        self.reports.lock().clone()
    }
}

impl DiagnosticSink for MemoryDiagnosticSink {
    fn record_missing_counts(&self, counts: &[MissingCount]) -> Result<()> {
        self.reports.lock().push(counts.to_vec());
        Ok(())
    }
}

/// Count missing values per column without persisting anything
pub fn count_missing(table: &RecordTable) -> MissingReport {
    let all_columns: Vec<MissingCount> = table
        .column_names()
        .iter()
        .enumerate()
        .map(|(idx, name)| MissingCount {
            column: name.clone(),
            count: table.column_values(idx).filter(|v| v.is_missing()).count(),
        })
        .collect();

    let columns_with_missing: Vec<MissingCount> =
        all_columns.iter().filter(|c| c.count > 0).cloned().collect();

    MissingReport {
        has_missing: !columns_with_missing.is_empty(),
        columns_with_missing,
        all_columns,
    }
}

/// Detect missing values and, when any exist, persist the per-column report
pub fn analyze(table: &RecordTable, sink: &dyn DiagnosticSink) -> Result<MissingReport> {
    let report = count_missing(table);

    if report.has_missing {
        sink.record_missing_counts(&report.all_columns)
            .map_err(|e| PipelineError::Diagnostics {
                stage: Stage::Missingness,
                source: Box::new(e),
            })?;
    }

    info!(
        has_missing = report.has_missing,
        columns = ?report.column_names(),
        "Missing-value analysis complete"
    );
    Ok(report)
}
