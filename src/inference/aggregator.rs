//! Prediction output

use super::dispatcher::PredictionResult;
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Header of the single output column
pub const PREDICTIONS_COLUMN: &str = "Predictions";

/// Writes reconciled predictions to a CSV file
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    output_path: PathBuf,
}

impl ResultAggregator {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write the predictions and return the output location.
    ///
    /// The file is written next to its destination under a temporary name
    /// and renamed into place, so a failure leaves no partial output.
    pub fn write(&self, result: &PredictionResult) -> Result<PathBuf> {
        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file_name = self
            .output_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PipelineError::Config(format!(
                    "output path {} has no file name",
                    self.output_path.display()
                ))
            })?;
        let tmp_path = self.output_path.with_file_name(format!(".{}.tmp", file_name));

        let written = write_csv(&tmp_path, &result.values)
            .and_then(|()| fs::rename(&tmp_path, &self.output_path).map_err(PipelineError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        info!(
            path = %self.output_path.display(),
            predictions = result.len(),
            "Predictions written"
        );
        Ok(self.output_path.clone())
    }
}

fn write_csv(path: &Path, values: &[f64]) -> Result<()> {
    let mut df = DataFrame::new(vec![Column::new(PREDICTIONS_COLUMN.into(), values.to_vec())])?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RowId;

    #[test]
    fn test_write_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Prediction_Output_File").join("Predictions.csv");
        let result = PredictionResult {
            row_ids: vec![RowId(0), RowId(2)],
            values: vec![1.0, 0.0],
        };

        let written = ResultAggregator::new(&path).write(&result).unwrap();
        assert_eq!(written, path);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Predictions");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].parse::<f64>().unwrap(), 1.0);
        assert_eq!(lines[2].parse::<f64>().unwrap(), 0.0);

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the rename fail
        let path = dir.path().join("Predictions.csv");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();
        let result = PredictionResult {
            row_ids: vec![RowId(0)],
            values: vec![1.0],
        };

        assert!(ResultAggregator::new(&path).write(&result).is_err());
        assert!(!dir.path().join(".Predictions.csv.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn test_empty_result_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = PredictionResult {
            row_ids: vec![],
            values: vec![],
        };
        ResultAggregator::new(&path).write(&result).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim(), "Predictions");
    }
}
