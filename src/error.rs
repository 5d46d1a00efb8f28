//! Error types for the survey inference pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Pipeline stage that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Sanitize,
    Missingness,
    Impute,
    Encode,
    VarianceFilter,
    Route,
    Dispatch,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Sanitize => "sanitize",
            Stage::Missingness => "missingness",
            Stage::Impute => "impute",
            Stage::Encode => "encode",
            Stage::VarianceFilter => "variance-filter",
            Stage::Route => "route",
            Stage::Dispatch => "dispatch",
            Stage::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema error in {stage}: {detail}")]
    Schema { stage: Stage, detail: String },

    #[error("Missing data error in {stage} (column '{column}'): {detail}")]
    MissingData {
        stage: Stage,
        column: String,
        detail: String,
    },

    #[error("Encoding error in {} (column '{}'{}): {}", .stage, .column, fmt_row(.row), .detail)]
    Encoding {
        stage: Stage,
        column: String,
        row: Option<usize>,
        detail: String,
    },

    #[error("No specialist model found for cluster {cluster_id}")]
    ModelNotFound { cluster_id: usize },

    #[error("Dimension mismatch for model '{model}': expected {expected} features, got {actual}")]
    DimensionMismatch {
        model: String,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to persist diagnostics in {stage}: {source}")]
    Diagnostics {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn fmt_row(row: &Option<usize>) -> String {
    match row {
        Some(id) => format!(", row {}", id),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn schema(stage: Stage, detail: impl Into<String>) -> Self {
        PipelineError::Schema {
            stage,
            detail: detail.into(),
        }
    }

    pub fn missing_data(stage: Stage, column: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::MissingData {
            stage,
            column: column.into(),
            detail: detail.into(),
        }
    }

    pub fn encoding(
        stage: Stage,
        column: impl Into<String>,
        row: Option<usize>,
        detail: impl Into<String>,
    ) -> Self {
        PipelineError::Encoding {
            stage,
            column: column.into(),
            row,
            detail: detail.into(),
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Data(format!("invalid matrix shape: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::schema(Stage::Sanitize, "column 'id' not found");
        assert_eq!(err.to_string(), "Schema error in sanitize: column 'id' not found");
    }

    #[test]
    fn test_encoding_error_mentions_row() {
        let err = PipelineError::encoding(Stage::Encode, "scholarshipAvailed", Some(4), "unmapped value 'x'");
        assert_eq!(
            err.to_string(),
            "Encoding error in encode (column 'scholarshipAvailed', row 4): unmapped value 'x'"
        );

        let err = PipelineError::encoding(Stage::Route, "hasLand_Yes", None, "unexpected column");
        assert!(!err.to_string().contains("row"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
