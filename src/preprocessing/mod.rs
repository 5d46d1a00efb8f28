//! Survey preprocessing
//!
//! Stages, in the order a prediction batch passes through them:
//! - Column sanitizing (unused columns, duplicate rows, invalid ages)
//! - Missing-value analysis with a persisted diagnostic report
//! - Most-frequent imputation of categorical columns
//! - Category normalization and ordinal / one-hot encoding
//! - Optional zero-variance column filter

mod config;
mod imputer;
mod pipeline;
pub mod encoder;
pub mod missing;
pub mod normalization;
pub mod sanitizer;
pub mod variance;

pub use config::{PreprocessingConfig, DEFAULT_COLUMNS_TO_DROP};
pub use encoder::{CategoricalEncoder, EncodedBatch, EncodingAnomaly, EncodingSchema, IndicatorSpec};
pub use imputer::CategoricalImputer;
pub use missing::{
    CsvDiagnosticSink, DiagnosticSink, MemoryDiagnosticSink, MissingCount, MissingReport,
};
pub use normalization::NormalizationTable;
pub use pipeline::{PreprocessedBatch, SurveyPreprocessor};
pub use sanitizer::{assign_roles, sanitize, separate_label_feature};
pub use variance::{drop_zero_variance, zero_variance_columns};
