//! Survey inference - cluster-then-predict batch pipeline
//!
//! Raw survey records are cleaned, imputed and encoded, assigned to a
//! cluster by a clustering model, and predicted by the specialist model of
//! their cluster. Every row keeps a stable [`table::RowId`] through all
//! stages, so predictions come back in input order.
//!
//! # Modules
//!
//! - [`table`] - Record table, column schema and cell values
//! - [`preprocessing`] - Sanitizing, missing values, imputation, encoding
//! - [`models`] - Pre-fitted model artifacts and model stores
//! - [`inference`] - Routing, dispatch, reconciliation and output
//! - [`config`] - Pipeline configuration
//! - [`logging`] - Console and per-run log setup
//! - [`cli`] - Command-line interface

pub mod error;
pub mod table;

pub mod preprocessing;
pub mod models;
pub mod inference;

pub mod config;
pub mod logging;
pub mod utils;
pub mod cli;

pub use error::{PipelineError, Result, Stage};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::error::{PipelineError, Result, Stage};
    pub use crate::inference::{
        ClusterRouter, InferenceConfig, ModelDispatcher, PredictionPipeline, PredictionResult,
        ResultAggregator,
    };
    pub use crate::models::{
        FileModelStore, InMemoryModelStore, Model, ModelArtifact, ModelStore,
    };
    pub use crate::preprocessing::{
        CategoricalEncoder, DiagnosticSink, PreprocessingConfig, SurveyPreprocessor,
    };
    pub use crate::table::{ColumnRole, RecordTable, RowId, Value};
    pub use crate::utils::DataLoader;
}
