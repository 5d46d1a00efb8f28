//! End-to-end prediction: preprocess, route, dispatch, aggregate

use super::aggregator::ResultAggregator;
use super::dispatcher::{reconcile, ModelDispatcher, PartitionPrediction, PredictionResult};
use super::router::ClusterRouter;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::logging;
use crate::models::{FileModelStore, ModelStore};
use crate::preprocessing::{
    CsvDiagnosticSink, DiagnosticSink, EncodingSchema, PreprocessedBatch, SurveyPreprocessor,
};
use crate::table::RecordTable;
use crate::utils::DataLoader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, info_span};

/// Every stage output of one run, kept for inspection
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub preprocessed: PreprocessedBatch,
    pub routed: RecordTable,
    pub partitions: Vec<PartitionPrediction>,
    pub predictions: PredictionResult,
}

/// Cluster-then-predict batch pipeline
pub struct PredictionPipeline {
    config: PipelineConfig,
    preprocessor: SurveyPreprocessor,
    store: Arc<dyn ModelStore>,
    diagnostics: Box<dyn DiagnosticSink>,
}

impl PredictionPipeline {
    /// Pipeline backed by the model directory and report path in `config`
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let mut preprocessor = SurveyPreprocessor::new(config.preprocessing.clone())?;
        if let Some(path) = &config.inference.encoding_schema {
            preprocessor = preprocessor.with_encoding_schema(EncodingSchema::load(path)?);
        }
        let store: Arc<dyn ModelStore> = Arc::new(FileModelStore::new(
            config.inference.models_dir.clone(),
            config.inference.clustering_model.clone(),
        ));
        let diagnostics = Box::new(CsvDiagnosticSink::new(config.missing_report_path.clone()));

        Ok(Self {
            config,
            preprocessor,
            store,
            diagnostics,
        })
    }

    /// Builder: replace the model store
    pub fn with_store(mut self, store: Arc<dyn ModelStore>) -> Self {
        self.store = store;
        self
    }

    /// Builder: replace the diagnostic sink
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in memory; nothing is written except diagnostics
    pub fn run(&self, raw: &RecordTable) -> Result<PipelineRun> {
        let _span = info_span!("prediction", rows = raw.n_rows()).entered();

        let preprocessed = self.preprocessor.run(raw, self.diagnostics.as_ref())?;

        let inference = &self.config.inference;
        let clustering = self.store.load(&inference.clustering_model)?;
        let routed = ClusterRouter::new(inference.clustering_model.clone(), clustering)
            .with_cluster_column(inference.cluster_column.clone())
            .assign(&preprocessed.features)?;

        let partitions = ModelDispatcher::new(Arc::clone(&self.store))
            .with_cluster_column(inference.cluster_column.clone())
            .with_parallel(inference.parallel_dispatch)
            .with_n_workers(inference.n_workers)
            .dispatch(&routed)?;

        let predictions = reconcile(preprocessed.features.row_ids(), &partitions)?;

        Ok(PipelineRun {
            preprocessed,
            routed,
            partitions,
            predictions,
        })
    }

    /// Run the pipeline and write the predictions file, returning its path
    pub fn predict_to_file(&self, raw: &RecordTable) -> Result<PathBuf> {
        info!("Start of Prediction");
        let result = self.run(raw).and_then(|run| {
            ResultAggregator::new(self.config.output_path.clone()).write(&run.predictions)
        });

        match &result {
            Ok(path) => info!(path = %path.display(), "End of Prediction"),
            Err(e) => error!(error = %e, "Error occurred while running the prediction"),
        }
        result
    }

    /// Load a CSV, predict, and write the output, logging the run to the
    /// configured run log
    pub fn predict_from_csv(&self, input: impl AsRef<Path>) -> Result<PathBuf> {
        let input = input.as_ref();
        logging::with_run_log(&self.config.log_path, || {
            let raw = DataLoader::new().load_csv(input).map_err(|e| {
                error!(error = %e, input = %input.display(), "Failed to load input");
                e
            })?;
            self.predict_to_file(&raw)
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::{InMemoryModelStore, KMeans, LinearRegression};
    use crate::preprocessing::{MemoryDiagnosticSink, PreprocessingConfig};
    use crate::table::Value;

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig::new()
            .with_preprocessing(PreprocessingConfig::new().with_columns_to_drop(["id"]))
            .rooted_at(dir)
    }

    fn raw() -> RecordTable {
        RecordTable::from_columns(vec![
            ("id".to_string(), vec![1.0.into(), 2.0.into(), 3.0.into()]),
            ("age".to_string(), vec![20.0.into(), 60.0.into(), 22.0.into()]),
            (
                "scholarshipAvailed".to_string(),
                vec!["हाँ".into(), "नहीं".into(), "हाँ".into()],
            ),
        ])
        .unwrap()
    }

    fn store() -> Arc<dyn ModelStore> {
        Arc::new(
            InMemoryModelStore::new()
                .with_model("KMeans", KMeans::new(vec![vec![20.0, 1.0], vec![60.0, 2.0]]))
                .with_specialist(0, "Young0", LinearRegression::new(vec![1.0, 0.0], 0.0))
                .with_specialist(1, "Old1", LinearRegression::new(vec![0.0, 100.0], 0.0)),
        )
    }

    #[test]
    fn test_run_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = PredictionPipeline::new(config(dir.path()))
            .unwrap()
            .with_store(store())
            .with_diagnostics(Box::new(MemoryDiagnosticSink::new()));

        let run = pipeline.run(&raw()).unwrap();
        assert_eq!(run.predictions.values, vec![20.0, 200.0, 22.0]);
        assert_eq!(run.partitions.len(), 2);
        let cluster = run.routed.column_index("cluster").unwrap();
        assert_eq!(run.routed.value(1, cluster), &Value::Numeric(1.0));
        assert!(!dir.path().join("Prediction_Output_File").exists());
    }

    #[test]
    fn test_failure_writes_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ModelStore> = Arc::new(
            InMemoryModelStore::new()
                .with_model("KMeans", KMeans::new(vec![vec![20.0, 1.0], vec![60.0, 2.0]]))
                .with_specialist(0, "Young0", LinearRegression::new(vec![1.0, 0.0], 0.0)),
        );
        let pipeline = PredictionPipeline::new(config(dir.path()))
            .unwrap()
            .with_store(store);

        let err = pipeline.predict_to_file(&raw()).unwrap_err();
        assert!(matches!(err, PipelineError::ModelNotFound { cluster_id: 1 }));
        assert!(!pipeline.config().output_path.exists());
    }
}
