//! Cluster routing: assigns every encoded row to a cluster

use crate::error::{PipelineError, Result, Stage};
use crate::models::{Model, ModelArtifact};
use crate::table::{RecordTable, Value};
use ndarray::Array2;
use std::sync::Arc;
use tracing::{debug, info};

/// Check a model's expected features against a table's columns
pub(crate) fn check_features(
    model_name: &str,
    model: &ModelArtifact,
    columns: &[String],
    stage: Stage,
) -> Result<()> {
    if model.n_features() != columns.len() {
        return Err(PipelineError::DimensionMismatch {
            model: model_name.to_string(),
            expected: model.n_features(),
            actual: columns.len(),
        });
    }
    if let Some(expected) = model.feature_names() {
        if let Some((want, got)) = expected.iter().zip(columns).find(|(want, got)| want != got) {
            return Err(PipelineError::encoding(
                stage,
                got.clone(),
                None,
                format!("model '{}' expects column '{}' at this position", model_name, want),
            ));
        }
    }
    Ok(())
}

/// Applies the clustering model and appends the cluster column
pub struct ClusterRouter {
    model_name: String,
    model: Arc<ModelArtifact>,
    cluster_column: String,
}

impl ClusterRouter {
    pub fn new(model_name: impl Into<String>, model: Arc<ModelArtifact>) -> Self {
        Self {
            model_name: model_name.into(),
            model,
            cluster_column: "cluster".to_string(),
        }
    }

    /// Builder: name of the appended column
    pub fn with_cluster_column(mut self, column: impl Into<String>) -> Self {
        self.cluster_column = column.into();
        self
    }

    pub fn cluster_column(&self) -> &str {
        &self.cluster_column
    }

    /// Append the cluster id of every row.
    ///
    /// The model sees exactly the encoded columns, in order. An empty table
    /// never reaches the model: batch-derived indicator columns cannot exist
    /// without rows, so its width is not checked and it is returned with an
    /// empty cluster column.
    pub fn assign(&self, encoded: &RecordTable) -> Result<RecordTable> {
        let clusters: Vec<f64> = if encoded.is_empty() {
            debug!(model = %self.model_name, columns = encoded.n_cols(), "No rows to route");
            Vec::new()
        } else {
            check_features(&self.model_name, &self.model, encoded.column_names(), Stage::Route)?;
            let x: Array2<f64> = encoded.to_matrix(Stage::Route)?;
            self.model.predict(&x)?.to_vec()
        };

        if clusters.len() != encoded.n_rows() {
            return Err(PipelineError::Reconciliation(format!(
                "clustering model '{}' returned {} labels for {} rows",
                self.model_name,
                clusters.len(),
                encoded.n_rows()
            )));
        }

        let mut values = Vec::with_capacity(clusters.len());
        for (row_id, label) in encoded.row_ids().iter().zip(&clusters) {
            if !label.is_finite() || *label < 0.0 || label.fract() != 0.0 {
                return Err(PipelineError::encoding(
                    Stage::Route,
                    self.cluster_column.clone(),
                    Some(row_id.0),
                    format!("model '{}' produced invalid cluster id {}", self.model_name, label),
                ));
            }
            values.push(Value::Numeric(*label));
        }

        let mut routed = encoded.clone();
        routed.push_column(self.cluster_column.clone(), values, Stage::Route)?;

        debug!(model = %self.model_name, "Cluster labels assigned");
        info!(
            rows = routed.n_rows(),
            clusters = distinct(&clusters),
            "Routed rows to clusters"
        );
        Ok(routed)
    }
}

fn distinct(labels: &[f64]) -> usize {
    let mut ids: Vec<u64> = labels.iter().map(|l| *l as u64).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}
