//! Model dispatch: one specialist model per cluster partition
//!
//! Partitions are processed in ascending cluster id. Each partition keeps
//! the row ids of its rows, and [`reconcile`] puts the partial predictions
//! back into the order the rows had before partitioning, no matter in
//! which order the partitions finished.

use super::router::check_features;
use crate::error::{PipelineError, Result, Stage};
use crate::models::{Model, ModelStore};
use crate::table::{RecordTable, RowId, Value};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Cluster id of every routed row, in table order
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    entries: Vec<(RowId, usize)>,
}

impl ClusterAssignment {
    /// Read the cluster column of a routed table
    pub fn from_table(routed: &RecordTable, cluster_column: &str) -> Result<Self> {
        let idx = routed.require_column(cluster_column, Stage::Dispatch)?;
        let entries = routed
            .rows()
            .map(|(row_id, row)| match &row[idx] {
                Value::Numeric(v) if *v >= 0.0 && v.fract() == 0.0 => Ok((row_id, *v as usize)),
                other => Err(PipelineError::encoding(
                    Stage::Dispatch,
                    cluster_column,
                    Some(row_id.0),
                    format!("'{}' is not a cluster id", other),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cluster_of(&self, row_id: RowId) -> Option<usize> {
        self.entries.iter().find(|(id, _)| *id == row_id).map(|(_, c)| *c)
    }

    /// Table positions of each cluster's rows, keyed by ascending cluster id
    pub fn partitions(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut partitions: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (pos, (_, cluster)) in self.entries.iter().enumerate() {
            partitions.entry(*cluster).or_default().push(pos);
        }
        partitions
    }
}

/// Predictions of one cluster partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionPrediction {
    pub cluster: usize,
    pub model: String,
    pub row_ids: Vec<RowId>,
    pub values: Vec<f64>,
}

/// One prediction per row, in pre-partition row order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub row_ids: Vec<RowId>,
    pub values: Vec<f64>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row_id: RowId) -> Option<f64> {
        self.row_ids
            .iter()
            .position(|id| *id == row_id)
            .map(|pos| self.values[pos])
    }
}

/// Fans routed rows out to their cluster's specialist model
pub struct ModelDispatcher {
    store: Arc<dyn ModelStore>,
    cluster_column: String,
    parallel: bool,
    n_workers: Option<usize>,
}

impl ModelDispatcher {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            cluster_column: "cluster".to_string(),
            parallel: false,
            n_workers: None,
        }
    }

    pub fn with_cluster_column(mut self, column: impl Into<String>) -> Self {
        self.cluster_column = column.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_n_workers(mut self, n_workers: Option<usize>) -> Self {
        self.n_workers = n_workers;
        self
    }

    /// Predict every partition, returning results in ascending cluster order
    pub fn dispatch(&self, routed: &RecordTable) -> Result<Vec<PartitionPrediction>> {
        let start = Instant::now();
        let assignment = ClusterAssignment::from_table(routed, &self.cluster_column)?;
        let features: Vec<String> = routed
            .column_names()
            .iter()
            .filter(|name| **name != self.cluster_column)
            .cloned()
            .collect();
        let partitions: Vec<(usize, Vec<usize>)> = assignment.partitions().into_iter().collect();

        let predictions = if self.parallel && partitions.len() > 1 {
            self.dispatch_parallel(routed, &features, &partitions)?
        } else {
            partitions
                .iter()
                .map(|(cluster, positions)| self.predict_partition(routed, &features, *cluster, positions))
                .collect::<Result<Vec<_>>>()?
        };

        info!(
            partitions = predictions.len(),
            rows = assignment.len(),
            parallel = self.parallel,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dispatch complete"
        );
        Ok(predictions)
    }

    fn dispatch_parallel(
        &self,
        routed: &RecordTable,
        features: &[String],
        partitions: &[(usize, Vec<usize>)],
    ) -> Result<Vec<PartitionPrediction>> {
        let predict_all = || -> Result<Vec<PartitionPrediction>> {
            partitions
                .par_iter()
                .map(|(cluster, positions)| self.predict_partition(routed, features, *cluster, positions))
                .collect::<Result<Vec<_>>>()
        };

        match self.n_workers {
            Some(n_workers) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n_workers)
                    .build()
                    .map_err(|e| PipelineError::Config(format!("Thread pool error: {}", e)))?;
                pool.install(predict_all)
            }
            None => predict_all(),
        }
    }

    fn predict_partition(
        &self,
        routed: &RecordTable,
        features: &[String],
        cluster: usize,
        positions: &[usize],
    ) -> Result<PartitionPrediction> {
        let partition = routed
            .select_rows(positions)
            .select_columns(features, Stage::Dispatch)?;

        let model_name = self.store.resolve(cluster)?;
        let model = self.store.load(&model_name)?;
        check_features(&model_name, &model, partition.column_names(), Stage::Dispatch)?;

        let x = partition.to_matrix(Stage::Dispatch)?;
        let values = model.predict(&x)?.to_vec();
        if values.len() != partition.n_rows() {
            return Err(PipelineError::Reconciliation(format!(
                "model '{}' returned {} predictions for {} rows of cluster {}",
                model_name,
                values.len(),
                partition.n_rows(),
                cluster
            )));
        }

        debug!(cluster, model = %model_name, rows = values.len(), "Predicted partition");
        Ok(PartitionPrediction {
            cluster,
            model: model_name,
            row_ids: partition.row_ids().to_vec(),
            values,
        })
    }
}

/// Merge partition predictions back into `order`.
///
/// Fails if a row in `order` received no prediction, received more than
/// one, or if a prediction names a row outside `order`.
pub fn reconcile(order: &[RowId], partials: &[PartitionPrediction]) -> Result<PredictionResult> {
    let mut by_row: HashMap<RowId, f64> = HashMap::with_capacity(order.len());
    for partial in partials {
        if partial.row_ids.len() != partial.values.len() {
            return Err(PipelineError::Reconciliation(format!(
                "cluster {} has {} rows but {} predictions",
                partial.cluster,
                partial.row_ids.len(),
                partial.values.len()
            )));
        }
        for (row_id, value) in partial.row_ids.iter().zip(&partial.values) {
            if by_row.insert(*row_id, *value).is_some() {
                return Err(PipelineError::Reconciliation(format!(
                    "row {} was predicted more than once",
                    row_id
                )));
            }
        }
    }

    let mut values = Vec::with_capacity(order.len());
    for row_id in order {
        let value = by_row.remove(row_id).ok_or_else(|| {
            PipelineError::Reconciliation(format!("row {} has no prediction", row_id))
        })?;
        values.push(value);
    }

    if let Some(stray) = by_row.keys().min() {
        return Err(PipelineError::Reconciliation(format!(
            "prediction for unknown row {}",
            stray
        )));
    }

    Ok(PredictionResult {
        row_ids: order.to_vec(),
        values,
    })
}
