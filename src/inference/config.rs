//! Inference configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for cluster routing and model dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Directory holding one sub-directory per model
    pub models_dir: PathBuf,

    /// Name of the clustering model in the store
    pub clustering_model: String,

    /// Name of the column the router appends
    pub cluster_column: String,

    /// Run cluster partitions on the rayon pool
    pub parallel_dispatch: bool,

    /// Number of parallel workers (rayon default when unset)
    pub n_workers: Option<usize>,

    /// Training-time encoding layout to pin prediction batches to
    pub encoding_schema: Option<PathBuf>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            clustering_model: "KMeans".to_string(),
            cluster_column: "cluster".to_string(),
            parallel_dispatch: false,
            n_workers: None,
            encoding_schema: None,
        }
    }
}

impl InferenceConfig {
    /// Create a new inference configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the model directory
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Builder method to set the clustering model name
    pub fn with_clustering_model(mut self, name: impl Into<String>) -> Self {
        self.clustering_model = name.into();
        self
    }

    /// Builder method to enable parallel dispatch
    pub fn with_parallel_dispatch(mut self, enabled: bool) -> Self {
        self.parallel_dispatch = enabled;
        self
    }

    /// Builder method to set number of workers
    pub fn with_n_workers(mut self, n: usize) -> Self {
        self.n_workers = Some(n);
        self
    }

    /// Builder method to pin encoding to a saved schema
    pub fn with_encoding_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.encoding_schema = Some(path.into());
        self
    }
}
