//! Model stores
//!
//! A store hands out read-only model artifacts by name and knows which
//! specialist model serves each cluster.

use super::ModelArtifact;
use crate::error::{PipelineError, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Read-only source of model artifacts
pub trait ModelStore: Send + Sync {
    /// Load a model by name
    fn load(&self, name: &str) -> Result<Arc<ModelArtifact>>;

    /// Name of the specialist model for a cluster
    fn resolve(&self, cluster_id: usize) -> Result<String>;
}

/// Directory-backed store: each model lives at `<root>/<name>/<name>.json`.
///
/// The specialist for cluster `k` is the model directory whose name is a
/// non-empty prefix followed by exactly the digits of `k` (for example
/// `RandomForest2` for cluster 2). The clustering model itself is never a
/// specialist.
pub struct FileModelStore {
    root: PathBuf,
    clustering_model: String,
    cache: RwLock<HashMap<String, Arc<ModelArtifact>>>,
}

impl FileModelStore {
    pub fn new(root: impl Into<PathBuf>, clustering_model: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            clustering_model: clustering_model.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn model_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(format!("{}.json", name))
    }

    /// Names of every model directory, sorted
    pub fn model_names(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| {
            PipelineError::Config(format!(
                "cannot list model directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Persist an artifact under `name`
    pub fn save(&self, name: &str, artifact: &ModelArtifact) -> Result<()> {
        artifact.save(self.model_path(name))?;
        self.cache.write().remove(name);
        Ok(())
    }
}

/// Whether `name` is a specialist name for `cluster_id`
fn serves_cluster(name: &str, cluster_id: usize) -> bool {
    let digits = cluster_id.to_string();
    match name.strip_suffix(digits.as_str()) {
        Some(prefix) => !prefix.is_empty() && !prefix.ends_with(|c: char| c.is_ascii_digit()),
        None => false,
    }
}

impl ModelStore for FileModelStore {
    fn load(&self, name: &str) -> Result<Arc<ModelArtifact>> {
        if let Some(model) = self.cache.read().get(name) {
            return Ok(Arc::clone(model));
        }

        let path = self.model_path(name);
        if !path.is_file() {
            return Err(PipelineError::Config(format!(
                "model '{}' not found at {}",
                name,
                path.display()
            )));
        }

        let model = Arc::new(ModelArtifact::load(&path)?);
        info!(model = name, kind = model.kind(), "Loaded model");
        self.cache
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&model));
        Ok(model)
    }

    fn resolve(&self, cluster_id: usize) -> Result<String> {
        let candidates: Vec<String> = self
            .model_names()?
            .into_iter()
            .filter(|name| *name != self.clustering_model && serves_cluster(name, cluster_id))
            .collect();

        match candidates.as_slice() {
            [] => Err(PipelineError::ModelNotFound { cluster_id }),
            [name] => {
                debug!(cluster = cluster_id, model = %name, "Resolved specialist model");
                Ok(name.clone())
            }
            _ => Err(PipelineError::Config(format!(
                "cluster {} matches several models: {}",
                cluster_id,
                candidates.join(", ")
            ))),
        }
    }
}

/// Store holding artifacts in memory
#[derive(Debug, Default, Clone)]
pub struct InMemoryModelStore {
    models: HashMap<String, Arc<ModelArtifact>>,
    specialists: BTreeMap<usize, String>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register a model by name
    pub fn with_model(mut self, name: impl Into<String>, artifact: impl Into<ModelArtifact>) -> Self {
        self.models.insert(name.into(), Arc::new(artifact.into()));
        self
    }

    /// Builder: register the specialist model of a cluster
    pub fn with_specialist(
        mut self,
        cluster_id: usize,
        name: impl Into<String>,
        artifact: impl Into<ModelArtifact>,
    ) -> Self {
        let name = name.into();
        self.specialists.insert(cluster_id, name.clone());
        self.with_model(name, artifact)
    }
}

impl ModelStore for InMemoryModelStore {
    fn load(&self, name: &str) -> Result<Arc<ModelArtifact>> {
        let artifact = self
            .models
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::Config(format!("model '{}' is not registered", name)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    fn resolve(&self, cluster_id: usize) -> Result<String> {
        self.specialists
            .get(&cluster_id)
            .cloned()
            .ok_or(PipelineError::ModelNotFound { cluster_id })
    }
}
