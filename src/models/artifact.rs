//! Serialized model artifacts

use super::{DecisionTree, KMeans, LinearRegression, LogisticRegression, Model};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A pre-fitted model as stored on disk, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Kmeans(KMeans),
    LinearRegression(LinearRegression),
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Kmeans(_) => "kmeans",
            ModelArtifact::LinearRegression(_) => "linear_regression",
            ModelArtifact::LogisticRegression(_) => "logistic_regression",
            ModelArtifact::DecisionTree(_) => "decision_tree",
        }
    }

    /// Parse and validate an artifact
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| match e {
            PipelineError::Serialization(msg) => {
                PipelineError::Serialization(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ModelArtifact::Kmeans(m) => m.validate()?,
            ModelArtifact::LinearRegression(m) => m.validate()?,
            ModelArtifact::LogisticRegression(m) => m.validate()?,
            ModelArtifact::DecisionTree(m) => m.validate()?,
        }
        if let Some(names) = self.feature_names() {
            if names.len() != self.n_features() {
                return Err(PipelineError::Config(format!(
                    "{} artifact lists {} feature names for {} features",
                    self.kind(),
                    names.len(),
                    self.n_features()
                )));
            }
        }
        Ok(())
    }

    fn inner(&self) -> &dyn Model {
        match self {
            ModelArtifact::Kmeans(m) => m,
            ModelArtifact::LinearRegression(m) => m,
            ModelArtifact::LogisticRegression(m) => m,
            ModelArtifact::DecisionTree(m) => m,
        }
    }
}

impl Model for ModelArtifact {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.inner().feature_names()
    }
}

impl From<KMeans> for ModelArtifact {
    fn from(model: KMeans) -> Self {
        ModelArtifact::Kmeans(model)
    }
}

impl From<LinearRegression> for ModelArtifact {
    fn from(model: LinearRegression) -> Self {
        ModelArtifact::LinearRegression(model)
    }
}

impl From<LogisticRegression> for ModelArtifact {
    fn from(model: LogisticRegression) -> Self {
        ModelArtifact::LogisticRegression(model)
    }
}

impl From<DecisionTree> for ModelArtifact {
    fn from(model: DecisionTree) -> Self {
        ModelArtifact::DecisionTree(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_parse_tagged_kmeans() {
        let json = r#"{"kind": "kmeans", "centroids": [[0.0], [5.0]]}"#;
        let artifact = ModelArtifact::from_json(json).unwrap();
        assert_eq!(artifact.kind(), "kmeans");
        assert_eq!(artifact.n_features(), 1);
        assert_eq!(artifact.predict(&array![[4.0]]).unwrap(), array![1.0]);
    }

    #[test]
    fn test_parse_linear_with_names() {
        let json = r#"{
            "kind": "linear_regression",
            "coefficients": [1.0, 1.0],
            "intercept": 1.0,
            "feature_names": ["age", "hasLand_Yes"]
        }"#;
        let artifact = ModelArtifact::from_json(json).unwrap();
        assert_eq!(
            artifact.feature_names(),
            Some(&["age".to_string(), "hasLand_Yes".to_string()][..])
        );
    }

    #[test]
    fn test_feature_name_count_checked() {
        let json = r#"{"kind": "linear_regression", "coefficients": [1.0], "feature_names": ["a", "b"]}"#;
        assert!(matches!(ModelArtifact::from_json(json), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = r#"{"kind": "xgboost", "trees": []}"#;
        assert!(matches!(ModelArtifact::from_json(json), Err(PipelineError::Serialization(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("KMeans").join("KMeans.json");
        let artifact = ModelArtifact::from(KMeans::new(vec![vec![1.0, 2.0]]));
        artifact.save(&path).unwrap();
        assert_eq!(ModelArtifact::load(&path).unwrap(), artifact);
    }
}
