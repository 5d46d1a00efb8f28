//! Top-level pipeline configuration

use crate::error::{PipelineError, Result};
use crate::inference::InferenceConfig;
use crate::preprocessing::PreprocessingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a prediction run needs, loadable from one JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocessing: PreprocessingConfig,
    pub inference: InferenceConfig,

    /// Where the predictions CSV is written
    pub output_path: PathBuf,

    /// Where the missing-value report is written when gaps are found
    pub missing_report_path: PathBuf,

    /// Run log appended to by every prediction run
    pub log_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocessing: PreprocessingConfig::default(),
            inference: InferenceConfig::default(),
            output_path: PathBuf::from("Prediction_Output_File/Predictions.csv"),
            missing_report_path: PathBuf::from("preprocessing_data/null_values.csv"),
            log_path: PathBuf::from("Prediction_Logs/Prediction_Log.txt"),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = config;
        self
    }

    pub fn with_inference(mut self, config: InferenceConfig) -> Self {
        self.inference = config;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_missing_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.missing_report_path = path.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    /// Root every relative path under `dir`
    pub fn rooted_at(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let root = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };
        root(&mut self.output_path);
        root(&mut self.missing_report_path);
        root(&mut self.log_path);
        root(&mut self.inference.models_dir);
        self
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::default();
        assert_eq!(config.output_path, PathBuf::from("Prediction_Output_File/Predictions.csv"));
        assert_eq!(config.missing_report_path, PathBuf::from("preprocessing_data/null_values.csv"));
        assert_eq!(config.log_path, PathBuf::from("Prediction_Logs/Prediction_Log.txt"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let config = PipelineConfig::new()
            .with_output_path("out/preds.csv")
            .with_inference(InferenceConfig::new().with_parallel_dispatch(true));

        config.save(&path).unwrap();
        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.output_path, PathBuf::from("out/preds.csv"));
        assert!(loaded.inference.parallel_dispatch);
        assert_eq!(loaded.preprocessing.ordinal_column, "scholarshipAvailed");
    }

    #[test]
    fn test_rooted_at() {
        let config = PipelineConfig::new()
            .with_log_path("/var/log/run.txt")
            .rooted_at("/work");
        assert_eq!(config.output_path, PathBuf::from("/work/Prediction_Output_File/Predictions.csv"));
        assert_eq!(config.inference.models_dir, PathBuf::from("/work/models"));
        assert_eq!(config.log_path, PathBuf::from("/var/log/run.txt"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            PipelineConfig::load("/nonexistent/pipeline.json"),
            Err(PipelineError::Config(_))
        ));
    }
}
