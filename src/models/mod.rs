//! Pre-fitted model artifacts and the store they are loaded from
//!
//! Models here are predict-only: their parameters are read from JSON
//! artifacts produced by an external training job.

mod artifact;
pub mod clustering;
pub mod decision_tree;
pub mod linear_models;
pub mod store;

pub use artifact::ModelArtifact;
pub use clustering::KMeans;
pub use decision_tree::{DecisionTree, TreeNode};
pub use linear_models::{LinearRegression, LogisticRegression};
pub use store::{FileModelStore, InMemoryModelStore, ModelStore};

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};

/// Common interface of every loaded predictor
pub trait Model: Send + Sync {
    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Number of input features the model was fitted on
    fn n_features(&self) -> usize;

    /// Feature names recorded at fit time, if the artifact carries them
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

/// Reject a matrix whose width differs from what the model expects
pub(crate) fn check_width(model: &str, expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(PipelineError::DimensionMismatch {
            model: model.to_string(),
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}
