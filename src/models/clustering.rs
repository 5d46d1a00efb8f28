//! Nearest-centroid cluster assignment

use super::{check_width, Model};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// K-Means clustering with fixed, pre-fitted centroids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Cluster centroids (n_clusters × n_features)
    pub centroids: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl KMeans {
    pub fn new(centroids: Vec<Vec<f64>>) -> Self {
        Self {
            centroids,
            feature_names: None,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.centroids.len()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let width = self.n_features();
        if self.centroids.is_empty() || width == 0 {
            return Err(PipelineError::Config("kmeans artifact has no centroids".to_string()));
        }
        if self.centroids.iter().any(|c| c.len() != width) {
            return Err(PipelineError::Config(
                "kmeans centroids have inconsistent lengths".to_string(),
            ));
        }
        Ok(())
    }

    fn euclidean_sq(a: &ArrayView1<f64>, b: &[f64]) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }
}

impl Model for KMeans {
    /// Index of the nearest centroid for each row; ties go to the lower index
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width("kmeans", self.n_features(), x)?;

        let labels: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut best_c = 0;
                let mut best_dist = f64::MAX;
                for (c, centroid) in self.centroids.iter().enumerate() {
                    let d = Self::euclidean_sq(&row, centroid);
                    if d < best_dist {
                        best_dist = d;
                        best_c = c;
                    }
                }
                best_c as f64
            })
            .collect();

        Ok(Array1::from_vec(labels))
    }

    fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}
