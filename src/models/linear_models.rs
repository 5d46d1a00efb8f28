//! Linear and logistic regression predictors

use super::{check_width, Model};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

fn default_threshold() -> f64 {
    0.5
}

fn validate_coefficients(kind: &str, coefficients: &[f64]) -> Result<()> {
    if coefficients.is_empty() {
        return Err(PipelineError::Config(format!("{} artifact has no coefficients", kind)));
    }
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(PipelineError::Config(format!(
            "{} artifact has non-finite coefficients",
            kind
        )));
    }
    Ok(())
}

/// Ordinary least squares model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl LinearRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            feature_names: None,
        }
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_coefficients("linear_regression", &self.coefficients)
    }
}

impl Model for LinearRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width("linear_regression", self.coefficients.len(), x)?;
        let coefficients = Array1::from_vec(self.coefficients.clone());
        Ok(x.dot(&coefficients) + self.intercept)
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}

/// Binary logistic regression; predicts class 0.0 or 1.0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    /// Probability at or above which class 1 is predicted
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
            threshold: default_threshold(),
            feature_names: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    fn sigmoid(z: f64) -> f64 {
        1.0 / (1.0 + (-z).exp())
    }

    /// Probability of class 1 for each row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width("logistic_regression", self.coefficients.len(), x)?;
        let coefficients = Array1::from_vec(self.coefficients.clone());
        let z = x.dot(&coefficients) + self.intercept;
        Ok(z.mapv(Self::sigmoid))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_coefficients("logistic_regression", &self.coefficients)?;
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(PipelineError::Config(format!(
                "logistic_regression threshold {} is outside [0, 1]",
                self.threshold
            )));
        }
        Ok(())
    }
}

impl Model for LogisticRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let threshold = self.threshold;
        Ok(proba.mapv(|p| if p >= threshold { 1.0 } else { 0.0 }))
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }
}
