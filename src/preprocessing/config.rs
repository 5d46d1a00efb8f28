//! Preprocessing configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Columns the survey export carries that never feed the models
pub const DEFAULT_COLUMNS_TO_DROP: &[&str] = &[
    "id",
    "eduInformal",
    "eduOther",
    "vocationCategory",
    "interestedCertProgram",
    "immovablePropLostCOVID",
    "movablePropLostCOVID",
    "injuryCOVID",
    "illnessCOVID",
    "disabledCOVID",
    "liveLostCOVID",
    "wageRecievedCOVID",
    "noGroup",
    "isFPOMember",
    "isCooperativeMember",
    "isSHGMember",
    "isWageEarner",
    "employmentType",
    "reasonLandless",
    "relWithHeadOfFamily",
    "genderHeadOfFamily",
    "eduTransport",
    "noScholarshipReason",
    "typeOfSchool",
    "hasEnrolledAdultLiteracy",
];

/// Configuration for data preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Columns removed by the sanitizer; every one must be present
    pub columns_to_drop: Vec<String>,

    /// Numeric column whose negative values mark a row as invalid
    pub age_column: String,

    /// Identifier columns kept in the table but never encoded
    pub id_columns: Vec<String>,

    /// Target column of a training batch
    pub label_column: Option<String>,

    /// Categorical column encoded ordinally instead of one-hot
    pub ordinal_column: String,

    /// Canonical label -> ordinal value for `ordinal_column`
    pub ordinal_mapping: BTreeMap<String, f64>,

    /// Category normalization table; the bundled table is used when unset
    pub normalization_table: Option<PathBuf>,

    /// Drop zero-variance columns after encoding
    pub drop_zero_variance: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        let mut ordinal_mapping = BTreeMap::new();
        ordinal_mapping.insert("availed".to_string(), 1.0);
        ordinal_mapping.insert("Not availed".to_string(), 2.0);

        Self {
            columns_to_drop: DEFAULT_COLUMNS_TO_DROP.iter().map(|s| s.to_string()).collect(),
            age_column: "age".to_string(),
            id_columns: Vec::new(),
            label_column: None,
            ordinal_column: "scholarshipAvailed".to_string(),
            ordinal_mapping,
            normalization_table: None,
            drop_zero_variance: false,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the columns removed by the sanitizer
    pub fn with_columns_to_drop<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_to_drop = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the age column
    pub fn with_age_column(mut self, column: impl Into<String>) -> Self {
        self.age_column = column.into();
        self
    }

    /// Builder method to mark identifier columns
    pub fn with_id_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.id_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to mark the label column
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    /// Builder method to set the ordinally encoded column and its mapping
    pub fn with_ordinal(mut self, column: impl Into<String>, mapping: BTreeMap<String, f64>) -> Self {
        self.ordinal_column = column.into();
        self.ordinal_mapping = mapping;
        self
    }

    /// Builder method to load the normalization table from a file
    pub fn with_normalization_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.normalization_table = Some(path.into());
        self
    }

    /// Builder method to enable the zero-variance pre-filter
    pub fn with_zero_variance_filter(mut self, enabled: bool) -> Self {
        self.drop_zero_variance = enabled;
        self
    }
}
