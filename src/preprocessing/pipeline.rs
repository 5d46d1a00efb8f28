//! Preprocessing stages chained in prediction order

use super::{
    config::PreprocessingConfig,
    encoder::{CategoricalEncoder, EncodedBatch, EncodingSchema},
    imputer::CategoricalImputer,
    missing::{self, DiagnosticSink, MissingReport},
    sanitizer, variance,
};
use crate::error::Result;
use crate::table::RecordTable;
use std::time::Instant;
use tracing::{info, info_span};

/// Every intermediate result of one preprocessing pass
#[derive(Debug, Clone)]
pub struct PreprocessedBatch {
    pub sanitized: RecordTable,
    pub missing: MissingReport,
    pub imputed: RecordTable,
    pub encoded: EncodedBatch,
    /// Columns removed by the optional zero-variance filter
    pub zero_variance_dropped: Vec<String>,
    /// Encoded table after the optional filter; the router's input
    pub features: RecordTable,
    pub elapsed_secs: f64,
}

/// Sanitize, analyze, impute, encode and optionally variance-filter a batch
#[derive(Debug, Clone)]
pub struct SurveyPreprocessor {
    config: PreprocessingConfig,
    encoder: CategoricalEncoder,
}

impl SurveyPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Result<Self> {
        let encoder = CategoricalEncoder::from_config(&config)?;
        Ok(Self { config, encoder })
    }

    /// Builder: pin the encoder to a training-time layout
    pub fn with_encoding_schema(mut self, schema: EncodingSchema) -> Self {
        self.encoder = self.encoder.with_schema(schema);
        self
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn run(&self, raw: &RecordTable, sink: &dyn DiagnosticSink) -> Result<PreprocessedBatch> {
        let _span = info_span!("preprocess", rows = raw.n_rows()).entered();
        let start = Instant::now();

        let sanitized = sanitizer::sanitize(raw, &self.config.columns_to_drop, &self.config.age_column)?;
        let sanitized = sanitizer::assign_roles(
            &sanitized,
            &self.config.id_columns,
            self.config.label_column.as_deref(),
        )?;

        let missing = missing::analyze(&sanitized, sink)?;
        let imputed = if missing.has_missing {
            CategoricalImputer::new().impute(&sanitized, &missing.column_names())?
        } else {
            sanitized.clone()
        };

        let encoded = self.encoder.encode_for_prediction(&imputed)?;
        encoded.ensure_clean()?;

        let (features, zero_variance_dropped) = if self.config.drop_zero_variance {
            let dropped = variance::zero_variance_columns(&encoded.table);
            (variance::drop_zero_variance(&encoded.table)?, dropped)
        } else {
            (encoded.table.clone(), Vec::new())
        };

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            rows = features.n_rows(),
            columns = features.n_cols(),
            elapsed_secs,
            "Preprocessing complete"
        );

        Ok(PreprocessedBatch {
            sanitized,
            missing,
            imputed,
            encoded,
            zero_variance_dropped,
            features,
            elapsed_secs,
        })
    }
}
