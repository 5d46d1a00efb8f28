//! Categorical encoding
//!
//! Text values are first normalized through a [`NormalizationTable`]. The
//! privileged ordinal column is then mapped to numbers, and every other
//! categorical column is expanded into `{column}_{category}` indicator
//! columns with the first category (in sorted order) dropped as reference.
//!
//! Only `Feature` columns are encoded. `Id` and `Label` columns are left
//! out of the encoded table, so they never reach a model.
//!
//! With an [`EncodingSchema`] attached, the categories and the final column
//! order come from the schema instead of the batch, so training-time and
//! prediction-time batches produce the same layout.

use super::config::PreprocessingConfig;
use super::normalization::NormalizationTable;
use crate::error::{PipelineError, Result, Stage};
use crate::table::{ColumnKind, ColumnRole, RecordTable, RowId, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Indicator layout of one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// Category encoded as all zeros
    pub reference: Option<String>,
    /// Categories with their own indicator column, sorted
    pub categories: Vec<String>,
}

impl IndicatorSpec {
    fn from_labels(labels: &[Option<String>]) -> Self {
        let mut distinct: Vec<String> = labels
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if distinct.is_empty() {
            return Self {
                reference: None,
                categories: Vec::new(),
            };
        }
        let reference = distinct.remove(0);
        Self {
            reference: Some(reference),
            categories: distinct,
        }
    }

    fn knows(&self, label: &str) -> bool {
        self.reference.as_deref() == Some(label) || self.categories.iter().any(|c| c == label)
    }
}

/// Persisted column layout of an encoded training batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSchema {
    /// Final encoded columns in canonical order
    pub columns: Vec<String>,
    /// Indicator layout per expanded categorical column
    pub indicators: BTreeMap<String, IndicatorSpec>,
}

impl EncodingSchema {
    /// Capture the layout an encoded batch ended up with
    pub fn from_batch(batch: &EncodedBatch) -> Self {
        Self {
            columns: batch.table.column_names().to_vec(),
            indicators: batch.indicators.clone(),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "cannot read encoding schema {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Ordinal value that could not be mapped
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingAnomaly {
    pub row_id: RowId,
    pub column: String,
    pub raw: Value,
}

/// Output of one encoding pass
#[derive(Debug, Clone)]
pub struct EncodedBatch {
    pub table: RecordTable,
    pub anomalies: Vec<EncodingAnomaly>,
    pub indicators: BTreeMap<String, IndicatorSpec>,
}

impl EncodedBatch {
    /// Fail on the first recorded anomaly
    pub fn ensure_clean(&self) -> Result<()> {
        match self.anomalies.first() {
            None => Ok(()),
            Some(anomaly) => Err(PipelineError::encoding(
                Stage::Encode,
                anomaly.column.clone(),
                Some(anomaly.row_id.0),
                format!(
                    "value '{}' has no ordinal mapping ({} unmapped value(s) in batch)",
                    anomaly.raw,
                    self.anomalies.len()
                ),
            )),
        }
    }
}

/// Deterministic categorical encoder shared by training and prediction
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    normalization: NormalizationTable,
    ordinal_column: String,
    ordinal_mapping: BTreeMap<String, f64>,
    schema: Option<EncodingSchema>,
}

impl CategoricalEncoder {
    pub fn new(
        normalization: NormalizationTable,
        ordinal_column: impl Into<String>,
        ordinal_mapping: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            normalization,
            ordinal_column: ordinal_column.into(),
            ordinal_mapping,
            schema: None,
        }
    }

    /// Build from configuration, loading the normalization table it names
    pub fn from_config(config: &PreprocessingConfig) -> Result<Self> {
        let normalization = match &config.normalization_table {
            Some(path) => NormalizationTable::load(path)?,
            None => NormalizationTable::builtin()?,
        };
        Ok(Self::new(
            normalization,
            config.ordinal_column.clone(),
            config.ordinal_mapping.clone(),
        ))
    }

    /// Builder: pin categories and column order to a training-time schema
    pub fn with_schema(mut self, schema: EncodingSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn schema(&self) -> Option<&EncodingSchema> {
        self.schema.as_ref()
    }

    pub fn encode_for_training(&self, table: &RecordTable) -> Result<EncodedBatch> {
        self.encode(table)
    }

    pub fn encode_for_prediction(&self, table: &RecordTable) -> Result<EncodedBatch> {
        self.encode(table)
    }

    fn encode(&self, table: &RecordTable) -> Result<EncodedBatch> {
        let ordinal_idx = table.require_column(&self.ordinal_column, Stage::Encode)?;
        if table.column_role(ordinal_idx) != ColumnRole::Feature {
            return Err(PipelineError::schema(
                Stage::Encode,
                format!("ordinal column '{}' is not a feature column", self.ordinal_column),
            ));
        }
        let categorical = self.categorical_columns(table, ordinal_idx)?;

        let passthrough: Vec<String> = table
            .column_names()
            .iter()
            .enumerate()
            .filter(|(idx, _)| table.column_role(*idx) == ColumnRole::Feature)
            .filter(|(idx, _)| !categorical.contains(idx))
            .map(|(_, name)| name.clone())
            .collect();
        let mut out = table.select_columns(&passthrough, Stage::Encode)?;

        let anomalies = self.map_ordinal(table, ordinal_idx, &mut out)?;

        let mut indicators = BTreeMap::new();
        for &idx in &categorical {
            let name = &table.column_names()[idx];
            let labels: Vec<Option<String>> = table
                .column_values(idx)
                .map(|v| self.label(name, v))
                .collect();

            let spec = match &self.schema {
                Some(schema) => {
                    let spec = schema.indicators.get(name).cloned().ok_or_else(|| {
                        PipelineError::schema(
                            Stage::Encode,
                            format!("column '{}' is not categorical in the encoding schema", name),
                        )
                    })?;
                    check_known(table.row_ids(), name, &labels, &spec)?;
                    spec
                }
                None => IndicatorSpec::from_labels(&labels),
            };

            for category in &spec.categories {
                let values = labels
                    .iter()
                    .map(|l| Value::Numeric(if l.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 }))
                    .collect();
                out.push_column(format!("{}_{}", name, category), values, Stage::Encode)?;
            }
            debug!(
                column = %name,
                reference = ?spec.reference,
                indicators = spec.categories.len(),
                "Expanded categorical column"
            );
            indicators.insert(name.clone(), spec);
        }

        if let Some(schema) = &self.schema {
            out = reorder_to_schema(&out, schema)?;
        }

        if !anomalies.is_empty() {
            warn!(
                column = %self.ordinal_column,
                count = anomalies.len(),
                "Unmapped ordinal values"
            );
        }
        info!(
            rows = out.n_rows(),
            columns_in = table.n_cols(),
            excluded = table.n_cols() - table.schema().feature_names().len(),
            columns_out = out.n_cols(),
            expanded = categorical.len(),
            "Encoded categorical values"
        );

        Ok(EncodedBatch {
            table: out,
            anomalies,
            indicators,
        })
    }

    /// Positions of the columns to expand into indicators
    fn categorical_columns(&self, table: &RecordTable, ordinal_idx: usize) -> Result<Vec<usize>> {
        let mut columns = Vec::new();
        for (idx, name) in table.column_names().iter().enumerate() {
            if idx == ordinal_idx || table.column_role(idx) != ColumnRole::Feature {
                continue;
            }
            let is_text = table.column_kind(idx) == ColumnKind::Categorical;
            match &self.schema {
                Some(schema) if schema.indicators.contains_key(name) => columns.push(idx),
                Some(_) if is_text => {
                    return Err(PipelineError::schema(
                        Stage::Encode,
                        format!("categorical column '{}' is unknown to the encoding schema", name),
                    ))
                }
                None if is_text => columns.push(idx),
                _ => {}
            }
        }
        Ok(columns)
    }

    fn map_ordinal(
        &self,
        table: &RecordTable,
        ordinal_idx: usize,
        out: &mut RecordTable,
    ) -> Result<Vec<EncodingAnomaly>> {
        let out_idx = out.require_column(&self.ordinal_column, Stage::Encode)?;
        out.set_kind(out_idx, ColumnKind::Numeric);
        let mut anomalies = Vec::new();

        for (pos, (row_id, row)) in table.rows().enumerate() {
            let raw = &row[ordinal_idx];
            let mapped = self
                .label(&self.ordinal_column, raw)
                .and_then(|label| self.ordinal_mapping.get(&label).copied());

            match mapped {
                Some(v) => out.set_value(pos, out_idx, Value::Numeric(v)),
                None => {
                    out.set_value(pos, out_idx, Value::Missing);
                    anomalies.push(EncodingAnomaly {
                        row_id,
                        column: self.ordinal_column.clone(),
                        raw: raw.clone(),
                    });
                }
            }
        }
        Ok(anomalies)
    }

    /// Normalized category label of a cell; `None` for missing
    fn label(&self, column: &str, value: &Value) -> Option<String> {
        match value {
            Value::Missing => None,
            Value::Text(raw) => Some(self.normalization.normalize(column, raw).to_string()),
            other => Some(other.to_string()),
        }
    }
}

fn check_known(
    row_ids: &[RowId],
    column: &str,
    labels: &[Option<String>],
    spec: &IndicatorSpec,
) -> Result<()> {
    for (row_id, label) in row_ids.iter().zip(labels) {
        if let Some(label) = label {
            if !spec.knows(label) {
                return Err(PipelineError::encoding(
                    Stage::Encode,
                    column,
                    Some(row_id.0),
                    format!("category '{}' was not seen at training time", label),
                ));
            }
        }
    }
    Ok(())
}

fn reorder_to_schema(table: &RecordTable, schema: &EncodingSchema) -> Result<RecordTable> {
    if let Some(extra) = table
        .column_names()
        .iter()
        .find(|name| !schema.columns.contains(name))
    {
        return Err(PipelineError::schema(
            Stage::Encode,
            format!("column '{}' is not part of the encoding schema", extra),
        ));
    }
    table.select_columns(&schema.columns, Stage::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> CategoricalEncoder {
        CategoricalEncoder::from_config(&PreprocessingConfig::default()).unwrap()
    }

    fn survey() -> RecordTable {
        RecordTable::from_columns(vec![
            ("age".to_string(), vec![30.0.into(), 41.0.into(), 25.0.into()]),
            (
                "scholarshipAvailed".to_string(),
                vec!["हाँ".into(), "नहीं".into(), "availed".into()],
            ),
            ("hasLand".to_string(), vec!["हाँ".into(), "नहीं".into(), "Yes".into()]),
            (
                "literacy".to_string(),
                vec!["शिक्षित".into(), Value::Missing, "अशिक्षित".into()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_ordinal_mapping_after_normalization() {
        let batch = encoder().encode_for_prediction(&survey()).unwrap();
        let idx = batch.table.column_index("scholarshipAvailed").unwrap();

        assert!(batch.anomalies.is_empty());
        assert_eq!(batch.table.value(0, idx), &Value::Numeric(1.0));
        assert_eq!(batch.table.value(1, idx), &Value::Numeric(2.0));
        assert_eq!(batch.table.value(2, idx), &Value::Numeric(1.0));
    }

    #[test]
    fn test_one_hot_drops_reference() {
        let batch = encoder().encode_for_prediction(&survey()).unwrap();

        assert_eq!(
            batch.table.column_names(),
            &[
                "age".to_string(),
                "scholarshipAvailed".to_string(),
                "hasLand_Yes".to_string(),
                "literacy_Literate".to_string(),
            ]
        );
        let land = batch.table.column_index("hasLand_Yes").unwrap();
        let values: Vec<&Value> = batch.table.column_values(land).collect();
        assert_eq!(values, vec![&Value::Numeric(1.0), &Value::Numeric(0.0), &Value::Numeric(1.0)]);

        // Missing literacy encodes as all zeros
        let lit = batch.table.column_index("literacy_Literate").unwrap();
        assert_eq!(batch.table.value(1, lit), &Value::Numeric(0.0));

        let spec = &batch.indicators["literacy"];
        assert_eq!(spec.reference.as_deref(), Some("Illiterate"));
    }

    #[test]
    fn test_empty_batch_never_passes_text_through() {
        let table = RecordTable::from_columns(vec![
            ("age".to_string(), vec![(-1.0).into(), (-2.0).into(), (-3.0).into()]),
            (
                "scholarshipAvailed".to_string(),
                vec!["हाँ".into(), "नहीं".into(), "हाँ".into()],
            ),
            (
                "eduType".to_string(),
                vec!["Formal".into(), "Informal".into(), "Other".into()],
            ),
        ])
        .unwrap();
        let batch = encoder().encode_for_prediction(&table.select_rows(&[])).unwrap();

        // No rows left, but eduType is still expanded rather than passed through
        assert_eq!(batch.table.n_rows(), 0);
        assert!(batch.table.column_index("eduType").is_none());
        assert_eq!(batch.table.column_kind(1), ColumnKind::Numeric);
    }

    #[test]
    fn test_non_feature_columns_excluded() {
        let table = survey()
            .with_role("age", ColumnRole::Id)
            .unwrap()
            .with_role("hasLand", ColumnRole::Label)
            .unwrap();
        let batch = encoder().encode_for_prediction(&table).unwrap();
        assert_eq!(
            batch.table.column_names(),
            &["scholarshipAvailed".to_string(), "literacy_Literate".to_string()]
        );
        assert!(!batch.indicators.contains_key("hasLand"));

        let ordinal_as_id = survey().with_role("scholarshipAvailed", ColumnRole::Id).unwrap();
        assert!(matches!(
            encoder().encode_for_prediction(&ordinal_as_id),
            Err(PipelineError::Schema { stage: Stage::Encode, .. })
        ));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let first = encoder().encode_for_training(&survey()).unwrap();
        let second = encoder().encode_for_prediction(&survey()).unwrap();
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn test_unmapped_ordinal_is_anomaly() {
        let table = RecordTable::from_columns(vec![(
            "scholarshipAvailed".to_string(),
            vec!["availed".into(), "maybe".into(), Value::Missing],
        )])
        .unwrap();
        let batch = encoder().encode_for_prediction(&table).unwrap();

        assert_eq!(batch.anomalies.len(), 2);
        assert_eq!(batch.anomalies[0].row_id, RowId(1));
        assert_eq!(batch.anomalies[0].raw, Value::from("maybe"));
        assert!(batch.table.value(1, 0).is_missing());
        assert!(matches!(
            batch.ensure_clean(),
            Err(PipelineError::Encoding { row: Some(1), .. })
        ));
    }

    #[test]
    fn test_missing_ordinal_column_is_schema_error() {
        let table = RecordTable::from_columns(vec![("age".to_string(), vec![1.0.into()])]).unwrap();
        let err = encoder().encode_for_prediction(&table).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { stage: Stage::Encode, .. }));
    }

    #[test]
    fn test_schema_pins_layout() {
        let training = encoder().encode_for_training(&survey()).unwrap();
        let schema = EncodingSchema::from_batch(&training);

        // A batch where hasLand only holds the reference category
        let batch = RecordTable::from_columns(vec![
            ("age".to_string(), vec![50.0.into()]),
            ("scholarshipAvailed".to_string(), vec!["नही".into()]),
            ("hasLand".to_string(), vec!["No".into()]),
            ("literacy".to_string(), vec!["शिक्षित".into()]),
        ])
        .unwrap();

        let encoded = encoder()
            .with_schema(schema.clone())
            .encode_for_prediction(&batch)
            .unwrap();
        assert_eq!(encoded.table.column_names(), schema.columns.as_slice());
        let land = encoded.table.column_index("hasLand_Yes").unwrap();
        assert_eq!(encoded.table.value(0, land), &Value::Numeric(0.0));
    }

    #[test]
    fn test_schema_rejects_unseen_category() {
        let schema = EncodingSchema::from_batch(&encoder().encode_for_training(&survey()).unwrap());
        let batch = RecordTable::from_columns(vec![
            ("age".to_string(), vec![50.0.into()]),
            ("scholarshipAvailed".to_string(), vec!["availed".into()]),
            ("hasLand".to_string(), vec!["Leased".into()]),
            ("literacy".to_string(), vec![Value::Missing]),
        ])
        .unwrap();

        let err = encoder()
            .with_schema(schema)
            .encode_for_prediction(&batch)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Encoding { ref column, .. } if column == "hasLand"));
    }

    #[test]
    fn test_schema_rejects_extra_column() {
        let schema = EncodingSchema::from_batch(&encoder().encode_for_training(&survey()).unwrap());
        let mut batch = survey();
        batch
            .push_column("income", vec![1.0.into(), 2.0.into(), 3.0.into()], Stage::Load)
            .unwrap();

        let err = encoder()
            .with_schema(schema)
            .encode_for_prediction(&batch)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }

    #[test]
    fn test_schema_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema").join("encoding.json");
        let schema = EncodingSchema::from_batch(&encoder().encode_for_training(&survey()).unwrap());

        schema.save(&path).unwrap();
        assert_eq!(EncodingSchema::load(&path).unwrap(), schema);
    }
}
