//! Most-frequent imputation for categorical columns

use crate::error::{PipelineError, Result, Stage};
use crate::table::{ColumnKind, RecordTable, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Fills missing categorical values with the column's most frequent value
#[derive(Debug, Clone, Default)]
pub struct CategoricalImputer {
    fill_values: BTreeMap<String, Value>,
    is_fitted: bool,
}

impl CategoricalImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn a fill value for each listed categorical column.
    ///
    /// A listed column with no observed value at all is an error. Numeric
    /// and boolean columns are skipped.
    pub fn fit(&mut self, table: &RecordTable, columns: &[String]) -> Result<&mut Self> {
        self.fill_values.clear();

        for name in columns {
            let idx = table.require_column(name, Stage::Impute)?;

            if table.n_rows() > 0 && table.column_values(idx).all(Value::is_missing) {
                return Err(PipelineError::missing_data(
                    Stage::Impute,
                    name.clone(),
                    "every value is missing, no fill value can be derived",
                ));
            }

            match table.column_kind(idx) {
                ColumnKind::Categorical => {
                    if let Some(mode) = most_frequent(table.column_values(idx)) {
                        debug!(column = %name, fill = %mode, "Fitted fill value");
                        self.fill_values.insert(name.clone(), mode);
                    }
                }
                kind => {
                    warn!(column = %name, ?kind, "Skipping imputation of non-categorical column");
                }
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace missing values in the fitted columns
    pub fn transform(&self, table: &RecordTable) -> Result<RecordTable> {
        if !self.is_fitted {
            return Err(PipelineError::Config(
                "imputer must be fitted before transform".to_string(),
            ));
        }

        let mut result = table.clone();
        for (name, fill) in &self.fill_values {
            let idx = result.require_column(name, Stage::Impute)?;
            let mut filled = 0usize;
            for pos in 0..result.n_rows() {
                if result.value(pos, idx).is_missing() {
                    result.set_value(pos, idx, fill.clone());
                    filled += 1;
                }
            }
            debug!(column = %name, filled, "Imputed column");
        }
        Ok(result)
    }

    /// Fit on `columns` and fill them in one step
    pub fn impute(&mut self, table: &RecordTable, columns: &[String]) -> Result<RecordTable> {
        self.fit(table, columns)?;
        let result = self.transform(table)?;
        info!(columns = self.fill_values.len(), "Imputation complete");
        Ok(result)
    }

    pub fn fill_value(&self, column: &str) -> Option<&Value> {
        self.fill_values.get(column)
    }
}

/// Most frequent text value; ties go to the lexicographically smallest
fn most_frequent<'a>(values: impl Iterator<Item = &'a Value>) -> Option<Value> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        if let Some(text) = value.as_text() {
            *counts.entry(text).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(text, _)| Value::text(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey() -> RecordTable {
        RecordTable::from_columns(vec![
            ("age".to_string(), vec![20.0.into(), Value::Missing, 40.0.into(), 50.0.into()]),
            (
                "hasLand".to_string(),
                vec!["Yes".into(), Value::Missing, "No".into(), "Yes".into()],
            ),
            ("literacy".to_string(), vec!["Literate".into(); 4]),
        ])
        .unwrap()
    }

    #[test]
    fn test_fills_with_mode() {
        let table = survey();
        let mut imputer = CategoricalImputer::new();
        let result = imputer.impute(&table, &["hasLand".to_string()]).unwrap();

        assert_eq!(result.value(1, 1), &Value::from("Yes"));
        assert_eq!(imputer.fill_value("hasLand"), Some(&Value::from("Yes")));
    }

    #[test]
    fn test_tie_takes_smallest_value() {
        let table = RecordTable::from_columns(vec![(
            "hasPDS".to_string(),
            vec!["Yes".into(), "No".into(), Value::Missing],
        )])
        .unwrap();
        let result = CategoricalImputer::new()
            .impute(&table, &["hasPDS".to_string()])
            .unwrap();
        assert_eq!(result.value(2, 0), &Value::from("No"));
    }

    #[test]
    fn test_numeric_column_left_untouched() {
        let table = survey();
        let result = CategoricalImputer::new()
            .impute(&table, &["age".to_string()])
            .unwrap();
        assert!(result.value(1, 0).is_missing());
    }

    #[test]
    fn test_complete_columns_are_identity() {
        let table = survey();
        let result = CategoricalImputer::new()
            .impute(&table, &["literacy".to_string()])
            .unwrap();
        assert_eq!(result, table);
    }

    #[test]
    fn test_all_missing_column_fails() {
        let table = RecordTable::from_columns(vec![(
            "hasSECC".to_string(),
            vec![Value::Missing, Value::Missing],
        )])
        .unwrap();
        let err = CategoricalImputer::new()
            .impute(&table, &["hasSECC".to_string()])
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingData { stage: Stage::Impute, .. }));
    }

    #[test]
    fn test_transform_requires_fit() {
        assert!(CategoricalImputer::new().transform(&survey()).is_err());
    }
}
