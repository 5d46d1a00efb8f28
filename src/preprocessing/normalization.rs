//! Category normalization table: raw survey answers to canonical labels

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("../../config/category_normalization.json");

/// Versioned column -> raw value -> canonical label mapping.
///
/// Several raw spellings may share one canonical label. Values with no
/// entry pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationTable {
    pub version: u32,
    pub columns: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for NormalizationTable {
    fn default() -> Self {
        Self {
            version: 1,
            columns: BTreeMap::new(),
        }
    }
}

impl NormalizationTable {
    /// Empty table: every value passes through
    pub fn new() -> Self {
        Self::default()
    }

    /// The table bundled with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "cannot read normalization table {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Builder: add a raw -> canonical entry
    pub fn with_entry(
        mut self,
        column: impl Into<String>,
        raw: impl Into<String>,
        canonical: impl Into<String>,
    ) -> Self {
        self.columns
            .entry(column.into())
            .or_default()
            .insert(raw.into(), canonical.into());
        self
    }

    /// Canonical label for `raw` in `column`, or `raw` itself
    pub fn normalize<'a>(&'a self, column: &str, raw: &'a str) -> &'a str {
        self.columns
            .get(column)
            .and_then(|mapping| mapping.get(raw))
            .map(String::as_str)
            .unwrap_or(raw)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    fn validate(&self) -> Result<()> {
        for (column, mapping) in &self.columns {
            if let Some((raw, _)) = mapping.iter().find(|(_, canonical)| canonical.is_empty()) {
                return Err(PipelineError::Config(format!(
                    "normalization of '{}' in column '{}' maps to an empty label",
                    raw, column
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let table = NormalizationTable::builtin().unwrap();
        assert_eq!(table.version, 1);
        assert_eq!(table.columns.len(), 11);
        assert!(table.has_column("hasHealthCert"));
    }

    #[test]
    fn test_many_to_one() {
        let table = NormalizationTable::builtin().unwrap();
        assert_eq!(table.normalize("scholarshipAvailed", "हाँ"), "availed");
        assert_eq!(table.normalize("scholarshipAvailed", "नही"), "Not availed");
        assert_eq!(table.normalize("scholarshipAvailed", "नहीं"), "Not availed");
        assert_eq!(table.normalize("eduType", "#NAME?"), "Informal");
    }

    #[test]
    fn test_unmapped_value_passes_through() {
        let table = NormalizationTable::builtin().unwrap();
        assert_eq!(table.normalize("hasLand", "शायद"), "शायद");
        assert_eq!(table.normalize("vocation", "farmer"), "farmer");
    }

    #[test]
    fn test_empty_label_rejected() {
        let json = r#"{"version": 2, "columns": {"hasLand": {"x": ""}}}"#;
        assert!(matches!(
            NormalizationTable::from_json(json),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.json");
        let table = NormalizationTable::new().with_entry("hasLand", "haan", "Yes");
        std::fs::write(&path, serde_json::to_string(&table).unwrap()).unwrap();

        let loaded = NormalizationTable::load(&path).unwrap();
        assert_eq!(loaded, table);
        assert!(NormalizationTable::load(dir.path().join("absent.json")).is_err());
    }
}
