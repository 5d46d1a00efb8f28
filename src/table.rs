//! Record table: ordered survey rows with stable row identity
//!
//! Every row carries a [`RowId`] assigned when the table is built. Filters,
//! partitions and column rewrites keep the id attached to its row, so
//! results computed on a subset can always be matched back to the input.

use crate::error::{PipelineError, Result, Stage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable identity of a row, independent of its current position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single cell value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Numeric(f64),
    Boolean(bool),
    Text(String),
    Missing,
}

impl Value {
    /// Build a numeric value; NaN becomes `Missing`
    pub fn numeric(v: f64) -> Self {
        if v.is_nan() {
            Value::Missing
        } else {
            Value::Numeric(v)
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the value (booleans map to 0/1)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(v) => Some(*v),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn canonical_bits(v: f64) -> u64 {
        if v == 0.0 {
            0.0f64.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Numeric(a), Value::Numeric(b)) => {
                Self::canonical_bits(*a) == Self::canonical_bits(*b)
            }
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Missing, Value::Missing) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Numeric(v) => Self::canonical_bits(*v).hash(state),
            Value::Boolean(b) => b.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("<missing>"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::numeric(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// Semantic role of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    Feature,
    Label,
    /// Identifier columns never reach a model
    Id,
}

/// Storage kind of a column, fixed when the table is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Categorical,
}

impl ColumnKind {
    /// `Categorical` if any value is text, `Boolean` if every observed value
    /// is a boolean, otherwise `Numeric` (including all-missing columns)
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut saw_bool = false;
        let mut saw_number = false;
        for value in values {
            match value {
                Value::Text(_) => return ColumnKind::Categorical,
                Value::Boolean(_) => saw_bool = true,
                Value::Numeric(_) => saw_number = true,
                Value::Missing => {}
            }
        }
        if saw_bool && !saw_number {
            ColumnKind::Boolean
        } else {
            ColumnKind::Numeric
        }
    }
}

/// Ordered, duplicate-free column names with their roles and kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    names: Vec<String>,
    roles: Vec<ColumnRole>,
    kinds: Vec<ColumnKind>,
}

impl ColumnSchema {
    pub fn new(names: Vec<String>) -> Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::schema(
                    Stage::Load,
                    format!("duplicate column name '{}'", name),
                ));
            }
        }
        let roles = vec![ColumnRole::Feature; names.len()];
        let kinds = vec![ColumnKind::Numeric; names.len()];
        Ok(Self { names, roles, kinds })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn role(&self, name: &str) -> Option<ColumnRole> {
        self.index_of(name).map(|idx| self.roles[idx])
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.index_of(name).map(|idx| self.kinds[idx])
    }

    /// The column carrying the `Label` role, if any
    pub fn label(&self) -> Option<&str> {
        self.names
            .iter()
            .zip(&self.roles)
            .find(|(_, role)| **role == ColumnRole::Label)
            .map(|(name, _)| name.as_str())
    }

    /// Columns with the `Feature` role, in schema order
    pub fn feature_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.roles)
            .filter(|(_, role)| **role == ColumnRole::Feature)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_subset_of(&self, other: &ColumnSchema) -> bool {
        self.names.iter().all(|n| other.index_of(n).is_some())
    }

    fn set_role(&mut self, name: &str, role: ColumnRole, stage: Stage) -> Result<()> {
        let idx = self.index_of(name).ok_or_else(|| {
            PipelineError::schema(stage, format!("column '{}' not found", name))
        })?;
        self.roles[idx] = role;
        Ok(())
    }

    fn push(&mut self, name: String, role: ColumnRole, kind: ColumnKind, stage: Stage) -> Result<()> {
        if self.index_of(&name).is_some() {
            return Err(PipelineError::schema(
                stage,
                format!("column '{}' already exists", name),
            ));
        }
        self.names.push(name);
        self.roles.push(role);
        self.kinds.push(kind);
        Ok(())
    }

    fn remove(&mut self, idx: usize) -> (String, ColumnRole) {
        self.kinds.remove(idx);
        (self.names.remove(idx), self.roles.remove(idx))
    }
}

/// Ordered rows sharing one [`ColumnSchema`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    schema: ColumnSchema,
    rows: Vec<Vec<Value>>,
    row_ids: Vec<RowId>,
}

impl RecordTable {
    /// Build a table from row-major values, assigning row ids in input order.
    ///
    /// Column kinds are inferred from these rows once and kept by every
    /// later row filter.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut schema = ColumnSchema::new(columns)?;
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(PipelineError::schema(
                    Stage::Load,
                    format!(
                        "row {} has {} values, expected {}",
                        idx,
                        row.len(),
                        schema.len()
                    ),
                ));
            }
        }
        for idx in 0..schema.len() {
            schema.kinds[idx] = ColumnKind::infer(rows.iter().map(|row| &row[idx]));
        }
        let row_ids = (0..rows.len()).map(RowId).collect();
        Ok(Self {
            schema,
            rows,
            row_ids,
        })
    }

    /// Build a table from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != n_rows) {
            return Err(PipelineError::schema(
                Stage::Load,
                format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    n_rows
                ),
            ));
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut rows: Vec<Vec<Value>> = (0..n_rows)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();
        for (name, values) in columns {
            names.push(name);
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Self::new(names, rows)
    }

    /// Builder: assign a role to a column
    pub fn with_role(mut self, name: &str, role: ColumnRole) -> Result<Self> {
        self.schema.set_role(name, role, Stage::Load)?;
        Ok(self)
    }

    pub fn set_role(&mut self, name: &str, role: ColumnRole, stage: Stage) -> Result<()> {
        self.schema.set_role(name, role, stage)
    }

    /// Builder: declare a column's kind instead of the inferred one
    pub fn with_kind(mut self, name: &str, kind: ColumnKind) -> Result<Self> {
        let idx = self.require_column(name, Stage::Load)?;
        self.set_kind(idx, kind);
        Ok(self)
    }

    pub fn set_kind(&mut self, idx: usize, kind: ColumnKind) {
        self.schema.kinds[idx] = kind;
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn column_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    pub fn row(&self, position: usize) -> &[Value] {
        &self.rows[position]
    }

    /// Iterate `(row id, values)` in table order
    pub fn rows(&self) -> impl Iterator<Item = (RowId, &[Value])> + '_ {
        self.row_ids
            .iter()
            .copied()
            .zip(self.rows.iter().map(|r| r.as_slice()))
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.index_of(name)
    }

    /// Column index, or a schema error naming the stage that needed it
    pub fn require_column(&self, name: &str, stage: Stage) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            PipelineError::schema(stage, format!("column '{}' not found", name))
        })
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        self.schema.kinds[idx]
    }

    pub fn column_role(&self, idx: usize) -> ColumnRole {
        self.schema.roles[idx]
    }

    pub fn value(&self, position: usize, col: usize) -> &Value {
        &self.rows[position][col]
    }

    pub fn set_value(&mut self, position: usize, col: usize, value: Value) {
        self.rows[position][col] = value;
    }

    /// Remove a column, returning its name and values
    pub fn remove_column(&mut self, idx: usize) -> (String, Vec<Value>) {
        let (name, _) = self.schema.remove(idx);
        let values = self.rows.iter_mut().map(|row| row.remove(idx)).collect();
        (name, values)
    }

    /// Append a column at the end of the schema
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
        stage: Stage,
    ) -> Result<()> {
        let name = name.into();
        if values.len() != self.rows.len() {
            return Err(PipelineError::schema(
                stage,
                format!(
                    "column '{}' has {} values, table has {} rows",
                    name,
                    values.len(),
                    self.rows.len()
                ),
            ));
        }
        let kind = ColumnKind::infer(&values);
        self.schema.push(name, ColumnRole::Feature, kind, stage)?;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Keep only the rows at the given positions, in the given order
    pub fn select_rows(&self, positions: &[usize]) -> RecordTable {
        RecordTable {
            schema: self.schema.clone(),
            rows: positions.iter().map(|&p| self.rows[p].clone()).collect(),
            row_ids: positions.iter().map(|&p| self.row_ids[p]).collect(),
        }
    }

    /// Project onto `names`, in that order
    pub fn select_columns(&self, names: &[String], stage: Stage) -> Result<RecordTable> {
        let indices = names
            .iter()
            .map(|name| self.require_column(name, stage))
            .collect::<Result<Vec<_>>>()?;

        let mut schema = ColumnSchema::new(names.to_vec())?;
        for (new_idx, &old_idx) in indices.iter().enumerate() {
            schema.roles[new_idx] = self.schema.roles[old_idx];
            schema.kinds[new_idx] = self.schema.kinds[old_idx];
        }

        Ok(RecordTable {
            schema,
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
            row_ids: self.row_ids.clone(),
        })
    }

    /// Dense numeric matrix of every column.
    ///
    /// Fails on the first missing or text cell, naming its column and row.
    pub fn to_matrix(&self, stage: Stage) -> Result<Array2<f64>> {
        let n_cols = self.n_cols();
        let mut data = Vec::with_capacity(self.n_rows() * n_cols);
        for (row_id, row) in self.rows() {
            for (col, value) in row.iter().enumerate() {
                match value {
                    Value::Numeric(v) => data.push(*v),
                    Value::Boolean(b) => data.push(if *b { 1.0 } else { 0.0 }),
                    Value::Missing => {
                        return Err(PipelineError::missing_data(
                            stage,
                            self.schema.names[col].clone(),
                            format!("row {} has no value", row_id),
                        ))
                    }
                    Value::Text(s) => {
                        return Err(PipelineError::encoding(
                            stage,
                            self.schema.names[col].clone(),
                            Some(row_id.0),
                            format!("non-numeric value '{}'", s),
                        ))
                    }
                }
            }
        }
        Ok(Array2::from_shape_vec((self.n_rows(), n_cols), data)?)
    }
}
