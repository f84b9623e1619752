//! Tabular dataset model: ordered columns, typed cells, inferred column types.

use crate::error::{AnalysisError, SchemaWarning};
use crate::stats::{mean_std, quantile_sorted, sorted_finite};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

/// A single cell. Serializes as a bare JSON number, string or null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Parse a raw CSV cell. Blank and NA-like cells are missing; non-finite numbers too.
    pub fn from_cell(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() || matches!(trimmed, "NA" | "N/A" | "null" | "NULL") {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Value::Number(v),
            Ok(_) => Value::Missing,
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Missing,
            serde_json::Value::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) if f.is_finite() => Value::Number(f),
                _ => Value::Missing,
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        }
    }
}

/// Accepts any JSON value; booleans become 0/1, arrays and objects become text.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(d).map(Value::from)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Value::Number(v)
        } else {
            Value::Missing
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    NonNumeric,
}

/// Ordered rows over a fixed, ordered set of columns.
///
/// A column is numeric when it has at least one number and every
/// non-missing cell is a number. Types are inferred once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, AnalysisError> {
        let mut seen = HashSet::new();
        for c in &columns {
            if !seen.insert(c.as_str()) {
                return Err(AnalysisError::DuplicateColumn(c.clone()));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(AnalysisError::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        let types = (0..columns.len()).map(|c| infer_type(&rows, c)).collect();
        Ok(Self {
            columns,
            types,
            rows,
        })
    }

    /// Build from JSON objects. Column order follows first appearance; absent keys are missing.
    pub fn from_records(
        records: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<Self, AnalysisError> {
        let mut columns: Vec<String> = Vec::new();
        let mut known = HashSet::new();
        for rec in &records {
            for key in rec.keys() {
                if known.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
        let rows = records
            .into_iter()
            .map(|mut rec| {
                columns
                    .iter()
                    .map(|c| rec.remove(c).map(Value::from).unwrap_or(Value::Missing))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.types.get(index).copied()
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Resolve a requested column to a numeric column index, or say why it can't be used.
    pub fn numeric_column_index(&self, name: &str) -> Result<usize, SchemaWarning> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| SchemaWarning::MissingColumn {
                column: name.to_string(),
            })?;
        match self.types[idx] {
            ColumnType::Numeric => Ok(idx),
            ColumnType::NonNumeric => Err(SchemaWarning::NonNumericColumn {
                column: name.to_string(),
            }),
        }
    }

    /// Present numeric values of a column, in row order.
    pub fn numeric_values(&self, column: usize) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column).and_then(Value::as_f64))
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.types)
            .filter(|(_, t)| **t == ColumnType::Numeric)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// New dataset holding the given rows, in the given order. Column types carry over.
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Dataset {
            columns: self.columns.clone(),
            types: self.types.clone(),
            rows,
        }
    }

    /// Copy with a column appended, or replaced when the name already exists.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Dataset, AnalysisError> {
        if values.len() != self.rows.len() {
            return Err(AnalysisError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let mut out = self.clone();
        let idx = match out.column_index(name) {
            Some(idx) => {
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
                idx
            }
            None => {
                out.columns.push(name.to_string());
                out.types.push(ColumnType::NonNumeric);
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row.push(v);
                }
                out.columns.len() - 1
            }
        };
        out.types[idx] = infer_type(&out.rows, idx);
        Ok(out)
    }

    /// Summary statistics for every numeric column.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| self.types[*i] == ColumnType::Numeric)
            .filter_map(|(i, name)| {
                let values = self.numeric_values(i);
                let sorted = sorted_finite(&values);
                let (mean, std) = mean_std(&values)?;
                Some(ColumnSummary {
                    column: name.clone(),
                    count: sorted.len(),
                    mean,
                    std,
                    min: *sorted.first()?,
                    q1: quantile_sorted(&sorted, 0.25)?,
                    median: quantile_sorted(&sorted, 0.5)?,
                    q3: quantile_sorted(&sorted, 0.75)?,
                    max: *sorted.last()?,
                })
            })
            .collect()
    }
}

fn infer_type(rows: &[Vec<Value>], column: usize) -> ColumnType {
    let mut any_number = false;
    for row in rows {
        match &row[column] {
            Value::Number(_) => any_number = true,
            Value::Text(_) => return ColumnType::NonNumeric,
            Value::Missing => {}
        }
    }
    if any_number {
        ColumnType::Numeric
    } else {
        ColumnType::NonNumeric
    }
}

/// Serializes as an array of row objects keyed by column name.
impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RowRef {
                columns: &self.columns,
                values: row,
            })?;
        }
        seq.end()
    }
}

struct RowRef<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (c, v) in self.columns.iter().zip(self.values) {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

/// Per-column summary, population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q1: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q3: f64,
    pub max: f64,
}
