//! In-memory SCADA telemetry table.
//!
//! A small column-oriented table with caller-supplied column names and stable
//! integer row labels. Labels record each row's position in the original
//! dataset and survive slicing, so the filter can partition a dataset into
//! normal/abnormal subsets whose label sets exactly tile the input.
//!
//! The table is deliberately minimal: named columns of `f64` or text, row
//! selection, and appending one numeric column (for predictions). Anything
//! richer belongs to the CSV adapter or the callers.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Schema errors are fatal configuration errors: a misnamed or wrongly-typed
/// column reference fails the whole call with no partial result.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("column not found: '{0}'")]
    MissingColumn(String),

    #[error("column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("column '{name}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column: '{0}'")]
    DuplicateColumn(String),
}

/// A single named column of telemetry values.
#[derive(Debug, Clone, Serialize)]
pub enum Column {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    /// Build a numeric column from any iterator of values.
    pub fn numeric<I: IntoIterator<Item = f64>>(values: I) -> Self {
        Self::Numeric(values.into_iter().collect())
    }

    /// Build a text column from any iterator of string-likes.
    pub fn text<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Text(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-subset copy, `rows` being positions into this column.
    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(rows.iter().map(|&r| v[r]).collect()),
            Self::Text(v) => Self::Text(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Render one cell for CSV export. NaN becomes an empty field.
    pub fn cell_to_string(&self, row: usize) -> String {
        match self {
            Self::Numeric(v) => {
                let x = v[row];
                if x.is_nan() {
                    String::new()
                } else {
                    x.to_string()
                }
            }
            Self::Text(v) => v[row].clone(),
        }
    }
}

/// Ordered collection of SCADA samples with stable row labels.
#[derive(Debug, Clone, Default)]
pub struct ScadaFrame {
    labels: Vec<usize>,
    columns: Vec<(String, Column)>,
}

impl ScadaFrame {
    /// Build a frame from named columns. Labels are assigned 0..n, matching
    /// the rows' original positions.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self, SchemaError> {
        let expected = columns.first().map_or(0, |(_, c)| c.len());
        let mut seen = HashSet::new();
        for (name, column) in &columns {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
            if column.len() != expected {
                return Err(SchemaError::LengthMismatch {
                    name: name.clone(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(Self {
            labels: (0..expected).collect(),
            columns,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Stable row labels (original dataset positions).
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[(String, Column)] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    fn column(&self, name: &str) -> Result<&Column, SchemaError> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))
    }

    /// Numeric column values by name.
    pub fn numeric(&self, name: &str) -> Result<&[f64], SchemaError> {
        match self.column(name)? {
            Column::Numeric(v) => Ok(v),
            Column::Text(_) => Err(SchemaError::NotNumeric(name.to_string())),
        }
    }

    /// Categorical keys by name. Text columns are returned as-is; numeric
    /// identifier columns are formatted, so turbine ids can be either.
    pub fn categorical(&self, name: &str) -> Result<Vec<String>, SchemaError> {
        match self.column(name)? {
            Column::Text(v) => Ok(v.clone()),
            Column::Numeric(v) => Ok(v.iter().map(ToString::to_string).collect()),
        }
    }

    /// New frame containing the given row positions, labels inherited.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), column.take(rows)))
                .collect(),
        }
    }

    /// New frame with one numeric column appended. Existing columns and row
    /// order are untouched.
    pub fn append_numeric(&self, name: &str, values: Vec<f64>) -> Result<Self, SchemaError> {
        if self.columns.iter().any(|(n, _)| n == name) {
            return Err(SchemaError::DuplicateColumn(name.to_string()));
        }
        if values.len() != self.len() {
            return Err(SchemaError::LengthMismatch {
                name: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }
        let mut columns = self.columns.clone();
        columns.push((name.to_string(), Column::Numeric(values)));
        Ok(Self {
            labels: self.labels.clone(),
            columns,
        })
    }
}
