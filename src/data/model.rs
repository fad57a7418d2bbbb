use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV reader infers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell. NaN, text and nulls are all "missing".
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Integral view of the cell, used for calendar components.
    /// `2013.0` counts as an integer, `2013.5` does not.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.as_f64().is_none()
    }
}

// ---------------------------------------------------------------------------
// Table – rows exactly as loaded, before any temporal indexing
// ---------------------------------------------------------------------------

/// One loaded row: column_name → value.
pub type Row = BTreeMap<String, CellValue>;

/// The raw table produced by a loader.
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Column names in header order.
    pub column_names: Vec<String>,
    pub rows: Vec<Row>,
    /// Rows the loader could not parse and left out.
    pub skipped_rows: usize,
}

impl Table {
    /// Build a table, collecting column names in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut column_names: Vec<String> = Vec::new();
        for row in &rows {
            for col in row.keys() {
                if !column_names.iter().any(|c| c == col) {
                    column_names.push(col.clone());
                }
            }
        }
        Table {
            column_names,
            rows,
            skipped_rows: 0,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Observation – one record keyed by its timestamp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// The temporal key.
    pub timestamp: NaiveDateTime,
    /// Every non-temporal column of the source row.
    pub values: Row,
}

impl Observation {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    /// Numeric value of `column`, `None` when absent or missing.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values.get(column).and_then(CellValue::as_f64)
    }
}

// ---------------------------------------------------------------------------
// AirQualityDataset – the time-indexed dataset
// ---------------------------------------------------------------------------

/// Observations sorted by timestamp (ties keep their load order).
///
/// Filtering produces another `AirQualityDataset`, so filters compose and
/// every aggregate accepts either a full or a filtered dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct AirQualityDataset {
    pub observations: Vec<Observation>,
    /// Non-temporal column names in header order.
    pub column_names: Vec<String>,
}

impl AirQualityDataset {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Earliest and latest calendar dates.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        Some((first.date(), last.date()))
    }

    /// Earliest and latest years.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        self.date_bounds()
            .map(|(first, last)| (first.year(), last.year()))
    }

    /// Non-missing values of `column`, in time order.
    pub fn values(&self, column: &str) -> Vec<f64> {
        self.observations
            .iter()
            .filter_map(|obs| obs.value(column))
            .collect()
    }

    /// Keep only the observations at `indices` (which must be ascending).
    pub fn select(&self, indices: &[usize]) -> AirQualityDataset {
        AirQualityDataset {
            observations: indices
                .iter()
                .filter_map(|&i| self.observations.get(i).cloned())
                .collect(),
            column_names: self.column_names.clone(),
        }
    }
}
