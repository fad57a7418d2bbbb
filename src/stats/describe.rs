use serde::Serialize;

use super::{quantile, require_columns, sorted};
use crate::data::model::AirQualityDataset;
use crate::error::Result;

/// Summary statistics of one column.
///
/// Statistics that are undefined for the available values (everything for
/// an all-missing column, `std` for a single value) are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    /// Number of non-missing values.
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator).
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn of(column: &str, values: Vec<f64>) -> Self {
        let values = sorted(values);
        let count = values.len();
        let n = count as f64;

        let mean = if count == 0 {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / n
        };
        let std = if count < 2 {
            f64::NAN
        } else {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };

        ColumnSummary {
            column: column.to_string(),
            count,
            mean,
            std,
            min: values.first().copied().unwrap_or(f64::NAN),
            p25: quantile(&values, 0.25),
            p50: quantile(&values, 0.5),
            p75: quantile(&values, 0.75),
            max: values.last().copied().unwrap_or(f64::NAN),
        }
    }
}

/// Per-column summaries in the order they were requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    pub columns: Vec<ColumnSummary>,
}

impl Description {
    pub fn get(&self, column: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|s| s.column == column)
    }
}

/// Count, mean, std, min, quartiles and max for each column.
pub fn describe<S: AsRef<str>>(dataset: &AirQualityDataset, columns: &[S]) -> Result<Description> {
    let columns = require_columns(dataset, columns)?;
    Ok(Description {
        columns: columns
            .iter()
            .map(|c| ColumnSummary::of(c, dataset.values(c)))
            .collect(),
    })
}
