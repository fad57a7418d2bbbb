use serde::Serialize;

use super::require_columns;
use crate::data::model::AirQualityDataset;
use crate::error::{PipelineError, Result};

/// Symmetric Pearson correlation matrix, rows and columns in `columns` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// A single coefficient for two columns, a matrix otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Correlation {
    Coefficient(f64),
    Matrix(CorrelationMatrix),
}

impl Correlation {
    pub fn as_coefficient(&self) -> Option<f64> {
        match self {
            Correlation::Coefficient(r) => Some(*r),
            Correlation::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&CorrelationMatrix> {
        match self {
            Correlation::Matrix(m) => Some(m),
            Correlation::Coefficient(_) => None,
        }
    }
}

/// Pearson correlation of every pair of columns.
///
/// Each pair uses only the observations where both values are present.
/// Pairs with fewer than two such observations, or with a constant side,
/// are NaN.
pub fn pairwise_correlation<S: AsRef<str>>(
    dataset: &AirQualityDataset,
    columns: &[S],
) -> Result<Correlation> {
    if columns.is_empty() {
        return Err(PipelineError::NoSelectionMade);
    }
    let columns = require_columns(dataset, columns)?;

    // Column-major copy of the selection; None marks a missing cell.
    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| dataset.observations.iter().map(|obs| obs.value(c)).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                self_correlation(&series[i])
            } else {
                pearson(&series[i], &series[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    if n == 2 {
        return Ok(Correlation::Coefficient(values[0][1]));
    }
    Ok(Correlation::Matrix(CorrelationMatrix { columns, values }))
}

/// Pearson correlation over the positions where both series have values.
fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| a.zip(*b))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in &pairs {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    (cov / denominator).clamp(-1.0, 1.0)
}

/// 1.0 when the column varies, NaN otherwise.
fn self_correlation(x: &[Option<f64>]) -> f64 {
    let mut present = x.iter().flatten();
    let Some(first) = present.next() else {
        return f64::NAN;
    };
    if present.any(|v| v != first) {
        1.0
    } else {
        f64::NAN
    }
}
