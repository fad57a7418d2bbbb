//! Aggregates over a (filtered) [`AirQualityDataset`].
//!
//! Every aggregate is a pure function of the dataset and a column selection.
//! Missing cells are left out of each column's computation, never read as
//! zero. Asking for a column the dataset lacks fails that aggregate alone
//! with [`PipelineError::ColumnUnavailable`].

pub mod correlation;
pub mod describe;
pub mod distribution;
pub mod resample;

use crate::data::model::AirQualityDataset;
use crate::error::{PipelineError, Result};

pub use correlation::{Correlation, CorrelationMatrix, pairwise_correlation};
pub use describe::{ColumnSummary, Description, describe};
pub use distribution::{BoxSummary, Histogram, box_summaries, histogram};
pub use resample::{Frequency, PeriodMean, Resampled, monthly_mean, yearly_mean};

/// Common guard for aggregates: a non-empty dataset holding every column.
pub(crate) fn require_columns<S: AsRef<str>>(
    dataset: &AirQualityDataset,
    columns: &[S],
) -> Result<Vec<String>> {
    if dataset.is_empty() {
        return Err(PipelineError::EmptyResult);
    }
    columns
        .iter()
        .map(|c| {
            let c = c.as_ref();
            if dataset.has_column(c) {
                Ok(c.to_string())
            } else {
                Err(PipelineError::column_unavailable(c))
            }
        })
        .collect()
}

/// Linear-interpolated quantile of an ascending slice (`q` in `[0, 1]`).
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

pub(crate) fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}
