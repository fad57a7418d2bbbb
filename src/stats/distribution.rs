use serde::Serialize;

use super::{quantile, require_columns, sorted};
use crate::data::model::AirQualityDataset;
use crate::error::Result;

/// Whisker reach, in multiples of the interquartile range.
const WHISKER_IQR: f64 = 1.5;

/// Box-plot figures for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub column: String,
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value no further than 1.5 IQR below `q1`.
    pub lower_whisker: f64,
    /// Largest value no further than 1.5 IQR above `q3`.
    pub upper_whisker: f64,
    /// Values beyond the whiskers, ascending.
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    fn of(column: &str, values: Vec<f64>) -> Self {
        let values = sorted(values);
        let q1 = quantile(&values, 0.25);
        let median = quantile(&values, 0.5);
        let q3 = quantile(&values, 0.75);
        let iqr = q3 - q1;
        let lo_fence = q1 - WHISKER_IQR * iqr;
        let hi_fence = q3 + WHISKER_IQR * iqr;

        let inside = || values.iter().copied().filter(|v| (lo_fence..=hi_fence).contains(v));
        let lower_whisker = inside().next().unwrap_or(f64::NAN);
        let upper_whisker = inside().last().unwrap_or(f64::NAN);
        let outliers = values
            .iter()
            .copied()
            .filter(|v| !(lo_fence..=hi_fence).contains(v))
            .collect();

        BoxSummary {
            column: column.to_string(),
            count: values.len(),
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        }
    }
}

/// Box-plot figures for each column.
pub fn box_summaries<S: AsRef<str>>(
    dataset: &AirQualityDataset,
    columns: &[S],
) -> Result<Vec<BoxSummary>> {
    let columns = require_columns(dataset, columns)?;
    Ok(columns
        .iter()
        .map(|c| BoxSummary::of(c, dataset.values(c)))
        .collect())
}

/// Equal-width histogram of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    /// `counts.len() + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Bin the non-missing values of `column` into `bins` equal-width bins.
///
/// The last bin is closed on the right so the maximum is counted. A
/// constant column gets unit-width bins centred on its value; an
/// all-missing column gets no bins.
pub fn histogram(dataset: &AirQualityDataset, column: &str, bins: usize) -> Result<Histogram> {
    let column = require_columns(dataset, &[column])?.remove(0);
    let values = dataset.values(&column);
    let bins = bins.max(1);

    let (Some(min), Some(max)) = (
        values.iter().copied().reduce(f64::min),
        values.iter().copied().reduce(f64::max),
    ) else {
        return Ok(Histogram {
            column,
            edges: Vec::new(),
            counts: Vec::new(),
        });
    };

    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(Histogram {
        column,
        edges,
        counts,
    })
}
