use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::require_columns;
use crate::data::model::{AirQualityDataset, Observation};
use crate::error::Result;

/// Calendar grouping for period means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Periods end on the last day of each month.
    MonthEnd,
    /// Periods end on 31 December.
    YearEnd,
}

impl Frequency {
    /// Last day of the period containing `date`.
    pub fn period_end(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::MonthEnd => {
                let first_of_next = if date.month() == 12 {
                    NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
                };
                first_of_next?.pred_opt()
            }
            Frequency::YearEnd => NaiveDate::from_ymd_opt(date.year(), 12, 31),
        }
    }

    /// End of the period right after the one ending on `period_end`.
    fn next_period_end(self, period_end: NaiveDate) -> Option<NaiveDate> {
        self.period_end(period_end.succ_opt()?)
    }
}

/// Mean of each column over one period, aligned with [`Resampled::columns`].
///
/// `None` marks a column with no values in that period; periods inside the
/// range with no observations at all are still emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMean {
    pub period: NaiveDate,
    pub means: Vec<Option<f64>>,
}

/// Grouped means over a dataset, computed lazily on iteration.
///
/// Iterating twice walks the observations twice; nothing is cached.
#[derive(Debug, Clone)]
pub struct Resampled<'a> {
    dataset: &'a AirQualityDataset,
    columns: Vec<String>,
    frequency: Frequency,
}

impl<'a> Resampled<'a> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn iter(&self) -> PeriodMeans<'_> {
        let observations = self.dataset.observations.as_slice();
        let bounds = observations.first().zip(observations.last());
        let (next_period, last_period) = match bounds {
            Some((first, last)) => (
                self.frequency.period_end(first.date()),
                self.frequency.period_end(last.date()),
            ),
            None => (None, None),
        };
        PeriodMeans {
            observations,
            columns: &self.columns,
            frequency: self.frequency,
            cursor: 0,
            next_period,
            last_period,
        }
    }
}

impl<'r> IntoIterator for &'r Resampled<'_> {
    type Item = PeriodMean;
    type IntoIter = PeriodMeans<'r>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over [`PeriodMean`]s in chronological order.
#[derive(Debug, Clone)]
pub struct PeriodMeans<'a> {
    observations: &'a [Observation],
    columns: &'a [String],
    frequency: Frequency,
    cursor: usize,
    next_period: Option<NaiveDate>,
    last_period: Option<NaiveDate>,
}

impl Iterator for PeriodMeans<'_> {
    type Item = PeriodMean;

    fn next(&mut self) -> Option<PeriodMean> {
        let period = self.next_period?;
        if Some(period) > self.last_period {
            self.next_period = None;
            return None;
        }

        let mut sums = vec![0.0; self.columns.len()];
        let mut counts = vec![0usize; self.columns.len()];

        while let Some(obs) = self.observations.get(self.cursor) {
            if obs.date() > period {
                break;
            }
            for (i, col) in self.columns.iter().enumerate() {
                if let Some(v) = obs.value(col) {
                    sums[i] += v;
                    counts[i] += 1;
                }
            }
            self.cursor += 1;
        }

        self.next_period = self.frequency.next_period_end(period);

        Some(PeriodMean {
            period,
            means: sums
                .into_iter()
                .zip(counts)
                .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                .collect(),
        })
    }
}

fn resample<'a, S: AsRef<str>>(
    dataset: &'a AirQualityDataset,
    columns: &[S],
    frequency: Frequency,
) -> Result<Resampled<'a>> {
    let columns = require_columns(dataset, columns)?;
    Ok(Resampled {
        dataset,
        columns,
        frequency,
    })
}

/// Mean per column for every calendar month in the dataset's range.
pub fn monthly_mean<'a, S: AsRef<str>>(
    dataset: &'a AirQualityDataset,
    columns: &[S],
) -> Result<Resampled<'a>> {
    resample(dataset, columns, Frequency::MonthEnd)
}

/// Mean per column for every calendar year in the dataset's range.
pub fn yearly_mean<'a, S: AsRef<str>>(
    dataset: &'a AirQualityDataset,
    columns: &[S],
) -> Result<Resampled<'a>> {
    resample(dataset, columns, Frequency::YearEnd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Row};
    use crate::error::PipelineError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dataset(points: &[(NaiveDate, Option<f64>, Option<f64>)]) -> AirQualityDataset {
        let cell = |v: Option<f64>| v.map(CellValue::Float).unwrap_or(CellValue::Null);
        AirQualityDataset {
            observations: points
                .iter()
                .map(|&(d, pm25, pm10)| {
                    let mut values = Row::new();
                    values.insert("PM2.5".into(), cell(pm25));
                    values.insert("PM10".into(), cell(pm10));
                    Observation {
                        timestamp: d.and_hms_opt(12, 0, 0).unwrap(),
                        values,
                    }
                })
                .collect(),
            column_names: vec!["PM2.5".into(), "PM10".into()],
        }
    }

    #[test]
    fn month_end_handles_leap_years_and_december() {
        let f = Frequency::MonthEnd;
        assert_eq!(f.period_end(date(2016, 2, 10)), Some(date(2016, 2, 29)));
        assert_eq!(f.period_end(date(2015, 2, 10)), Some(date(2015, 2, 28)));
        assert_eq!(f.period_end(date(2013, 12, 1)), Some(date(2013, 12, 31)));
        assert_eq!(
            Frequency::YearEnd.period_end(date(2013, 3, 1)),
            Some(date(2013, 12, 31))
        );
    }

    #[test]
    fn monthly_means_cover_gaps_in_order() {
        let ds = dataset(&[
            (date(2013, 3, 1), Some(10.0), Some(1.0)),
            (date(2013, 3, 31), Some(20.0), None),
            (date(2013, 5, 2), Some(40.0), Some(3.0)),
        ]);
        let monthly = monthly_mean(&ds, &["PM2.5", "PM10"]).unwrap();
        let periods: Vec<PeriodMean> = monthly.iter().collect();
        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].period, date(2013, 3, 31));
        assert_eq!(periods[0].means, vec![Some(15.0), Some(1.0)]);
        assert_eq!(periods[1].period, date(2013, 4, 30));
        assert_eq!(periods[1].means, vec![None, None]);
        assert_eq!(periods[2].means, vec![Some(40.0), Some(3.0)]);
    }

    #[test]
    fn sequence_is_restartable() {
        let ds = dataset(&[
            (date(2013, 3, 1), Some(1.0), None),
            (date(2014, 7, 1), Some(3.0), None),
        ]);
        let yearly = yearly_mean(&ds, &["PM2.5"]).unwrap();
        let first: Vec<PeriodMean> = yearly.iter().collect();
        let second: Vec<PeriodMean> = (&yearly).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].period, date(2014, 12, 31));
        assert_eq!(yearly.frequency(), Frequency::YearEnd);
    }

    #[test]
    fn iterator_is_finite_after_last_period() {
        let ds = dataset(&[(date(2013, 3, 1), Some(1.0), None)]);
        let monthly = monthly_mean(&ds, &["PM2.5"]).unwrap();
        let mut it = monthly.iter();
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn unknown_column_is_unavailable() {
        let ds = dataset(&[(date(2013, 3, 1), Some(1.0), None)]);
        assert!(matches!(
            yearly_mean(&ds, &["SO2"]),
            Err(PipelineError::ColumnUnavailable { .. })
        ));
    }
}
