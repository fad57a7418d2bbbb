use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::Serialize;

use super::columns::POLLUTANTS;
use super::model::{AirQualityDataset, Observation};
use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// FilterCriteria: the sidebar selection as an explicit value
// ---------------------------------------------------------------------------

/// One complete selection: date window, year window and chosen columns.
///
/// Rebuilt on every interaction; equal criteria select equal data, which is
/// what lets a [`crate::state::Session`] memoize filter results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FilterCriteria {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub year_min: i32,
    pub year_max: i32,
    /// Selected pollutant columns. Must not be empty.
    pub pollutants: Vec<String>,
    /// Selected environmental parameter columns. May be empty.
    pub parameters: Vec<String>,
}

impl FilterCriteria {
    /// The initial selection for a dataset: its full date and year span,
    /// every pollutant ticked, no parameters.
    pub fn spanning(dataset: &AirQualityDataset) -> Option<Self> {
        let (start_date, end_date) = dataset.date_bounds()?;
        Some(FilterCriteria {
            start_date,
            end_date,
            year_min: start_date.year(),
            year_max: end_date.year(),
            pollutants: POLLUTANTS.iter().map(|p| p.to_string()).collect(),
            parameters: Vec::new(),
        })
    }

    /// Reject selections that can't be filtered at all.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PipelineError::InvalidRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.year_min > self.year_max {
            return Err(PipelineError::InvalidYearRange {
                min: self.year_min,
                max: self.year_max,
            });
        }
        if self.pollutants.is_empty() {
            return Err(PipelineError::NoSelectionMade);
        }
        Ok(())
    }

    /// Whether an observation falls inside both windows (inclusive).
    ///
    /// The date window compares calendar dates, so every hour of `end_date`
    /// is kept.
    pub fn contains(&self, obs: &Observation) -> bool {
        let date = obs.date();
        let in_dates = self.start_date <= date && date <= self.end_date;
        let in_years = (self.year_min..=self.year_max).contains(&obs.year());
        in_dates && in_years
    }

    /// Pollutants followed by parameters, without duplicates.
    pub fn selected_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> =
            Vec::with_capacity(self.pollutants.len() + self.parameters.len());
        for col in self.pollutants.iter().chain(&self.parameters) {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        columns
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return indices of observations inside the criteria's windows.
///
/// Column selection plays no part here: an unknown column only surfaces
/// when an aggregate asks for it.
pub fn filtered_indices(dataset: &AirQualityDataset, criteria: &FilterCriteria) -> Vec<usize> {
    dataset
        .observations
        .iter()
        .enumerate()
        .filter(|(_, obs)| criteria.contains(obs))
        .map(|(i, _)| i)
        .collect()
}

/// Validate `criteria` and keep the matching observations.
///
/// Fails with [`PipelineError::EmptyResult`] when nothing matches; callers
/// must not aggregate an empty set.
pub fn filter(dataset: &AirQualityDataset, criteria: &FilterCriteria) -> Result<AirQualityDataset> {
    criteria.validate()?;

    let indices = filtered_indices(dataset, criteria);
    debug!(
        "Filter kept {} of {} observations ({} .. {}, years {}-{})",
        indices.len(),
        dataset.len(),
        criteria.start_date,
        criteria.end_date,
        criteria.year_min,
        criteria.year_max
    );
    if indices.is_empty() {
        return Err(PipelineError::EmptyResult);
    }
    Ok(dataset.select(&indices))
}
