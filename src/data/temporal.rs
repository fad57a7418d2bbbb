use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, warn};

use super::columns::{DATE, DAY, MONTH, YEAR};
use super::model::{AirQualityDataset, CellValue, Observation, Row, Table};
use crate::error::{PipelineError, Result};

/// Formats accepted for an existing `date` column, tried in order.
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Where the temporal key of each row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalSource {
    /// An existing `date` column.
    DateColumn,
    /// Composed from `year`, `month`, `day`.
    Components,
}

/// Outcome of indexing a table by time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub source: TemporalSource,
    /// Rows dropped because no valid date could be built from them.
    pub dropped_invalid_dates: usize,
}

/// Decide where timestamps come from, or fail if they can't be derived.
pub fn temporal_source(table: &Table) -> Result<TemporalSource> {
    if table.has_column(DATE) {
        Ok(TemporalSource::DateColumn)
    } else if [YEAR, MONTH, DAY].iter().all(|c| table.has_column(c)) {
        Ok(TemporalSource::Components)
    } else {
        Err(PipelineError::MissingTemporalDimension)
    }
}

/// Re-key a loaded table by its timestamp.
///
/// Rows without a valid date are dropped and counted. The result is sorted
/// chronologically; rows sharing a timestamp keep their load order.
pub fn index_by_time(table: Table) -> Result<(AirQualityDataset, IndexReport)> {
    let source = temporal_source(&table)?;

    let column_names: Vec<String> = table
        .column_names
        .into_iter()
        .filter(|c| c != DATE)
        .collect();

    let total = table.rows.len();
    let mut observations: Vec<Observation> = table
        .rows
        .into_iter()
        .filter_map(|mut values| {
            let timestamp = match source {
                TemporalSource::DateColumn => {
                    values.remove(DATE).as_ref().and_then(parse_timestamp)
                }
                TemporalSource::Components => compose_date(&values),
            };
            timestamp.map(|timestamp| Observation { timestamp, values })
        })
        .collect();

    let dropped_invalid_dates = total - observations.len();
    if dropped_invalid_dates > 0 {
        warn!("Dropped {dropped_invalid_dates} of {total} rows with invalid dates");
    }

    // Stable sort: equal timestamps stay in load order.
    observations.sort_by_key(|obs| obs.timestamp);

    if observations.is_empty() {
        return Err(PipelineError::EmptyResult);
    }
    debug!(
        "Indexed {} observations from {:?}",
        observations.len(),
        source
    );

    Ok((
        AirQualityDataset {
            observations,
            column_names,
        },
        IndexReport {
            source,
            dropped_invalid_dates,
        },
    ))
}

fn compose_date(values: &Row) -> Option<NaiveDateTime> {
    let component = |name: &str| values.get(name).and_then(CellValue::as_i64);
    let year = i32::try_from(component(YEAR)?).ok()?;
    let month = u32::try_from(component(MONTH)?).ok()?;
    let day = u32::try_from(component(DAY)?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    let CellValue::String(text) = cell else {
        return None;
    };
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
