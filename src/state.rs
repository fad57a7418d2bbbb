use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;

use crate::data::columns::{self, PARAMETERS, POLLUTANTS, PRIMARY_POLLUTANTS};
use crate::data::filter::{FilterCriteria, filter};
use crate::data::model::{AirQualityDataset, Table};
use crate::data::temporal::{IndexReport, index_by_time};
use crate::error::{PipelineError, Result};
use crate::stats::{
    BoxSummary, Correlation, Description, Frequency, Histogram, PeriodMean, Resampled,
    box_summaries, describe, histogram, monthly_mean, pairwise_correlation, yearly_mean,
};

/// Bins per pollutant histogram.
pub const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything one dashboard session holds, independent of rendering.
///
/// The dataset is loaded once; the criteria change with every interaction
/// and each change is followed by a fresh [`Session::view`].
#[derive(Debug, Default)]
pub struct Session {
    /// Time-indexed dataset (None until a table is loaded).
    pub dataset: Option<AirQualityDataset>,

    /// How the dataset was indexed.
    pub index_report: Option<IndexReport>,

    /// Current selection.
    pub criteria: Option<FilterCriteria>,

    /// Last filter result and the criteria that produced it.
    filtered: Option<(FilterCriteria, AirQualityDataset)>,

    /// Status / error message for the presentation layer.
    pub status_message: Option<String>,
}

impl Session {
    /// Ingest a newly loaded table: index it by time and reset the criteria.
    pub fn set_table(&mut self, table: Table) -> Result<()> {
        let (dataset, report) = match index_by_time(table) {
            Ok(indexed) => indexed,
            Err(e) => {
                self.dataset = None;
                self.index_report = None;
                self.criteria = None;
                self.filtered = None;
                self.status_message = Some(e.to_string());
                return Err(e);
            }
        };
        info!(
            "Session dataset: {} observations, {} dropped for invalid dates",
            dataset.len(),
            report.dropped_invalid_dates
        );

        self.criteria = FilterCriteria::spanning(&dataset);
        self.filtered = None;
        self.dataset = Some(dataset);
        self.index_report = Some(report);
        self.status_message = None;
        Ok(())
    }

    fn criteria_mut(&mut self) -> Result<&mut FilterCriteria> {
        self.criteria.as_mut().ok_or(PipelineError::DatasetNotLoaded)
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = Some(criteria);
    }

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let criteria = self.criteria_mut()?;
        criteria.start_date = start;
        criteria.end_date = end;
        Ok(())
    }

    pub fn set_year_range(&mut self, min: i32, max: i32) -> Result<()> {
        let criteria = self.criteria_mut()?;
        criteria.year_min = min;
        criteria.year_max = max;
        Ok(())
    }

    /// Tick or untick a column. Known parameter columns go to the parameter
    /// selection, everything else is treated as a pollutant.
    pub fn toggle_column(&mut self, column: &str) -> Result<()> {
        let criteria = self.criteria_mut()?;
        let selected = if columns::is_parameter(column) {
            &mut criteria.parameters
        } else {
            &mut criteria.pollutants
        };
        if let Some(pos) = selected.iter().position(|c| c == column) {
            selected.remove(pos);
        } else {
            selected.push(column.to_string());
        }
        Ok(())
    }

    /// Select every pollutant.
    pub fn select_all_pollutants(&mut self) -> Result<()> {
        self.criteria_mut()?.pollutants = POLLUTANTS.iter().map(|p| p.to_string()).collect();
        Ok(())
    }

    /// Deselect every pollutant.
    pub fn select_no_pollutants(&mut self) -> Result<()> {
        self.criteria_mut()?.pollutants.clear();
        Ok(())
    }

    /// Select every environmental parameter the dataset actually has.
    pub fn select_all_parameters(&mut self) -> Result<()> {
        let available: Vec<String> = match &self.dataset {
            Some(ds) => PARAMETERS
                .iter()
                .filter(|p| ds.has_column(p))
                .map(|p| p.to_string())
                .collect(),
            None => return Err(PipelineError::DatasetNotLoaded),
        };
        self.criteria_mut()?.parameters = available;
        Ok(())
    }

    /// The dataset filtered by the current criteria, reusing the last
    /// result when the criteria haven't changed.
    pub fn filtered(&mut self) -> Result<&AirQualityDataset> {
        let dataset = self.dataset.as_ref().ok_or(PipelineError::DatasetNotLoaded)?;
        let criteria = self.criteria.as_ref().ok_or(PipelineError::DatasetNotLoaded)?;

        let cached = matches!(&self.filtered, Some((c, _)) if c == criteria);
        if cached {
            debug!("Reusing filter result");
        } else {
            match filter(dataset, criteria) {
                Ok(result) => self.filtered = Some((criteria.clone(), result)),
                Err(e) => {
                    self.filtered = None;
                    self.status_message = Some(e.to_string());
                    return Err(e);
                }
            }
        }

        self.status_message = None;
        self.filtered
            .as_ref()
            .map(|(_, ds)| ds)
            .ok_or(PipelineError::EmptyResult)
    }

    /// Recompute every panel for the current criteria.
    ///
    /// Fails only when the selection itself is unusable; a panel that needs
    /// a missing column is reported as [`Panel::Unavailable`] instead.
    pub fn view(&mut self) -> Result<DashboardView> {
        let criteria = self
            .criteria
            .clone()
            .ok_or(PipelineError::DatasetNotLoaded)?;
        let dropped_invalid_dates = self
            .index_report
            .as_ref()
            .map_or(0, |r| r.dropped_invalid_dates);
        let filtered = self.filtered()?;
        Ok(DashboardView::build(filtered, criteria, dropped_invalid_dates))
    }
}

// ---------------------------------------------------------------------------
// Dashboard view: plain data for the presentation layer
// ---------------------------------------------------------------------------

/// One aggregate, or the reason it can't be shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready { data: T },
    Unavailable { reason: String },
}

impl<T> Panel<T> {
    fn from_result(name: &str, result: Result<T>) -> Self {
        match result {
            Ok(data) => Panel::Ready { data },
            Err(e) => {
                warn!("{name} unavailable: {e}");
                Panel::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            Panel::Unavailable { .. } => None,
        }
    }
}

/// A fully evaluated [`Resampled`] sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub frequency: Frequency,
    pub columns: Vec<String>,
    pub points: Vec<PeriodMean>,
}

impl From<Resampled<'_>> for TrendSeries {
    fn from(resampled: Resampled<'_>) -> Self {
        TrendSeries {
            frequency: resampled.frequency(),
            columns: resampled.columns().to_vec(),
            points: resampled.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub criteria: FilterCriteria,
    pub row_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub dropped_invalid_dates: usize,
    pub statistics: Panel<Description>,
    pub monthly_trend: Panel<TrendSeries>,
    pub yearly_trend: Panel<TrendSeries>,
    pub distribution: Panel<Vec<BoxSummary>>,
    pub histograms: Panel<Vec<Histogram>>,
    pub correlation: Panel<Correlation>,
}

impl DashboardView {
    /// Compute every panel from an already filtered dataset.
    pub fn build(
        filtered: &AirQualityDataset,
        criteria: FilterCriteria,
        dropped_invalid_dates: usize,
    ) -> Self {
        let selected = criteria.selected_columns();
        let pollutants = &criteria.pollutants;
        let bounds = filtered.date_bounds();

        DashboardView {
            row_count: filtered.len(),
            first_date: bounds.map(|b| b.0),
            last_date: bounds.map(|b| b.1),
            dropped_invalid_dates,
            statistics: Panel::from_result("statistics", describe(filtered, &selected)),
            monthly_trend: Panel::from_result(
                "monthly trend",
                monthly_mean(filtered, pollutants).map(TrendSeries::from),
            ),
            yearly_trend: Panel::from_result(
                "yearly trend",
                yearly_mean(filtered, &PRIMARY_POLLUTANTS).map(TrendSeries::from),
            ),
            distribution: Panel::from_result("distribution", box_summaries(filtered, pollutants)),
            histograms: Panel::from_result(
                "histograms",
                pollutants
                    .iter()
                    .map(|p| histogram(filtered, p, HISTOGRAM_BINS))
                    .collect(),
            ),
            correlation: Panel::from_result(
                "correlation",
                pairwise_correlation(filtered, &selected),
            ),
            criteria,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::read_csv;

    const CSV: &str = "\
year,month,day,hour,PM2.5,PM10,SO2,NO2,CO,O3,TEMP,PRES
2013,3,1,0,10,20,1,5,300,40,-1.0,1020
2013,3,2,0,20,30,2,6,400,30,0.5,1018
2013,4,1,0,30,50,NA,7,500,20,5.0,1015
2014,1,1,0,40,60,4,8,600,10,-3.0,1030
2014,2,30,0,99,99,9,9,999,99,9.9,999
";

    fn session() -> Session {
        let mut session = Session::default();
        session.set_table(read_csv(CSV.as_bytes()).unwrap()).unwrap();
        session
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn loading_resets_criteria_to_full_span() {
        let session = session();
        let criteria = session.criteria.as_ref().unwrap();
        assert_eq!(criteria.start_date, date(2013, 3, 1));
        assert_eq!(criteria.end_date, date(2014, 1, 1));
        assert_eq!(session.index_report.as_ref().unwrap().dropped_invalid_dates, 1);
    }

    #[test]
    fn view_fills_every_panel() {
        let mut session = session();
        let view = session.view().unwrap();
        assert_eq!(view.row_count, 4);
        assert_eq!(view.dropped_invalid_dates, 1);

        let stats = view.statistics.ready().unwrap();
        assert_eq!(stats.get("SO2").unwrap().count, 3);

        let monthly = view.monthly_trend.ready().unwrap();
        assert_eq!(monthly.points.len(), 11);
        assert_eq!(monthly.points[0].period, date(2013, 3, 31));

        let yearly = view.yearly_trend.ready().unwrap();
        assert_eq!(yearly.columns, vec!["PM2.5", "PM10"]);
        assert_eq!(yearly.points[0].means[0], Some(20.0));
        assert_eq!(yearly.points[1].means[1], Some(60.0));

        assert!(view.correlation.ready().unwrap().as_matrix().is_some());
    }

    #[test]
    fn missing_column_only_fails_its_panels() {
        let mut session = session();
        session.toggle_column("XYZ").unwrap();
        let view = session.view().unwrap();
        assert!(matches!(view.statistics, Panel::Unavailable { .. }));
        assert!(matches!(view.correlation, Panel::Unavailable { .. }));
        assert!(view.yearly_trend.ready().is_some());
    }

    #[test]
    fn two_selected_columns_correlate_to_a_coefficient() {
        let mut session = session();
        session.select_no_pollutants().unwrap();
        session.toggle_column("PM2.5").unwrap();
        session.toggle_column("TEMP").unwrap();
        assert_eq!(session.criteria.as_ref().unwrap().parameters, vec!["TEMP"]);
        let view = session.view().unwrap();
        assert!(view.correlation.ready().unwrap().as_coefficient().is_some());
    }

    #[test]
    fn no_pollutants_is_an_error() {
        let mut session = session();
        session.select_no_pollutants().unwrap();
        assert_eq!(session.view().unwrap_err(), PipelineError::NoSelectionMade);
        assert!(session.status_message.is_some());

        session.select_all_pollutants().unwrap();
        assert!(session.view().is_ok());
        assert!(session.status_message.is_none());
    }

    #[test]
    fn narrowing_dates_refilters() {
        let mut session = session();
        assert_eq!(session.filtered().unwrap().len(), 4);
        session.set_date_range(date(2013, 3, 2), date(2013, 4, 1)).unwrap();
        assert_eq!(session.filtered().unwrap().len(), 2);
        session.set_year_range(2014, 2014).unwrap();
        assert_eq!(session.filtered().unwrap_err(), PipelineError::EmptyResult);
    }

    #[test]
    fn unchanged_criteria_reuse_the_filter_result() {
        let mut session = session();
        let first: *const AirQualityDataset = session.filtered().unwrap();
        let second: *const AirQualityDataset = session.filtered().unwrap();
        assert!(std::ptr::eq(first, second));

        session.set_year_range(2013, 2013).unwrap();
        assert_eq!(session.filtered().unwrap().len(), 3);
        let (cached_criteria, _) = session.filtered.as_ref().unwrap();
        assert_eq!(cached_criteria.year_max, 2013);
    }

    #[test]
    fn histograms_cover_each_pollutant() {
        let mut session = session();
        let view = session.view().unwrap();
        let histograms = view.histograms.ready().unwrap();
        assert_eq!(histograms.len(), 6);
        assert_eq!(histograms[0].column, "PM2.5");
        assert_eq!(histograms[0].counts.iter().sum::<usize>(), 4);
        assert_eq!(histograms[0].counts.len(), HISTOGRAM_BINS);
    }

    #[test]
    fn select_all_parameters_uses_present_columns() {
        let mut session = session();
        session.select_all_parameters().unwrap();
        assert_eq!(
            session.criteria.as_ref().unwrap().parameters,
            vec!["TEMP", "PRES"]
        );
    }

    #[test]
    fn empty_session_reports_not_loaded() {
        let mut session = Session::default();
        assert_eq!(session.view().unwrap_err(), PipelineError::DatasetNotLoaded);
        assert_eq!(
            session.toggle_column("PM10").unwrap_err(),
            PipelineError::DatasetNotLoaded
        );
    }

    #[test]
    fn table_without_dates_is_fatal() {
        let mut session = Session::default();
        let table = read_csv("station,PM10\nDingling,3\n".as_bytes()).unwrap();
        assert_eq!(
            session.set_table(table).unwrap_err(),
            PipelineError::MissingTemporalDimension
        );
        assert!(session.dataset.is_none());
    }

    #[test]
    fn failed_load_clears_the_previous_dataset() {
        let mut session = session();
        assert!(session.index_report.is_some());
        let table = read_csv("station,PM10\nDingling,3\n".as_bytes()).unwrap();
        assert!(session.set_table(table).is_err());
        assert!(session.index_report.is_none());
        assert!(session.criteria.is_none());
        assert_eq!(session.view().unwrap_err(), PipelineError::DatasetNotLoaded);
    }
}
