//! Filtering and summary pipeline for air-quality time series.
//!
//! ```text
//!  file ─▶ loader ─▶ Table ─▶ temporal ─▶ AirQualityDataset
//!                                              │
//!                         FilterCriteria ─▶ filter
//!                                              │
//!                                              ▼
//!                     describe / monthly_mean / yearly_mean /
//!                     pairwise_correlation / box_summaries
//! ```
//!
//! [`state::Session`] ties the pieces together the way a dashboard uses
//! them: load once, then rebuild a [`state::DashboardView`] after every
//! change of criteria.

pub mod data;
pub mod error;
pub mod state;
pub mod stats;

pub use data::filter::{FilterCriteria, filter};
pub use data::model::{AirQualityDataset, CellValue, Observation, Table};
pub use data::temporal::index_by_time;
pub use error::{PipelineError, Result, Severity};
