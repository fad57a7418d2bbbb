use chrono::NaiveDate;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Everything that can stop the pipeline from producing a view.
///
/// Dropped rows (malformed CSV lines, invalid calendar dates) are *not*
/// errors: they are counted and logged where they happen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("no 'date' column and the columns 'year', 'month', 'day' are not all present")]
    MissingTemporalDimension,

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("minimum year {min} is after maximum year {max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("no records match the current selection")]
    EmptyResult,

    #[error("column '{column}' is not available in this dataset")]
    ColumnUnavailable { column: String },

    #[error("select at least one pollutant to analyse")]
    NoSelectionMade,

    #[error("no dataset loaded")]
    DatasetNotLoaded,
}

/// How far an error reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing can be shown until a different dataset is loaded.
    Session,
    /// The current selection is unusable; a new selection may succeed.
    View,
}

impl PipelineError {
    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::MissingTemporalDimension | PipelineError::DatasetNotLoaded => {
                Severity::Session
            }
            PipelineError::InvalidRange { .. }
            | PipelineError::InvalidYearRange { .. }
            | PipelineError::EmptyResult
            | PipelineError::ColumnUnavailable { .. }
            | PipelineError::NoSelectionMade => Severity::View,
        }
    }

    pub(crate) fn column_unavailable(column: &str) -> Self {
        PipelineError::ColumnUnavailable {
            column: column.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporal_errors_end_the_session() {
        assert_eq!(
            PipelineError::MissingTemporalDimension.severity(),
            Severity::Session
        );
        assert_eq!(PipelineError::EmptyResult.severity(), Severity::View);
        assert_eq!(
            PipelineError::column_unavailable("XYZ").severity(),
            Severity::View
        );
    }

    #[test]
    fn messages_name_the_column() {
        let err = PipelineError::column_unavailable("XYZ");
        assert_eq!(
            err.to_string(),
            "column 'XYZ' is not available in this dataset"
        );
    }
}
