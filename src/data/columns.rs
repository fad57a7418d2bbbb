//! Column names used by PRSA-style air-quality tables.

/// The six measured concentration columns.
pub const POLLUTANTS: [&str; 6] = ["PM2.5", "PM10", "SO2", "NO2", "CO", "O3"];

/// Ancillary weather measurements.
pub const PARAMETERS: [&str; 4] = ["TEMP", "DEWP", "PRES", "RAIN"];

/// Pollutants tracked year over year.
pub const PRIMARY_POLLUTANTS: [&str; 2] = ["PM2.5", "PM10"];

pub const DATE: &str = "date";
pub const YEAR: &str = "year";
pub const MONTH: &str = "month";
pub const DAY: &str = "day";

pub fn is_pollutant(column: &str) -> bool {
    POLLUTANTS.contains(&column)
}

pub fn is_parameter(column: &str) -> bool {
    PARAMETERS.contains(&column)
}
