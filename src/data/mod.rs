/// Data layer: core types, loading, temporal indexing and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table (malformed rows skipped)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ temporal  │  derive timestamp, drop invalid dates → AirQualityDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterCriteria → filtered AirQualityDataset
///   └──────────┘
/// ```

pub mod columns;
pub mod filter;
pub mod loader;
pub mod model;
pub mod temporal;
