/// Data layer: table model, loading, classification, filtering and analysis.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ classify  │  date / categorical / numeric roles, dates normalised
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date range, then category selection → filtered Table
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  stats    │   │ outliers  │  numeric column of the filtered table
///   └──────────┘   └──────────┘
/// ```
///
/// Non-fatal problems along the way are collected in `advisory::Advisories`.

pub mod advisory;
pub mod classify;
pub mod filter;
pub mod loader;
pub mod model;
pub mod outliers;
pub mod stats;
