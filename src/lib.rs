//! Data access and derived views for the Malaysian GDP dataset published by DOSM.
//!
//! [`loader`] fetches and normalizes the snapshot into an immutable [`Table`]; the other
//! modules derive schema information, filtered and paged rows, year aggregations and
//! chart feeds from it. [`dashboard::build_report`] combines them into one presentation feed.

pub mod aggregate;
pub mod cache;
pub mod chart_data;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod error_display;
pub mod export;
pub mod loader;
pub mod query;
pub mod schema;
pub mod source;
pub mod table;

pub use aggregate::{AggregationResult, Statistic, YearComparison, YearRange};
pub use cache::CacheSlot;
pub use chart_data::{ChartKind, SeriesOrder, SeriesPoint};
pub use config::{AppConfig, ConfigManager};
pub use dashboard::{build_report, DashboardReport, Notice, ViewConfig};
pub use error::{ErrorCategory, LoadError, ViewError, ViewResult};
pub use export::ExportMode;
pub use gdpdash_cli::{Args, SnapshotFormat};
pub use loader::{LoadOptions, Loader};
pub use query::{Page, Predicate};
pub use table::Table;

/// Application name used for the config directory
pub const APP_NAME: &str = "gdpdash";
