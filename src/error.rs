//! Typed errors for snapshot loading and derived views.

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;

/// Category of a failed load, reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Network,
    Parse,
    Schema,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Parse => write!(f, "parse"),
            ErrorCategory::Schema => write!(f, "schema"),
        }
    }
}

/// A load attempt failed. Terminal for that attempt; the cache slot is left untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Fetch failed, timed out, or the server answered with an error status.
    #[error("network error: {0}")]
    Network(String),
    /// The snapshot bytes could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
    /// Expected date or metric columns are absent or unusable.
    #[error("schema error: {0}")]
    Schema(String),
}

impl LoadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoadError::Network(_) => ErrorCategory::Network,
            LoadError::Parse(_) => ErrorCategory::Parse,
            LoadError::Schema(_) => ErrorCategory::Schema,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LoadError::Network(m) | LoadError::Parse(m) | LoadError::Schema(m) => m,
        }
    }
}

/// A derived view (filter, aggregation, comparison, chart feed) could not be produced.
/// Non-fatal: the view is skipped with a notice while the rest of the report is built.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no qualifying rows for {0}")]
    EmptyResult(String),
    #[error("need at least {required} years with data, found {found}")]
    InsufficientYears { required: usize, found: usize },
    #[error("need at least 2 complete value pairs, found {found}")]
    InsufficientPairs { found: usize },
    #[error("correlation of '{x}' and '{y}' is undefined: one of them is constant")]
    UndefinedCorrelation { x: String, y: String },
    #[error("'{0}' cannot be plotted against itself")]
    SameMetric(String),
    #[error("column '{0}' has no sub-annual dates (one period per year)")]
    NoSubAnnualData(String),
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("column '{0}' is not a date column")]
    NotTemporal(String),
    #[error("invalid filter: {0}")]
    InvalidPredicate(String),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type ViewResult<T> = std::result::Result<T, ViewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_category_and_message() {
        let err = LoadError::Network("timed out".into());
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.message(), "timed out");
        assert_eq!(err.to_string(), "network error: timed out");
        assert_eq!(LoadError::Schema("x".into()).category().to_string(), "schema");
    }

    #[test]
    fn view_error_display() {
        let err = ViewError::InsufficientYears {
            required: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "need at least 2 years with data, found 1");
    }
}
