//! Immutable in-memory table produced by the loader.

use crate::error::{ViewError, ViewResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;

/// Derived integer year column.
pub const YEAR_COLUMN: &str = "year";
/// Derived string form of the year column.
pub const YEAR_STR_COLUMN: &str = "year_str";

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
pub(crate) const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

pub(crate) fn units_per_second(unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    }
}

/// Converts a physical datetime value to a naive UTC datetime. Sub-second parts are kept.
pub(crate) fn timestamp_to_datetime(v: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let k = units_per_second(unit);
    let secs = v.div_euclid(k);
    let nanos = (v.rem_euclid(k) * (1_000_000_000 / k)) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

/// Loaded snapshot. Rows share one fixed column set; the frame is never mutated after load.
/// Filtered views are new `Table`s built with [`Table::with_frame`].
#[derive(Clone, Debug)]
pub struct Table {
    frame: DataFrame,
    date_column: Option<String>,
}

impl Table {
    pub fn new(frame: DataFrame, date_column: Option<String>) -> Self {
        Self { frame, date_column }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn date_column(&self) -> Option<&str> {
        self.date_column.as_deref()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_columns().iter().any(|c| c.name().as_str() == name)
    }

    /// A view over a subset (or reordering) of this table's rows with the same column metadata.
    pub fn with_frame(&self, frame: DataFrame) -> Self {
        Self {
            frame,
            date_column: self.date_column.clone(),
        }
    }

    pub(crate) fn series(&self, name: &str) -> ViewResult<&Series> {
        if !self.has_column(name) {
            return Err(ViewError::ColumnNotFound(name.to_string()));
        }
        Ok(self.frame.column(name)?.as_materialized_series())
    }

    /// Values of a numeric column as f64. Nulls and NaN are reported as missing (`None`).
    pub fn numeric_values(&self, name: &str) -> ViewResult<Vec<Option<f64>>> {
        let series = self.series(name)?;
        if !series.dtype().is_numeric() {
            return Err(ViewError::NotNumeric(name.to_string()));
        }
        let as_f64 = series.cast(&DataType::Float64)?;
        Ok(as_f64
            .f64()?
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Year key of every row, `None` where the row has no parseable date.
    pub fn year_values(&self) -> ViewResult<Vec<Option<i32>>> {
        let series = self.series(YEAR_COLUMN)?;
        let years = series.cast(&DataType::Int32)?;
        Ok(years.i32()?.iter().collect())
    }

    /// Values of a Date or Datetime column as naive datetimes (UTC for zoned columns).
    pub fn date_values(&self, name: &str) -> ViewResult<Vec<Option<NaiveDateTime>>> {
        let series = self.series(name)?;
        match series.dtype() {
            DataType::Datetime(unit, _) => {
                let unit = *unit;
                let raw = series.cast(&DataType::Int64)?;
                Ok(raw
                    .i64()?
                    .iter()
                    .map(|v| v.and_then(|v| timestamp_to_datetime(v, unit)))
                    .collect())
            }
            DataType::Date => {
                let days = series.cast(&DataType::Int32)?;
                Ok(days
                    .i32()?
                    .iter()
                    .map(|d| {
                        d.and_then(|d| {
                            NaiveDate::from_num_days_from_ce_opt(
                                UNIX_EPOCH_CE_DAYS.saturating_add(d),
                            )
                        })
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                    })
                    .collect())
            }
            _ => Err(ViewError::NotTemporal(name.to_string())),
        }
    }

    /// String form of every value in a column; nulls stay `None`.
    pub fn string_values(&self, name: &str) -> ViewResult<Vec<Option<String>>> {
        let series = self.series(name)?;
        let as_str = series.cast(&DataType::String)?;
        Ok(as_str
            .str()?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect())
    }
}
