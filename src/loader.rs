//! Dataset loader: fetch the snapshot, decode it, normalize the date column and derive year keys.

use crate::cache::CacheSlot;
use crate::error::LoadError;
use crate::error_display::{user_message_from_io, user_message_from_polars};
use crate::schema::metric_columns;
use crate::source::{self, InputSource};
use crate::table::{
    timestamp_to_datetime, units_per_second, Table, UNIX_EPOCH_CE_DAYS, YEAR_COLUMN,
    YEAR_STR_COLUMN,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use gdpdash_cli::SnapshotFormat;
use polars::prelude::*;
use std::io::Cursor;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_DATE_COLUMN: &str = "date";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for a single load. Built with the `with_*` methods; `Default` applies no row restriction.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    pub format: Option<SnapshotFormat>,
    pub date_column: String,
    pub min_year: Option<i32>,
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            min_year: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: SnapshotFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into();
        self
    }

    pub fn with_min_year(mut self, year: i32) -> Self {
        self.min_year = Some(year);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Loads snapshots and memoizes the last successful one.
///
/// The cache holds the normalized, unrestricted table for a source identifier; the
/// `min_year` restriction is applied on top of it for each call.
#[derive(Default)]
pub struct Loader {
    cache: CacheSlot,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide loader shared by every session.
    pub fn shared() -> &'static Loader {
        static SHARED: OnceLock<Loader> = OnceLock::new();
        SHARED.get_or_init(Loader::new)
    }

    pub fn cache(&self) -> &CacheSlot {
        &self.cache
    }

    /// Returns the cached table for `source` when present, otherwise fetches it.
    pub fn load(&self, source: &str, options: &LoadOptions) -> Result<Arc<Table>, LoadError> {
        match self.cache.get(source) {
            Some(table) => {
                debug!(source, "snapshot served from cache");
                restrict(table, options.min_year)
            }
            None => self.reload(source, options),
        }
    }

    /// Fetches `source` regardless of the cache and swaps the slot on success.
    /// A failed reload leaves the previous entry in place.
    pub fn reload(&self, source: &str, options: &LoadOptions) -> Result<Arc<Table>, LoadError> {
        let unrestricted = LoadOptions {
            min_year: None,
            ..options.clone()
        };
        let table = match fetch_table(source, &unrestricted) {
            Ok(table) => Arc::new(table),
            Err(e) => {
                warn!(source, category = %e.category(), "snapshot load failed: {}", e.message());
                return Err(e);
            }
        };
        self.cache.store(source, Arc::clone(&table));
        restrict(table, options.min_year)
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

fn restrict(table: Arc<Table>, min_year: Option<i32>) -> Result<Arc<Table>, LoadError> {
    match min_year {
        None => Ok(table),
        Some(year) => Ok(Arc::new(restrict_min_year(&table, year)?)),
    }
}

/// Fetches, decodes and normalizes a snapshot without touching any cache.
pub fn fetch_table(identifier: &str, options: &LoadOptions) -> Result<Table, LoadError> {
    let source = source::input_source(identifier);
    let format = source::detect_format(&source, options.format);
    info!(source = identifier, ?format, "fetching snapshot");
    let bytes = fetch_bytes(&source, options.timeout)?;
    debug!(bytes = bytes.len(), "snapshot fetched");
    let table = table_from_bytes(bytes, format, options)?;
    info!(
        rows = table.height(),
        columns = table.width(),
        "snapshot loaded"
    );
    Ok(table)
}

/// Decodes snapshot bytes and normalizes the result.
pub fn table_from_bytes(
    bytes: Vec<u8>,
    format: SnapshotFormat,
    options: &LoadOptions,
) -> Result<Table, LoadError> {
    let frame = decode(bytes, format)?;
    prepare_table(frame, options)
}

/// Normalizes the date column to second precision, derives `year`/`year_str`,
/// checks that metric columns exist and applies the optional `min_year` restriction.
pub fn prepare_table(mut frame: DataFrame, options: &LoadOptions) -> Result<Table, LoadError> {
    let date_column = options.date_column.as_str();
    let date = frame
        .column(date_column)
        .map_err(|_| {
            let names: Vec<String> = frame
                .get_column_names()
                .iter()
                .map(|n| n.to_string())
                .collect();
            LoadError::Schema(format!(
                "date column '{}' not found (columns: {})",
                date_column,
                names.join(", ")
            ))
        })?
        .as_materialized_series()
        .clone();

    let (normalized, years) = normalize_dates(&date)?;
    let year_strings: Vec<Option<String>> =
        years.iter().map(|y| y.map(|y| y.to_string())).collect();

    frame.with_column(normalized).map_err(parse_error)?;
    frame
        .with_column(Series::new(YEAR_COLUMN.into(), years))
        .map_err(parse_error)?;
    frame
        .with_column(Series::new(YEAR_STR_COLUMN.into(), year_strings))
        .map_err(parse_error)?;

    let table = Table::new(frame, Some(date_column.to_string()));
    if metric_columns(&table).is_empty() {
        return Err(LoadError::Schema(
            "snapshot has no numeric metric columns".to_string(),
        ));
    }

    match options.min_year {
        Some(year) => restrict_min_year(&table, year),
        None => Ok(table),
    }
}

/// Keeps rows whose year is at least `min_year`. Rows without a year are dropped.
pub fn restrict_min_year(table: &Table, min_year: i32) -> Result<Table, LoadError> {
    let years = table
        .year_values()
        .map_err(|e| LoadError::Schema(e.to_string()))?;
    let mask: Vec<bool> = years
        .iter()
        .map(|y| y.is_some_and(|y| y >= min_year))
        .collect();
    let mask = BooleanChunked::from_slice("mask".into(), &mask);
    let frame = table.frame().filter(&mask).map_err(parse_error)?;
    debug!(
        min_year,
        kept = frame.height(),
        dropped = table.height() - frame.height(),
        "applied minimum year"
    );
    Ok(table.with_frame(frame))
}

fn parse_error(e: PolarsError) -> LoadError {
    LoadError::Parse(user_message_from_polars(&e))
}

fn decode(bytes: Vec<u8>, format: SnapshotFormat) -> Result<DataFrame, LoadError> {
    let cursor = Cursor::new(bytes);
    let result = match format {
        SnapshotFormat::Parquet => ParquetReader::new(cursor).finish(),
        SnapshotFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .map_parse_options(|opts| opts.with_try_parse_dates(true))
            .into_reader_with_file_handle(cursor)
            .finish(),
    };
    result.map_err(parse_error)
}

fn fetch_bytes(source: &InputSource, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    match source {
        InputSource::Local(path) => std::fs::read(path).map_err(|e| {
            LoadError::Network(format!(
                "{}: {}",
                path.display(),
                user_message_from_io(&e, None)
            ))
        }),
        InputSource::Http(url) => fetch_http(url, timeout),
    }
}

#[cfg(feature = "http")]
fn fetch_http(url: &str, timeout: Duration) -> Result<Vec<u8>, LoadError> {
    use std::io::Read;

    let response = match ureq::get(url).timeout(timeout).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, response)) => {
            return Err(LoadError::Network(format!(
                "Server returned {} {}. Check the URL.",
                code,
                response.status_text()
            )))
        }
        Err(e) => {
            return Err(LoadError::Network(format!(
                "Download failed. Check the URL and your connection: {}",
                e
            )))
        }
    };
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| {
            LoadError::Network(format!(
                "Download failed while reading the response: {}",
                user_message_from_io(&e, None)
            ))
        })?;
    Ok(bytes)
}

#[cfg(not(feature = "http"))]
fn fetch_http(url: &str, _timeout: Duration) -> Result<Vec<u8>, LoadError> {
    Err(LoadError::Network(format!(
        "HTTP support is not enabled in this build; cannot fetch {}",
        url
    )))
}

/// Parses the string date forms found in exported snapshots.
pub(crate) fn parse_date_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Returns the second-floored date series (same name) and the year of each row.
fn normalize_dates(date: &Series) -> Result<(Series, Vec<Option<i32>>), LoadError> {
    let name = date.name().clone();
    match date.dtype() {
        DataType::Datetime(unit, tz) => {
            let unit = *unit;
            let k = units_per_second(unit);
            let raw = date.cast(&DataType::Int64).map_err(parse_error)?;
            let raw = raw.i64().map_err(parse_error)?;
            let floored: Int64Chunked = raw
                .iter()
                .map(|v| v.map(|v| v.div_euclid(k) * k))
                .collect();
            let years = floored
                .iter()
                .map(|v| v.and_then(|v| timestamp_to_datetime(v, unit)).map(|dt| dt.year()))
                .collect();
            let series = floored
                .into_series()
                .with_name(name)
                .cast(&DataType::Datetime(unit, tz.clone()))
                .map_err(parse_error)?;
            Ok((series, years))
        }
        DataType::Date => {
            let days = date.cast(&DataType::Int32).map_err(parse_error)?;
            let years = days
                .i32()
                .map_err(parse_error)?
                .iter()
                .map(|d| {
                    d.and_then(|d| {
                        NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_CE_DAYS.saturating_add(d))
                    })
                    .map(|d| d.year())
                })
                .collect();
            Ok((date.clone(), years))
        }
        DataType::String => {
            let values = date.str().map_err(parse_error)?;
            let parsed: Vec<Option<NaiveDateTime>> = values
                .iter()
                .map(|v| v.and_then(parse_date_str))
                .collect();
            let non_null = values.len() - values.null_count();
            let parsed_count = parsed.iter().filter(|p| p.is_some()).count();
            if non_null > 0 && parsed_count == 0 {
                return Err(LoadError::Schema(format!(
                    "date column '{}' contains no parseable dates",
                    name
                )));
            }
            if parsed_count < non_null {
                warn!(
                    column = %name,
                    unparsed = non_null - parsed_count,
                    "some dates could not be parsed; those rows have no year"
                );
            }
            let millis: Int64Chunked = parsed
                .iter()
                .map(|p| p.map(|dt| dt.and_utc().timestamp() * 1_000))
                .collect();
            let years = parsed.iter().map(|p| p.map(|dt| dt.year())).collect();
            let series = millis
                .into_series()
                .with_name(name)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
                .map_err(parse_error)?;
            Ok((series, years))
        }
        other => Err(LoadError::Schema(format!(
            "date column '{}' has unsupported type {}",
            name, other
        ))),
    }
}
