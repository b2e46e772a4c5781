//! CSV export of a loaded table and re-import of an exported file.

use crate::error::ViewResult;
use crate::loader::parse_date_str;
use crate::table::{units_per_second, Table, UNIX_EPOCH_CE_DAYS};
use chrono::Datelike;
use color_eyre::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

pub const FULL_FILE_NAME: &str = "malaysia_gdp_full_data.csv";
pub const SIMPLIFIED_FILE_NAME: &str = "malaysia_gdp_simplified.csv";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Every column as stored; timestamps as `YYYY-MM-DD HH:MM:SS`.
    #[default]
    Full,
    /// Same columns, with the date column reduced to `YYYY-MM-DD`.
    Simplified,
}

impl ExportMode {
    pub fn default_file_name(self) -> &'static str {
        match self {
            ExportMode::Full => FULL_FILE_NAME,
            ExportMode::Simplified => SIMPLIFIED_FILE_NAME,
        }
    }
}

/// Copy of the frame with temporal columns rendered as text.
/// Zoned timestamps are written as their UTC wall time.
fn render_dates(table: &Table, mode: ExportMode) -> ViewResult<DataFrame> {
    let mut frame = table.frame().clone();
    let temporal: Vec<(String, DataType)> = frame
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::Date | DataType::Datetime(_, _)))
        .map(|c| (c.name().to_string(), c.dtype().clone()))
        .collect();

    for (name, dtype) in temporal {
        let fmt = match (&dtype, mode) {
            (DataType::Date, _) => DATE_FORMAT,
            (_, ExportMode::Simplified) if table.date_column() == Some(name.as_str()) => {
                DATE_FORMAT
            }
            _ => DATETIME_FORMAT,
        };
        let text: Vec<Option<String>> = table
            .date_values(&name)?
            .into_iter()
            .map(|v| v.map(|dt| dt.format(fmt).to_string()))
            .collect();
        frame.with_column(Series::new(name.as_str().into(), text))?;
    }
    Ok(frame)
}

/// CSV bytes with a header row, comma separated, UTF-8, column order preserved.
pub fn export_csv(table: &Table, mode: ExportMode) -> ViewResult<Vec<u8>> {
    let mut frame = render_dates(table, mode)?;
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut frame)?;
    Ok(buf)
}

/// Writes the export to `path`, or to the mode's default file name inside `path` when it
/// is a directory. Returns the file written.
pub fn write_csv_file(table: &Table, mode: ExportMode, path: &Path) -> Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(mode.default_file_name())
    } else {
        path.to_path_buf()
    };
    let mut frame = render_dates(table, mode)?;
    let file = File::create(&target)?;
    let mut writer = BufWriter::new(file);
    CsvWriter::new(&mut writer)
        .include_header(true)
        .finish(&mut frame)?;
    info!(path = %target.display(), rows = frame.height(), ?mode, "exported csv");
    Ok(target)
}

/// Parses CSV bytes produced by [`export_csv`].
///
/// With `schema`, every column is read back as its original type. Temporal columns are
/// parsed from their text form; without a schema, types are inferred.
pub fn import_csv(bytes: &[u8], schema: Option<&Schema>) -> ViewResult<DataFrame> {
    let Some(schema) = schema else {
        return Ok(CsvReadOptions::default()
            .with_has_header(true)
            .map_parse_options(|opts| opts.with_try_parse_dates(true))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?);
    };

    let mut overwrite = Schema::with_capacity(schema.len());
    for (name, dtype) in schema.iter() {
        let read_as = match dtype {
            DataType::Date | DataType::Datetime(_, _) => DataType::String,
            other => other.clone(),
        };
        overwrite.with_column(name.clone(), read_as);
    }
    let mut frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(overwrite)))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;

    for (name, dtype) in schema.iter() {
        let restored = match dtype {
            DataType::Datetime(unit, _) => {
                let k = units_per_second(*unit);
                let text = frame
                    .column(name.as_str())?
                    .as_materialized_series()
                    .str()?
                    .clone();
                let raw: Int64Chunked = text
                    .iter()
                    .map(|v| {
                        v.and_then(parse_date_str)
                            .map(|dt| dt.and_utc().timestamp() * k)
                    })
                    .collect();
                raw.into_series().with_name(name.clone()).cast(dtype)?
            }
            DataType::Date => {
                let text = frame
                    .column(name.as_str())?
                    .as_materialized_series()
                    .str()?
                    .clone();
                let days: Int32Chunked = text
                    .iter()
                    .map(|v| {
                        v.and_then(parse_date_str)
                            .map(|dt| dt.date().num_days_from_ce() - UNIX_EPOCH_CE_DAYS)
                    })
                    .collect();
                days.into_series().with_name(name.clone()).cast(dtype)?
            }
            _ => continue,
        };
        frame.with_column(restored)?;
    }
    Ok(frame)
}
