//! User-facing error message formatting.
//!
//! Uses typed error matching (PolarsError variants, io::ErrorKind, LoadError variants)
//! rather than string parsing to produce notices the presentation layer can show as-is.

use crate::error::{LoadError, ViewError};
use polars::prelude::PolarsError;
use std::io;

/// Hint appended to load failures the user can retry.
pub const RETRY_HINT: &str = "Check your network connection or try again later.";

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::ComputeError(msg) => simplify_compute_message(msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::ConnectionRefused => "Connection refused.".to_string(),
        ErrorKind::ConnectionReset => "Connection reset.".to_string(),
        ErrorKind::TimedOut => "Timed out.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Operation interrupted.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Notice shown when a load attempt fails. Network failures carry the retry hint.
pub fn user_message_from_load(err: &LoadError) -> String {
    match err {
        LoadError::Network(msg) => format!("Could not fetch the dataset: {} {}", msg, RETRY_HINT),
        LoadError::Parse(msg) => format!("The dataset could not be read: {}", msg),
        LoadError::Schema(msg) => format!("The dataset has an unexpected layout: {}", msg),
    }
}

/// Notice shown in place of a view that could not be built.
pub fn user_message_from_view(err: &ViewError) -> String {
    match err {
        ViewError::Polars(pe) => user_message_from_polars(pe),
        ViewError::InsufficientYears { required, found } => format!(
            "This view needs data for at least {} years; only {} available.",
            required, found
        ),
        ViewError::InsufficientPairs { found } => format!(
            "Not enough data points ({}) where both metrics are present.",
            found
        ),
        other => {
            let mut msg = other.to_string();
            if let Some(first) = msg.get(..1) {
                let upper = first.to_uppercase();
                msg.replace_range(..1, &upper);
            }
            msg.push('.');
            msg
        }
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find LoadError, PolarsError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(le) = cause.downcast_ref::<LoadError>() {
            return user_message_from_load(le);
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return user_message_from_polars(pe);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
    }

    // Fallback: use first line of display to avoid long tracebacks
    let display = report.to_string();
    display
        .lines()
        .next()
        .unwrap_or("An error occurred")
        .trim()
        .to_string()
}

/// Light cleanup for ComputeError messages: strip Polars-internal phrasing.
fn simplify_compute_message(msg: &str) -> String {
    let lower = msg.to_lowercase();
    if lower.contains("conversion from") && lower.contains("failed") {
        return format!("Values could not be converted: {}", msg);
    }
    if lower.contains("parquet") || lower.contains("magic") {
        return format!("Not a valid Parquet file: {}", msg);
    }
    msg.to_string()
}
