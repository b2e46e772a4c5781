//! Snapshot source detection: local paths vs HTTP/HTTPS URLs, and format inference.

use gdpdash_cli::SnapshotFormat;
use std::path::{Path, PathBuf};

/// DOSM annual nominal GDP by supply (kind of economic activity).
pub const DEFAULT_SOURCE_URL: &str =
    "https://storage.dosm.gov.my/gdp/gdp_annual_nominal_supply.parquet";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InputSource {
    Local(PathBuf),
    Http(String),
}

/// Classifies the identifier as local or HTTP/HTTPS using string parsing only (no filesystem calls).
pub fn input_source(identifier: &str) -> InputSource {
    if let Some(after_scheme) = identifier.find("://") {
        let prefix = identifier[..after_scheme].to_lowercase();
        if prefix == "http" || prefix == "https" {
            return InputSource::Http(identifier.to_string());
        }
    }
    InputSource::Local(PathBuf::from(identifier))
}

/// Returns the path segment and file extension for URL format inference.
/// For HTTP/HTTPS the host is stripped and any query string or fragment is ignored.
pub fn url_path_extension(url: &str) -> (String, Option<String>) {
    let path_part = if let Some(i) = url.find("://") {
        let after = &url[i + 3..];
        after
            .find('/')
            .map(|j| after[j + 1..].to_string())
            .unwrap_or_default()
    } else {
        String::new()
    };
    let path_part = path_part
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .to_string();
    let last_segment = path_part.rsplit('/').next().unwrap_or(&path_part);
    let ext = Path::new(last_segment)
        .extension()
        .and_then(|e| e.to_str())
        .map(String::from);
    (path_part, ext)
}

/// Format for a source: explicit override first, then extension, then Parquet
/// (the published snapshots are Parquet).
pub fn detect_format(source: &InputSource, explicit: Option<SnapshotFormat>) -> SnapshotFormat {
    if let Some(format) = explicit {
        return format;
    }
    let detected = match source {
        InputSource::Local(path) => SnapshotFormat::from_path(path),
        InputSource::Http(url) => url_path_extension(url)
            .1
            .as_deref()
            .and_then(SnapshotFormat::from_extension),
    };
    detected.unwrap_or(SnapshotFormat::Parquet)
}
