//! Shared CLI definitions for gdpdash.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::Path;

/// Snapshot file format (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the path or URL extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Parquet columnar format
    Parquet,
    /// Comma-separated values
    Csv,
}

impl SnapshotFormat {
    /// Detect format from path extension. Returns None when extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "parquet", "csv").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "parquet" | "pq" => Some(Self::Parquet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Summary statistic applied to each year group
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StatArg {
    Mean,
    Sum,
    Median,
}

/// Chart gallery entry
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ChartArg {
    /// Time series trend (mean by year, one series per metric)
    Line,
    /// Year-over-year comparison for selected years
    Bar,
    /// Share of the most recent N years
    Pie,
    /// Year by quarter grid (requires sub-annual dates)
    Heatmap,
    /// Correlation between two metrics
    Scatter,
    /// Stacked metrics by year
    StackedArea,
}

/// Ordering of chart series keys
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OrderArg {
    Ascending,
    Descending,
}

/// Command-line arguments for gdpdash
#[derive(Clone, Parser, Debug)]
#[command(
    name = "gdpdash",
    version,
    about = "Malaysian GDP dataset views",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Snapshot to load: an http(s) URL or a local path.
    /// Defaults to the configured source (DOSM annual nominal GDP by supply).
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Force snapshot format (parquet, csv). By default format is detected from the extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<SnapshotFormat>,

    /// Keep only rows whose year is at least this value
    #[arg(long = "min-year", value_name = "YEAR")]
    pub min_year: Option<i32>,

    /// Fetch timeout in seconds (default: 30)
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Case-insensitive search term matched against every column; narrows the rows before paging
    #[arg(long = "search", value_name = "TERM")]
    pub search: Option<String>,

    /// Page of the table view to show (1-based, clamped to the available pages)
    #[arg(long = "page", value_name = "N")]
    pub page: Option<usize>,

    /// Rows per page, 10 to 100 (default: 20)
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Metric column to analyse. Repeat for multi-series charts (line, stacked-area)
    #[arg(long = "metric", value_name = "COLUMN")]
    pub metrics: Vec<String>,

    /// Statistic used for grouped values (default: mean)
    #[arg(long = "stat", value_enum)]
    pub stat: Option<StatArg>,

    /// First year (inclusive) of the analysed range
    #[arg(long = "from-year", value_name = "YEAR")]
    pub from_year: Option<i32>,

    /// Last year (inclusive) of the analysed range
    #[arg(long = "to-year", value_name = "YEAR")]
    pub to_year: Option<i32>,

    /// Chart to prepare data for (default: line)
    #[arg(long = "chart", value_enum)]
    pub chart: Option<ChartArg>,

    /// Ordering of chart series by year (default: ascending)
    #[arg(long = "order", value_enum)]
    pub order: Option<OrderArg>,

    /// Number of most recent years shown in the pie view (default: 5)
    #[arg(long = "recent-years", value_name = "N")]
    pub recent_years: Option<usize>,

    /// Year to include in the bar comparison. Repeat for several years (default: last five)
    #[arg(long = "compare", value_name = "YEAR")]
    pub compare: Vec<i32>,

    /// X axis metric for the scatter view
    #[arg(long = "x-metric", value_name = "COLUMN")]
    pub x_metric: Option<String>,

    /// Y axis metric for the scatter view
    #[arg(long = "y-metric", value_name = "COLUMN")]
    pub y_metric: Option<String>,

    /// Numeric column used to colour the scatter points
    #[arg(long = "color-by", value_name = "COLUMN")]
    pub color_by: Option<String>,

    /// Write the loaded table as CSV to this path
    #[arg(long = "export", value_name = "PATH")]
    pub export: Option<std::path::PathBuf>,

    /// Export dates as YYYY-MM-DD instead of full timestamps
    #[arg(long = "simplified", requires = "export", action)]
    pub simplified: bool,

    /// Print the report as JSON instead of text
    #[arg(long = "json", action)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Generate default configuration file at ~/.config/gdpdash/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            format!("[{placeholder}]")
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if placeholder.is_empty() || !arg.get_action().takes_values() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}
