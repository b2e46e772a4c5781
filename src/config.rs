use crate::aggregate::{Statistic, YearRange};
use crate::chart_data::{ChartKind, SeriesOrder};
use crate::loader::{LoadOptions, DEFAULT_DATE_COLUMN};
use crate::source::DEFAULT_SOURCE_URL;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use gdpdash_cli::{Args, SnapshotFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const PAGE_SIZE_RANGE: (usize, usize) = (10, 100);
pub const RECENT_YEARS_RANGE: (usize, usize) = (2, 10);

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }

    /// Read and parse config.toml. A missing file yields the defaults.
    pub fn read_config(&self) -> Result<AppConfig> {
        let config_path = self.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub source: SourceConfig,
    pub table: TableConfig,
    pub analysis: AnalysisConfig,
    pub chart: ChartConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    /// "parquet" or "csv"; detected from the extension when unset.
    pub format: Option<String>,
    pub date_column: String,
    pub timeout_secs: u64,
    pub min_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub statistic: Statistic,
    pub year_range: Option<YearRange>,
    pub metrics: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub kind: ChartKind,
    pub order: SeriesOrder,
    pub recent_years: usize,
    pub comparison_years: Option<Vec<i32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            source: SourceConfig::default(),
            table: TableConfig::default(),
            analysis: AnalysisConfig::default(),
            chart: ChartConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            format: None,
            date_column: DEFAULT_DATE_COLUMN.to_string(),
            timeout_secs: 30,
            min_year: None,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            kind: ChartKind::Line,
            order: SeriesOrder::Ascending,
            recent_years: 5,
            comparison_years: None,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let manager = ConfigManager::new(app_name)?;
        Self::load_from(&manager)
    }

    /// Load configuration from a specific config directory (default → user file)
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();

        match manager.read_config() {
            Ok(user_config) => config.merge(user_config),
            Err(e) => warn!("ignoring user config: {}", e),
        }

        config.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.source.merge(other.source);
        self.table.merge(other.table);
        self.analysis.merge(other.analysis);
        self.chart.merge(other.chart);
        self.export.merge(other.export);
    }

    /// Apply command-line overrides (the last configuration layer).
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(source) = &args.source {
            self.source.url = source.clone();
        }
        if let Some(format) = args.format {
            self.source.format = Some(
                match format {
                    SnapshotFormat::Parquet => "parquet",
                    SnapshotFormat::Csv => "csv",
                }
                .to_string(),
            );
        }
        if args.min_year.is_some() {
            self.source.min_year = args.min_year;
        }
        if let Some(secs) = args.timeout_secs {
            self.source.timeout_secs = secs;
        }
        if let Some(page_size) = args.page_size {
            self.table.page_size = page_size;
        }
        if let Some(stat) = args.stat {
            self.analysis.statistic = stat.into();
        }
        if args.from_year.is_some() || args.to_year.is_some() {
            let current = self.analysis.year_range.unwrap_or_default();
            self.analysis.year_range = Some(YearRange::new(
                args.from_year.or(current.start),
                args.to_year.or(current.end),
            ));
        }
        if !args.metrics.is_empty() {
            self.analysis.metrics = Some(args.metrics.clone());
        }
        if let Some(chart) = args.chart {
            self.chart.kind = chart.into();
        }
        if let Some(order) = args.order {
            self.chart.order = order.into();
        }
        if let Some(n) = args.recent_years {
            self.chart.recent_years = n;
        }
        if !args.compare.is_empty() {
            self.chart.comparison_years = Some(args.compare.clone());
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.source.url.trim().is_empty() {
            return Err(eyre!("source.url must not be empty"));
        }
        if self.source.date_column.trim().is_empty() {
            return Err(eyre!("source.date_column must not be empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(eyre!("source.timeout_secs must be greater than 0"));
        }
        self.source.snapshot_format()?;

        let (min, max) = PAGE_SIZE_RANGE;
        if !(min..=max).contains(&self.table.page_size) {
            return Err(eyre!(
                "table.page_size must be between {} and {}, got {}",
                min,
                max,
                self.table.page_size
            ));
        }

        if let Some(YearRange {
            start: Some(start),
            end: Some(end),
        }) = self.analysis.year_range
        {
            if start > end {
                return Err(eyre!(
                    "analysis.year_range start ({}) is after end ({})",
                    start,
                    end
                ));
            }
        }
        if let Some(metrics) = &self.analysis.metrics {
            if metrics.is_empty() {
                return Err(eyre!("analysis.metrics must list at least one column"));
            }
        }

        let (min, max) = RECENT_YEARS_RANGE;
        if !(min..=max).contains(&self.chart.recent_years) {
            return Err(eyre!(
                "chart.recent_years must be between {} and {}, got {}",
                min,
                max,
                self.chart.recent_years
            ));
        }

        Ok(())
    }
}

// Merge implementations for each config section
impl SourceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = SourceConfig::default();
        if other.url != default.url {
            self.url = other.url;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.date_column != default.date_column {
            self.date_column = other.date_column;
        }
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.min_year.is_some() {
            self.min_year = other.min_year;
        }
    }

    /// Explicit snapshot format, if one is configured.
    pub fn snapshot_format(&self) -> Result<Option<SnapshotFormat>> {
        match &self.format {
            None => Ok(None),
            Some(name) => SnapshotFormat::from_extension(name).map(Some).ok_or_else(|| {
                eyre!(
                    "Invalid source.format: {}. Must be 'parquet' or 'csv'",
                    name
                )
            }),
        }
    }

    /// Loader options for this source. Fails only when the format name is invalid.
    pub fn load_options(&self) -> Result<LoadOptions> {
        let mut options = LoadOptions::new()
            .with_date_column(self.date_column.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(format) = self.snapshot_format()? {
            options = options.with_format(format);
        }
        if let Some(year) = self.min_year {
            options = options.with_min_year(year);
        }
        Ok(options)
    }
}

impl TableConfig {
    pub fn merge(&mut self, other: Self) {
        let default = TableConfig::default();
        if other.page_size != default.page_size {
            self.page_size = other.page_size;
        }
    }
}

impl AnalysisConfig {
    pub fn merge(&mut self, other: Self) {
        let default = AnalysisConfig::default();
        if other.statistic != default.statistic {
            self.statistic = other.statistic;
        }
        if other.year_range.is_some() {
            self.year_range = other.year_range;
        }
        if other.metrics.is_some() {
            self.metrics = other.metrics;
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.kind != default.kind {
            self.kind = other.kind;
        }
        if other.order != default.order {
            self.order = other.order;
        }
        if other.recent_years != default.recent_years {
            self.recent_years = other.recent_years;
        }
        if other.comparison_years.is_some() {
            self.comparison_years = other.comparison_years;
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        if other.directory.is_some() {
            self.directory = other.directory;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
