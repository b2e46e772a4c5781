use gdpdash::aggregate::{Statistic, YearRange};
use gdpdash::chart_data::{ChartKind, SeriesOrder};
use gdpdash::config::{AppConfig, ConfigManager};
use std::fs;
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert!(config.source.url.ends_with("gdp_annual_nominal_supply.parquet"));
    assert_eq!(config.source.date_column, "date");
    assert_eq!(config.source.timeout_secs, 30);
    assert_eq!(config.source.min_year, None);
    assert_eq!(config.table.page_size, 20);
    assert_eq!(config.analysis.statistic, Statistic::Mean);
    assert_eq!(config.chart.kind, ChartKind::Line);
    assert_eq!(config.chart.order, SeriesOrder::Ascending);
    assert_eq!(config.chart.recent_years, 5);
    assert!(config.validate().is_ok());
}

#[test]
fn test_generate_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let template = config_manager.generate_default_config();

    assert!(template.contains("[source]"));
    assert!(template.contains("[table]"));
    assert!(template.contains("[analysis]"));
    assert!(template.contains("[chart]"));
    assert!(template.contains("[export]"));
    assert!(template.contains("version = \"0.1\""));
}

#[test]
fn test_write_default_config() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let config_path = config_manager
        .write_default_config(false)
        .expect("Failed to write config");

    assert!(config_path.exists());
    let content = fs::read_to_string(&config_path).expect("Failed to read config");
    assert!(content.contains("page_size = 20"));

    // A second write without force is refused
    assert!(config_manager.write_default_config(false).is_err());
    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_user_config_overrides_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        r#"
[source]
url = "/data/gdp.csv"
min_year = 2015

[analysis]
statistic = "median"
year_range = { start = 2016, end = 2022 }

[chart]
kind = "stacked-area"
comparison_years = [2019, 2023]
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&config_manager).expect("config loads");
    assert_eq!(config.source.url, "/data/gdp.csv");
    assert_eq!(config.source.min_year, Some(2015));
    assert_eq!(config.source.timeout_secs, 30);
    assert_eq!(config.analysis.statistic, Statistic::Median);
    assert_eq!(
        config.analysis.year_range,
        Some(YearRange::new(Some(2016), Some(2022)))
    );
    assert_eq!(config.chart.kind, ChartKind::StackedArea);
    assert_eq!(config.chart.comparison_years, Some(vec![2019, 2023]));
    assert_eq!(config.table.page_size, 20);
}

#[test]
fn test_out_of_range_values_fail_validation() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(
        config_manager.config_path("config.toml"),
        "[table]\npage_size = 500\n",
    )
    .unwrap();

    assert!(AppConfig::load_from(&config_manager).is_err());

    let mut config = AppConfig::default();
    config.chart.recent_years = 1;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.analysis.year_range = Some(YearRange::new(Some(2023), Some(2019)));
    assert!(config.validate().is_err());
}

#[test]
fn test_unparseable_user_config_falls_back_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();
    fs::write(config_manager.config_path("config.toml"), "not = [valid").unwrap();

    assert!(config_manager.read_config().is_err());
    let config = AppConfig::load_from(&config_manager).expect("defaults still load");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_merge_keeps_unset_values() {
    let mut base = AppConfig::default();
    base.source.min_year = Some(2010);

    let mut other = AppConfig::default();
    other.table.page_size = 50;
    base.merge(other);

    assert_eq!(base.table.page_size, 50);
    assert_eq!(base.source.min_year, Some(2010));
}
