mod common;

use clap::Parser;
use gdpdash::dashboard::{build_report, render_text, ChartFeed, ViewConfig};
use gdpdash::{AppConfig, Args, ChartKind};

fn view_from(argv: &[&str]) -> ViewConfig {
    let args = Args::parse_from(argv);
    let mut config = AppConfig::default();
    config.apply_args(&args);
    config.validate().unwrap();
    ViewConfig::from_args(&config, &args)
}

#[test]
fn test_default_report() {
    let table = common::gdp_table();
    let report = build_report(&table, &ViewConfig::default());

    assert_eq!(report.overview.rows, 10);
    assert_eq!(report.overview.first_year, Some(2019));
    assert_eq!(report.overview.last_year, Some(2023));
    assert_eq!(report.metrics, vec!["value".to_string()]);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].column, "value");
    let window = report.table.as_ref().unwrap();
    assert_eq!(window.page.total_rows, 10);
    assert!(matches!(report.chart, Some(ChartFeed::Line { .. })));
    assert!(report.notices.is_empty(), "{:?}", report.notices);
}

#[test]
fn test_heatmap_on_annual_data_is_declined() {
    let table = common::gdp_table();
    let view = view_from(&["gdpdash", "--chart", "heatmap"]);
    assert_eq!(view.chart, ChartKind::Heatmap);

    let report = build_report(&table, &view);
    assert!(report.chart.is_none());
    assert_eq!(report.notices.len(), 1);
    assert_eq!(report.notices[0].view, "heatmap");
    // the rest of the report is still built
    assert!(report.aggregation.is_some());
    assert!(render_text(&report).contains("== Notices =="));
}

#[test]
fn test_pie_of_recent_years() {
    let table = common::gdp_table();
    let view = view_from(&["gdpdash", "--chart", "pie", "--recent-years", "3"]);
    match build_report(&table, &view).chart {
        Some(ChartFeed::Pie { slices, .. }) => {
            let years: Vec<i32> = slices.iter().map(|s| s.year).collect();
            assert_eq!(years, vec![2023, 2022, 2021]);
        }
        other => panic!("expected pie feed, got {:?}", other),
    }
}

#[test]
fn test_search_and_page_from_args() {
    let table = common::gdp_table();
    let view = view_from(&["gdpdash", "--search", "agri", "--page", "9"]);
    let report = build_report(&table, &view);
    let window = report.table.unwrap();
    assert_eq!(window.page.total_rows, 5);
    assert_eq!(window.page.page, 1);
    assert_eq!(window.rows.len(), 5);
}

#[test]
fn test_unknown_metric_is_a_notice() {
    let table = common::gdp_table();
    let view = view_from(&["gdpdash", "--metric", "exports"]);
    let report = build_report(&table, &view);
    assert!(report.aggregation.is_none());
    assert!(report
        .notices
        .iter()
        .any(|n| n.message.contains("exports")));
}

#[test]
fn test_json_feed() {
    let table = common::gdp_table();
    let view = view_from(&[
        "gdpdash",
        "--chart",
        "bar",
        "--compare",
        "2023",
        "--compare",
        "2019",
    ]);
    let json = serde_json::to_value(build_report(&table, &view)).unwrap();
    assert_eq!(json["chart"]["kind"], "bar");
    assert_eq!(json["chart"]["bars"][0]["key"], 2023);
    assert_eq!(json["columns"][0]["semantic_type"], "date");
}

#[test]
fn test_scatter_coloured_by_year() {
    let table = common::gdp_table();
    let view = view_from(&[
        "gdpdash",
        "--chart",
        "scatter",
        "--x-metric",
        "value",
        "--y-metric",
        "year",
        "--color-by",
        "year",
    ]);
    match build_report(&table, &view).chart {
        Some(ChartFeed::Scatter(feed)) => {
            assert_eq!(feed.color_metric.as_deref(), Some("year"));
            assert!(feed
                .points
                .iter()
                .all(|p| p.color == p.year.map(f64::from)));
        }
        other => panic!("expected scatter feed, got {:?}", other),
    }
}
