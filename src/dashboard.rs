//! Builds the presentation feed: every derived view of one table for one view configuration.
//!
//! [`build_report`] is pure over an immutable [`Table`]. A view that cannot be built is
//! replaced by a [`Notice`] and the rest of the report is still produced.

use crate::aggregate::{
    self, column_summary, key_indicator, recent_years, require_non_empty, shares,
    AggregationResult, ColumnSummary, Statistic, YearComparison, YearRange,
};
use crate::chart_data::{
    format_value, prepare_bar, prepare_heatmap, prepare_multi_series, prepare_scatter,
    prepare_series, prepare_shares, ChartKind, HeatmapFeed, NamedSeries, ScatterFeed,
    SeriesOrder, SeriesPoint, ShareSlice,
};
use crate::config::AppConfig;
use crate::error::{ViewError, ViewResult};
use crate::error_display::user_message_from_view;
use crate::query::{filter, paginate, search, Page, Predicate};
use crate::schema::{
    self, describe, metric_columns, missing_report, numeric_summary, type_counts,
    ColumnDescriptor, MissingCount, NumericSummary, SemanticType,
};
use crate::table::Table;
use gdpdash_cli::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, warn};

const DEFAULT_METRIC_COUNT: usize = 3;
const DEFAULT_COMPARISON_YEARS: usize = 5;

/// Everything a single report depends on besides the table itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub search: Option<String>,
    pub predicates: Vec<Predicate>,
    pub page_size: usize,
    pub page: usize,
    /// Metric columns to analyse; `None` picks the first three metric columns.
    pub metrics: Option<Vec<String>>,
    pub statistic: Statistic,
    pub year_range: YearRange,
    /// Years compared in the bar view; `None` uses the last five years.
    pub comparison_years: Option<Vec<i32>>,
    pub recent_years: usize,
    pub chart: ChartKind,
    pub order: SeriesOrder,
    pub x_metric: Option<String>,
    pub y_metric: Option<String>,
    pub color_metric: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ViewConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            search: None,
            predicates: Vec::new(),
            page_size: config.table.page_size,
            page: 1,
            metrics: config.analysis.metrics.clone(),
            statistic: config.analysis.statistic,
            year_range: config.analysis.year_range.unwrap_or_default(),
            comparison_years: config.chart.comparison_years.clone(),
            recent_years: config.chart.recent_years,
            chart: config.chart.kind,
            order: config.chart.order,
            x_metric: None,
            y_metric: None,
            color_metric: None,
        }
    }

    /// View configuration from a merged config plus the per-invocation command-line options.
    pub fn from_args(config: &AppConfig, args: &Args) -> Self {
        let mut view = Self::from_config(config);
        view.search = args.search.clone().filter(|s| !s.is_empty());
        view.page = args.page.unwrap_or(1);
        view.x_metric = args.x_metric.clone();
        view.y_metric = args.y_metric.clone();
        view.color_metric = args.color_by.clone();
        view
    }

    /// Requested metrics, or the first few metric columns of the table.
    fn resolve_metrics(&self, table: &Table) -> Vec<String> {
        match &self.metrics {
            Some(metrics) if !metrics.is_empty() => metrics.clone(),
            _ => metric_columns(table)
                .into_iter()
                .take(DEFAULT_METRIC_COUNT)
                .collect(),
        }
    }
}

/// A view that was skipped, with the message to show in its place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub view: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub metric_count: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub key_indicator: Option<YearComparison>,
    pub metric_summary: Option<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableWindow {
    pub search: Option<String>,
    pub page: Page,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ChartFeed {
    Line { series: Vec<NamedSeries> },
    StackedArea { series: Vec<NamedSeries> },
    Bar { metric: String, bars: Vec<SeriesPoint> },
    Pie { metric: String, slices: Vec<ShareSlice> },
    Heatmap(HeatmapFeed),
    Scatter(ScatterFeed),
}

/// The presentation feed.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub overview: Overview,
    pub columns: Vec<ColumnDescriptor>,
    pub type_counts: BTreeMap<SemanticType, usize>,
    pub missing: Vec<MissingCount>,
    pub numeric_summary: Vec<NumericSummary>,
    pub table: Option<TableWindow>,
    pub metrics: Vec<String>,
    pub aggregation: Option<AggregationResult>,
    pub series: Vec<SeriesPoint>,
    pub chart: Option<ChartFeed>,
    pub notices: Vec<Notice>,
}

/// Collects skipped views while a report is built.
#[derive(Default)]
struct Notices(Vec<Notice>);

impl Notices {
    fn keep<T>(&mut self, view: &str, result: ViewResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(view, error = %e, "view skipped");
                self.0.push(Notice {
                    view: view.to_string(),
                    message: user_message_from_view(&e),
                });
                None
            }
        }
    }
}

/// Derives every view of `table` for `view`.
pub fn build_report(table: &Table, view: &ViewConfig) -> DashboardReport {
    let mut notices = Notices::default();
    let metrics = view.resolve_metrics(table);
    let primary = metrics.first().cloned();
    debug!(?metrics, chart = %view.chart, "building report");

    let columns = notices.keep("columns", describe(table)).unwrap_or_default();
    let years = notices.keep("years", schema::years(table)).unwrap_or_default();

    let overview = Overview {
        rows: table.height(),
        columns: table.width(),
        metric_count: metric_columns(table).len(),
        first_year: years.first().copied(),
        last_year: years.last().copied(),
        key_indicator: primary
            .as_deref()
            .and_then(|m| notices.keep("key indicator", key_indicator(table, m))),
        metric_summary: primary
            .as_deref()
            .and_then(|m| notices.keep("metric summary", column_summary(table, m))),
    };

    let table_window = notices.keep("table", table_window(table, view));

    let aggregation = primary.as_deref().and_then(|m| {
        let result = aggregate::aggregate(table, m, view.statistic, view.year_range)
            .and_then(require_non_empty);
        notices.keep("aggregation", result)
    });
    let series = aggregation
        .as_ref()
        .map(|r| prepare_series(r, view.order))
        .unwrap_or_default();

    let chart = match primary.as_deref() {
        Some(metric) => {
            let feed = chart_feed(table, view, metric, &metrics, &years, &mut notices);
            notices.keep(&view.chart.to_string(), feed)
        }
        None => {
            notices.keep::<()>(
                &view.chart.to_string(),
                Err(ViewError::EmptyResult("metric columns".to_string())),
            );
            None
        }
    };

    DashboardReport {
        overview,
        type_counts: type_counts(table),
        missing: missing_report(&columns),
        numeric_summary: notices
            .keep("statistics", numeric_summary(table))
            .unwrap_or_default(),
        columns,
        table: table_window,
        metrics,
        aggregation,
        series,
        chart,
        notices: notices.0,
    }
}

fn table_window(table: &Table, view: &ViewConfig) -> ViewResult<TableWindow> {
    let filtered = filter(table, &view.predicates)?;
    let rows = match &view.search {
        Some(term) => search(&filtered, term)?,
        None => filtered,
    };
    let page = paginate(&rows, view.page_size, view.page);

    let columns = page.rows.column_names();
    let mut cells: Vec<Vec<Option<String>>> =
        vec![Vec::with_capacity(columns.len()); page.rows.height()];
    for name in &columns {
        for (row, value) in cells.iter_mut().zip(page.rows.string_values(name)?) {
            row.push(value);
        }
    }
    Ok(TableWindow {
        search: view.search.clone(),
        page,
        columns,
        rows: cells,
    })
}

fn chart_feed(
    table: &Table,
    view: &ViewConfig,
    metric: &str,
    metrics: &[String],
    years: &[i32],
    notices: &mut Notices,
) -> ViewResult<ChartFeed> {
    match view.chart {
        ChartKind::Line | ChartKind::StackedArea => {
            // one series per metric; metrics without data are reported on their own
            let mut results = Vec::with_capacity(metrics.len());
            let mut skipped = Vec::new();
            for m in metrics {
                match aggregate::aggregate(table, m, Statistic::Mean, view.year_range)
                    .and_then(require_non_empty)
                {
                    Ok(result) => results.push(result),
                    Err(e) => skipped.push(e),
                }
            }
            if results.is_empty() {
                return Err(ViewError::EmptyResult(format!(
                    "{} of {}",
                    Statistic::Mean,
                    metrics.join(", ")
                )));
            }
            let view_name = view.chart.to_string();
            for e in skipped {
                notices.keep::<()>(&view_name, Err(e));
            }
            let series = prepare_multi_series(&results, view.order);
            Ok(match view.chart {
                ChartKind::StackedArea => ChartFeed::StackedArea { series },
                _ => ChartFeed::Line { series },
            })
        }
        ChartKind::Bar => {
            let compared = match &view.comparison_years {
                Some(years) => years.clone(),
                None => {
                    let start = years.len().saturating_sub(DEFAULT_COMPARISON_YEARS);
                    years[start..].to_vec()
                }
            };
            let result = aggregate::aggregate(table, metric, view.statistic, YearRange::default())?;
            let bars = prepare_bar(&result, &compared);
            if bars.is_empty() {
                return Err(ViewError::EmptyResult(format!(
                    "{} in the compared years",
                    metric
                )));
            }
            Ok(ChartFeed::Bar {
                metric: metric.to_string(),
                bars,
            })
        }
        ChartKind::Pie => {
            let recent = recent_years(table, view.recent_years)?;
            let totals = shares(table, metric, &recent)?;
            Ok(ChartFeed::Pie {
                metric: metric.to_string(),
                slices: prepare_shares(&totals),
            })
        }
        ChartKind::Heatmap => Ok(ChartFeed::Heatmap(prepare_heatmap(
            table,
            metric,
            view.year_range,
        )?)),
        ChartKind::Scatter => {
            let x = view.x_metric.clone().unwrap_or_else(|| metric.to_string());
            let y = match &view.y_metric {
                Some(y) => y.clone(),
                None => metrics
                    .iter()
                    .chain(metric_columns(table).iter())
                    .find(|m| **m != x)
                    .cloned()
                    .ok_or_else(|| {
                        ViewError::EmptyResult("a second metric for the scatter view".to_string())
                    })?,
            };
            Ok(ChartFeed::Scatter(prepare_scatter(
                table,
                &x,
                &y,
                view.color_metric.as_deref(),
            )?))
        }
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(format_value).unwrap_or_else(|| "-".to_string())
}

/// Plain-text rendering of a report for terminal output.
pub fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();
    let o = &report.overview;

    let _ = writeln!(out, "== Overview ==");
    let _ = writeln!(
        out,
        "{} rows, {} columns, {} metrics",
        o.rows, o.columns, o.metric_count
    );
    if let (Some(first), Some(last)) = (o.first_year, o.last_year) {
        let _ = writeln!(out, "Years: {} to {}", first, last);
    }
    if let Some(ki) = &o.key_indicator {
        let _ = writeln!(
            out,
            "{}: {} ({}) vs {} ({}), {:+.2}%",
            ki.metric,
            format_value(ki.latest_value),
            ki.latest_year,
            format_value(ki.previous_value),
            ki.previous_year,
            ki.growth_pct
        );
    }
    if let Some(s) = &o.metric_summary {
        let _ = writeln!(
            out,
            "{}: mean {}, median {}, total {}",
            s.metric,
            fmt_opt(s.mean),
            fmt_opt(s.median),
            format_value(s.sum)
        );
    }

    let _ = writeln!(out, "\n== Columns ==");
    for c in &report.columns {
        let _ = writeln!(
            out,
            "{:<24} {:<8} missing {:>6}  distinct {:>6}",
            c.name, c.semantic_type, c.missing, c.distinct
        );
    }

    if !report.numeric_summary.is_empty() {
        let _ = writeln!(out, "\n== Statistics ==");
        for s in &report.numeric_summary {
            let _ = writeln!(
                out,
                "{:<24} count {:>6}  mean {:>16}  std {:>16}  min {:>16}  median {:>16}  max {:>16}",
                s.column,
                s.count,
                fmt_opt(s.mean),
                fmt_opt(s.std),
                fmt_opt(s.min),
                fmt_opt(s.median),
                fmt_opt(s.max)
            );
        }
    }

    if let Some(window) = &report.table {
        let _ = writeln!(out, "\n== Table ==");
        if let Some(term) = &window.search {
            let _ = writeln!(out, "Search: {:?}", term);
        }
        let _ = writeln!(out, "{}", window.columns.join(" | "));
        for row in &window.rows {
            let cells: Vec<&str> = row.iter().map(|v| v.as_deref().unwrap_or("")).collect();
            let _ = writeln!(out, "{}", cells.join(" | "));
        }
        let _ = writeln!(out, "{}", window.page.summary());
    }

    if let Some(agg) = &report.aggregation {
        let _ = writeln!(out, "\n== {} of {} by year ==", agg.statistic, agg.metric);
        for point in &report.series {
            let _ = writeln!(out, "{:>6}  {:>20}", point.key, format_value(point.value));
        }
    }

    if let Some(chart) = &report.chart {
        let _ = writeln!(out, "\n== Chart ==");
        match chart {
            ChartFeed::Line { series } | ChartFeed::StackedArea { series } => {
                for s in series {
                    let points: Vec<String> = s
                        .points
                        .iter()
                        .map(|p| format!("{}={}", p.key, format_value(p.value)))
                        .collect();
                    let _ = writeln!(out, "{}: {}", s.name, points.join(", "));
                }
            }
            ChartFeed::Bar { metric, bars } => {
                let _ = writeln!(out, "{}", metric);
                for b in bars {
                    let _ = writeln!(out, "{:>6}  {:>20}", b.key, format_value(b.value));
                }
            }
            ChartFeed::Pie { metric, slices } => {
                let _ = writeln!(out, "{}", metric);
                for s in slices {
                    let _ = writeln!(
                        out,
                        "{:>6}  {:>20}  {:>6.1}%",
                        s.year,
                        format_value(s.value),
                        s.fraction * 100.0
                    );
                }
            }
            ChartFeed::Heatmap(feed) => {
                let _ = writeln!(out, "{} (year x quarter)", feed.metric);
                for c in &feed.cells {
                    let _ = writeln!(
                        out,
                        "{} Q{}  {:>20}",
                        c.year,
                        c.quarter,
                        format_value(c.value)
                    );
                }
            }
            ChartFeed::Scatter(feed) => {
                let _ = writeln!(
                    out,
                    "{} vs {}: {} points, correlation {:.3}",
                    feed.x_metric,
                    feed.y_metric,
                    feed.points.len(),
                    feed.correlation
                );
            }
        }
    }

    if !report.notices.is_empty() {
        let _ = writeln!(out, "\n== Notices ==");
        for n in &report.notices {
            let _ = writeln!(out, "[{}] {}", n.view, n.message);
        }
    }
    out
}
