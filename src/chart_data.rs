//! Shape aggregation results into ordered series and per-chart feeds for the chart gallery.

use crate::aggregate::{pearson, AggregationResult, YearRange};
use crate::error::{ViewError, ViewResult};
use crate::table::Table;
use chrono::Datelike;
use gdpdash_cli::{ChartArg, OrderArg};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Ordering of series keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesOrder {
    #[default]
    Ascending,
    Descending,
}

impl From<OrderArg> for SeriesOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Ascending => SeriesOrder::Ascending,
            OrderArg::Descending => SeriesOrder::Descending,
        }
    }
}

/// Chart gallery entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Pie,
    Heatmap,
    Scatter,
    StackedArea,
}

impl From<ChartArg> for ChartKind {
    fn from(arg: ChartArg) -> Self {
        match arg {
            ChartArg::Line => ChartKind::Line,
            ChartArg::Bar => ChartKind::Bar,
            ChartArg::Pie => ChartKind::Pie,
            ChartArg::Heatmap => ChartKind::Heatmap,
            ChartArg::Scatter => ChartKind::Scatter,
            ChartArg::StackedArea => ChartKind::StackedArea,
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Scatter => "scatter",
            ChartKind::StackedArea => "stacked-area",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: i32,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamedSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// One `(key, value)` point per aggregated year, in the requested order.
/// Never filters or recomputes values.
pub fn prepare_series(result: &AggregationResult, order: SeriesOrder) -> Vec<SeriesPoint> {
    let points = result
        .values
        .iter()
        .map(|(&key, &value)| SeriesPoint { key, value });
    match order {
        SeriesOrder::Ascending => points.collect(),
        SeriesOrder::Descending => points.rev().collect(),
    }
}

/// One named series per metric (line and stacked-area charts).
pub fn prepare_multi_series(results: &[AggregationResult], order: SeriesOrder) -> Vec<NamedSeries> {
    results
        .iter()
        .map(|r| NamedSeries {
            name: r.metric.clone(),
            points: prepare_series(r, order),
        })
        .collect()
}

/// Bars for the requested years in the caller's order. Years absent from the result are skipped.
pub fn prepare_bar(result: &AggregationResult, years: &[i32]) -> Vec<SeriesPoint> {
    years
        .iter()
        .filter_map(|&key| result.get(key).map(|value| SeriesPoint { key, value }))
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ShareSlice {
    pub year: i32,
    pub value: f64,
    /// Part of the total across all slices, 0..=1.
    pub fraction: f64,
}

/// Pie slices from per-year totals, newest year first.
pub fn prepare_shares(shares: &BTreeMap<i32, f64>) -> Vec<ShareSlice> {
    let total: f64 = shares.values().sum();
    shares
        .iter()
        .rev()
        .map(|(&year, &value)| ShareSlice {
            year,
            value,
            fraction: if total == 0.0 { 0.0 } else { value / total },
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub year: Option<i32>,
    /// Value of the colour metric on the same row, when one is set.
    pub color: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScatterFeed {
    pub x_metric: String,
    pub y_metric: String,
    pub color_metric: Option<String>,
    pub points: Vec<ScatterPoint>,
    pub correlation: f64,
}

/// Finite `(x, y)` points of two distinct metrics with their Pearson correlation.
///
/// Points may be coloured by any numeric column. Declined when fewer than two points
/// remain or when the correlation is undefined because one side is constant.
pub fn prepare_scatter(
    table: &Table,
    x: &str,
    y: &str,
    color: Option<&str>,
) -> ViewResult<ScatterFeed> {
    if x == y {
        return Err(ViewError::SameMetric(x.to_string()));
    }
    let colors = match color {
        Some(name) => table.numeric_values(name)?,
        None => vec![None; table.height()],
    };
    let xs = table.numeric_values(x)?;
    let ys = table.numeric_values(y)?;
    let years = table.year_values().unwrap_or_else(|_| vec![None; table.height()]);

    let points: Vec<ScatterPoint> = xs
        .into_iter()
        .zip(ys)
        .zip(years)
        .zip(colors)
        .filter_map(|(((x, y), year), color)| {
            let (x, y) = (x?, y?);
            (x.is_finite() && y.is_finite()).then_some(ScatterPoint { x, y, year, color })
        })
        .collect();
    if points.len() < 2 {
        return Err(ViewError::InsufficientPairs {
            found: points.len(),
        });
    }
    let pairs: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    let correlation = pearson(&pairs).ok_or_else(|| ViewError::UndefinedCorrelation {
        x: x.to_string(),
        y: y.to_string(),
    })?;
    Ok(ScatterFeed {
        x_metric: x.to_string(),
        y_metric: y.to_string(),
        color_metric: color.map(str::to_string),
        points,
        correlation,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub year: i32,
    /// Calendar quarter, 1..=4.
    pub quarter: u32,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapFeed {
    pub metric: String,
    pub years: Vec<i32>,
    pub cells: Vec<HeatmapCell>,
}

/// Year by quarter grid of `metric` means, taken from the table's own dates.
///
/// Declined when fewer than two years are in range, or when every year holds a single
/// quarter (annual data has no quarterly breakdown).
pub fn prepare_heatmap(table: &Table, metric: &str, range: YearRange) -> ViewResult<HeatmapFeed> {
    let date_column = table
        .date_column()
        .ok_or_else(|| ViewError::NotTemporal("(no date column)".to_string()))?;
    let dates = table.date_values(date_column)?;
    let values = table.numeric_values(metric)?;

    let mut groups: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
    for (date, value) in dates.into_iter().zip(values) {
        let (Some(date), Some(value)) = (date, value) else {
            continue;
        };
        if !range.contains(date.year()) {
            continue;
        }
        let quarter = date.month0() / 3 + 1;
        groups.entry((date.year(), quarter)).or_default().push(value);
    }

    let years: BTreeSet<i32> = groups.keys().map(|(year, _)| *year).collect();
    if years.len() < 2 {
        return Err(ViewError::InsufficientYears {
            required: 2,
            found: years.len(),
        });
    }
    let sub_annual = years
        .iter()
        .any(|y| groups.keys().filter(|(year, _)| year == y).count() > 1);
    if !sub_annual {
        return Err(ViewError::NoSubAnnualData(date_column.to_string()));
    }

    let cells = groups
        .into_iter()
        .map(|((year, quarter), group)| HeatmapCell {
            year,
            quarter,
            value: group.iter().sum::<f64>() / group.len() as f64,
        })
        .collect();
    Ok(HeatmapFeed {
        metric: metric.to_string(),
        years: years.into_iter().collect(),
        cells,
    })
}

/// Thousands-separated value with two decimals, e.g. `1,234,567.89`.
pub fn format_value(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Compact axis label: scientific notation for very large or very small magnitudes.
pub fn format_axis_label(v: f64) -> String {
    if v.abs() >= 1e6 || (v.abs() < 1e-2 && v != 0.0) {
        format!("{:.2e}", v)
    } else {
        format!("{:.2}", v)
    }
}
