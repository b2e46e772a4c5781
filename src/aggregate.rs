//! Year-keyed aggregation and the derived figures built on it.

use crate::error::{ViewError, ViewResult};
use crate::schema::quantile_sorted;
use crate::table::Table;
use gdpdash_cli::StatArg;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Statistic applied to the non-missing values of each year group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Mean,
    Sum,
    Median,
}

impl Statistic {
    /// Applies the statistic to `values`; `None` when there are no values.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Statistic::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Statistic::Sum => Some(values.iter().sum()),
            Statistic::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                quantile_sorted(&sorted, 0.5)
            }
        }
    }
}

impl From<StatArg> for Statistic {
    fn from(arg: StatArg) -> Self {
        match arg {
            StatArg::Mean => Statistic::Mean,
            StatArg::Sum => Statistic::Sum,
            StatArg::Median => Statistic::Median,
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statistic::Mean => write!(f, "mean"),
            Statistic::Sum => write!(f, "sum"),
            Statistic::Median => write!(f, "median"),
        }
    }
}

/// Inclusive year range. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start.is_none_or(|s| year >= s) && self.end.is_none_or(|e| year <= e)
    }
}

/// Summary value per year, ascending by year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub metric: String,
    pub statistic: Statistic,
    pub values: BTreeMap<i32, f64>,
    /// Non-missing values that went into each year's figure.
    pub counts: BTreeMap<i32, usize>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied()
    }
}

/// Non-missing values of `metric` grouped by year. Rows without a year are dropped.
fn group_by_year(table: &Table, metric: &str) -> ViewResult<BTreeMap<i32, Vec<f64>>> {
    let values = table.numeric_values(metric)?;
    let years = table.year_values()?;
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (year, value) in years.into_iter().zip(values) {
        if let (Some(year), Some(value)) = (year, value) {
            groups.entry(year).or_default().push(value);
        }
    }
    Ok(groups)
}

/// Groups `metric` by year within `range` and applies `stat` to each group.
/// Years with no non-missing values produce no entry.
pub fn aggregate(
    table: &Table,
    metric: &str,
    stat: Statistic,
    range: YearRange,
) -> ViewResult<AggregationResult> {
    let mut values = BTreeMap::new();
    let mut counts = BTreeMap::new();
    for (year, group) in group_by_year(table, metric)? {
        if !range.contains(year) {
            continue;
        }
        if let Some(v) = stat.apply(&group) {
            values.insert(year, v);
            counts.insert(year, group.len());
        }
    }
    Ok(AggregationResult {
        metric: metric.to_string(),
        statistic: stat,
        values,
        counts,
    })
}

/// Errors with [`ViewError::EmptyResult`] when the aggregation has no years.
pub fn require_non_empty(result: AggregationResult) -> ViewResult<AggregationResult> {
    if result.is_empty() {
        return Err(ViewError::EmptyResult(format!(
            "{} of {}",
            result.statistic, result.metric
        )));
    }
    Ok(result)
}

/// Percentage change from `previous` to `latest`; 0 when `previous` is 0.
pub fn growth(latest: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (latest - previous) / previous * 100.0
}

/// Two compared periods of one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearComparison {
    pub metric: String,
    pub previous_year: i32,
    pub previous_value: f64,
    pub latest_year: i32,
    pub latest_value: f64,
    pub growth_pct: f64,
}

/// Compares the `stat` of `metric` between two years.
pub fn compare_years(
    table: &Table,
    metric: &str,
    stat: Statistic,
    previous: i32,
    latest: i32,
) -> ViewResult<YearComparison> {
    let result = aggregate(table, metric, stat, YearRange::default())?;
    let value_for = |year: i32| {
        result
            .get(year)
            .ok_or_else(|| ViewError::EmptyResult(format!("{} in {}", metric, year)))
    };
    let previous_value = value_for(previous)?;
    let latest_value = value_for(latest)?;
    Ok(YearComparison {
        metric: metric.to_string(),
        previous_year: previous,
        previous_value,
        latest_year: latest,
        latest_value,
        growth_pct: growth(latest_value, previous_value),
    })
}

/// Latest year against the year before it (or the next most recent year with data), by mean.
pub fn key_indicator(table: &Table, metric: &str) -> ViewResult<YearComparison> {
    let result = aggregate(table, metric, Statistic::Mean, YearRange::default())?;
    let years: Vec<i32> = result.values.keys().copied().collect();
    let (latest, fallback) = match years.as_slice() {
        [.., prev, last] => (*last, *prev),
        _ => {
            return Err(ViewError::InsufficientYears {
                required: 2,
                found: years.len(),
            })
        }
    };
    let previous = if result.values.contains_key(&(latest - 1)) {
        latest - 1
    } else {
        fallback
    };
    compare_years(table, metric, Statistic::Mean, previous, latest)
}

/// Pearson correlation of paired values.
///
/// `None` below two pairs, and when either side has zero variance (the coefficient is undefined).
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    let denominator = (sum_sq_x * sum_sq_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((numerator / denominator).clamp(-1.0, 1.0))
}

/// Pearson correlation between two metric columns over rows where both are present.
pub fn correlate(table: &Table, x: &str, y: &str) -> ViewResult<Option<f64>> {
    let xs = table.numeric_values(x)?;
    let ys = table.numeric_values(y)?;
    let pairs: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect();
    Ok(pearson(&pairs))
}

/// Per-year sums of `metric` for the requested years that have data.
/// Declined with [`ViewError::InsufficientYears`] when fewer than two qualify.
pub fn shares(table: &Table, metric: &str, years: &[i32]) -> ViewResult<BTreeMap<i32, f64>> {
    let wanted: BTreeSet<i32> = years.iter().copied().collect();
    let sums: BTreeMap<i32, f64> = aggregate(table, metric, Statistic::Sum, YearRange::default())?
        .values
        .into_iter()
        .filter(|(year, _)| wanted.contains(year))
        .collect();
    if sums.len() < 2 {
        return Err(ViewError::InsufficientYears {
            required: 2,
            found: sums.len(),
        });
    }
    Ok(sums)
}

/// The `n` most recent years in the table, newest first.
pub fn recent_years(table: &Table, n: usize) -> ViewResult<Vec<i32>> {
    let years: BTreeSet<i32> = table.year_values()?.into_iter().flatten().collect();
    Ok(years.into_iter().rev().take(n).collect())
}

/// Mean, median and sum over a whole metric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub metric: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub sum: f64,
}

pub fn column_summary(table: &Table, metric: &str) -> ViewResult<ColumnSummary> {
    let values: Vec<f64> = table.numeric_values(metric)?.into_iter().flatten().collect();
    Ok(ColumnSummary {
        metric: metric.to_string(),
        count: values.len(),
        mean: Statistic::Mean.apply(&values),
        median: Statistic::Median.apply(&values),
        sum: values.iter().sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn gdp() -> Table {
        let frame = df!(
            "year" => &[2019, 2020, 2021, 2022, 2023],
            "gdp" => &[100.0_f64, 110.0, 121.0, 115.0, 130.0],
            "flat" => &[5.0_f64; 5]
        )
        .unwrap();
        Table::new(frame, None)
    }

    fn grouped() -> Table {
        let frame = df!(
            "year" => &[Some(2020), Some(2020), Some(2021), Some(2021), Some(2022), None],
            "value" => &[Some(1.0_f64), Some(3.0), Some(f64::NAN), None, Some(7.0), Some(9.0)]
        )
        .unwrap();
        Table::new(frame, None)
    }

    #[test]
    fn aggregate_skips_missing_values_and_years() {
        let result = aggregate(&grouped(), "value", Statistic::Mean, YearRange::default()).unwrap();
        assert_eq!(result.values.len(), 2);
        assert_eq!(result.get(2020), Some(2.0));
        assert_eq!(result.get(2021), None);
        assert_eq!(result.counts[&2022], 1);
        assert!(result.counts.values().sum::<usize>() <= 6);
    }

    #[test]
    fn aggregate_statistics() {
        let t = grouped();
        let sum = aggregate(&t, "value", Statistic::Sum, YearRange::default()).unwrap();
        assert_eq!(sum.get(2020), Some(4.0));
        let median = aggregate(&t, "value", Statistic::Median, YearRange::default()).unwrap();
        assert_eq!(median.get(2020), Some(2.0));
    }

    #[test]
    fn aggregate_respects_year_range() {
        let result = aggregate(
            &gdp(),
            "gdp",
            Statistic::Mean,
            YearRange::new(Some(2020), Some(2021)),
        )
        .unwrap();
        assert_eq!(result.values.keys().copied().collect::<Vec<_>>(), vec![2020, 2021]);
    }

    #[test]
    fn aggregate_unknown_metric_errors() {
        let err = aggregate(&gdp(), "nope", Statistic::Mean, YearRange::default()).unwrap_err();
        assert!(matches!(err, ViewError::ColumnNotFound(_)));
    }

    #[test]
    fn require_non_empty_rejects_empty() {
        let result = aggregate(
            &gdp(),
            "gdp",
            Statistic::Mean,
            YearRange::new(Some(1990), Some(1995)),
        )
        .unwrap();
        assert!(result.is_empty());
        assert!(matches!(
            require_non_empty(result),
            Err(ViewError::EmptyResult(_))
        ));
    }

    #[test]
    fn growth_cases() {
        assert_eq!(growth(100.0, 50.0), 100.0);
        assert_eq!(growth(50.0, 0.0), 0.0);
        assert_eq!(growth(42.0, 42.0), 0.0);
    }

    #[test]
    fn gdp_key_indicator() {
        let ki = key_indicator(&gdp(), "gdp").unwrap();
        assert_eq!((ki.previous_year, ki.latest_year), (2022, 2023));
        assert!((ki.growth_pct - 13.043_478).abs() < 1e-4);
    }

    #[test]
    fn key_indicator_falls_back_to_previous_year_with_data() {
        let frame = df!("year" => &[2015, 2020], "gdp" => &[1.0_f64, 2.0]).unwrap();
        let ki = key_indicator(&Table::new(frame, None), "gdp").unwrap();
        assert_eq!(ki.previous_year, 2015);
        assert_eq!(ki.growth_pct, 100.0);
    }

    #[test]
    fn key_indicator_needs_two_years() {
        let frame = df!("year" => &[2020], "gdp" => &[1.0_f64]).unwrap();
        let err = key_indicator(&Table::new(frame, None), "gdp").unwrap_err();
        assert!(matches!(err, ViewError::InsufficientYears { found: 1, .. }));
    }

    #[test]
    fn compare_missing_year_is_empty_result() {
        let err = compare_years(&gdp(), "gdp", Statistic::Mean, 2010, 2023).unwrap_err();
        assert!(matches!(err, ViewError::EmptyResult(_)));
    }

    #[test]
    fn correlation_bounds() {
        let t = gdp();
        let r = correlate(&t, "gdp", "year").unwrap().unwrap();
        assert!((-1.0..=1.0).contains(&r));
        let same = correlate(&t, "gdp", "gdp").unwrap().unwrap();
        assert!((same - 1.0).abs() < 1e-12);
        assert_eq!(correlate(&t, "gdp", "flat").unwrap(), None);
    }

    #[test]
    fn constant_column_has_undefined_correlation() {
        let frame = df!("a" => &[1.0_f64, 2.0, 3.0], "b" => &[5.0_f64, 5.0, 5.0]).unwrap();
        let t = Table::new(frame, None);
        assert_eq!(correlate(&t, "a", "b").unwrap(), None);
        assert_eq!(pearson(&[(1.0, 5.0), (2.0, 5.0)]), None);
    }

    #[test]
    fn correlation_needs_two_pairs() {
        let frame = df!(
            "a" => &[Some(1.0_f64), None, Some(3.0)],
            "b" => &[Some(2.0_f64), Some(5.0), None]
        )
        .unwrap();
        assert_eq!(correlate(&Table::new(frame, None), "a", "b").unwrap(), None);
    }

    #[test]
    fn shares_need_two_years() {
        let t = gdp();
        let err = shares(&t, "gdp", &[2023]).unwrap_err();
        assert!(matches!(err, ViewError::InsufficientYears { found: 1, .. }));
        let ok = shares(&t, "gdp", &[2023, 2022, 1990]).unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[&2022], 115.0);
    }

    #[test]
    fn recent_years_newest_first() {
        assert_eq!(recent_years(&gdp(), 3).unwrap(), vec![2023, 2022, 2021]);
        assert_eq!(recent_years(&gdp(), 10).unwrap().len(), 5);
    }

    #[test]
    fn column_summary_whole_column() {
        let s = column_summary(&gdp(), "gdp").unwrap();
        assert_eq!(s.count, 5);
        assert_eq!(s.sum, 576.0);
        assert_eq!(s.median, Some(115.0));
    }
}
