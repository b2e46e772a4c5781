//! Column metadata and summary statistics derived from a loaded table.

use crate::error::ViewResult;
use crate::table::{Table, YEAR_COLUMN};
use chrono::NaiveDateTime;
use polars::prelude::DataType;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Semantic type of a column, decided from its stored dtype only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Numeric,
    Date,
    Text,
}

impl SemanticType {
    pub fn of(dtype: &DataType) -> Self {
        if dtype.is_numeric() {
            SemanticType::Numeric
        } else if matches!(dtype, DataType::Date | DataType::Datetime(_, _)) {
            SemanticType::Date
        } else {
            SemanticType::Text
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticType::Numeric => write!(f, "numeric"),
            SemanticType::Date => write!(f, "date"),
            SemanticType::Text => write!(f, "text"),
        }
    }
}

/// Smallest or largest non-missing value of a numeric or date column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Bound {
    Numeric(f64),
    Date(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Storage type as reported by polars (e.g. `f64`, `datetime[ns]`).
    pub dtype: String,
    pub missing: usize,
    pub distinct: usize,
    /// `None` for text columns and for columns where every value is missing.
    pub min: Option<Bound>,
    pub max: Option<Bound>,
}

/// `describe()`-style summary of one numeric column. Quantiles interpolate linearly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (ddof = 1); `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Describes every column of the table, in column order.
pub fn describe(table: &Table) -> ViewResult<Vec<ColumnDescriptor>> {
    let mut descriptors = Vec::with_capacity(table.width());
    for column in table.frame().get_columns() {
        let name = column.name().to_string();
        let semantic_type = SemanticType::of(column.dtype());
        let dtype = column.dtype().to_string();

        let descriptor = match semantic_type {
            SemanticType::Numeric => {
                let values = table.numeric_values(&name)?;
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                let distinct = present
                    .iter()
                    .map(|v| if *v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() })
                    .collect::<HashSet<_>>()
                    .len();
                let min = present.iter().copied().reduce(f64::min).map(Bound::Numeric);
                let max = present.iter().copied().reduce(f64::max).map(Bound::Numeric);
                ColumnDescriptor {
                    name,
                    semantic_type,
                    dtype,
                    missing: values.len() - present.len(),
                    distinct,
                    min,
                    max,
                }
            }
            SemanticType::Date => {
                let values = table.date_values(&name)?;
                let present: Vec<NaiveDateTime> = values.iter().flatten().copied().collect();
                let distinct = present.iter().collect::<HashSet<_>>().len();
                ColumnDescriptor {
                    missing: values.len() - present.len(),
                    distinct,
                    min: present.iter().min().copied().map(Bound::Date),
                    max: present.iter().max().copied().map(Bound::Date),
                    name,
                    semantic_type,
                    dtype,
                }
            }
            SemanticType::Text => {
                let values = table.string_values(&name)?;
                let distinct = values.iter().flatten().collect::<HashSet<_>>().len();
                ColumnDescriptor {
                    missing: column.null_count(),
                    distinct,
                    min: None,
                    max: None,
                    name,
                    semantic_type,
                    dtype,
                }
            }
        };
        descriptors.push(descriptor);
    }
    Ok(descriptors)
}

/// Numeric columns usable as metrics: every numeric column except the derived year.
pub fn metric_columns(table: &Table) -> Vec<String> {
    table
        .frame()
        .get_columns()
        .iter()
        .filter(|c| c.dtype().is_numeric() && c.name().as_str() != YEAR_COLUMN)
        .map(|c| c.name().to_string())
        .collect()
}

/// Sorted distinct years present in the table.
pub fn years(table: &Table) -> ViewResult<Vec<i32>> {
    let years: BTreeSet<i32> = table.year_values()?.into_iter().flatten().collect();
    Ok(years.into_iter().collect())
}

/// Number of columns per semantic type.
pub fn type_counts(table: &Table) -> BTreeMap<SemanticType, usize> {
    let mut counts = BTreeMap::new();
    for column in table.frame().get_columns() {
        *counts.entry(SemanticType::of(column.dtype())).or_insert(0) += 1;
    }
    counts
}

/// Columns that have at least one missing value.
pub fn missing_report(descriptors: &[ColumnDescriptor]) -> Vec<MissingCount> {
    descriptors
        .iter()
        .filter(|d| d.missing > 0)
        .map(|d| MissingCount {
            column: d.name.clone(),
            missing: d.missing,
        })
        .collect()
}

/// Count, mean, std, min, quartiles and max for each metric column.
pub fn numeric_summary(table: &Table) -> ViewResult<Vec<NumericSummary>> {
    metric_columns(table)
        .into_iter()
        .map(|column| {
            let mut values: Vec<f64> = table.numeric_values(&column)?.into_iter().flatten().collect();
            values.sort_by(f64::total_cmp);
            Ok(summarize(column, &values))
        })
        .collect()
}

fn summarize(column: String, sorted: &[f64]) -> NumericSummary {
    let count = sorted.len();
    let mean = (count > 0).then(|| sorted.iter().sum::<f64>() / count as f64);
    let std = match mean {
        Some(m) if count > 1 => {
            let var = sorted.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (count - 1) as f64;
            Some(var.sqrt())
        }
        _ => None,
    };
    NumericSummary {
        column,
        count,
        mean,
        std,
        min: sorted.first().copied(),
        q25: quantile_sorted(sorted, 0.25),
        median: quantile_sorted(sorted, 0.5),
        q75: quantile_sorted(sorted, 0.75),
        max: sorted.last().copied(),
    }
}

/// Linear-interpolated quantile of already sorted values.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn table() -> Table {
        let date = Series::new(
            "date".into(),
            &[Some(1_577_836_800_000_i64), None, Some(1_609_459_200_000)],
        )
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .unwrap();
        let frame = DataFrame::new(vec![
            date.into(),
            Series::new("year".into(), &[Some(2020), None, Some(2021)]).into(),
            Series::new("value".into(), &[Some(1.0_f64), Some(f64::NAN), Some(3.0)]).into(),
            Series::new("series".into(), &[Some("abs"), Some("abs"), None]).into(),
        ])
        .unwrap();
        Table::new(frame, Some("date".into()))
    }

    #[test]
    fn describe_classifies_and_counts() {
        let d = describe(&table()).unwrap();
        assert_eq!(d.len(), 4);

        assert_eq!(d[0].semantic_type, SemanticType::Date);
        assert_eq!(d[0].missing, 1);
        assert_eq!(d[0].distinct, 2);
        assert!(matches!(d[0].min, Some(Bound::Date(_))));

        assert_eq!(d[2].semantic_type, SemanticType::Numeric);
        assert_eq!(d[2].missing, 1);
        assert_eq!(d[2].min, Some(Bound::Numeric(1.0)));
        assert_eq!(d[2].max, Some(Bound::Numeric(3.0)));

        assert_eq!(d[3].semantic_type, SemanticType::Text);
        assert_eq!(d[3].missing, 1);
        assert_eq!(d[3].distinct, 1);
        assert_eq!(d[3].min, None);
    }

    #[test]
    fn all_missing_date_has_no_bounds() {
        let date = Series::new("date".into(), &[None::<i64>, None])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let t = Table::new(DataFrame::new(vec![date.into()]).unwrap(), None);
        let d = describe(&t).unwrap();
        assert_eq!(d[0].missing, 2);
        assert_eq!(d[0].min, None);
        assert_eq!(d[0].max, None);
    }

    #[test]
    fn metric_columns_exclude_year() {
        assert_eq!(metric_columns(&table()), vec!["value".to_string()]);
    }

    #[test]
    fn years_sorted_distinct() {
        assert_eq!(years(&table()).unwrap(), vec![2020, 2021]);
    }

    #[test]
    fn type_counts_and_missing_report() {
        let t = table();
        let counts = type_counts(&t);
        assert_eq!(counts[&SemanticType::Numeric], 2);
        assert_eq!(counts[&SemanticType::Date], 1);
        assert_eq!(counts[&SemanticType::Text], 1);
        let report = missing_report(&describe(&t).unwrap());
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn numeric_summary_quartiles() {
        let frame = df!("v" => &[1.0_f64, 2.0, 3.0, 4.0]).unwrap();
        let s = numeric_summary(&Table::new(frame, None)).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].count, 4);
        assert_eq!(s[0].mean, Some(2.5));
        assert_eq!(s[0].q25, Some(1.75));
        assert_eq!(s[0].median, Some(2.5));
        assert_eq!(s[0].q75, Some(3.25));
        let std = s[0].std.unwrap();
        assert!((std - 1.290_994_448_735_805_6).abs() < 1e-12);
    }
}
