//! Row selection over a loaded table: free-text search, structured predicates and pagination.

use crate::error::{ViewError, ViewResult};
use crate::table::Table;
use polars::prelude::*;
use regex::Regex;
use serde::Serialize;

/// Rows where the case-insensitive string form of any value contains `term`.
/// An empty term returns the table unchanged; nulls never match.
pub fn search(table: &Table, term: &str) -> ViewResult<Table> {
    if term.is_empty() {
        return Ok(table.clone());
    }
    let needle = term.to_lowercase();
    let mut mask = vec![false; table.height()];
    for name in table.column_names() {
        for (hit, value) in mask.iter_mut().zip(table.string_values(&name)?) {
            if !*hit {
                *hit = value.is_some_and(|v| v.to_lowercase().contains(&needle));
            }
        }
    }
    apply_mask(table, &mask)
}

/// Structured row condition. Bounds are inclusive; `None` leaves that side open.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// String form of the value equals `value` exactly.
    Equals { column: String, value: String },
    Range {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    YearRange { start: Option<i32>, end: Option<i32> },
    /// Regular expression matched against the string form of the value.
    Matches { column: String, pattern: String },
}

/// Rows for which every predicate holds. Original row order is kept.
pub fn filter(table: &Table, predicates: &[Predicate]) -> ViewResult<Table> {
    if predicates.is_empty() {
        return Ok(table.clone());
    }
    let mut mask = vec![true; table.height()];
    for predicate in predicates {
        let holds = evaluate(table, predicate)?;
        for (keep, ok) in mask.iter_mut().zip(holds) {
            *keep = *keep && ok;
        }
    }
    apply_mask(table, &mask)
}

fn evaluate(table: &Table, predicate: &Predicate) -> ViewResult<Vec<bool>> {
    match predicate {
        Predicate::Equals { column, value } => Ok(table
            .string_values(column)?
            .into_iter()
            .map(|v| v.as_deref() == Some(value.as_str()))
            .collect()),
        Predicate::Range { column, min, max } => Ok(table
            .numeric_values(column)?
            .into_iter()
            .map(|v| {
                v.is_some_and(|v| min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m))
            })
            .collect()),
        Predicate::YearRange { start, end } => Ok(table
            .year_values()?
            .into_iter()
            .map(|y| {
                y.is_some_and(|y| start.is_none_or(|s| y >= s) && end.is_none_or(|e| y <= e))
            })
            .collect()),
        Predicate::Matches { column, pattern } => {
            let re = Regex::new(pattern)
                .map_err(|e| ViewError::InvalidPredicate(format!("{}: {}", pattern, e)))?;
            Ok(table
                .string_values(column)?
                .into_iter()
                .map(|v| v.is_some_and(|v| re.is_match(&v)))
                .collect())
        }
    }
}

fn apply_mask(table: &Table, mask: &[bool]) -> ViewResult<Table> {
    let mask = BooleanChunked::from_slice("mask".into(), mask);
    Ok(table.with_frame(table.frame().filter(&mask)?))
}

/// One window of table rows.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    #[serde(skip)]
    pub rows: Table,
    /// 1-based page number after clamping.
    pub page: usize,
    pub total_pages: usize,
    /// 1-based index of the first row shown; 0 when the table is empty.
    pub start_row: usize,
    pub end_row: usize,
    pub total_rows: usize,
}

impl Page {
    /// "Showing rows X to Y of N" line for the table view.
    pub fn summary(&self) -> String {
        format!(
            "Showing rows {} to {} of {} (page {} of {})",
            self.start_row, self.end_row, self.total_rows, self.page, self.total_pages
        )
    }
}

/// Slices `table` into page `page_number` of `page_size` rows.
///
/// `total_pages` is `max(1, rows / page_size)` (floor), so the last page also carries the
/// remainder rows. Out-of-range page numbers clamp to the first or last page.
pub fn paginate(table: &Table, page_size: usize, page_number: usize) -> Page {
    let page_size = page_size.max(1);
    let total_rows = table.height();
    let total_pages = (total_rows / page_size).max(1);
    let page = page_number.clamp(1, total_pages);

    let offset = (page - 1) * page_size;
    let len = if page == total_pages {
        total_rows.saturating_sub(offset)
    } else {
        page_size
    };
    let frame = table.frame().slice(offset as i64, len);

    Page {
        rows: table.with_frame(frame),
        page,
        total_pages,
        start_row: if len == 0 { 0 } else { offset + 1 },
        end_row: offset + len,
        total_rows,
    }
}
