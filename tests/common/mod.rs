#![allow(dead_code)]

use gdpdash::loader::{prepare_table, LoadOptions};
use gdpdash::Table;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Total GDP per year, 2019 to 2023.
pub const GDP_TOTAL: [f64; 5] = [100.0, 110.0, 121.0, 115.0, 130.0];

/// Nanosecond timestamp of 1 January of `year` plus a sub-second offset, as stored upstream.
fn jan_first_ns(year: i32) -> i64 {
    let days = (year - 1970) as i64 * 365 + ((year - 1969) / 4) as i64;
    days * 86_400 * 1_000_000_000 + 123_456_789
}

/// Long-format snapshot: one row per (year, sector), with a missing agriculture value in 2021.
pub fn gdp_frame() -> DataFrame {
    let years = [2019, 2020, 2021, 2022, 2023];
    let mut dates = Vec::new();
    let mut sectors = Vec::new();
    let mut values = Vec::new();
    for (i, year) in years.iter().enumerate() {
        dates.push(jan_first_ns(*year));
        sectors.push("p0");
        values.push(Some(GDP_TOTAL[i]));

        dates.push(jan_first_ns(*year));
        sectors.push("agriculture");
        values.push(if *year == 2021 {
            None
        } else {
            Some(GDP_TOTAL[i] / 10.0)
        });
    }
    let date = Series::new("date".into(), dates)
        .cast(&DataType::Datetime(TimeUnit::Nanoseconds, None))
        .unwrap();
    DataFrame::new(vec![
        date.into(),
        Series::new("sector".into(), sectors).into(),
        Series::new("value".into(), values).into(),
    ])
    .unwrap()
}

pub fn gdp_table() -> Table {
    prepare_table(gdp_frame(), &LoadOptions::default()).unwrap()
}

pub fn write_parquet(dir: &Path, name: &str, mut df: DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    ParquetWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

pub fn write_csv(dir: &Path, name: &str, mut df: DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}
