mod common;

use color_eyre::Result;
use gdpdash::error::ErrorCategory;
use gdpdash::{LoadOptions, Loader, SnapshotFormat};
use tempfile::TempDir;

#[test]
fn test_load_local_parquet() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_parquet(dir.path(), "gdp.parquet", common::gdp_frame());

    let loader = Loader::new();
    let table = loader.load(path.to_str().unwrap(), &LoadOptions::default())?;

    assert_eq!(table.height(), 10);
    assert!(table.has_column("year"));
    assert!(table.has_column("year_str"));
    let dates = table.date_values("date")?;
    assert!(dates.iter().flatten().all(|d| d.and_utc().timestamp_subsec_nanos() == 0));
    Ok(())
}

#[test]
fn test_load_local_csv() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_csv(dir.path(), "gdp.csv", common::gdp_frame());

    let table = Loader::new().load(path.to_str().unwrap(), &LoadOptions::default())?;
    let mut years: Vec<i32> = table.year_values()?.into_iter().flatten().collect();
    years.dedup();
    assert_eq!(years, vec![2019, 2020, 2021, 2022, 2023]);
    assert_eq!(table.numeric_values("value")?[4], Some(121.0));
    Ok(())
}

#[test]
fn test_format_override() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_csv(dir.path(), "gdp.data", common::gdp_frame());
    let options = LoadOptions::new().with_format(SnapshotFormat::Csv);
    let table = Loader::new().load(path.to_str().unwrap(), &options)?;
    assert_eq!(table.height(), 10);
    Ok(())
}

#[test]
fn test_cache_serves_repeat_loads() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_parquet(dir.path(), "gdp.parquet", common::gdp_frame());
    let source = path.to_str().unwrap().to_string();

    let loader = Loader::new();
    let first = loader.load(&source, &LoadOptions::default())?;
    std::fs::remove_file(&path)?;

    // The file is gone; only the cache can answer.
    let second = loader.load(&source, &LoadOptions::default())?;
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    let restricted = loader.load(&source, &LoadOptions::new().with_min_year(2022))?;
    assert_eq!(restricted.height(), 4);
    Ok(())
}

#[test]
fn test_failed_reload_keeps_cached_table() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_parquet(dir.path(), "gdp.parquet", common::gdp_frame());
    let source = path.to_str().unwrap().to_string();

    let loader = Loader::new();
    loader.load(&source, &LoadOptions::default())?;
    std::fs::write(&path, b"corrupted")?;

    let err = loader
        .reload(&source, &LoadOptions::default())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    assert_eq!(loader.cache().cached_source(), Some(source.clone()));
    assert!(loader.cache().get(&source).is_some());
    Ok(())
}

#[test]
fn test_invalidate_forces_fetch() -> Result<()> {
    let dir = TempDir::new()?;
    let path = common::write_parquet(dir.path(), "gdp.parquet", common::gdp_frame());
    let source = path.to_str().unwrap().to_string();

    let loader = Loader::new();
    loader.load(&source, &LoadOptions::default())?;
    loader.invalidate();
    std::fs::remove_file(&path)?;

    let err = loader
        .load(&source, &LoadOptions::default())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Network);
    assert!(loader.cache().cached_source().is_none());
    Ok(())
}

#[test]
fn test_missing_date_column_is_schema_error() -> Result<()> {
    let dir = TempDir::new()?;
    let frame = common::gdp_frame().drop("date")?;
    let path = common::write_parquet(dir.path(), "nodate.parquet", frame);

    let err = Loader::new()
        .load(path.to_str().unwrap(), &LoadOptions::default())
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Schema);
    Ok(())
}

#[test]
fn test_custom_date_column() -> Result<()> {
    let dir = TempDir::new()?;
    let mut frame = common::gdp_frame();
    frame.rename("date", "period".into())?;
    let path = common::write_parquet(dir.path(), "period.parquet", frame);

    let options = LoadOptions::new().with_date_column("period");
    let table = Loader::new().load(path.to_str().unwrap(), &options)?;
    assert_eq!(table.date_column(), Some("period"));
    Ok(())
}
