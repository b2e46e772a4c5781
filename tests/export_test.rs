mod common;

use color_eyre::Result;
use gdpdash::export::{export_csv, import_csv, write_csv_file, ExportMode, FULL_FILE_NAME};
use gdpdash::{LoadOptions, Loader};
use tempfile::TempDir;

#[test]
fn test_round_trip_with_schema() -> Result<()> {
    let table = common::gdp_table();
    let bytes = export_csv(&table, ExportMode::Full)?;
    let back = import_csv(&bytes, Some(&**table.frame().schema()))?;

    assert_eq!(back.get_column_names(), table.frame().get_column_names());
    assert!(back.equals_missing(table.frame()));
    Ok(())
}

#[test]
fn test_exported_file_loads_again() -> Result<()> {
    let dir = TempDir::new()?;
    let table = common::gdp_table();
    let path = write_csv_file(&table, ExportMode::Full, dir.path())?;
    assert_eq!(path.file_name().unwrap(), FULL_FILE_NAME);

    let reloaded = Loader::new().load(path.to_str().unwrap(), &LoadOptions::default())?;
    assert_eq!(reloaded.height(), table.height());
    assert_eq!(reloaded.year_values()?, table.year_values()?);
    assert_eq!(reloaded.numeric_values("value")?, table.numeric_values("value")?);
    assert_eq!(reloaded.date_values("date")?, table.date_values("date")?);
    Ok(())
}

#[test]
fn test_simplified_export_has_plain_dates() -> Result<()> {
    let table = common::gdp_table();
    let csv = String::from_utf8(export_csv(&table, ExportMode::Simplified)?)?;
    let first_row = csv.lines().nth(1).unwrap();
    assert!(first_row.starts_with("2019-01-01,p0,100"));
    assert_eq!(csv.lines().count(), table.height() + 1);
    Ok(())
}
