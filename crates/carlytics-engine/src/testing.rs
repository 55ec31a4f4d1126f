//! Shared fixtures for unit tests.

use std::path::{Path, PathBuf};

use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;
use tempfile::TempDir;

use crate::config::{ColumnMap, SourceConfig};

/// A CSV file in its own temporary directory, removed on drop.
pub(crate) struct CsvFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl CsvFixture {
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

pub(crate) fn write_csv(contents: &str) -> CsvFixture {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("vehicles.csv");
    std::fs::write(&path, contents).expect("write fixture csv");
    CsvFixture { _dir: dir, path }
}

pub(crate) fn source_config(path: &Path) -> SourceConfig {
    SourceConfig {
        path: path.to_path_buf(),
        delimiter: ",".to_string(),
        schema_infer_max_records: 1000,
        columns: ColumnMap::default(),
    }
}

/// Render batches as a table, one string per line, for order-sensitive asserts.
pub(crate) fn render(batches: &[RecordBatch]) -> Vec<String> {
    pretty_format_batches(batches)
        .expect("format batches")
        .to_string()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Listings covering every report, including nulls in optional columns and
/// one record missing a required field.
pub(crate) const LISTINGS: &str = "\
make,model,price,year,mileage,transmission,Fuel Type,Color,Cylinders
Toyota,Corolla,20000,2020,30000,Automatic,Gasoline,White,4
Toyota,Camry,25000,2019,40000,Automatic,Gasoline,Black,4
BMW,X5,65000,2022,15000,Automatic,Diesel,Black,6
BMW,M3,72000,2021,120000,Manual,Gasoline,Blue,6
Kia,Rio,8000,2015,140000,Manual,Gasoline,Red,4
Ford,F-150,30000,2018,90000,Automatic,Diesel,,8
Ford,Focus,9999.5,2016,110000,,Gasoline,White,
Ford,,15000,2017,80000,Manual,Gasoline,Grey,4
";
