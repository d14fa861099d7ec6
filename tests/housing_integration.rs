//! Integration tests for the housing job
//!
//! The MySQL side is replaced by a fixed in-memory table and the warehouse
//! by [`MemoryWarehouse`]; CSV output goes to a temporary directory.

use eyre::Result;
use mysql_bigquery_etl::config::WarehouseConfig;
use mysql_bigquery_etl::datasets::housing;
use mysql_bigquery_etl::error::EtlError;
use mysql_bigquery_etl::etl::Transformer;
use mysql_bigquery_etl::source::Source;
use mysql_bigquery_etl::table::{Table, Value};
use mysql_bigquery_etl::transform::{OnInvalid, Unpivot};
use mysql_bigquery_etl::warehouse::{MemoryWarehouse, Warehouse};
use std::sync::Arc;
use tempfile::TempDir;

/// Source answering every query with the same table
struct StaticSource {
    table: Table,
}

impl StaticSource {
    fn new(table: Table) -> Self {
        Self { table }
    }
}

impl Source for StaticSource {
    async fn fetch(&self, _query: &str) -> Result<Table> {
        Ok(self.table.clone())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

fn wide_prices() -> Table {
    Table::from_rows(
        vec![
            "Date".into(),
            "CA-San Francisco".into(),
            "NY-New York".into(),
            "TX-Fort-Worth".into(),
        ],
        vec![
            vec![
                "2000-01-31".into(),
                Value::Float(1500.5),
                Value::Int(900),
                Value::Null,
            ],
            vec![
                "2000-02-29".into(),
                "1510".into(),
                Value::Int(905),
                "n/a".into(),
            ],
        ],
    )
    .unwrap()
}

fn config() -> WarehouseConfig {
    WarehouseConfig::offline("etl-project").unwrap()
}

#[tokio::test]
async fn test_housing_end_to_end() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let source = StaticSource::new(wide_prices());

    let report = housing::run(source, warehouse.clone(), &config(), temp.path())
        .await
        .unwrap();

    // 2 rows x 3 series
    assert_eq!(report.extracted, 2);
    assert_eq!(report.transformed, 6);
    assert_eq!(report.loads.len(), 2);
    assert_eq!(report.loads[1].sink, "etl-project.house_price_data.house_prices");
    assert_eq!(report.loads[1].rows, 6);

    let csv = std::fs::read_to_string(housing::output_path(temp.path())).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "Date,City,State,Price");
    assert_eq!(lines[1], "2000-01-31,San Francisco,CA,1500.5");
    assert_eq!(lines[2], "2000-01-31,New York,NY,900");
    // Split on the first separator only; null price kept as an empty field
    assert_eq!(lines[3], "2000-01-31,Fort-Worth,TX,");
    assert_eq!(lines[4], "2000-02-29,San Francisco,CA,1510");
    // Unparsable price becomes null
    assert_eq!(lines[6], "2000-02-29,Fort-Worth,TX,");

    let destination = housing::destination(&config()).unwrap();
    let loaded = warehouse.table(&destination).unwrap();
    assert_eq!(loaded.columns(), ["Date", "City", "State", "Price"]);
    assert_eq!(loaded.len(), 6);
}

#[tokio::test]
async fn test_housing_rerun_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let destination = housing::destination(&config()).unwrap();

    housing::run(
        StaticSource::new(wide_prices()),
        warehouse.clone(),
        &config(),
        temp.path(),
    )
    .await
    .unwrap();
    let first_table = warehouse.table(&destination).unwrap();
    let first_csv = std::fs::read_to_string(housing::output_path(temp.path())).unwrap();

    housing::run(
        StaticSource::new(wide_prices()),
        warehouse.clone(),
        &config(),
        temp.path(),
    )
    .await
    .unwrap();

    assert_eq!(warehouse.table(&destination).unwrap(), first_table);
    assert_eq!(warehouse.row_count(&destination).await.unwrap(), 6);
    assert_eq!(
        std::fs::read_to_string(housing::output_path(temp.path())).unwrap(),
        first_csv
    );
}

#[tokio::test]
async fn test_housing_empty_extraction_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let empty = Table::new(vec!["Date".into(), "CA-Fresno".into()]);
    let source = StaticSource::new(empty);

    let err = housing::run(source, warehouse.clone(), &config(), temp.path())
        .await
        .unwrap_err();

    assert!(matches!(EtlError::find(&err), Some(EtlError::EmptyInput(_))));
    assert!(!housing::output_path(temp.path()).exists());
    assert!(warehouse.table_ids().is_empty());
}

#[tokio::test]
async fn test_housing_date_only_table_keeps_previous_load() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let destination = housing::destination(&config()).unwrap();

    let first = Table::from_rows(
        vec!["Date".into(), "CA-Fresno".into()],
        vec![vec!["2000-01-31".into(), Value::Int(120000)]],
    )
    .unwrap();
    housing::run(StaticSource::new(first), warehouse.clone(), &config(), temp.path())
        .await
        .unwrap();
    let first_csv = std::fs::read_to_string(housing::output_path(temp.path())).unwrap();

    // Rows but no series columns: nothing to unpivot
    let dates_only = Table::from_rows(
        vec!["Date".into()],
        vec![vec!["2000-02-29".into()]],
    )
    .unwrap();
    let err = housing::run(
        StaticSource::new(dates_only),
        warehouse.clone(),
        &config(),
        temp.path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(EtlError::find(&err), Some(EtlError::EmptyInput(_))));
    assert_eq!(warehouse.row_count(&destination).await.unwrap(), 1);
    assert_eq!(
        std::fs::read_to_string(housing::output_path(temp.path())).unwrap(),
        first_csv
    );
}

#[tokio::test]
async fn test_housing_null_date_aborts() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let table = Table::from_rows(
        vec!["Date".into(), "CA-Fresno".into()],
        vec![
            vec!["2000-01-31".into(), Value::Int(1)],
            vec![Value::Null, Value::Int(2)],
        ],
    )
    .unwrap();

    let err = housing::run(
        StaticSource::new(table),
        warehouse.clone(),
        &config(),
        temp.path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        EtlError::find(&err),
        Some(EtlError::InvalidValue { column, .. }) if column == "Date"
    ));
    assert!(!housing::output_path(temp.path()).exists());
    assert!(warehouse.table_ids().is_empty());
}

#[tokio::test]
async fn test_housing_bad_label_aborts_before_writing() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let table = Table::from_rows(
        vec!["Date".into(), "Fresno".into()],
        vec![vec!["2000-01-31".into(), Value::Int(1)]],
    )
    .unwrap();

    let err = housing::run(
        StaticSource::new(table),
        warehouse.clone(),
        &config(),
        temp.path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        EtlError::find(&err),
        Some(EtlError::InvalidLabel(label)) if label == "Fresno"
    ));
    assert!(!housing::output_path(temp.path()).exists());
    assert!(warehouse.table_ids().is_empty());
}

#[tokio::test]
async fn test_housing_bad_date_aborts() {
    let temp = TempDir::new().unwrap();
    let warehouse = Arc::new(MemoryWarehouse::new());
    let table = Table::from_rows(
        vec!["Date".into(), "CA-Fresno".into()],
        vec![vec!["not a date".into(), Value::Int(1)]],
    )
    .unwrap();

    let err = housing::run(
        StaticSource::new(table),
        warehouse.clone(),
        &config(),
        temp.path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        EtlError::find(&err),
        Some(EtlError::InvalidValue { column, .. }) if column == "Date"
    ));
}

#[test]
fn test_strict_price_policy() {
    let strict = Unpivot::default().with_price_policy(OnInvalid::Fail);
    let err = strict.transform(wide_prices()).unwrap_err();

    assert!(matches!(
        EtlError::find(&err),
        Some(EtlError::InvalidValue { column, value }) if column == "Price" && value == "n/a"
    ));
}

#[test]
fn test_labels_round_trip() {
    let long = Unpivot::default().transform(wide_prices()).unwrap();
    let labels: Vec<String> = long
        .rows()
        .iter()
        .take(3)
        .map(|row| format!("{}-{}", row[2], row[1]))
        .collect();

    assert_eq!(labels, ["CA-San Francisco", "NY-New York", "TX-Fort-Worth"]);
}
