//! Housing prices: wide city time series to a long table
//!
//! `city_house_prices` → [`Unpivot`] → `house_price_data/house_prices.csv`
//! → `<project>.<housing dataset>.house_prices` (truncate-and-load).

use crate::config::WarehouseConfig;
use crate::etl::{Pipeline, PipelineReport};
use crate::source::{QueryExtractor, Source};
use crate::storage::CsvFileWriter;
use crate::table::DisplayOptions;
use crate::transform::Unpivot;
use crate::warehouse::{TableRef, Warehouse, WarehouseLoader, WriteDisposition};
use eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SOURCE_TABLE: &str = "city_house_prices";
pub const OUTPUT_DIR: &str = "house_price_data";
pub const OUTPUT_FILE: &str = "house_prices.csv";
pub const DESTINATION_TABLE: &str = "house_prices";

pub fn query() -> String {
    format!("SELECT * FROM {}", SOURCE_TABLE)
}

/// Local export path below `root`
pub fn output_path(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(OUTPUT_DIR).join(OUTPUT_FILE)
}

pub fn destination(config: &WarehouseConfig) -> Result<TableRef> {
    TableRef::new(&config.project, &config.housing_dataset, DESTINATION_TABLE)
}

/// Assemble the housing pipeline
///
/// Loaders run in order: local CSV first, then the warehouse. A rerun
/// replaces both the file and the warehouse table.
pub fn pipeline<S: Source>(
    source: S,
    warehouse: Arc<dyn Warehouse>,
    destination: TableRef,
    root: impl AsRef<Path>,
) -> Pipeline<QueryExtractor<S>, Unpivot> {
    Pipeline::new(
        "housing",
        QueryExtractor::new(source, query()),
        Unpivot::default(),
    )
    .with_loader(CsvFileWriter::new(output_path(root)))
    .with_loader(WarehouseLoader::new(
        warehouse,
        destination,
        WriteDisposition::Truncate,
    ))
    .with_display(DisplayOptions::default())
}

/// Extract, reshape, export and load the housing table
pub async fn run<S: Source>(
    source: S,
    warehouse: Arc<dyn Warehouse>,
    config: &WarehouseConfig,
    root: impl AsRef<Path>,
) -> Result<PipelineReport> {
    let destination = destination(config)?;
    pipeline(source, warehouse, destination, root).run().await
}
