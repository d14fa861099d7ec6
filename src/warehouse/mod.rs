//! Cloud warehouse destinations
//!
//! [`Warehouse`] is the load capability the pipelines depend on. It is
//! implemented by [`BigQuery`] (REST API) and [`MemoryWarehouse`]
//! (in-process, for dry runs). [`WarehouseLoader`] adapts a warehouse to the
//! ETL [`Loader`] trait and [`load_csv_dir`] loads a directory of exported
//! files, one destination table per file.

mod auth;
mod bigquery;
mod memory;

pub use auth::{Auth, AuthType};
pub use bigquery::BigQuery;
pub use memory::MemoryWarehouse;

use crate::error::EtlError;
use crate::etl::Loader;
use crate::storage::list_csv_files;
use crate::table::Table;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Allowed characters for each `project.dataset.table` segment
const ID_PATTERN: &str = r"^[A-Za-z0-9_-]{1,1024}$";

static ID_SEGMENT: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(ID_PATTERN));

/// Fully qualified `project.dataset.table` identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    /// # Errors
    /// [`EtlError::Config`] if any segment is empty or has characters outside
    /// `[A-Za-z0-9_-]`
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self> {
        let table_ref = Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        };
        let id_segment = ID_SEGMENT
            .as_ref()
            .map_err(|e| eyre::eyre!("Invalid identifier pattern {}: {}", ID_PATTERN, e))?;
        for segment in [&table_ref.project, &table_ref.dataset, &table_ref.table] {
            if !id_segment.is_match(segment) {
                return Err(EtlError::Config(format!(
                    "invalid identifier '{}' in {}",
                    segment, table_ref
                ))
                .into());
            }
        }
        Ok(table_ref)
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

impl std::str::FromStr for TableRef {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.split('.').collect::<Vec<_>>().as_slice() {
            [project, dataset, table] => Self::new(*project, *dataset, *table),
            _ => Err(EtlError::Config(format!(
                "expected 'project.dataset.table', got '{}'",
                s
            ))
            .into()),
        }
    }
}

/// How a load treats data already in the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    /// Replace existing rows (truncate-and-load)
    Truncate,
    /// Create the table if absent; fail if it already holds rows
    Empty,
    /// Append to existing rows
    Append,
}

impl WriteDisposition {
    pub fn as_api_str(self) -> &'static str {
        match self {
            Self::Truncate => "WRITE_TRUNCATE",
            Self::Empty => "WRITE_EMPTY",
            Self::Append => "WRITE_APPEND",
        }
    }
}

/// Load job settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    pub write_disposition: WriteDisposition,
    /// Infer the destination schema from the data
    pub autodetect: bool,
    /// Header lines to skip in delimited sources
    pub skip_leading_rows: u32,
}

impl LoadConfig {
    pub fn new(write_disposition: WriteDisposition) -> Self {
        Self {
            write_disposition,
            autodetect: true,
            skip_leading_rows: 1,
        }
    }
}

/// Data handed to a load job
#[derive(Debug, Clone, Copy)]
pub enum LoadSource<'a> {
    /// An in-memory table
    Table(&'a Table),
    /// A delimited file with a header row
    Csv(&'a Path),
}

/// Load capability of a destination warehouse
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Run a load job into `destination` and wait for it to finish
    ///
    /// # Errors
    /// [`EtlError::WarehouseFailure`] when the job is rejected or fails
    async fn load(
        &self,
        destination: &TableRef,
        source: LoadSource<'_>,
        config: &LoadConfig,
    ) -> Result<()>;

    /// Number of rows the destination currently reports
    async fn row_count(&self, table: &TableRef) -> Result<u64>;

    /// Verify the warehouse is reachable with the configured credentials
    async fn check(&self) -> Result<()>;
}

/// Load a table into a warehouse, then read the row count back
pub struct WarehouseLoader {
    warehouse: Arc<dyn Warehouse>,
    destination: TableRef,
    config: LoadConfig,
}

impl WarehouseLoader {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        destination: TableRef,
        write_disposition: WriteDisposition,
    ) -> Self {
        Self {
            warehouse,
            destination,
            config: LoadConfig::new(write_disposition),
        }
    }
}

#[async_trait]
impl Loader for WarehouseLoader {
    fn name(&self) -> String {
        self.destination.to_string()
    }

    async fn load(&self, table: &Table) -> Result<usize> {
        self.warehouse
            .load(&self.destination, LoadSource::Table(table), &self.config)
            .await?;

        let rows = self.warehouse.row_count(&self.destination).await?;
        log::info!(
            "{} rows loaded to {}",
            rows,
            self.destination.to_string().cyan()
        );
        Ok(rows as usize)
    }
}

/// Outcome of a [`load_csv_dir`] run
#[derive(Debug, Default)]
pub struct DirLoadReport {
    /// Destination and the row count read back after the load
    pub loaded: Vec<(TableRef, u64)>,
    /// File and the error that stopped its load
    pub failed: Vec<(PathBuf, eyre::Report)>,
}

impl DirLoadReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Load every `*.csv` file in `dir` into `project.dataset.<file stem>`
///
/// Files are loaded one at a time in file-name order. A failed file is
/// logged and recorded in the report; the remaining files are still loaded.
///
/// # Errors
/// Only when the directory itself cannot be listed
pub async fn load_csv_dir(
    warehouse: &dyn Warehouse,
    project: &str,
    dataset: &str,
    dir: impl AsRef<Path>,
    write_disposition: WriteDisposition,
) -> Result<DirLoadReport> {
    let dir = dir.as_ref();
    let files = list_csv_files(dir)?;
    if files.is_empty() {
        log::warn!("No CSV files found in {}", dir.display());
    }

    let config = LoadConfig::new(write_disposition);
    let mut report = DirLoadReport::default();

    for file in files {
        match load_csv_file(warehouse, project, dataset, &file, &config).await {
            Ok((destination, rows)) => {
                log::info!(
                    "{} rows loaded from {} to {}",
                    rows,
                    file.display().bright_black(),
                    destination.to_string().cyan()
                );
                report.loaded.push((destination, rows));
            }
            Err(e) => {
                log::error!("Failed to load {}: {:#}", file.display(), e);
                report.failed.push((file, e));
            }
        }
    }

    Ok(report)
}

async fn load_csv_file(
    warehouse: &dyn Warehouse,
    project: &str,
    dataset: &str,
    file: &Path,
    config: &LoadConfig,
) -> Result<(TableRef, u64)> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EtlError::Config(format!("unusable file name: {}", file.display())))?;
    let destination = TableRef::new(project, dataset, stem)?;

    warehouse
        .load(&destination, LoadSource::Csv(file), config)
        .await
        .wrap_err_with(|| format!("Load into {} failed", destination))?;
    let rows = warehouse.row_count(&destination).await?;

    Ok((destination, rows))
}
