//! In-process warehouse used for dry runs
//!
//! Tables live in a map keyed by their fully qualified name and follow the
//! same write dispositions BigQuery applies.

use super::{LoadConfig, LoadSource, TableRef, Warehouse, WriteDisposition};
use crate::error::EtlError;
use crate::storage::read_table;
use crate::table::Table;
use async_trait::async_trait;
use eyre::Result;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    tables: Mutex<BTreeMap<String, Table>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a stored table
    pub fn table(&self, table: &TableRef) -> Option<Table> {
        self.lock().ok()?.get(&table.to_string()).cloned()
    }

    /// Fully qualified names of all stored tables, sorted
    pub fn table_ids(&self) -> Vec<String> {
        self.lock()
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Table>>> {
        self.tables
            .lock()
            .map_err(|_| EtlError::WarehouseFailure("memory warehouse lock poisoned".into()).into())
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn load(
        &self,
        destination: &TableRef,
        source: LoadSource<'_>,
        config: &LoadConfig,
    ) -> Result<()> {
        let incoming = match source {
            LoadSource::Table(table) => table.clone(),
            LoadSource::Csv(path) => read_table(path, b',')?,
        };

        let key = destination.to_string();
        let mut tables = self.lock()?;

        match (config.write_disposition, tables.get_mut(&key)) {
            (WriteDisposition::Empty, Some(existing)) if !existing.is_empty() => {
                return Err(EtlError::WarehouseFailure(format!(
                    "Already Exists: Table {} is not empty",
                    key
                ))
                .into());
            }
            (WriteDisposition::Append, Some(existing)) => {
                if existing.columns() != incoming.columns() {
                    return Err(EtlError::WarehouseFailure(format!(
                        "Provided schema does not match table {}",
                        key
                    ))
                    .into());
                }
                for row in incoming.into_rows() {
                    existing.push_row(row)?;
                }
                return Ok(());
            }
            _ => {}
        }

        log::trace!("Stored {} rows in {}", incoming.len(), key);
        tables.insert(key, incoming);
        Ok(())
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64> {
        self.lock()?
            .get(&table.to_string())
            .map(|t| t.len() as u64)
            .ok_or_else(|| EtlError::WarehouseFailure(format!("Not found: Table {}", table)).into())
    }

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}
