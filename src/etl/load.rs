//! Loader trait for writing tables to destinations

use crate::table::Table;
use async_trait::async_trait;
use eyre::Result;

/// Loader trait for loading a table to a destination
///
/// Implementors define where the rows land:
/// - Local delimited files
/// - Warehouse tables
///
/// # Example
/// ```no_run
/// use mysql_bigquery_etl::etl::Loader;
/// use mysql_bigquery_etl::table::Table;
/// use async_trait::async_trait;
/// use eyre::Result;
///
/// struct CountingLoader;
///
/// #[async_trait]
/// impl Loader for CountingLoader {
///     fn name(&self) -> String {
///         "counter".to_string()
///     }
///
///     async fn load(&self, table: &Table) -> Result<usize> {
///         Ok(table.len())
///     }
/// }
/// ```
#[async_trait]
pub trait Loader: Send + Sync {
    /// Human readable destination name for logs and reports
    fn name(&self) -> String;

    /// Load the table to the destination
    ///
    /// Returns the number of rows the destination reports as loaded
    ///
    /// # Errors
    /// Returns an error if loading fails (I/O, network, rejected job, etc.)
    async fn load(&self, table: &Table) -> Result<usize>;
}
