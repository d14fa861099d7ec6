//! Extractor trait for pulling a result set from a source

use crate::table::Table;
use eyre::Result;

/// Extractor trait for extracting a table from a source
///
/// Implementors define where the rows come from:
/// - Relational databases
/// - Delimited files
/// - Fixed in-memory fixtures
///
/// # Example
/// ```no_run
/// use mysql_bigquery_etl::etl::Extractor;
/// use mysql_bigquery_etl::table::Table;
/// use eyre::Result;
///
/// struct FixtureExtractor {
///     table: Table,
/// }
///
/// impl Extractor for FixtureExtractor {
///     async fn extract(&self) -> Result<Table> {
///         Ok(self.table.clone())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// Extract the full result set
    ///
    /// # Errors
    /// Returns an error if extraction fails (connection, query, decoding, etc.)
    fn extract(&self) -> impl std::future::Future<Output = Result<Table>> + Send;
}
