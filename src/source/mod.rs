//! Relational sources
//!
//! A [`Source`] runs one query and returns the full result set as a
//! [`Table`]. [`QueryExtractor`] binds a source to a fixed query so it can
//! drive a [`Pipeline`](crate::etl::Pipeline).

mod mysql;

pub use mysql::MySqlSource;

use crate::etl::Extractor;
use crate::table::Table;
use eyre::Result;
use std::future::Future;

/// A database that answers SQL queries
pub trait Source: Send + Sync {
    /// Run `query` and collect every row
    ///
    /// # Errors
    /// [`EtlError::ConnectionFailure`](crate::error::EtlError::ConnectionFailure)
    /// when the database is unreachable, otherwise query or decoding errors
    fn fetch(&self, query: &str) -> impl Future<Output = Result<Table>> + Send;

    /// Verify the source accepts the configured credentials
    fn check(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Extract by running a fixed query against a source
pub struct QueryExtractor<S> {
    source: S,
    query: String,
}

impl<S: Source> QueryExtractor<S> {
    pub fn new(source: S, query: impl Into<String>) -> Self {
        Self {
            source,
            query: query.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl<S: Source> Extractor for QueryExtractor<S> {
    async fn extract(&self) -> Result<Table> {
        log::debug!("Running query: {}", self.query);
        self.source.fetch(&self.query).await
    }
}
