//! MySQL to BigQuery batch ETL
//!
//! Two single-pass jobs built from the same parts: a [`Source`] query, a
//! [`Transformer`] chain, and [`Loader`]s writing local CSV files and
//! warehouse tables.
//!
//! - [`datasets::housing`]: wide city price series reshaped into a long table
//! - [`datasets::movies`]: movies categorised and split into one table per year

pub mod cli;
pub mod config;
pub mod datasets;
pub mod error;
pub mod etl;
pub mod source;
pub mod storage;
pub mod table;
pub mod transform;
pub mod warehouse;

// Re-exports for convenience
pub use error::EtlError;
pub use etl::{Extractor, Loader, Pipeline, Transformer};
pub use source::{MySqlSource, QueryExtractor, Source};
pub use table::{Table, Value};
pub use warehouse::{BigQuery, MemoryWarehouse, TableRef, Warehouse, WriteDisposition};
