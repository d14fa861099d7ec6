//! The two batch jobs
//!
//! Each module owns its query, output locations and destination naming, and
//! wires the generic [`etl`](crate::etl) pieces into a runnable pipeline.

pub mod housing;
pub mod movies;

pub use movies::MoviesReport;
