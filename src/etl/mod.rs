//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides trait definitions for building batch pipelines
//! that extract a table from a source, reshape it, and load it to one or
//! more destinations.

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{LoadOutcome, Pipeline, PipelineReport};
pub use transform::{Chain, Transformer};
