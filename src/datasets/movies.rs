//! Movie metadata: categorised films split into one file per year
//!
//! `imdb_movies` (with a query-level `movie_category`) →
//! [`VoteCategorizer`] → [`LengthCategorizer`] → `movie_data/movies_<year>.csv`,
//! then every exported file is loaded into its own table in the movie
//! dataset with write-if-empty semantics.

use crate::config::WarehouseConfig;
use crate::etl::{Chain, Pipeline, PipelineReport, Transformer};
use crate::source::{QueryExtractor, Source};
use crate::storage::PartitionedCsvWriter;
use crate::table::DisplayOptions;
use crate::transform::{
    AVG_VOTE_COLUMN, DURATION_COLUMN, LengthBranches, LengthCategorizer, VoteCategorizer,
    movie_category_case_sql,
};
use crate::warehouse::{DirLoadReport, Warehouse, WriteDisposition, load_csv_dir};
use eyre::Result;
use std::path::{Path, PathBuf};

pub const SOURCE_TABLE: &str = "imdb_movies";
pub const OUTPUT_DIR: &str = "movie_data";
pub const PARTITION_COLUMN: &str = "year";
pub const FILE_PREFIX: &str = "movies";

pub fn query() -> String {
    format!(
        "SELECT {}, title, genre, {}, {}, {} FROM {}",
        PARTITION_COLUMN,
        AVG_VOTE_COLUMN,
        movie_category_case_sql(),
        DURATION_COLUMN,
        SOURCE_TABLE
    )
}

/// Directory below `root` holding the per-year files
pub fn output_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(OUTPUT_DIR)
}

pub type MovieTransform = Chain<VoteCategorizer, LengthCategorizer>;

pub fn pipeline<S: Source>(
    source: S,
    branches: LengthBranches,
    root: impl AsRef<Path>,
) -> Pipeline<QueryExtractor<S>, MovieTransform> {
    Pipeline::new(
        "movies",
        QueryExtractor::new(source, query()),
        VoteCategorizer.then(LengthCategorizer::new(branches)),
    )
    .with_loader(PartitionedCsvWriter::new(
        output_dir(root),
        PARTITION_COLUMN,
        FILE_PREFIX,
    ))
    .with_display(DisplayOptions::default())
}

/// Load every exported file in `dir`; populated tables fail per file
pub async fn load(
    warehouse: &dyn Warehouse,
    config: &WarehouseConfig,
    dir: impl AsRef<Path>,
) -> Result<DirLoadReport> {
    load_csv_dir(
        warehouse,
        &config.project,
        &config.movie_dataset,
        dir,
        WriteDisposition::Empty,
    )
    .await
}

#[derive(Debug)]
pub struct MoviesReport {
    pub pipeline: PipelineReport,
    pub load: DirLoadReport,
}

/// Extract, categorise and export the movie table, then load the files
///
/// # Errors
/// Any pipeline stage failure aborts before loading. Individual file load
/// failures do not; they are returned in [`MoviesReport::load`].
pub async fn run<S: Source>(
    source: S,
    warehouse: &dyn Warehouse,
    config: &WarehouseConfig,
    branches: LengthBranches,
    root: impl AsRef<Path>,
) -> Result<MoviesReport> {
    let root = root.as_ref();
    let pipeline = pipeline(source, branches, root).run().await?;
    let load = load(warehouse, config, output_dir(root)).await?;
    Ok(MoviesReport { pipeline, load })
}
