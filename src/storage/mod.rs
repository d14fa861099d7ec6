//! File system storage operations
//!
//! This module handles the local side of a run:
//! - Writing tables as delimited text, whole or partitioned by a column
//! - Reading exported files back
//! - Discovering exported files in a directory

mod delimited;

pub use delimited::{
    CsvFileWriter, CsvFormat, PartitionedCsvWriter, list_csv_files, read_table, write_table,
};
