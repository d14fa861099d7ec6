//! Delimited text files

use crate::error::EtlError;
use crate::etl::Loader;
use crate::table::{DATE_FORMAT, DATETIME_FORMAT, Row, Table, Value};
use async_trait::async_trait;
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// How values are rendered into delimited text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: u8,
    pub date_format: String,
    pub datetime_format: String,
    /// Written for [`Value::Null`]
    pub null: String,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            date_format: DATE_FORMAT.to_string(),
            datetime_format: DATETIME_FORMAT.to_string(),
            null: String::new(),
        }
    }
}

impl CsvFormat {
    fn render(&self, value: &Value) -> String {
        match value {
            Value::Null => self.null.clone(),
            Value::Date(d) => d.format(&self.date_format).to_string(),
            Value::DateTime(dt) => dt.format(&self.datetime_format).to_string(),
            other => other.to_string(),
        }
    }
}

/// Write a table with a header row, replacing any existing file
///
/// # Errors
/// [`EtlError::WriteFailure`] on any filesystem or encoding error
pub fn write_table(path: impl AsRef<Path>, table: &Table, format: &CsvFormat) -> Result<()> {
    let path = path.as_ref();
    let fail = |e: &dyn std::fmt::Display| EtlError::write_failure(path, e);

    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter)
        .from_path(path)
        .map_err(|e| fail(&e))?;

    writer.write_record(table.columns()).map_err(|e| fail(&e))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| format.render(v)))
            .map_err(|e| fail(&e))?;
    }
    writer.flush().map_err(|e| fail(&e))?;

    Ok(())
}

/// Read a delimited file with a header row; every cell comes back as text,
/// empty cells as null
pub fn read_table(path: impl AsRef<Path>, delimiter: u8) -> Result<Table> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let columns = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
        .iter()
        .map(String::from)
        .collect();

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read CSV record: {}", path.display()))?;
        let row: Row = record
            .iter()
            .map(|cell| match cell {
                "" => Value::Null,
                text => Value::from(text),
            })
            .collect();
        table.push_row(row)?;
    }

    Ok(table)
}

/// List `*.csv` files in a directory, sorted by file name
pub fn list_csv_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("csv") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| EtlError::write_failure(dir, e).into())
}

/// Write the whole table to a single file
pub struct CsvFileWriter {
    path: PathBuf,
    format: CsvFormat,
}

impl CsvFileWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format: CsvFormat::default(),
        }
    }

    pub fn with_format(mut self, format: CsvFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Loader for CsvFileWriter {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self, table: &Table) -> Result<usize> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir(dir)?;
        }
        write_table(&self.path, table, &self.format)?;
        log::info!(
            "Exported {} rows to {}",
            table.len(),
            self.path.display().bright_black()
        );
        Ok(table.len())
    }
}

/// Write one file per distinct value of a partition column
///
/// Files are named `{prefix}_{value}.csv` inside `dir`, which is created if
/// needed. Partitions are written in first-appearance order.
pub struct PartitionedCsvWriter {
    dir: PathBuf,
    column: String,
    prefix: String,
    format: CsvFormat,
}

impl PartitionedCsvWriter {
    pub fn new(dir: impl AsRef<Path>, column: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            column: column.into(),
            prefix: prefix.into(),
            format: CsvFormat::default(),
        }
    }

    pub fn with_format(mut self, format: CsvFormat) -> Self {
        self.format = format;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding rows whose partition value is `value`
    ///
    /// # Errors
    /// [`EtlError::InvalidValue`] unless the rendered value is made of
    /// `[A-Za-z0-9_-]`, which keeps the file inside `dir` and its stem usable
    /// as a table id
    pub fn partition_path(&self, value: &Value) -> Result<PathBuf> {
        let rendered = self.format.render(value);
        if !rendered
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(EtlError::InvalidValue {
                column: self.column.clone(),
                value: rendered,
            }
            .into());
        }
        Ok(self.dir.join(format!("{}_{}.csv", self.prefix, rendered)))
    }

    /// Write every partition, returning the files written and their row counts
    ///
    /// All partition values are checked before the first file is written.
    pub fn write_partitions(&self, table: &Table) -> Result<Vec<(PathBuf, usize)>> {
        let index = table.require_column(&self.column)?;
        let partitions: Vec<(Value, PathBuf)> = table
            .distinct(index)
            .into_iter()
            .map(|value| self.partition_path(&value).map(|path| (value, path)))
            .collect::<Result<_>>()?;
        create_dir(&self.dir)?;

        let mut written = Vec::new();
        for (value, path) in partitions {
            let subset = table.filter_eq(index, &value);
            if subset.is_empty() {
                log::info!("No data for {} {}, skipping export", self.column, value);
                continue;
            }

            write_table(&path, &subset, &self.format)?;
            log::info!(
                "Exported {} rows for {} {} to {}",
                subset.len(),
                self.column,
                value.cyan(),
                path.display().bright_black()
            );
            written.push((path, subset.len()));
        }

        Ok(written)
    }
}

#[async_trait]
impl Loader for PartitionedCsvWriter {
    fn name(&self) -> String {
        format!("{} (by {})", self.dir.display(), self.column)
    }

    async fn load(&self, table: &Table) -> Result<usize> {
        let written = self.write_partitions(table)?;
        Ok(written.iter().map(|(_, rows)| rows).sum())
    }
}
