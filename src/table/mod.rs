//! In-memory tabular result sets
//!
//! A [`Table`] is an ordered list of column names plus rows aligned with
//! them. It is what extractors produce, transformers reshape, and sinks
//! write. Nothing outlives a single run.

mod display;
mod value;

pub use display::DisplayOptions;
pub use value::{DATE_FORMAT, DATETIME_FORMAT, Value};

use crate::error::EtlError;
use eyre::Result;

pub type Row = Vec<Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and rows, checking row widths
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            eyre::bail!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of a column that must be present
    ///
    /// # Errors
    /// [`EtlError::MissingColumn`] if the column is absent
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()).into())
    }

    /// Append a column whose values are derived from each existing row
    pub fn push_column<F>(&mut self, name: impl Into<String>, mut derive: F)
    where
        F: FnMut(&Row) -> Value,
    {
        self.columns.push(name.into());
        for row in &mut self.rows {
            let value = derive(row);
            row.push(value);
        }
    }

    /// Rows whose value at `index` equals `key`, in original order
    pub fn filter_eq(&self, index: usize, key: &Value) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| &row[index] == key)
                .cloned()
                .collect(),
        }
    }

    /// Distinct values of a column in first-appearance order
    pub fn distinct(&self, index: usize) -> Vec<Value> {
        let mut seen: Vec<Value> = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row[index]) {
                seen.push(row[index].clone());
            }
        }
        seen
    }
}
