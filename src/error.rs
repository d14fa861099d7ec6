//! Error taxonomy for the ETL runs
//!
//! Every stage returns `eyre::Result`. When a failure belongs to one of the
//! categories below it is raised as an [`EtlError`] so callers (and tests) can
//! recover the category from the report chain with [`EtlError::find`].

use std::path::PathBuf;

/// Categorised ETL failures
#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    /// Bad credentials, unreachable host, or missing credentials file
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Zero rows where at least one was required
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// An expected column is absent from the table
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A wide-table column label is not of the form `<State>-<City>`
    #[error("invalid label '{0}': expected '<State>-<City>'")]
    InvalidLabel(String),

    /// A value failed a coercion declared as fatal
    #[error("invalid value '{value}' in column '{column}'")]
    InvalidValue { column: String, value: String },

    /// Filesystem permission or path errors
    #[error("write failure at {}: {message}", path.display())]
    WriteFailure { path: PathBuf, message: String },

    /// Remote API errors, schema conflicts, rejected load jobs
    #[error("warehouse failure: {0}")]
    WarehouseFailure(String),

    /// Missing or malformed configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Find the first categorised error in a report's chain
    pub fn find(report: &eyre::Report) -> Option<&EtlError> {
        report.chain().find_map(|e| e.downcast_ref::<EtlError>())
    }

    pub fn write_failure(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::WriteFailure {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn test_find_through_context() {
        let result: eyre::Result<()> = Err(EtlError::MissingColumn("Date".to_string()).into());
        let report = result.wrap_err("Reshape failed").unwrap_err();

        assert!(matches!(
            EtlError::find(&report),
            Some(EtlError::MissingColumn(column)) if column == "Date"
        ));
    }

    #[test]
    fn test_find_none_for_foreign_errors() {
        let report = eyre::eyre!("something else");
        assert!(EtlError::find(&report).is_none());
    }

    #[test]
    fn test_write_failure_message() {
        let err = EtlError::write_failure("/tmp/out.csv", "permission denied");
        assert_eq!(
            err.to_string(),
            "write failure at /tmp/out.csv: permission denied"
        );
    }
}
