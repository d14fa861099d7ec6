//! Pipeline orchestration for ETL runs

use super::{Extractor, Loader, Transformer};
use crate::error::EtlError;
use crate::table::DisplayOptions;
use eyre::{Result, WrapErr};

/// Rows written by one loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub sink: String,
    pub rows: usize,
}

/// Summary of a completed pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub extracted: usize,
    pub transformed: usize,
    pub loads: Vec<LoadOutcome>,
}

/// ETL Pipeline that runs Extract, Transform, and one or more Loads in order
///
/// # Type Parameters
/// - `E`: Extractor type
/// - `T`: Transformer type (use [`Transformer::then`] to combine steps)
///
/// Loaders run sequentially in the order they were added; the first failure
/// aborts the run and later loaders never see the table.
///
/// # Example
/// ```no_run
/// use mysql_bigquery_etl::etl::Pipeline;
/// # use mysql_bigquery_etl::etl::{Extractor, Transformer, Loader};
/// # use mysql_bigquery_etl::table::Table;
/// # use async_trait::async_trait;
/// # use eyre::Result;
/// # struct MyExtractor;
/// # impl Extractor for MyExtractor {
/// #     async fn extract(&self) -> Result<Table> { Ok(Table::default()) }
/// # }
/// # struct MyTransformer;
/// # impl Transformer for MyTransformer {
/// #     fn transform(&self, input: Table) -> Result<Table> { Ok(input) }
/// # }
/// # struct MyLoader;
/// # #[async_trait]
/// # impl Loader for MyLoader {
/// #     fn name(&self) -> String { "mine".into() }
/// #     async fn load(&self, table: &Table) -> Result<usize> { Ok(table.len()) }
/// # }
///
/// # async fn example() -> Result<()> {
/// let pipeline = Pipeline::new("example", MyExtractor, MyTransformer).with_loader(MyLoader);
///
/// let report = pipeline.run().await?;
/// println!("Transformed {} rows", report.transformed);
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<E, T> {
    name: String,
    extractor: E,
    transformer: T,
    loaders: Vec<Box<dyn Loader>>,
    display: DisplayOptions,
}

impl<E, T> Pipeline<E, T>
where
    E: Extractor,
    T: Transformer,
{
    /// Create a new pipeline with no loaders
    pub fn new(name: impl Into<String>, extractor: E, transformer: T) -> Self {
        Self {
            name: name.into(),
            extractor,
            transformer,
            loaders: Vec::new(),
            display: DisplayOptions::default(),
        }
    }

    /// Append a loader; loaders run in insertion order
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Set the preview limits used when logging the transformed table
    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    /// Run the complete ETL pipeline
    ///
    /// Steps:
    /// 1. Extract the result set from the source
    /// 2. Transform it
    /// 3. Hand the same table to each loader in turn
    ///
    /// # Errors
    /// Returns [`EtlError::EmptyInput`] when extraction or the transform
    /// yields no rows (before anything is written), otherwise the first error
    /// of any stage.
    pub async fn run(&self) -> Result<PipelineReport> {
        log::info!("Starting {} pipeline", self.name);

        // Extract
        log::debug!("Extracting from source...");
        let table = self
            .extractor
            .extract()
            .await
            .wrap_err_with(|| format!("{} extraction failed", self.name))?;
        let extracted = table.len();
        log::info!("Extracted {} rows", extracted);

        if table.is_empty() {
            return Err(EtlError::EmptyInput(format!(
                "{} extraction returned no rows, nothing will be written",
                self.name
            ))
            .into());
        }

        // Transform
        log::debug!("Transforming rows...");
        let table = self
            .transformer
            .transform(table)
            .wrap_err_with(|| format!("{} transformation failed", self.name))?;
        let transformed = table.len();
        log::info!("Transformed into {} rows", transformed);

        if table.is_empty() {
            return Err(EtlError::EmptyInput(format!(
                "{} transformation produced no rows, nothing will be written",
                self.name
            ))
            .into());
        }
        log::debug!("Preview:\n{}", table.preview(&self.display));

        // Load
        let mut loads = Vec::with_capacity(self.loaders.len());
        for loader in &self.loaders {
            let sink = loader.name();
            log::debug!("Loading to {}...", sink);
            let rows = loader
                .load(&table)
                .await
                .wrap_err_with(|| format!("Loading to {} failed", sink))?;
            log::info!("Loaded {} rows to {}", rows, sink);
            loads.push(LoadOutcome { sink, rows });
        }

        Ok(PipelineReport {
            extracted,
            transformed,
            loads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Table, Value};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct MockExtractor(Table);

    impl Extractor for MockExtractor {
        async fn extract(&self) -> Result<Table> {
            Ok(self.0.clone())
        }
    }

    struct DoubleTransformer;

    impl Transformer for DoubleTransformer {
        fn transform(&self, input: Table) -> Result<Table> {
            let columns = input.columns().to_vec();
            let rows = input
                .into_rows()
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| match v {
                            Value::Int(i) => Value::Int(i * 2),
                            other => other,
                        })
                        .collect()
                })
                .collect();
            Table::from_rows(columns, rows)
        }
    }

    struct DropAll;

    impl Transformer for DropAll {
        fn transform(&self, input: Table) -> Result<Table> {
            Ok(Table::new(input.columns().to_vec()))
        }
    }

    struct SumLoader(Arc<Mutex<i64>>);

    #[async_trait]
    impl Loader for SumLoader {
        fn name(&self) -> String {
            "sum".to_string()
        }

        async fn load(&self, table: &Table) -> Result<usize> {
            let sum: i64 = table
                .rows()
                .iter()
                .filter_map(|r| match r[0] {
                    Value::Int(i) => Some(i),
                    _ => None,
                })
                .sum();
            *self.0.lock().unwrap() = sum;
            Ok(table.len())
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl Loader for FailingLoader {
        fn name(&self) -> String {
            "broken".to_string()
        }

        async fn load(&self, _table: &Table) -> Result<usize> {
            eyre::bail!("disk full")
        }
    }

    fn ints(values: &[i64]) -> Table {
        Table::from_rows(
            vec!["n".into()],
            values.iter().map(|i| vec![Value::Int(*i)]).collect(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_pipeline() {
        let result = Arc::new(Mutex::new(0));

        let pipeline = Pipeline::new("test", MockExtractor(ints(&[1, 2, 3])), DoubleTransformer)
            .with_loader(SumLoader(result.clone()));

        let report = pipeline.run().await.unwrap();
        assert_eq!(report.extracted, 3);
        assert_eq!(report.transformed, 3);
        assert_eq!(
            report.loads,
            vec![LoadOutcome {
                sink: "sum".to_string(),
                rows: 3
            }]
        );
        assert_eq!(*result.lock().unwrap(), 12); // (1+2+3)*2 = 12
    }

    #[tokio::test]
    async fn test_empty_pipeline_aborts_before_loading() {
        let result = Arc::new(Mutex::new(-1));

        let pipeline = Pipeline::new("test", MockExtractor(ints(&[])), DoubleTransformer)
            .with_loader(SumLoader(result.clone()));

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(EtlError::find(&err), Some(EtlError::EmptyInput(_))));
        assert_eq!(*result.lock().unwrap(), -1);
    }

    #[tokio::test]
    async fn test_empty_transform_output_aborts_before_loading() {
        let result = Arc::new(Mutex::new(-1));

        let pipeline = Pipeline::new("test", MockExtractor(ints(&[1, 2])), DropAll)
            .with_loader(SumLoader(result.clone()));

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(EtlError::find(&err), Some(EtlError::EmptyInput(_))));
        assert_eq!(*result.lock().unwrap(), -1);
    }

    #[tokio::test]
    async fn test_failed_loader_stops_later_loaders() {
        let result = Arc::new(Mutex::new(-1));

        let pipeline = Pipeline::new("test", MockExtractor(ints(&[1])), DoubleTransformer)
            .with_loader(FailingLoader)
            .with_loader(SumLoader(result.clone()));

        let err = pipeline.run().await.unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));
        assert_eq!(*result.lock().unwrap(), -1);
    }
}
