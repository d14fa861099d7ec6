//! Transformer trait for reshaping tables

use crate::table::Table;
use eyre::Result;

/// Transformer trait for reshaping a table in memory
///
/// Implementors define a pure table-to-table step:
/// - Unpivoting wide tables
/// - Deriving columns from existing ones
/// - Coercing column types
///
/// # Example
/// ```
/// use mysql_bigquery_etl::etl::Transformer;
/// use mysql_bigquery_etl::table::{Table, Value};
/// use eyre::Result;
///
/// struct RowNumber;
///
/// impl Transformer for RowNumber {
///     fn transform(&self, mut input: Table) -> Result<Table> {
///         let mut n = 0;
///         input.push_column("row_number", |_| {
///             n += 1;
///             Value::Int(n)
///         });
///         Ok(input)
///     }
/// }
///
/// let table = Table::from_rows(vec!["a".into()], vec![vec![Value::Null]]).unwrap();
/// let out = RowNumber.transform(table).unwrap();
/// assert_eq!(out.rows()[0][1], Value::Int(1));
/// ```
pub trait Transformer: Send + Sync {
    /// Transform a table
    ///
    /// # Errors
    /// Returns an error if a precondition fails (missing column, bad value, etc.)
    fn transform(&self, input: Table) -> Result<Table>;

    /// Run `next` on the output of this transformer
    fn then<U: Transformer>(self, next: U) -> Chain<Self, U>
    where
        Self: Sized,
    {
        Chain {
            first: self,
            second: next,
        }
    }
}

/// Two transformers applied in sequence, see [`Transformer::then`]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A: Transformer, B: Transformer> Transformer for Chain<A, B> {
    fn transform(&self, input: Table) -> Result<Table> {
        self.second.transform(self.first.transform(input)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    struct AddConst(&'static str, i64);

    impl Transformer for AddConst {
        fn transform(&self, mut input: Table) -> Result<Table> {
            input.push_column(self.0, |_| Value::Int(self.1));
            Ok(input)
        }
    }

    struct Fail;

    impl Transformer for Fail {
        fn transform(&self, _input: Table) -> Result<Table> {
            eyre::bail!("boom")
        }
    }

    #[test]
    fn test_chain_applies_in_order() {
        let table = Table::from_rows(vec!["a".into()], vec![vec![Value::Null]]).unwrap();
        let out = AddConst("b", 1).then(AddConst("c", 2)).transform(table).unwrap();
        assert_eq!(out.columns(), ["a", "b", "c"]);
        assert_eq!(out.rows()[0], vec![Value::Null, Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_chain_stops_on_error() {
        let table = Table::new(vec!["a".into()]);
        assert!(Fail.then(AddConst("b", 1)).transform(table).is_err());
    }
}
