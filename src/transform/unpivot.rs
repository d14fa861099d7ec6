//! Wide-to-long reshape for time-series tables
//!
//! Turns one row per date with one `<State>-<City>` column per series into
//! one row per `(date, series)` cell with columns `Date, City, State, Price`.

use super::coerce::{CoerceTo, Coercion, OnInvalid};
use crate::error::EtlError;
use crate::etl::Transformer;
use crate::table::{Table, Value};
use eyre::Result;
use std::collections::HashSet;

pub const DATE_COLUMN: &str = "Date";
pub const LONG_COLUMNS: [&str; 4] = ["Date", "City", "State", "Price"];

/// Splits `<State>-<City>` labels on the first separator
pub const LABEL_SEPARATOR: char = '-';

/// Transformer that unpivots a wide time-series table
///
/// Null price cells are kept, so the output always has
/// `rows × (columns − 1)` rows, in row-major order. A null `Date` is
/// rejected unless the date policy is [`OnInvalid::Null`].
///
/// # Example
/// ```
/// use mysql_bigquery_etl::etl::Transformer;
/// use mysql_bigquery_etl::table::{Table, Value};
/// use mysql_bigquery_etl::transform::Unpivot;
///
/// let wide = Table::from_rows(
///     vec!["Date".into(), "CA-Fresno".into()],
///     vec![vec!["2000-01-31".into(), Value::Int(120000)]],
/// )
/// .unwrap();
///
/// let long = Unpivot::default().transform(wide).unwrap();
/// assert_eq!(long.columns(), ["Date", "City", "State", "Price"]);
/// assert_eq!(long.rows()[0][1], Value::from("Fresno"));
/// assert_eq!(long.rows()[0][2], Value::from("CA"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Unpivot {
    date: Coercion,
    price: Coercion,
}

impl Default for Unpivot {
    /// Unparsable prices become null, unparsable dates abort the run
    fn default() -> Self {
        Self {
            date: Coercion::new(CoerceTo::Date, OnInvalid::Fail),
            price: Coercion::new(CoerceTo::Number, OnInvalid::Null),
        }
    }
}

impl Unpivot {
    pub fn with_date_policy(mut self, on_invalid: OnInvalid) -> Self {
        self.date.on_invalid = on_invalid;
        self
    }

    pub fn with_price_policy(mut self, on_invalid: OnInvalid) -> Self {
        self.price.on_invalid = on_invalid;
        self
    }
}

/// Split a `<State>-<City>` label into `(state, city)`
pub fn split_label(label: &str) -> Result<(&str, &str)> {
    label
        .split_once(LABEL_SEPARATOR)
        .ok_or_else(|| EtlError::InvalidLabel(label.to_string()).into())
}

impl Transformer for Unpivot {
    fn transform(&self, input: Table) -> Result<Table> {
        let date_index = input.require_column(DATE_COLUMN)?;
        if input.is_empty() {
            return Err(EtlError::EmptyInput("wide table has no rows to unpivot".into()).into());
        }

        // Labels are validated once, up front
        let series: Vec<(usize, String, String)> = input
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_index)
            .map(|(i, label)| {
                split_label(label).map(|(state, city)| (i, state.to_string(), city.to_string()))
            })
            .collect::<Result<_>>()?;

        let mut seen = HashSet::new();
        let mut output = Table::new(LONG_COLUMNS.iter().map(|c| c.to_string()).collect());

        for row in input.into_rows() {
            let date = self.date.apply(DATE_COLUMN, row[date_index].clone())?;
            // A missing date is a defect under the strict policy, not a null cell
            if date.is_null() && self.date.on_invalid == OnInvalid::Fail {
                return Err(EtlError::InvalidValue {
                    column: DATE_COLUMN.to_string(),
                    value: "NULL".to_string(),
                }
                .into());
            }
            if !seen.insert(date.to_string()) {
                log::warn!("Duplicate {} value in wide table: {}", DATE_COLUMN, date);
            }

            for (index, state, city) in &series {
                let price = self.price.apply("Price", row[*index].clone())?;
                output.push_row(vec![
                    date.clone(),
                    Value::from(city.as_str()),
                    Value::from(state.as_str()),
                    price,
                ])?;
            }
        }

        log::debug!(
            "Unpivoted {} series into {} rows",
            series.len(),
            output.len()
        );
        Ok(output)
    }
}
