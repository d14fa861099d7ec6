//! Declared per-column type coercion
//!
//! Every coercion names its target kind and what happens to values that do
//! not parse. Nothing is coerced implicitly.

use crate::error::EtlError;
use crate::table::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use eyre::Result;

/// Text formats tried, in order, when coercing to a date
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y"];

/// Text formats tried, in order, when coercing to a datetime
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceTo {
    Number,
    Date,
}

/// What to do with a value that cannot be coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnInvalid {
    /// Replace it with [`Value::Null`]
    Null,
    /// Abort with [`EtlError::InvalidValue`]
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coercion {
    pub to: CoerceTo,
    pub on_invalid: OnInvalid,
}

impl Coercion {
    pub const fn new(to: CoerceTo, on_invalid: OnInvalid) -> Self {
        Self { to, on_invalid }
    }

    /// Coerce one value from `column`
    ///
    /// Null input stays null under either policy.
    pub fn apply(&self, column: &str, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let coerced = match self.to {
            CoerceTo::Number => to_number(&value),
            CoerceTo::Date => to_date(&value),
        };

        match (coerced, self.on_invalid) {
            (Some(v), _) => Ok(v),
            (None, OnInvalid::Null) => Ok(Value::Null),
            (None, OnInvalid::Fail) => Err(EtlError::InvalidValue {
                column: column.to_string(),
                value: value.to_string(),
            }
            .into()),
        }
    }
}

fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Int(_) => Some(value.clone()),
        Value::Float(n) if n.is_nan() => None,
        Value::Float(_) => Some(value.clone()),
        Value::Text(_) => value.as_f64().map(Value::Float),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<Value> {
    match value {
        Value::Date(_) => Some(value.clone()),
        Value::DateTime(dt) => Some(normalize(*dt)),
        Value::Text(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

/// Midnight datetimes collapse to plain dates
fn normalize(dt: NaiveDateTime) -> Value {
    if dt.time() == NaiveTime::MIN {
        Value::Date(dt.date())
    } else {
        Value::DateTime(dt)
    }
}

fn parse_date_text(s: &str) -> Option<Value> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .map(Value::Date)
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(normalize)
        })
}
