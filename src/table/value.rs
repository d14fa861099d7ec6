//! Scalar cell values

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell of a [`Table`](super::Table)
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value
    ///
    /// Text is parsed after trimming; anything unparsable (including NaN)
    /// yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let n = match self {
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (!n.is_nan()).then_some(n)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => (*i).into(),
            // NaN and infinities have no JSON form
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => s.clone().into(),
            other => other.to_string().into(),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_f64() {
        assert_eq!(Value::Int(42).as_f64(), Some(42.0));
        assert_eq!(Value::from(" 1.5 ").as_f64(), Some(1.5));
        assert_eq!(Value::from("n/a").as_f64(), None);
        assert_eq!(Value::Float(f64::NAN).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_display() {
        let date = NaiveDate::from_ymd_opt(2000, 1, 31).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2000-01-31");
        assert_eq!(Value::Float(350000.0).to_string(), "350000");
        assert_eq!(Value::Float(1.25).to_string(), "1.25");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_json_conversion() {
        let date = NaiveDate::from_ymd_opt(2000, 1, 31).unwrap();
        assert_eq!(serde_json::Value::from(&Value::Date(date)), json!("2000-01-31"));
        assert_eq!(serde_json::Value::from(&Value::Int(7)), json!(7));
        assert_eq!(serde_json::Value::from(&Value::Float(f64::NAN)), json!(null));
        assert_eq!(serde_json::Value::from(&Value::Null), json!(null));
    }
}
