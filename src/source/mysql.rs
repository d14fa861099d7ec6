//! MySQL source backed by sqlx

use super::Source;
use crate::config::SourceConfig;
use crate::error::EtlError;
use crate::table::{Table, Value};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use eyre::{Result, WrapErr};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Row, TypeInfo, ValueRef};

/// Cell decoding chosen from the column's reported SQL type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decode {
    Int,
    Unsigned,
    Float,
    Decimal,
    Date,
    DateTime,
    Time,
    Bytes,
    Text,
}

impl Decode {
    fn for_type(type_name: &str) -> Self {
        let upper = type_name.to_ascii_uppercase();
        let base = upper.split_whitespace().next().unwrap_or_default();
        match base {
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR"
                if upper.contains("UNSIGNED") =>
            {
                Self::Unsigned
            }
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
                Self::Int
            }
            "FLOAT" | "DOUBLE" => Self::Float,
            "DECIMAL" => Self::Decimal,
            "DATE" => Self::Date,
            "DATETIME" | "TIMESTAMP" => Self::DateTime,
            "TIME" => Self::Time,
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => Self::Bytes,
            _ => Self::Text,
        }
    }
}

/// Opens a fresh connection for every query and closes it afterwards
#[derive(Clone)]
pub struct MySqlSource {
    options: MySqlConnectOptions,
    label: String,
}

impl MySqlSource {
    pub fn new(config: &SourceConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        Self {
            options,
            label: format!("{}@{}:{}/{}", config.user, config.host, config.port, config.database),
        }
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        log::debug!("Connecting to {}", self.label);
        self.options.connect().await.map_err(|e| {
            EtlError::ConnectionFailure(format!("could not connect to {}: {}", self.label, e))
                .into()
        })
    }
}

impl std::fmt::Display for MySqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mysql://{}", self.label)
    }
}

impl Source for MySqlSource {
    async fn fetch(&self, query: &str) -> Result<Table> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(query).fetch_all(&mut conn).await;
        if let Err(e) = conn.close().await {
            log::warn!("Failed to close connection to {}: {}", self.label, e);
        }
        let rows = rows.wrap_err_with(|| format!("Query failed on {}", self.label))?;

        let Some(first) = rows.first() else {
            // No rows means no column metadata from the server
            return Ok(Table::default());
        };
        let plan: Vec<(String, Decode)> = first
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), Decode::for_type(c.type_info().name())))
            .collect();
        log::trace!("Column decoding: {:?}", plan);

        let mut table = Table::new(plan.iter().map(|(name, _)| name.clone()).collect());
        for row in &rows {
            let cells = plan
                .iter()
                .enumerate()
                .map(|(i, (name, decode))| {
                    decode_cell(row, i, *decode)
                        .wrap_err_with(|| format!("Failed to decode column '{}'", name))
                })
                .collect::<Result<Vec<_>>>()?;
            table.push_row(cells)?;
        }
        Ok(table)
    }

    async fn check(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        conn.ping()
            .await
            .map_err(|e| EtlError::ConnectionFailure(format!("{}: {}", self.label, e)))?;
        conn.close().await.ok();
        Ok(())
    }
}

fn decode_cell(row: &MySqlRow, index: usize, decode: Decode) -> Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value = match decode {
        Decode::Int => Value::Int(row.try_get_unchecked::<i64, _>(index)?),
        Decode::Unsigned => {
            let n = row.try_get_unchecked::<u64, _>(index)?;
            i64::try_from(n).map_or_else(|_| Value::Text(n.to_string()), Value::Int)
        }
        Decode::Float => Value::Float(row.try_get_unchecked::<f64, _>(index)?),
        Decode::Decimal => {
            let text = row.try_get_unchecked::<String, _>(index)?;
            match text.trim().parse::<f64>() {
                Ok(n) => Value::Float(n),
                Err(_) => Value::Text(text),
            }
        }
        Decode::Date => Value::Date(row.try_get_unchecked::<NaiveDate, _>(index)?),
        Decode::DateTime => Value::DateTime(row.try_get_unchecked::<NaiveDateTime, _>(index)?),
        Decode::Time => Value::Text(
            row.try_get_unchecked::<NaiveTime, _>(index)?
                .format("%H:%M:%S")
                .to_string(),
        ),
        Decode::Bytes => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            Value::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        Decode::Text => Value::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_for_type() {
        assert_eq!(Decode::for_type("INT"), Decode::Int);
        assert_eq!(Decode::for_type("BIGINT UNSIGNED"), Decode::Unsigned);
        assert_eq!(Decode::for_type("BOOLEAN"), Decode::Int);
        assert_eq!(Decode::for_type("YEAR"), Decode::Int);
        assert_eq!(Decode::for_type("DOUBLE"), Decode::Float);
        assert_eq!(Decode::for_type("DECIMAL"), Decode::Decimal);
        assert_eq!(Decode::for_type("DATE"), Decode::Date);
        assert_eq!(Decode::for_type("TIMESTAMP"), Decode::DateTime);
        assert_eq!(Decode::for_type("TIME"), Decode::Time);
        assert_eq!(Decode::for_type("VARBINARY"), Decode::Bytes);
        assert_eq!(Decode::for_type("VARCHAR"), Decode::Text);
        assert_eq!(Decode::for_type("ENUM"), Decode::Text);
    }

    #[test]
    fn test_display_hides_password() {
        let source = MySqlSource::new(&SourceConfig {
            host: "db.local".into(),
            port: 3306,
            user: "etl".into(),
            password: "hunter2".into(),
            database: "warehouse_src".into(),
        });
        let shown = source.to_string();
        assert_eq!(shown, "mysql://etl@db.local:3306/warehouse_src");
        assert!(!shown.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connection_failure() {
        let source = MySqlSource::new(&SourceConfig {
            host: "127.0.0.1".into(),
            port: 1,
            user: "etl".into(),
            password: String::new(),
            database: "none".into(),
        });
        let err = source.fetch("SELECT 1").await.unwrap_err();
        assert!(matches!(
            EtlError::find(&err),
            Some(EtlError::ConnectionFailure(_))
        ));
    }
}
