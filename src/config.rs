//! Typed run configuration
//!
//! Source credentials come from a swappable [`CredentialSource`]:
//! - [`CredsFile`]: `key=value` lines (`host`, `port`, `user`, `password`, `database`)
//! - [`EnvCredentials`]: `MYSQL_HOST`, `MYSQL_PORT`, `MYSQL_USER`, `MYSQL_PASSWORD`, `MYSQL_DATABASE`
//! - [`YamlCredentials`]: a YAML document with the same keys
//!
//! Warehouse settings always come from the environment, see
//! [`WarehouseConfig::from_env`].

use crate::error::EtlError;
use crate::warehouse::{Auth, AuthType};
use eyre::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_BIGQUERY_URL: &str = "https://bigquery.googleapis.com";
pub const DEFAULT_HOUSING_DATASET: &str = "house_price_data";
pub const DEFAULT_MOVIE_DATASET: &str = "movie_data";

/// Connection settings for the relational source
#[derive(Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl SourceConfig {
    /// Build from lowercase keys; `port` and `password` are optional
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let required = |key: &str| {
            map.get(key)
                .cloned()
                .ok_or_else(|| EtlError::Config(format!("missing source setting '{}'", key)))
        };

        let port = match map.get("port") {
            Some(port) => port
                .parse()
                .map_err(|_| EtlError::Config(format!("invalid port '{}'", port)))?,
            None => DEFAULT_MYSQL_PORT,
        };

        Ok(Self {
            host: required("host")?,
            port,
            user: required("user")?,
            password: map.get("password").cloned().unwrap_or_default(),
            database: required("database")?,
        })
    }
}

/// Where source credentials are read from
pub trait CredentialSource {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Load the source connection settings
    ///
    /// # Errors
    /// [`EtlError::ConnectionFailure`] when the credentials cannot be found,
    /// [`EtlError::Config`] when they are incomplete
    fn source_config(&self) -> Result<SourceConfig>;
}

/// `key=value` credentials file
pub struct CredsFile {
    path: PathBuf,
}

impl CredsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CredentialSource for CredsFile {
    fn describe(&self) -> String {
        format!("credentials file {}", self.path.display())
    }

    fn source_config(&self) -> Result<SourceConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            EtlError::ConnectionFailure(format!(
                "credentials file not found: {} ({})",
                self.path.display(),
                e
            ))
        })?;

        let map = parse_creds(&content).map_err(|line| {
            EtlError::Config(format!(
                "malformed credentials file {}: line {} has no '='",
                self.path.display(),
                line
            ))
        })?;

        SourceConfig::from_map(&map)
    }
}

/// Parse `key=value` lines, keeping each value exactly as written
///
/// Keys are lowercased, blank lines and lines starting with `#` are skipped.
/// Values are split on the first `=` only and never expanded or unquoted, so
/// passwords may contain `$`, `#` or `=`. Returns the 1-based number of the
/// first line without a separator.
fn parse_creds(content: &str) -> std::result::Result<HashMap<String, String>, usize> {
    let mut map = HashMap::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=').ok_or(number + 1)?;
        map.insert(key.trim().to_lowercase(), value.trim().to_string());
    }
    Ok(map)
}

/// Credentials from prefixed environment variables
pub struct EnvCredentials {
    prefix: String,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new("MYSQL_")
    }
}

impl EnvCredentials {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn describe(&self) -> String {
        format!("environment variables {}*", self.prefix)
    }

    fn source_config(&self) -> Result<SourceConfig> {
        let map: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(&self.prefix)
                    .map(|key| (key.to_lowercase(), v))
            })
            .collect();

        if map.is_empty() {
            return Err(EtlError::ConnectionFailure(format!(
                "no {}* environment variables set",
                self.prefix
            ))
            .into());
        }

        SourceConfig::from_map(&map)
    }
}

/// Credentials from a YAML document
pub struct YamlCredentials {
    path: PathBuf,
}

impl YamlCredentials {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CredentialSource for YamlCredentials {
    fn describe(&self) -> String {
        format!("YAML credentials {}", self.path.display())
    }

    fn source_config(&self) -> Result<SourceConfig> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            EtlError::ConnectionFailure(format!(
                "credentials file not found: {} ({})",
                self.path.display(),
                e
            ))
        })?;

        serde_yaml::from_str(&content).map_err(|e| {
            EtlError::Config(format!("malformed YAML credentials {}: {}", self.path.display(), e))
                .into()
        })
    }
}

/// Settings for the destination warehouse
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub project: String,
    pub api_url: Url,
    pub auth: Auth,
    pub location: Option<String>,
    pub housing_dataset: String,
    pub movie_dataset: String,
}

impl WarehouseConfig {
    /// Load warehouse settings from the environment
    ///
    /// Expected environment variables:
    /// - BIGQUERY_PROJECT: project id (required)
    /// - BIGQUERY_API_URL: API base URL (optional, defaults to Google's endpoint)
    /// - BIGQUERY_AUTH: `bearer` or `none` (optional, defaults to `bearer`)
    /// - BIGQUERY_ACCESS_TOKEN: OAuth access token (required for `bearer`)
    /// - BIGQUERY_LOCATION: job location (optional)
    /// - HOUSING_DATASET / MOVIE_DATASET: dataset ids (optional)
    pub fn from_env() -> Result<Self> {
        let project = std::env::var("BIGQUERY_PROJECT")
            .map_err(|_| EtlError::Config("BIGQUERY_PROJECT environment variable not set".into()))?;

        let url_str =
            std::env::var("BIGQUERY_API_URL").unwrap_or_else(|_| DEFAULT_BIGQUERY_URL.to_string());
        let api_url = Url::parse(&url_str)
            .map_err(|e| EtlError::Config(format!("invalid BIGQUERY_API_URL '{}': {}", url_str, e)))?;

        let auth_type = match std::env::var("BIGQUERY_AUTH") {
            Ok(s) => AuthType::from_str(&s)
                .map_err(|_| EtlError::Config(format!("invalid BIGQUERY_AUTH '{}'", s)))?,
            Err(_) => AuthType::Bearer,
        };
        let token = std::env::var("BIGQUERY_ACCESS_TOKEN").ok();
        if matches!(auth_type, AuthType::Bearer) && token.is_none() {
            return Err(EtlError::Config(
                "BIGQUERY_ACCESS_TOKEN is required for bearer authentication".into(),
            )
            .into());
        }

        Ok(Self {
            project,
            api_url,
            auth: Auth::new(&auth_type, token),
            location: std::env::var("BIGQUERY_LOCATION").ok(),
            housing_dataset: std::env::var("HOUSING_DATASET")
                .unwrap_or_else(|_| DEFAULT_HOUSING_DATASET.to_string()),
            movie_dataset: std::env::var("MOVIE_DATASET")
                .unwrap_or_else(|_| DEFAULT_MOVIE_DATASET.to_string()),
        })
    }

    /// Settings for runs that never reach a real warehouse
    pub fn offline(project: impl Into<String>) -> Result<Self> {
        Ok(Self {
            project: project.into(),
            api_url: Url::parse(DEFAULT_BIGQUERY_URL)?,
            auth: Auth::None,
            location: None,
            housing_dataset: DEFAULT_HOUSING_DATASET.to_string(),
            movie_dataset: DEFAULT_MOVIE_DATASET.to_string(),
        })
    }
}
