//! BigQuery REST client
//!
//! Load jobs are inserted with a `multipart/related` upload (job metadata
//! followed by the data) and then polled until BigQuery reports them done.

use super::{Auth, LoadConfig, LoadSource, TableRef, Warehouse};
use crate::config::WarehouseConfig;
use crate::error::EtlError;
use crate::table::Table;
use async_trait::async_trait;
use eyre::{Context, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

const CSV_FORMAT: &str = "CSV";
const NDJSON_FORMAT: &str = "NEWLINE_DELIMITED_JSON";

/// BigQuery client scoped to one project
///
/// # Example
/// ```no_run
/// use mysql_bigquery_etl::config::WarehouseConfig;
/// use mysql_bigquery_etl::warehouse::{BigQuery, Warehouse};
///
/// # async fn example() -> eyre::Result<()> {
/// let config = WarehouseConfig::from_env()?;
/// let bigquery = BigQuery::try_new(&config)?;
/// bigquery.check().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BigQuery {
    client: Client,
    url: Url,
    project: String,
    location: Option<String>,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Job {
    job_reference: JobReference,
    #[serde(default)]
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    state: Option<String>,
    error_result: Option<ErrorProto>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

impl std::fmt::Display for ErrorProto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.reason.as_deref().unwrap_or("error"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

impl JobStatus {
    fn is_done(&self) -> bool {
        self.state.as_deref() == Some("DONE")
    }

    /// Error text when the job finished unsuccessfully
    fn failure(&self) -> Option<String> {
        let main = self.error_result.as_ref()?;
        let details: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        Some(match details.is_empty() {
            true => main.to_string(),
            false => format!("{} ({})", main, details.join("; ")),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableResource {
    num_rows: Option<String>,
}

impl BigQuery {
    /// Create a client from warehouse settings
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built or the token is
    /// not a valid header value
    pub fn try_new(config: &WarehouseConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Auth::Bearer(token) = &config.auth {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token).parse()?,
            );
        }
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            url: config.api_url.clone(),
            project: config.project.clone(),
            location: config.location.clone(),
            poll_interval: Duration::from_secs(1),
        })
    }

    /// Set how long to wait between job status requests
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.url
            .join(path.strip_prefix('/').unwrap_or(path))
            .with_context(|| format!("Invalid API path: {}", path))
    }

    /// Load job metadata for the jobs.insert call
    fn job_metadata(&self, destination: &TableRef, format: &str, config: &LoadConfig) -> Value {
        let mut load = json!({
            "destinationTable": {
                "projectId": destination.project,
                "datasetId": destination.dataset,
                "tableId": destination.table,
            },
            "sourceFormat": format,
            "autodetect": config.autodetect,
            "writeDisposition": config.write_disposition.as_api_str(),
            "createDisposition": "CREATE_IF_NEEDED",
        });
        if format == CSV_FORMAT {
            load["skipLeadingRows"] = json!(config.skip_leading_rows);
        }

        let mut job = json!({ "configuration": { "load": load } });
        if let Some(location) = &self.location {
            job["jobReference"] = json!({ "projectId": self.project, "location": location });
        }
        job
    }

    /// Error out on non-2xx responses, keeping the body for the message
    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(
                EtlError::WarehouseFailure(format!("{} ({}): {}", action, status, body)).into(),
            );
        }
        Ok(response)
    }

    async fn insert_job(&self, metadata: &Value, data: Vec<u8>) -> Result<Job> {
        let url = self.endpoint(&format!("upload/bigquery/v2/projects/{}/jobs", self.project))?;
        let (content_type, body) = multipart_related(metadata, &data)?;

        log::debug!("Inserting load job ({} bytes of data)", data.len());
        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "multipart")])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| EtlError::WarehouseFailure(format!("Failed to send request: {}", e)))?;

        let response = Self::ensure_success(response, "Failed to insert load job").await?;
        response
            .json::<Job>()
            .await
            .with_context(|| "Failed to parse load job response")
    }

    async fn get_job(&self, reference: &JobReference) -> Result<Job> {
        let url = self.endpoint(&format!(
            "bigquery/v2/projects/{}/jobs/{}",
            self.project, reference.job_id
        ))?;
        let mut request = self.client.get(url);
        if let Some(location) = &reference.location {
            request = request.query(&[("location", location)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EtlError::WarehouseFailure(format!("Failed to send request: {}", e)))?;
        let response = Self::ensure_success(response, "Failed to get load job").await?;
        response
            .json::<Job>()
            .await
            .with_context(|| "Failed to parse job status response")
    }

    /// Poll until the job is done; the job's own error becomes the result
    async fn wait_for(&self, mut job: Job) -> Result<()> {
        while !job.status.is_done() {
            log::trace!(
                "Job {} is {}",
                job.job_reference.job_id,
                job.status.state.as_deref().unwrap_or("PENDING")
            );
            tokio::time::sleep(self.poll_interval).await;
            job = self.get_job(&job.job_reference).await?;
        }

        match job.status.failure() {
            Some(failure) => Err(EtlError::WarehouseFailure(format!(
                "Load job {} failed: {}",
                job.job_reference.job_id, failure
            ))
            .into()),
            None => Ok(()),
        }
    }
}

/// Serialize a table as newline-delimited JSON objects keyed by column
pub(crate) fn table_to_ndjson(table: &Table) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for row in table.rows() {
        let object: serde_json::Map<String, Value> = table
            .columns()
            .iter()
            .cloned()
            .zip(row.iter().map(Value::from))
            .collect();
        serde_json::to_writer(&mut out, &object)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Build a `multipart/related` body: JSON metadata part, then the data part
fn multipart_related(metadata: &Value, data: &[u8]) -> Result<(String, Vec<u8>)> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let boundary = format!("mybq_{:x}", nanos);

    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes(),
    );
    serde_json::to_writer(&mut body, metadata)?;
    body.extend_from_slice(
        format!("\r\n--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Ok((format!("multipart/related; boundary={}", boundary), body))
}

#[async_trait]
impl Warehouse for BigQuery {
    async fn load(
        &self,
        destination: &TableRef,
        source: LoadSource<'_>,
        config: &LoadConfig,
    ) -> Result<()> {
        let (format, data) = match source {
            LoadSource::Table(table) => (NDJSON_FORMAT, table_to_ndjson(table)?),
            LoadSource::Csv(path) => (
                CSV_FORMAT,
                std::fs::read(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            ),
        };

        log::debug!(
            "Loading {} into {} ({})",
            format,
            destination,
            config.write_disposition.as_api_str()
        );
        let metadata = self.job_metadata(destination, format, config);
        let job = self.insert_job(&metadata, data).await?;
        self.wait_for(job).await
    }

    async fn row_count(&self, table: &TableRef) -> Result<u64> {
        let url = self.endpoint(&format!(
            "bigquery/v2/projects/{}/datasets/{}/tables/{}",
            table.project, table.dataset, table.table
        ))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EtlError::WarehouseFailure(format!("Failed to send request: {}", e)))?;
        let response = Self::ensure_success(response, "Failed to get table").await?;
        let resource: TableResource = response
            .json()
            .await
            .with_context(|| "Failed to parse table response")?;

        match resource.num_rows {
            Some(n) => n
                .parse()
                .with_context(|| format!("Invalid numRows '{}' for {}", n, table)),
            None => Ok(0),
        }
    }

    async fn check(&self) -> Result<()> {
        let url = self.endpoint(&format!("bigquery/v2/projects/{}/datasets", self.project))?;
        let response = self
            .client
            .get(url)
            .query(&[("maxResults", "1")])
            .send()
            .await
            .map_err(|e| EtlError::WarehouseFailure(format!("Failed to send request: {}", e)))?;
        Self::ensure_success(response, "Failed to list datasets").await?;
        Ok(())
    }
}

impl std::fmt::Display for BigQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (project: {})", self.url, self.project)
    }
}
