//! CLI helper functions

use crate::{
    config::{CredentialSource, CredsFile, EnvCredentials, WarehouseConfig, YamlCredentials},
    datasets::{MoviesReport, housing, movies},
    etl::PipelineReport,
    source::{MySqlSource, Source},
    transform::LengthBranches,
    warehouse::{BigQuery, DirLoadReport, MemoryWarehouse, Warehouse},
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DRY_RUN_PROJECT: &str = "dry-run";

/// Where MySQL credentials are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CredentialKind {
    /// `key=value` lines in the credentials file
    File,
    /// `MYSQL_*` environment variables
    Env,
    /// YAML document in the credentials file
    Yaml,
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub credentials: CredentialKind,
    pub creds_path: PathBuf,
    pub output_dir: PathBuf,
    /// Load into an in-process warehouse instead of BigQuery
    pub dry_run: bool,
}

pub fn credential_source(kind: CredentialKind, path: impl AsRef<Path>) -> Box<dyn CredentialSource> {
    match kind {
        CredentialKind::File => Box::new(CredsFile::new(path)),
        CredentialKind::Env => Box::new(EnvCredentials::default()),
        CredentialKind::Yaml => Box::new(YamlCredentials::new(path)),
    }
}

/// Build the MySQL source from the selected credentials
pub fn load_source(options: &RunOptions) -> Result<MySqlSource> {
    let credentials = credential_source(options.credentials, &options.creds_path);
    log::debug!("Reading source credentials from {}", credentials.describe());
    let config = credentials
        .source_config()
        .with_context(|| format!("Failed to read {}", credentials.describe()))?;
    Ok(MySqlSource::new(&config))
}

/// Load warehouse settings from the environment
///
/// A dry run tolerates missing settings and falls back to defaults under
/// the `dry-run` project.
pub fn load_warehouse_config(dry_run: bool) -> Result<WarehouseConfig> {
    match WarehouseConfig::from_env() {
        Ok(config) => Ok(config),
        Err(e) if dry_run => {
            log::debug!("Using offline warehouse settings: {}", e);
            WarehouseConfig::offline(DRY_RUN_PROJECT)
        }
        Err(e) => Err(e),
    }
}

pub fn load_warehouse(config: &WarehouseConfig, dry_run: bool) -> Result<Arc<dyn Warehouse>> {
    if dry_run {
        log::info!("Dry run: loading into an in-memory warehouse");
        return Ok(Arc::new(MemoryWarehouse::new()));
    }
    let bigquery = BigQuery::try_new(config).context("Failed to create BigQuery client")?;
    log::debug!("Using BigQuery at {}", bigquery);
    Ok(Arc::new(bigquery))
}

/// Run the housing job
///
/// Pipeline: MySQL → Unpivot → CSV file → warehouse (truncate)
pub async fn run_housing(options: &RunOptions) -> Result<PipelineReport> {
    let source = load_source(options)?;
    let config = load_warehouse_config(options.dry_run)?;
    let warehouse = load_warehouse(&config, options.dry_run)?;

    log::info!("Running housing job from {}", source.to_string().cyan());
    let report = housing::run(source, warehouse, &config, &options.output_dir).await?;

    log::info!(
        "✓ Housing: {} wide rows reshaped into {} rows",
        report.extracted,
        report.transformed
    );
    Ok(report)
}

/// Run the movie job
///
/// Pipeline: MySQL → VoteCategorizer → LengthCategorizer → CSV per year,
/// then one warehouse table per file (write-if-empty)
pub async fn run_movies(options: &RunOptions, branches: LengthBranches) -> Result<MoviesReport> {
    let source = load_source(options)?;
    let config = load_warehouse_config(options.dry_run)?;
    let warehouse = load_warehouse(&config, options.dry_run)?;

    log::info!("Running movie job from {}", source.to_string().cyan());
    let report = movies::run(
        source,
        warehouse.as_ref(),
        &config,
        branches,
        &options.output_dir,
    )
    .await?;

    log_dir_load(&report.load);
    Ok(report)
}

/// Load previously exported movie files from `dir`
pub async fn load_movies(options: &RunOptions, dir: impl AsRef<Path>) -> Result<DirLoadReport> {
    let dir = dir.as_ref();
    let config = load_warehouse_config(options.dry_run)?;
    let warehouse = load_warehouse(&config, options.dry_run)?;

    log::info!("Loading movie files from {}", dir.display().bright_black());
    let report = movies::load(warehouse.as_ref(), &config, dir).await?;

    log_dir_load(&report);
    Ok(report)
}

/// Check that both the source and the warehouse accept our credentials
pub async fn check_auth(options: &RunOptions) -> Result<()> {
    let source = load_source(options)?;
    log::info!("Checking source {}", source.to_string().cyan());
    source.check().await?;
    log::info!("✓ Source reachable");

    let config = load_warehouse_config(options.dry_run)?;
    let warehouse = load_warehouse(&config, options.dry_run)?;
    log::info!("Checking warehouse project {}", config.project.cyan());
    warehouse.check().await?;
    log::info!("✓ Warehouse reachable");

    Ok(())
}

fn log_dir_load(report: &DirLoadReport) {
    let rows: u64 = report.loaded.iter().map(|(_, rows)| rows).sum();
    log::info!(
        "✓ Loaded {} table(s), {} row(s)",
        report.loaded.len(),
        rows
    );
    for (file, _) in &report.failed {
        log::warn!("Not loaded: {}", file.display().bright_black());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_source_kind() {
        let file = credential_source(CredentialKind::File, "creds.txt");
        assert_eq!(file.describe(), "credentials file creds.txt");

        let yaml = credential_source(CredentialKind::Yaml, "creds.yml");
        assert_eq!(yaml.describe(), "YAML credentials creds.yml");

        let env = credential_source(CredentialKind::Env, "ignored");
        assert_eq!(env.describe(), "environment variables MYSQL_*");
    }

    #[test]
    #[serial_test::serial]
    fn test_dry_run_falls_back_to_offline_config() {
        unsafe {
            std::env::remove_var("BIGQUERY_PROJECT");
        }
        assert!(load_warehouse_config(false).is_err());

        let config = load_warehouse_config(true).unwrap();
        assert_eq!(config.project, DRY_RUN_PROJECT);
    }

    #[test]
    fn test_missing_creds_file() {
        let options = RunOptions {
            credentials: CredentialKind::File,
            creds_path: PathBuf::from("/definitely/missing/creds.txt"),
            output_dir: PathBuf::from("."),
            dry_run: true,
        };
        assert!(load_source(&options).is_err());
    }
}
