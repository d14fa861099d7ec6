use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use mysql_bigquery_etl::cli::{self, CredentialKind, RunOptions};
use mysql_bigquery_etl::transform::LengthBranches;
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// mybq: move MySQL tables into CSV exports and BigQuery, one batch at a time
#[derive(Parser)]
#[command(name = "mybq", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source settings from (skipped if missing)
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging, including table previews
    #[arg(long, global = true)]
    debug: bool,

    /// Where to read MySQL credentials from
    #[arg(short, long, global = true, value_enum, default_value_t = CredentialKind::File)]
    credentials: CredentialKind,

    /// Credentials file for the `file` and `yaml` credential sources
    #[arg(long, global = true, default_value = "creds.txt")]
    creds_path: PathBuf,

    /// Root directory for the exported CSV files
    #[arg(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,

    /// Load into an in-memory warehouse instead of BigQuery
    #[arg(long, global = true)]
    dry_run: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reshape city house prices and replace the warehouse table
    Housing,

    /// Categorise movies, export one file per year and load each into its own table
    Movies {
        /// Categorise films from 120 up to 180 minutes as "Long Film"
        #[arg(long)]
        long_film: bool,
    },

    /// Load previously exported movie files from a directory
    LoadMovies {
        /// Directory containing movies_<year>.csv files
        #[arg(default_value = "movie_data")]
        dir: PathBuf,
    },

    /// Test connectivity to the MySQL source and the warehouse
    Auth,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let dotenv = dotenvy::from_filename(&cli.env);

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    if let Err(e) = dotenv {
        log::debug!("No settings loaded from {}: {}", cli.env.bright_black(), e);
    }

    if let Err(e) = run(cli).await {
        log::error!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let options = RunOptions {
        credentials: cli.credentials,
        creds_path: cli.creds_path,
        output_dir: cli.output_dir,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Housing => {
            log::info!(
                "Exporting housing prices to {}",
                options.output_dir.display().bright_black()
            );
            cli::run_housing(&options).await?;
        }
        Commands::Movies { long_film } => {
            let branches = match long_film {
                true => LengthBranches::LongFilmBelow180,
                false => LengthBranches::AsWritten,
            };
            log::info!(
                "Exporting movies to {} (length categories: {:?})",
                options.output_dir.display().bright_black(),
                branches
            );
            let report = cli::run_movies(&options, branches).await?;
            if !report.load.is_success() {
                eyre::bail!("{} movie file(s) failed to load", report.load.failed.len());
            }
        }
        Commands::LoadMovies { dir } => {
            let report = cli::load_movies(&options, &dir).await?;
            if !report.is_success() {
                eyre::bail!("{} movie file(s) failed to load", report.failed.len());
            }
        }
        Commands::Auth => {
            log::info!("Testing authorization");
            cli::check_auth(&options).await?;
        }
    }

    Ok(())
}
