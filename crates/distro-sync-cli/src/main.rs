//! distro-sync - keep the distro test matrix in step with endoflife.date
//!
//! Run without arguments from the repository root. Every option has an
//! environment variable fallback so the scheduled workflow can stay short.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use distro_sync_core::config::{DEFAULT_FAMILIES, DEFAULT_IGNORED};
use distro_sync_core::{
    emit_github_outputs, render_summary, GithubOutput, JsonReport, LogFormat, Reconciler,
    SyncConfig,
};
use eol_source::{EndOfLifeClient, EolConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use matrix_store::{ChompFixup, DEFAULT_JOB, DEFAULT_WORKFLOW_PATH};
use tracing::{info, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "distro-sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Sync the distro test matrix with supported releases from endoflife.date",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,

    /// Workflow file holding the matrix
    #[arg(long, env = "DISTRO_SYNC_WORKFLOW", default_value = DEFAULT_WORKFLOW_PATH)]
    workflow: PathBuf,

    /// Job whose strategy.matrix.include is synced
    #[arg(long, env = "DISTRO_SYNC_JOB", default_value = DEFAULT_JOB)]
    job: String,

    /// Distro families to query, comma separated
    #[arg(
        long,
        env = "DISTRO_SYNC_FAMILIES",
        value_delimiter = ',',
        default_values = DEFAULT_FAMILIES
    )]
    families: Vec<String>,

    /// Identifiers or families never added or removed; pass "" for none
    #[arg(
        long,
        env = "DISTRO_SYNC_IGNORE",
        value_delimiter = ',',
        default_values = DEFAULT_IGNORED
    )]
    ignore: Vec<String>,

    /// endoflife.date API root
    #[arg(long, env = "EOL_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "EOL_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Keys whose new block scalars are written with `|` rather than `|-`
    #[arg(long, value_delimiter = ',', default_values = ChompFixup::DEFAULT_KEYS)]
    clip_keys: Vec<String>,

    /// Report what would change without writing the workflow file
    #[arg(long)]
    dry_run: bool,

    /// Summary format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl Cli {
    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            workflow_path: self.workflow.clone(),
            job: self.job.clone(),
            families: non_empty(&self.families),
            ignored: non_empty(&self.ignore),
            eol: EolConfig::new(&self.api_url).with_timeout_secs(self.timeout_secs),
            clip_keys: non_empty(&self.clip_keys),
        }
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    distro_sync_core::init_tracing(LogFormat::from_json_flag(cli.json_logs), level);

    let config = cli.sync_config();
    let client =
        EndOfLifeClient::new(config.eol.clone()).context("Failed to build endoflife.date client")?;

    info!(
        workflow = %config.workflow_path.display(),
        families = ?config.families,
        dry_run = cli.dry_run,
        "Checking supported distros"
    );

    let outcome = Reconciler::new(&client, &config)
        .dry_run(cli.dry_run)
        .run()
        .await
        .with_context(|| format!("Failed to sync {}", config.workflow_path.display()))?;

    emit_github_outputs(&outcome, GithubOutput::from_env().as_ref())
        .context("Failed to write GitHub step outputs")?;

    match cli.format {
        OutputFormat::Text => print!("{}", render_summary(&outcome)),
        OutputFormat::Json => {
            let report = JsonReport::new(outcome);
            println!("{}", report.to_json_pretty().context("Failed to encode report")?);
        }
    }

    Ok(())
}
