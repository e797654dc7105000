//! vault-probe
//!
//! Verifies a Vault deployment running behind load balancers on managed
//! instance groups.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI (suite) ──▶ config ──▶ <Suite>Context::gather ──▶ evaluate ──▶ CheckReport
//!                                   │                                     │
//!                                   ▼                                     ▼
//!                           ┌──────────────┐                       stdout (text/json)
//!                           │ poll::Poller │◀── Ctrl-C cancels
//!                           └──────┬───────┘
//!                                  ▼
//!                     gcloud client / Vault health probe
//!                                  │
//!                                  ▼
//!                        command runner (child process)
//! ```
//!
//! Exit status is 1 when any check fails and 130 when interrupted before the
//! checks could be evaluated.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use vault_probe::checks::{
    instance_group, load_balancer, CheckReport, Suite, SuiteError, VaultHealthClient,
};
use vault_probe::command::ProcessRunner;
use vault_probe::config::{load_config, validate_config, ConfigError, ProbeConfig};
use vault_probe::gcloud::Gcloud;
use vault_probe::observability::{logging, metrics};
use vault_probe::poll::{Poller, TokioSleeper};

#[derive(Parser)]
#[command(name = "vault-probe")]
#[command(about = "Verify a Vault deployment on managed instance groups", long_about = None)]
struct Cli {
    /// TOML config file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cloud project hosting the deployment
    #[arg(long, env = "PROJECT_ID")]
    project_id: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Instance group stability, health and startup scripts
    InstanceGroup,
    /// External load balancer and Vault TLS health
    External,
    /// Internal load balancer and instance status
    Internal,
}

impl Commands {
    fn suite(&self) -> Suite {
        match self {
            Commands::InstanceGroup => Suite::InstanceGroup,
            Commands::External => Suite::External,
            Commands::Internal => Suite::Internal,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// 128 + SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProbeConfig::default(),
    };
    if let Some(project_id) = cli.project_id {
        config.project_id = project_id;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;
    let metrics_handle = match &config.observability.metrics_textfile {
        Some(_) => Some(metrics::install_recorder()?),
        None => None,
    };

    let run_id = Uuid::new_v4();
    let suite = cli.command.suite();
    tracing::info!(
        run_id = %run_id,
        suite = %suite,
        project_id = %config.project_id,
        "vault-probe starting"
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, cancelling polls");
                cancel.cancel();
            }
        }
    });

    let runner = Arc::new(ProcessRunner::new(Duration::from_secs(
        config.command.timeout_secs,
    )));
    let gcloud = Gcloud::new(
        runner,
        config.command.gcloud_path.clone(),
        config.project_id.clone(),
    );
    let poller = Poller::new().with_cancellation(cancel);

    let span = tracing::info_span!("probe", run_id = %run_id, suite = %suite);
    let report = match run_suite(suite, &gcloud, &poller, &config, run_id)
        .instrument(span)
        .await
    {
        Ok(report) => report,
        Err(e) if e.is_cancelled() => {
            tracing::warn!(error = %e, "Interrupted, no report produced");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        Err(e) => return Err(e.into()),
    };

    match cli.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let (Some(handle), Some(path)) = (&metrics_handle, &config.observability.metrics_textfile) {
        if let Err(e) = metrics::write_textfile(handle, path) {
            tracing::error!(path = %path.display(), error = %e, "Failed to write metrics textfile");
        }
    }

    if !report.passed() {
        tracing::error!(failed = report.failures().count(), "Checks failed");
        std::process::exit(1);
    }

    tracing::info!("All checks passed");
    Ok(())
}

async fn run_suite(
    suite: Suite,
    gcloud: &Gcloud,
    poller: &Poller<TokioSleeper>,
    config: &ProbeConfig,
    run_id: Uuid,
) -> Result<CheckReport, SuiteError> {
    let report = match suite {
        Suite::InstanceGroup => {
            instance_group::run(gcloud, poller, &config.instance_group, run_id).await?
        }
        Suite::External => {
            let probe = VaultHealthClient::new(Duration::from_secs(
                config.external.request_timeout_secs,
            ))?;
            load_balancer::run_external(gcloud, poller, &probe, &config.external, run_id).await?
        }
        Suite::Internal => load_balancer::run_internal(gcloud, &config.internal, run_id).await,
    };
    Ok(report)
}
