//! Emit `terraform state mv` commands for resources moved under a module.
//!
//! Dry-run by default:
//!
//! ```text
//! gen-upgrade-commands               # prints commands with -dry-run
//! gen-upgrade-commands --no-dry-run | bash
//! ```
//!
//! The flag is spelled `--no-dry-run` with two dashes; the single-dash
//! `-no-dry-run` of the older shell helper is not accepted.
//!
//! Without `--plan-file`, terraform is run using `command.terraform_path` and
//! `command.timeout_secs` from `--config`. `--terraform` overrides the path.

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;

use vault_probe::config::{load_config, ProbeConfig};
use vault_probe::observability::logging;
use vault_probe::upgrade::{configured_plan, render_command, scan_plan, DRY_RUN_BANNER};

#[derive(Parser)]
#[command(name = "gen-upgrade-commands")]
#[command(about = "Generate terraform state mv commands for a module rename", long_about = None)]
struct Cli {
    /// TOML config file; only the `command` and `observability` tables are read
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print commands without -dry-run
    #[arg(long = "no-dry-run")]
    no_dry_run: bool,

    /// Module the resources moved into
    #[arg(long, default_value = "cluster")]
    module: String,

    /// Read plan text from this file ("-" for stdin) instead of running terraform
    #[arg(long)]
    plan_file: Option<PathBuf>,

    /// Terraform binary, overriding `command.terraform_path`
    #[arg(long)]
    terraform: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProbeConfig::default(),
    };
    if let Some(terraform) = cli.terraform {
        config.command.terraform_path = terraform;
    }
    logging::init_logging(&config.observability)?;

    let plan = match &cli.plan_file {
        Some(path) if path.as_os_str() == "-" => {
            let mut plan = String::new();
            std::io::stdin().read_to_string(&mut plan)?;
            plan
        }
        Some(path) => std::fs::read_to_string(path)?,
        None => configured_plan(&config.command).await?,
    };

    let moves = scan_plan(&plan, &cli.module)?;
    tracing::info!(module = %cli.module, moves = moves.len(), "Scanned plan");

    let dry_run = !cli.no_dry_run;
    if dry_run {
        eprintln!("{DRY_RUN_BANNER}");
    }

    for state_move in &moves {
        println!("{}", render_command(state_move, dry_run));
    }

    Ok(())
}
