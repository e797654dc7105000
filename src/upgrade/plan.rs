//! Plan scanning and command rendering.

use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::command::{CommandError, CommandRunner, ProcessRunner};
use crate::config::CommandConfig;

pub const DRY_RUN_BANNER: &str = "===> Executing with -dry-run. To actually run, execute:\n\
                                  ===>   gen-upgrade-commands --no-dry-run | bash";

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("terraform plan exited with status {status}: {stderr}")]
    PlanFailed { status: i32, stderr: String },

    #[error("invalid module name: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to read plan: {0}")]
    Io(#[from] std::io::Error),
}

/// One resource address rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateMove {
    /// Address in the current state, without the module segment.
    pub from: String,
    /// Address the plan expects.
    pub to: String,
}

/// Find resources the plan wants to create under `module.<module>`.
///
/// Lines mentioning `data` are data sources and are skipped, as are comment
/// lines that do not carry a `# <address> will ...` header.
pub fn scan_plan(plan: &str, module: &str) -> Result<Vec<StateMove>, UpgradeError> {
    let selector = Regex::new(&format!(r"#.*\.{}\.", regex::escape(module)))?;
    let header = Regex::new(r"# (.*?) will")?;
    let segment = format!("module.{module}.");

    let moves = plan
        .lines()
        .filter(|line| selector.is_match(line) && !line.contains("data"))
        .filter_map(|line| match header.captures(line) {
            Some(caps) => Some(caps[1].to_string()),
            None => {
                tracing::debug!(line = %line, "Skipping plan line without address header");
                None
            }
        })
        .map(|address| StateMove {
            from: address.replace(&segment, ""),
            to: address,
        })
        .collect();

    Ok(moves)
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn render_command(state_move: &StateMove, dry_run: bool) -> String {
    let flag = if dry_run { " -dry-run" } else { "" };
    format!(
        "terraform state mv{flag} {} {}",
        shell_quote(&state_move.from),
        shell_quote(&state_move.to)
    )
}

/// Run `terraform plan -no-color` in the current directory.
pub async fn terraform_plan(
    runner: &dyn CommandRunner,
    terraform: &str,
) -> Result<String, UpgradeError> {
    let args = vec!["plan".to_string(), "-no-color".to_string()];
    let output = runner.run(terraform, &args).await?;
    if !output.success() {
        return Err(UpgradeError::PlanFailed {
            status: output.exit_status,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Run the configured terraform binary under the configured command timeout.
pub async fn configured_plan(config: &CommandConfig) -> Result<String, UpgradeError> {
    let runner = ProcessRunner::new(Duration::from_secs(config.timeout_secs));
    terraform_plan(&runner, &config.terraform_path).await
}
