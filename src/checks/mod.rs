//! Deployment checks.
//!
//! # Data Flow
//! ```text
//! Suite selected on the CLI
//!     → <Suite>Context::gather (gcloud queries, bounded polls)
//!     → evaluate: one CheckOutcome per check, read-only over the context
//!     → CheckReport (text or JSON on stdout)
//! ```
//!
//! # Design Decisions
//! - Each suite gathers its observations exactly once
//! - A failed query fails the checks that need it and nothing else
//! - Poll exhaustion is not a failure by itself; checks judge the last observation
//! - A cancelled poll aborts the suite with [`SuiteError::Cancelled`]; no report is produced

pub mod instance_group;
pub mod load_balancer;
pub mod report;
pub mod vault_health;

use thiserror::Error;

use crate::poll::{PollError, PollResult, PollStatus};

pub use report::{CheckOutcome, CheckReport};
pub use vault_health::{HealthError, HealthProbe, VaultHealth, VaultHealthClient};

/// Reasons a suite stops before evaluating its checks.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("cancelled while polling {operation}")]
    Cancelled { operation: &'static str },

    #[error(transparent)]
    Health(#[from] HealthError),
}

impl SuiteError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SuiteError::Cancelled { .. })
    }
}

/// Pass a finished poll through, turning a cancelled one into an error.
pub(crate) fn unless_cancelled<T, E>(
    operation: &'static str,
    result: PollResult<T, E>,
) -> Result<PollResult<T, E>, SuiteError> {
    if result.status == PollStatus::Cancelled {
        tracing::warn!(operation = operation, "Suite cancelled");
        return Err(SuiteError::Cancelled { operation });
    }
    Ok(result)
}

/// Check suites runnable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    InstanceGroup,
    External,
    Internal,
}

impl Suite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::InstanceGroup => instance_group::SUITE,
            Suite::External => load_balancer::EXTERNAL_SUITE,
            Suite::Internal => load_balancer::INTERNAL_SUITE,
        }
    }
}

impl std::fmt::Display for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
