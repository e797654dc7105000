//! Deployment verification for Vault on managed instance groups.

pub mod checks;
pub mod command;
pub mod config;
pub mod gcloud;
pub mod observability;
pub mod poll;
pub mod upgrade;

pub use checks::{CheckReport, Suite};
pub use config::ProbeConfig;
pub use poll::{poll, PollConfig, PollResult, PollStatus, Poller};
