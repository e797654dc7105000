//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the probe.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::poll::PollConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProbeConfig {
    /// Cloud project that hosts the deployment.
    pub project_id: String,

    /// External program settings.
    pub command: CommandConfig,

    /// Managed instance group checks.
    pub instance_group: InstanceGroupConfig,

    /// External load balancer checks.
    pub external: ExternalLbConfig,

    /// Internal load balancer checks.
    pub internal: InternalLbConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// External program settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Path or name of the gcloud binary.
    pub gcloud_path: String,

    /// Path or name of the terraform binary.
    pub terraform_path: String,

    /// Hard limit for a single command invocation in seconds.
    pub timeout_secs: u64,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            gcloud_path: "gcloud".to_string(),
            terraform_path: "terraform".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Managed instance group settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstanceGroupConfig {
    /// Instance group manager name.
    pub name: String,

    /// Region of the regional instance group.
    pub region: String,

    /// Seconds `wait-until --stable` may take.
    pub deadline_secs: u64,

    /// Poll for every instance to reach currentAction NONE.
    pub action_poll: PollConfig,

    /// Poll per instance for the startup scripts to finish.
    pub boot_poll: PollConfig,
}

impl Default for InstanceGroupConfig {
    fn default() -> Self {
        Self {
            name: "vault-igm".to_string(),
            region: "us-east4".to_string(),
            deadline_secs: 300,
            action_poll: PollConfig::default(),
            boot_poll: PollConfig::default(),
        }
    }
}

/// External load balancer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExternalLbConfig {
    /// Forwarding rule name.
    pub name: String,

    pub region: String,

    /// Expected forwarding rule port range.
    pub port_range: String,

    /// Port Vault listens on behind the load balancer.
    pub vault_port: u16,

    /// Poll until the health endpoint answers.
    pub health_poll: PollConfig,

    /// Timeout for one health request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ExternalLbConfig {
    fn default() -> Self {
        Self {
            name: "vault-external".to_string(),
            region: "us-east4".to_string(),
            port_range: "8200-8200".to_string(),
            vault_port: 8200,
            health_poll: PollConfig {
                max_attempts: 20,
                delay_ms: 60_000,
            },
            request_timeout_secs: 10,
        }
    }
}

/// Internal load balancer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InternalLbConfig {
    /// Forwarding rule name.
    pub name: String,

    pub region: String,

    /// Every instance in the project must carry this name prefix.
    pub instance_name_prefix: String,
}

impl Default for InternalLbConfig {
    fn default() -> Self {
        Self {
            name: "vault-internal".to_string(),
            region: "us-west1".to_string(),
            instance_name_prefix: "vault".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Write Prometheus text metrics here when the run finishes.
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_textfile: None,
        }
    }
}
