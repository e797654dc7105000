//! Decoded gcloud records and query errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::CommandError;

/// A single failed gcloud query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("`{command}` exited with status {status}: {stderr}")]
    NonZeroExit {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("`{command}` returned malformed JSON: {source}")]
    Malformed {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Entry of `compute instance-groups managed list-instances`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstance {
    /// Instance URL.
    pub instance: String,

    #[serde(default)]
    pub instance_status: Option<String>,

    #[serde(default)]
    pub current_action: Option<String>,

    #[serde(default)]
    pub instance_health: Vec<InstanceHealth>,
}

impl ManagedInstance {
    pub fn is_idle(&self) -> bool {
        self.current_action.as_deref() == Some("NONE")
    }

    /// Short instance name from the instance URL.
    pub fn name(&self) -> &str {
        self.instance
            .rsplit('/')
            .next()
            .unwrap_or(self.instance.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceHealth {
    #[serde(default)]
    pub detailed_health_state: Option<String>,
}

/// Output of `compute forwarding-rules describe`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingRule {
    #[serde(rename = "IPAddress")]
    pub ip_address: String,

    #[serde(default)]
    pub port_range: Option<String>,

    #[serde(default)]
    pub load_balancing_scheme: Option<String>,
}

/// Entry of `compute instances list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Instance {
    pub name: String,
    pub status: String,
}
