//! gcloud invocations used by the checks.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::command::{CommandOutput, CommandRunner};
use crate::gcloud::types::{ManagedInstance, QueryError};

/// gcloud bound to one project.
#[derive(Clone)]
pub struct Gcloud {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    project_id: String,
}

impl Gcloud {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        binary: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            project_id: project_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn args(&self, args: &[&str]) -> Vec<String> {
        std::iter::once(format!("--project={}", self.project_id))
            .chain(args.iter().map(|s| s.to_string()))
            .collect()
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run gcloud and return its output whatever the exit status.
    pub async fn run(&self, args: &[&str]) -> Result<CommandOutput, QueryError> {
        let args = self.args(args);
        Ok(self.runner.run(&self.binary, &args).await?)
    }

    /// Run gcloud and require a zero exit status.
    async fn run_ok(&self, args: &[&str]) -> Result<CommandOutput, QueryError> {
        let full = self.args(args);
        let output = self.runner.run(&self.binary, &full).await?;
        if !output.success() {
            return Err(QueryError::NonZeroExit {
                command: self.command_line(&full),
                status: output.exit_status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Decode the JSON stdout of a finished command.
    pub fn decode<T: DeserializeOwned>(
        command: &str,
        output: &CommandOutput,
    ) -> Result<T, QueryError> {
        if !output.success() {
            return Err(QueryError::NonZeroExit {
                command: command.to_string(),
                status: output.exit_status,
                stderr: output.stderr.trim().to_string(),
            });
        }
        serde_json::from_str(&output.stdout).map_err(|source| QueryError::Malformed {
            command: command.to_string(),
            source,
        })
    }

    async fn json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, QueryError> {
        let output = self.run_ok(args).await?;
        let command = self.command_line(&self.args(args));
        Self::decode(&command, &output)
    }

    /// Serial console output of one instance.
    pub async fn serial_port_output(&self, instance: &str) -> Result<String, QueryError> {
        let output = self
            .run_ok(&["compute", "instances", "get-serial-port-output", instance])
            .await?;
        Ok(output.stdout)
    }

    pub async fn list_managed_instances(
        &self,
        group: &str,
        region: &str,
    ) -> Result<Vec<ManagedInstance>, QueryError> {
        let region = format!("--region={region}");
        self.json(&[
            "compute",
            "instance-groups",
            "managed",
            "list-instances",
            group,
            &region,
            "--format=json",
        ])
        .await
    }

    /// Block until the group is stable or `deadline_secs` pass.
    pub async fn wait_until_stable(
        &self,
        group: &str,
        region: &str,
        deadline_secs: u64,
    ) -> Result<CommandOutput, QueryError> {
        let timeout = format!("--timeout={deadline_secs}");
        let region = format!("--region={region}");
        self.run(&[
            "compute",
            "instance-groups",
            "managed",
            "wait-until",
            "--stable",
            &timeout,
            group,
            &region,
        ])
        .await
    }

    pub async fn describe_forwarding_rule(
        &self,
        name: &str,
        region: &str,
    ) -> Result<CommandOutput, QueryError> {
        self.run(&[
            "compute",
            "forwarding-rules",
            "describe",
            name,
            "--region",
            region,
            "--format=json",
        ])
        .await
    }

    pub async fn list_instances(&self) -> Result<CommandOutput, QueryError> {
        self.run(&["compute", "instances", "list", "--format=json"])
            .await
    }
}

impl std::fmt::Debug for Gcloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gcloud")
            .field("binary", &self.binary)
            .field("project_id", &self.project_id)
            .finish()
    }
}
