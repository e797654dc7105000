//! Managed instance group checks.
//!
//! The group's state is gathered once into an [`InstanceGroupContext`]: wait
//! for the group to become stable, poll until no instance has a pending
//! action, then poll each instance's serial console until its startup
//! scripts finish. Every check then reads from that context.

use uuid::Uuid;

use crate::checks::report::CheckReport;
use crate::checks::{unless_cancelled, SuiteError};
use crate::command::CommandOutput;
use crate::config::InstanceGroupConfig;
use crate::gcloud::{Gcloud, ManagedInstance, QueryError};
use crate::poll::{PollResult, Poller, Sleeper};

pub const SUITE: &str = "instance-group";

/// Serial console line written once the guest agent ran all startup scripts.
pub const BOOT_FINISHED_MARKER: &str = "GCEMetadataScripts: Finished running startup scripts";

/// Serial console line written when the startup script succeeded.
pub const STARTUP_SUCCESS_MARKER: &str = "startup-script exit status 0";

const STABLE_MARKER: &str = "Group is stable";

/// Observations of one instance group, shared by all checks.
#[derive(Debug)]
pub struct InstanceGroupContext {
    pub deadline_secs: u64,
    /// Output of `wait-until --stable`.
    pub stable: Result<CommandOutput, QueryError>,
    /// Last instance listing of the pending-action poll.
    pub instances: PollResult<Vec<ManagedInstance>, QueryError>,
    /// Serial console poll per listed instance, in listing order.
    pub consoles: Vec<PollResult<String, QueryError>>,
}

impl InstanceGroupContext {
    pub async fn gather<S: Sleeper>(
        gcloud: &Gcloud,
        poller: &Poller<S>,
        config: &InstanceGroupConfig,
    ) -> Result<Self, SuiteError> {
        tracing::info!(
            group = %config.name,
            region = %config.region,
            deadline_secs = config.deadline_secs,
            "Waiting for instance group to become stable"
        );
        let stable = gcloud
            .wait_until_stable(&config.name, &config.region, config.deadline_secs)
            .await;

        let instances = poller
            .poll(
                &config.action_poll,
                "wait_for_action",
                || gcloud.list_managed_instances(&config.name, &config.region),
                |list| list.iter().all(ManagedInstance::is_idle),
            )
            .await?;
        let instances = unless_cancelled("wait_for_action", instances)?;

        let mut consoles = Vec::new();
        if let Some(list) = instances.value() {
            for instance in list {
                let console = poller
                    .poll(
                        &config.boot_poll,
                        "wait_for_boot",
                        || gcloud.serial_port_output(&instance.instance),
                        |output| output.contains(BOOT_FINISHED_MARKER),
                    )
                    .await?;
                consoles.push(unless_cancelled("wait_for_boot", console)?);
            }
        }

        Ok(Self {
            deadline_secs: config.deadline_secs,
            stable,
            instances,
            consoles,
        })
    }

    fn listed(&self) -> Result<&[ManagedInstance], String> {
        self.instances
            .observation
            .as_ref()
            .map(Vec::as_slice)
            .map_err(|e| format!("could not list instances: {e}"))
    }
}

pub fn check_stable(ctx: &InstanceGroupContext) -> Result<(), String> {
    let output = ctx.stable.as_ref().map_err(|e| e.to_string())?;
    if !output.success() {
        return Err(format!(
            "wait-until exited with status {}: {}",
            output.exit_status,
            output.stderr.trim()
        ));
    }
    if !output.stdout.contains(STABLE_MARKER) {
        return Err(format!(
            "expected output to include \"{STABLE_MARKER}\", got {:?}",
            output.stdout
        ));
    }
    Ok(())
}

pub fn check_actions_settled(ctx: &InstanceGroupContext) -> Result<(), String> {
    let instances = ctx.listed()?;
    let busy: Vec<String> = instances
        .iter()
        .filter(|i| !i.is_idle())
        .map(|i| {
            format!(
                "{} ({})",
                i.name(),
                i.current_action.as_deref().unwrap_or("unknown")
            )
        })
        .collect();
    if busy.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "instances still busy after {} attempts: {}",
            ctx.instances.attempts_used,
            busy.join(", ")
        ))
    }
}

pub fn check_has_instances(ctx: &InstanceGroupContext) -> Result<(), String> {
    if ctx.listed()?.is_empty() {
        return Err("expected at least one instance, got none".to_string());
    }
    Ok(())
}

pub fn check_running(ctx: &InstanceGroupContext) -> Result<(), String> {
    let instances = ctx.listed()?;
    for instance in instances {
        if instance.instance_status.as_deref() != Some("RUNNING") {
            return Err(format!(
                "expected all to be RUNNING, got {}",
                summarize(instances)
            ));
        }
    }
    Ok(())
}

pub fn check_healthy(ctx: &InstanceGroupContext) -> Result<(), String> {
    for instance in ctx.listed()? {
        let all_healthy = instance
            .instance_health
            .iter()
            .all(|h| h.detailed_health_state.as_deref() == Some("HEALTHY"));
        if !all_healthy {
            let states: Vec<&str> = instance
                .instance_health
                .iter()
                .map(|h| h.detailed_health_state.as_deref().unwrap_or("UNKNOWN"))
                .collect();
            return Err(format!(
                "expected {} to have all detailedHealthState HEALTHY, got [{}]",
                instance.name(),
                states.join(", ")
            ));
        }
    }
    Ok(())
}

pub fn check_startup_scripts(ctx: &InstanceGroupContext) -> Result<(), String> {
    if ctx.consoles.is_empty() {
        return Err("no serial console output collected".to_string());
    }
    let instances = ctx.listed()?;
    for (instance, console) in instances.iter().zip(&ctx.consoles) {
        match &console.observation {
            Ok(output) if output.contains(STARTUP_SUCCESS_MARKER) => {}
            Ok(_) => {
                return Err(format!(
                    "serial console of {} does not include \"{STARTUP_SUCCESS_MARKER}\" \
                     after {} attempts",
                    instance.name(),
                    console.attempts_used
                ))
            }
            Err(e) => {
                return Err(format!(
                    "could not read serial console of {}: {e}",
                    instance.name()
                ))
            }
        }
    }
    Ok(())
}

fn summarize(instances: &[ManagedInstance]) -> String {
    instances
        .iter()
        .map(|i| {
            format!(
                "{}={}",
                i.name(),
                i.instance_status.as_deref().unwrap_or("UNKNOWN")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Evaluate every instance group check against a gathered context.
pub fn evaluate(ctx: &InstanceGroupContext, run_id: Uuid) -> CheckReport {
    let mut report = CheckReport::new(SUITE, run_id);
    report.record(
        format!("should become stable in {} seconds", ctx.deadline_secs),
        check_stable(ctx),
    );
    report.record("should settle with no pending actions", check_actions_settled(ctx));
    report.record("should have at least one instance in the group", check_has_instances(ctx));
    report.record("should be running", check_running(ctx));
    report.record("should be healthy", check_healthy(ctx));
    report.record(
        "should run startup scripts successfully with exit status 0",
        check_startup_scripts(ctx),
    );
    report
}

pub async fn run<S: Sleeper>(
    gcloud: &Gcloud,
    poller: &Poller<S>,
    config: &InstanceGroupConfig,
    run_id: Uuid,
) -> Result<CheckReport, SuiteError> {
    let ctx = InstanceGroupContext::gather(gcloud, poller, config).await?;
    Ok(evaluate(&ctx, run_id))
}
