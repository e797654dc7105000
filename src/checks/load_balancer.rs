//! Load balancer checks.
//!
//! Two suites:
//! - external: forwarding rule port range, and Vault answering through the
//!   load balancer IP with a certificate that names that IP
//! - internal: forwarding rule scheme, and every project instance running

use uuid::Uuid;

use crate::checks::report::CheckReport;
use crate::checks::{unless_cancelled, SuiteError};
use crate::checks::vault_health::{HealthError, HealthProbe, VaultHealth};
use crate::command::CommandOutput;
use crate::config::{ExternalLbConfig, InternalLbConfig};
use crate::gcloud::{ForwardingRule, Gcloud, Instance, QueryError};
use crate::poll::{PollResult, Poller, Sleeper};

pub const EXTERNAL_SUITE: &str = "external";
pub const INTERNAL_SUITE: &str = "internal";

/// Vault answers 501 on `/v1/sys/health` until it is initialized.
const UNINITIALIZED_STATUS: u16 = 501;

/// Require exit status 0 and an empty stderr.
fn check_clean_exit(output: &Result<CommandOutput, QueryError>) -> Result<(), String> {
    let output = output.as_ref().map_err(|e| e.to_string())?;
    if !output.success() {
        return Err(format!(
            "expected exit status 0, got {}: {}",
            output.exit_status,
            output.stderr.trim()
        ));
    }
    if !output.stderr.is_empty() {
        return Err(format!("expected empty stderr, got {:?}", output.stderr));
    }
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(
    what: &str,
    output: &Result<CommandOutput, QueryError>,
) -> Result<T, String> {
    let output = output.as_ref().map_err(|e| e.to_string())?;
    Gcloud::decode(what, output).map_err(|e| e.to_string())
}

/// Observations of the external load balancer.
#[derive(Debug)]
pub struct ExternalContext {
    pub expected_port_range: String,
    pub forwarding_rule: Result<CommandOutput, QueryError>,
    /// Absent when the forwarding rule could not be read.
    pub health: Option<PollResult<VaultHealth, HealthError>>,
}

impl ExternalContext {
    pub async fn gather<S: Sleeper>(
        gcloud: &Gcloud,
        poller: &Poller<S>,
        probe: &dyn HealthProbe,
        config: &ExternalLbConfig,
    ) -> Result<Self, SuiteError> {
        let forwarding_rule = gcloud
            .describe_forwarding_rule(&config.name, &config.region)
            .await;

        let rule: Result<ForwardingRule, String> =
            decode("forwarding-rules describe", &forwarding_rule);
        let health = match rule {
            Ok(rule) => {
                let ip = rule.ip_address;
                tracing::info!(lb_ip = %ip, "Probing Vault health through load balancer");
                let health = poller
                    .poll(
                        &config.health_poll,
                        "vault_health",
                        || probe.probe(&ip, config.vault_port),
                        |_| true,
                    )
                    .await?;
                Some(unless_cancelled("vault_health", health)?)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping Vault health probe");
                None
            }
        };

        Ok(Self {
            expected_port_range: config.port_range.clone(),
            forwarding_rule,
            health,
        })
    }

    fn rule(&self) -> Result<ForwardingRule, String> {
        decode("forwarding-rules describe", &self.forwarding_rule)
    }
}

pub fn check_port_range(ctx: &ExternalContext) -> Result<(), String> {
    let rule = ctx.rule()?;
    match rule.port_range.as_deref() {
        Some(range) if range == ctx.expected_port_range => Ok(()),
        other => Err(format!(
            "expected portRange {:?}, got {:?}",
            ctx.expected_port_range, other
        )),
    }
}

pub fn check_vault_health(ctx: &ExternalContext) -> Result<(), String> {
    let rule = ctx.rule()?;
    let poll = ctx
        .health
        .as_ref()
        .ok_or_else(|| "Vault health was not probed".to_string())?;
    let health = poll.observation.as_ref().map_err(|e| {
        format!(
            "no health response after {} attempts: {e}",
            poll.attempts_used
        )
    })?;

    if health.status != UNINITIALIZED_STATUS {
        return Err(format!(
            "expected status {UNINITIALIZED_STATUS}, got {}",
            health.status
        ));
    }
    if health.initialized() != Some(false) {
        return Err(format!(
            "expected initialized to be false, got body {}",
            health.body
        ));
    }
    if !health.has_subject_alt_name(&rule.ip_address) {
        return Err(format!(
            "expected certificate SAN to include {}, got [{}]",
            rule.ip_address,
            health.subject_alt_names.join(", ")
        ));
    }
    Ok(())
}

pub fn evaluate_external(ctx: &ExternalContext, run_id: Uuid) -> CheckReport {
    let mut report = CheckReport::new(EXTERNAL_SUITE, run_id);
    report.record(
        "forwarding rule should be described cleanly",
        check_clean_exit(&ctx.forwarding_rule),
    );
    report.record("should be running", check_port_range(ctx));
    report.record("should be healthy", check_vault_health(ctx));
    report
}

pub async fn run_external<S: Sleeper>(
    gcloud: &Gcloud,
    poller: &Poller<S>,
    probe: &dyn HealthProbe,
    config: &ExternalLbConfig,
    run_id: Uuid,
) -> Result<CheckReport, SuiteError> {
    let ctx = ExternalContext::gather(gcloud, poller, probe, config).await?;
    Ok(evaluate_external(&ctx, run_id))
}

/// Observations of the internal load balancer.
#[derive(Debug)]
pub struct InternalContext {
    pub instance_name_prefix: String,
    pub forwarding_rule: Result<CommandOutput, QueryError>,
    pub instances: Result<CommandOutput, QueryError>,
}

impl InternalContext {
    pub async fn gather(gcloud: &Gcloud, config: &InternalLbConfig) -> Self {
        let forwarding_rule = gcloud
            .describe_forwarding_rule(&config.name, &config.region)
            .await;
        let instances = gcloud.list_instances().await;
        Self {
            instance_name_prefix: config.instance_name_prefix.clone(),
            forwarding_rule,
            instances,
        }
    }
}

pub fn check_internal_scheme(ctx: &InternalContext) -> Result<(), String> {
    let rule: ForwardingRule = decode("forwarding-rules describe", &ctx.forwarding_rule)?;
    match rule.load_balancing_scheme.as_deref() {
        Some("INTERNAL") => Ok(()),
        other => Err(format!(
            "expected loadBalancingScheme \"INTERNAL\", got {other:?}"
        )),
    }
}

pub fn check_instances_running(ctx: &InternalContext) -> Result<(), String> {
    let instances: Vec<Instance> = decode("instances list", &ctx.instances)?;
    for instance in &instances {
        if !instance.name.starts_with(&ctx.instance_name_prefix) {
            return Err(format!(
                "expected {:?} to start with {:?}",
                instance.name, ctx.instance_name_prefix
            ));
        }
        if instance.status != "RUNNING" {
            return Err(format!(
                "expected {} to be RUNNING, got {}",
                instance.name, instance.status
            ));
        }
    }
    Ok(())
}

pub fn evaluate_internal(ctx: &InternalContext, run_id: Uuid) -> CheckReport {
    let mut report = CheckReport::new(INTERNAL_SUITE, run_id);
    report.record(
        "forwarding rule should be described cleanly",
        check_clean_exit(&ctx.forwarding_rule),
    );
    report.record("should be internal", check_internal_scheme(ctx));
    report.record(
        "instance list should be described cleanly",
        check_clean_exit(&ctx.instances),
    );
    report.record("should be running", check_instances_running(ctx));
    report
}

pub async fn run_internal(
    gcloud: &Gcloud,
    config: &InternalLbConfig,
    run_id: Uuid,
) -> CheckReport {
    let ctx = InternalContext::gather(gcloud, config).await;
    evaluate_internal(&ctx, run_id)
}
