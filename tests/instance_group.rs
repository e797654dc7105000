//! Instance group suite against scripted gcloud output.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vault_probe::checks::instance_group::{self, InstanceGroupContext};
use vault_probe::checks::SuiteError;
use vault_probe::config::InstanceGroupConfig;
use vault_probe::gcloud::Gcloud;
use vault_probe::poll::{PollConfig, PollStatus, Poller};

mod common;
use common::{fail, ok, RecordingSleeper, ScriptedRunner};

const STABLE: &str = "Waiting for group to become stable...\nGroup is stable\n";

const VERIFYING: &str = r#"[
  {"instance": "https://compute/projects/vault-ci/zones/us-east4-a/instances/vault-x1", "instanceStatus": "RUNNING", "currentAction": "VERIFYING", "instanceHealth": [{"detailedHealthState": "UNKNOWN"}]},
  {"instance": "https://compute/projects/vault-ci/zones/us-east4-b/instances/vault-x2", "instanceStatus": "RUNNING", "currentAction": "NONE", "instanceHealth": [{"detailedHealthState": "HEALTHY"}]}
]"#;

const SETTLED: &str = r#"[
  {"instance": "https://compute/projects/vault-ci/zones/us-east4-a/instances/vault-x1", "instanceStatus": "RUNNING", "currentAction": "NONE", "instanceHealth": [{"detailedHealthState": "HEALTHY"}]},
  {"instance": "https://compute/projects/vault-ci/zones/us-east4-b/instances/vault-x2", "instanceStatus": "RUNNING", "currentAction": "NONE", "instanceHealth": [{"detailedHealthState": "HEALTHY"}]}
]"#;

const BOOTING: &str = "Starting Vault...\n";
const BOOTED: &str =
    "startup-script exit status 0\nGCEMetadataScripts: Finished running startup scripts.\n";

fn config() -> InstanceGroupConfig {
    InstanceGroupConfig {
        action_poll: PollConfig::new(5, Duration::from_secs(5)),
        boot_poll: PollConfig::new(3, Duration::from_secs(5)),
        ..Default::default()
    }
}

fn gcloud(runner: &Arc<ScriptedRunner>) -> Gcloud {
    Gcloud::new(runner.clone(), "gcloud", "vault-ci")
}

#[tokio::test]
async fn test_group_settles_and_passes() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("wait-until", vec![ok(STABLE)])
            .on("list-instances", vec![ok(VERIFYING), ok(SETTLED)])
            .on("instances/vault-x1", vec![ok(BOOTING), ok(BOOTED)])
            .on("instances/vault-x2", vec![ok(BOOTED)]),
    );
    let poller = Poller::with_sleeper(RecordingSleeper::default());

    let report = instance_group::run(&gcloud(&runner), &poller, &config(), Uuid::nil())
        .await
        .unwrap();

    assert!(report.passed(), "{}", report.render_text());
    assert_eq!(runner.calls_matching("wait-until --stable --timeout=300"), 1);
    assert_eq!(runner.calls_matching("list-instances"), 2);
    assert_eq!(runner.calls_matching("get-serial-port-output"), 3);
    assert_eq!(
        poller.sleeper().delays(),
        vec![Duration::from_secs(5), Duration::from_secs(5)]
    );
}

#[tokio::test]
async fn test_listing_errors_are_retried() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("wait-until", vec![ok(STABLE)])
            .on(
                "list-instances",
                vec![fail(1, "ERROR: (gcloud) Internal error"), ok("not json"), ok(SETTLED)],
            )
            .on("get-serial-port-output", vec![ok(BOOTED)]),
    );
    let poller = Poller::with_sleeper(RecordingSleeper::default());

    let ctx = InstanceGroupContext::gather(&gcloud(&runner), &poller, &config())
        .await
        .unwrap();

    assert_eq!(ctx.instances.status, PollStatus::Satisfied);
    assert_eq!(ctx.instances.attempts_used, 3);
    assert_eq!(ctx.consoles.len(), 2);
    assert!(instance_group::evaluate(&ctx, Uuid::nil()).passed());
}

#[tokio::test]
async fn test_boot_never_finishes() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("wait-until", vec![ok(STABLE)])
            .on("list-instances", vec![ok(SETTLED)])
            .on("instances/vault-x1", vec![ok(BOOTING)])
            .on("instances/vault-x2", vec![ok(BOOTED)]),
    );
    let poller = Poller::with_sleeper(RecordingSleeper::default());

    let report = instance_group::run(&gcloud(&runner), &poller, &config(), Uuid::nil())
        .await
        .unwrap();

    assert!(!report.passed());
    let failure = report
        .outcome("should run startup scripts successfully with exit status 0")
        .unwrap();
    assert!(!failure.passed);
    assert!(failure.detail.as_deref().unwrap().contains("vault-x1"));
    assert_eq!(runner.calls_matching("instances/vault-x1"), 3);
    assert_eq!(report.failures().count(), 1);
}

#[tokio::test]
async fn test_listing_never_succeeds() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on(
                "wait-until",
                vec![fail(1, "ERROR: Timeout while waiting for group to become stable.")],
            )
            .on("list-instances", vec![fail(1, "ERROR: (gcloud) permission denied")]),
    );
    let poller = Poller::with_sleeper(RecordingSleeper::default());

    let ctx = InstanceGroupContext::gather(&gcloud(&runner), &poller, &config())
        .await
        .unwrap();

    assert_eq!(ctx.instances.status, PollStatus::Exhausted);
    assert_eq!(ctx.instances.attempts_used, 5);
    assert!(ctx.instances.observation.is_err());
    assert!(ctx.consoles.is_empty());
    assert_eq!(runner.calls_matching("get-serial-port-output"), 0);

    let report = instance_group::evaluate(&ctx, Uuid::nil());
    let listing = report
        .outcome("should have at least one instance in the group")
        .unwrap();
    assert!(listing
        .detail
        .as_deref()
        .unwrap()
        .starts_with("could not list instances"));
    assert!(report.failures().all(|o| o.detail.is_some()));
    assert_eq!(report.failures().count(), 6);
}

#[tokio::test]
async fn test_zero_attempt_budget_rejected() {
    let runner = Arc::new(ScriptedRunner::new().on("wait-until", vec![ok(STABLE)]));
    let poller = Poller::with_sleeper(RecordingSleeper::default());
    let mut config = config();
    config.action_poll.max_attempts = 0;

    let result = InstanceGroupContext::gather(&gcloud(&runner), &poller, &config).await;

    assert!(result.is_err());
    assert_eq!(runner.calls_matching("list-instances"), 0);
}

fn cancelled_poller() -> Poller<RecordingSleeper> {
    let token = CancellationToken::new();
    token.cancel();
    Poller::with_sleeper(RecordingSleeper::default()).with_cancellation(token)
}

#[tokio::test]
async fn test_cancel_during_action_wait_stops_suite() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("wait-until", vec![ok(STABLE)])
            .on("list-instances", vec![ok(VERIFYING)])
            .on("get-serial-port-output", vec![ok(BOOTED)]),
    );
    let poller = cancelled_poller();

    let err = instance_group::run(&gcloud(&runner), &poller, &config(), Uuid::nil())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SuiteError::Cancelled {
            operation: "wait_for_action"
        }
    ));
    assert!(err.is_cancelled());
    assert_eq!(runner.calls_matching("list-instances"), 1);
    assert_eq!(runner.calls_matching("get-serial-port-output"), 0);
}

#[tokio::test]
async fn test_cancel_during_boot_wait_skips_remaining_instances() {
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("wait-until", vec![ok(STABLE)])
            .on("list-instances", vec![ok(SETTLED)])
            .on("instances/vault-x1", vec![ok(BOOTING)])
            .on("instances/vault-x2", vec![ok(BOOTED)]),
    );
    let poller = cancelled_poller();

    let err = InstanceGroupContext::gather(&gcloud(&runner), &poller, &config())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SuiteError::Cancelled {
            operation: "wait_for_boot"
        }
    ));
    assert_eq!(runner.calls_matching("instances/vault-x1"), 1);
    assert_eq!(runner.calls_matching("instances/vault-x2"), 0);
}
