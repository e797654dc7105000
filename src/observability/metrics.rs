//! Metrics collection and exposition.
//!
//! # Metrics
//! - `probe_poll_attempts_total` (counter): queries issued, by operation
//! - `probe_polls_total` (counter): finished polls, by operation and status
//! - `probe_poll_attempts_used` (histogram): attempts per finished poll
//! - `probe_checks_total` (counter): check results, by suite and result

use std::path::Path;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::poll::PollStatus;

pub const POLL_ATTEMPTS_TOTAL: &str = "probe_poll_attempts_total";
pub const POLLS_TOTAL: &str = "probe_polls_total";
pub const POLL_ATTEMPTS_USED: &str = "probe_poll_attempts_used";
pub const CHECKS_TOTAL: &str = "probe_checks_total";

pub fn record_poll_attempt(operation: &str) {
    counter!(POLL_ATTEMPTS_TOTAL, "operation" => operation.to_string()).increment(1);
}

pub fn record_poll_outcome(operation: &str, status: PollStatus, attempts_used: u32) {
    counter!(
        POLLS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.as_str()
    )
    .increment(1);
    histogram!(POLL_ATTEMPTS_USED, "operation" => operation.to_string())
        .record(f64::from(attempts_used));
}

pub fn record_check(suite: &str, passed: bool) {
    let result = if passed { "pass" } else { "fail" };
    counter!(CHECKS_TOTAL, "suite" => suite.to_string(), "result" => result).increment(1);
}

/// Install the Prometheus recorder as the global metrics recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Write the current metrics in Prometheus text format, for the node
/// exporter textfile collector.
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, handle.render())
}
