//! Check outcomes and suite reports.

use std::fmt::Write as _;

use serde::Serialize;
use uuid::Uuid;

use crate::observability::metrics;

/// Result of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// All outcomes of one suite run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub suite: String,
    pub run_id: Uuid,
    pub outcomes: Vec<CheckOutcome>,
}

impl CheckReport {
    pub fn new(suite: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            suite: suite.into(),
            run_id,
            outcomes: Vec::new(),
        }
    }

    /// Record a check; `Err` carries the failure message.
    pub fn record(&mut self, name: impl Into<String>, result: Result<(), String>) {
        let name = name.into();
        let passed = result.is_ok();
        match &result {
            Ok(()) => tracing::info!(suite = %self.suite, check = %name, "Check passed"),
            Err(detail) => {
                tracing::warn!(suite = %self.suite, check = %name, detail = %detail, "Check failed")
            }
        }
        metrics::record_check(&self.suite, passed);

        self.outcomes.push(CheckOutcome {
            name,
            passed,
            detail: result.err(),
        });
    }

    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn outcome(&self, name: &str) -> Option<&CheckOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} (run {})", self.suite, self.run_id);
        for outcome in &self.outcomes {
            let mark = if outcome.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "  {mark} {}", outcome.name);
            if let Some(detail) = &outcome.detail {
                for line in detail.lines() {
                    let _ = writeln!(out, "       {line}");
                }
            }
        }
        let failed = self.failures().count();
        let _ = writeln!(
            out,
            "{} passed, {} failed",
            self.outcomes.len() - failed,
            failed
        );
        out
    }
}
