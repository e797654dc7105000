//! Bounded poller over an eventually-consistent state source.
//!
//! # Example
//!
//! ```ignore
//! use vault_probe::poll::{PollConfig, Poller};
//!
//! let result = Poller::new()
//!     .poll(&PollConfig::default(), "list_instances", || gcloud.list_instances(), |list| {
//!         list.iter().all(|i| i.status == "RUNNING")
//!     })
//!     .await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::observability::metrics;
use crate::poll::sleeper::{Sleeper, TokioSleeper};

/// Attempt budget and pacing for one poll invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Maximum number of query attempts. Must be at least 1.
    pub max_attempts: u32,

    /// Delay between unsuccessful attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            delay_ms: 5_000,
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Single attempt, no delay.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn validate(&self) -> Result<(), PollError> {
        if self.max_attempts == 0 {
            return Err(PollError::ConfigInvalid {
                max_attempts: self.max_attempts,
            });
        }
        Ok(())
    }
}

/// Errors raised before a poll starts querying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("invalid poll config: max_attempts must be at least 1, got {max_attempts}")]
    ConfigInvalid { max_attempts: u32 },
}

/// How a poll invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// The predicate held for the returned observation.
    Satisfied,
    /// The attempt budget ran out.
    Exhausted,
    /// The cancellation token fired while waiting between attempts.
    Cancelled,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Satisfied => "satisfied",
            PollStatus::Exhausted => "exhausted",
            PollStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for PollStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one poll invocation.
///
/// `observation` is the last query result, which may be an error when the
/// budget ran out on a failing query.
#[derive(Debug, Clone, PartialEq)]
pub struct PollResult<T, E> {
    pub observation: Result<T, E>,
    pub status: PollStatus,
    pub attempts_used: u32,
}

impl<T, E> PollResult<T, E> {
    pub fn is_satisfied(&self) -> bool {
        self.status == PollStatus::Satisfied
    }

    /// The last observation, if the query that produced it succeeded.
    pub fn value(&self) -> Option<&T> {
        self.observation.as_ref().ok()
    }
}

/// Repeats a query until a predicate holds or the attempt budget is spent.
///
/// A poller owns no per-poll state, so one instance can drive any number of
/// concurrent polls.
#[derive(Debug, Clone)]
pub struct Poller<S = TokioSleeper> {
    sleeper: S,
    cancel: Option<CancellationToken>,
}

impl Poller<TokioSleeper> {
    pub fn new() -> Self {
        Self::with_sleeper(TokioSleeper)
    }
}

impl Default for Poller<TokioSleeper> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Sleeper> Poller<S> {
    pub fn with_sleeper(sleeper: S) -> Self {
        Self {
            sleeper,
            cancel: None,
        }
    }

    /// Abort the wait between attempts when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Query until `predicate` accepts an observation or `config.max_attempts`
    /// queries have run.
    ///
    /// Query errors count as unsatisfied attempts. Only an invalid config is
    /// returned as `Err`, and it is detected before the first query.
    pub async fn poll<T, E, F, Fut, P>(
        &self,
        config: &PollConfig,
        operation_name: &str,
        mut query: F,
        predicate: P,
    ) -> Result<PollResult<T, E>, PollError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&T) -> bool,
        E: Display,
    {
        config.validate()?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            metrics::record_poll_attempt(operation_name);

            let observation = query().await;
            let satisfied = match &observation {
                Ok(value) => predicate(value),
                Err(e) => {
                    debug!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Query failed"
                    );
                    false
                }
            };

            if satisfied {
                info!(
                    operation = %operation_name,
                    attempts = attempt,
                    "Condition satisfied"
                );
                return Ok(finish(operation_name, observation, PollStatus::Satisfied, attempt));
            }

            if attempt >= config.max_attempts {
                warn!(
                    operation = %operation_name,
                    attempts = attempt,
                    "Attempt budget exhausted"
                );
                return Ok(finish(operation_name, observation, PollStatus::Exhausted, attempt));
            }

            debug!(
                operation = %operation_name,
                attempt = attempt,
                max_attempts = config.max_attempts,
                delay_ms = config.delay_ms,
                "Condition not met, retrying"
            );

            if !self.pause(config.delay()).await {
                warn!(
                    operation = %operation_name,
                    attempts = attempt,
                    "Poll cancelled"
                );
                return Ok(finish(operation_name, observation, PollStatus::Cancelled, attempt));
            }
        }
    }

    /// Returns false when cancelled before the delay elapsed.
    async fn pause(&self, delay: Duration) -> bool {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = self.sleeper.sleep(delay) => true,
            },
            None => {
                self.sleeper.sleep(delay).await;
                true
            }
        }
    }
}

fn finish<T, E>(
    operation_name: &str,
    observation: Result<T, E>,
    status: PollStatus,
    attempts_used: u32,
) -> PollResult<T, E> {
    metrics::record_poll_outcome(operation_name, status, attempts_used);
    PollResult {
        observation,
        status,
        attempts_used,
    }
}

/// Poll with the Tokio sleeper and no cancellation.
pub async fn poll<T, E, F, Fut, P>(
    config: &PollConfig,
    operation_name: &str,
    query: F,
    predicate: P,
) -> Result<PollResult<T, E>, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
    E: Display,
{
    Poller::new()
        .poll(config, operation_name, query, predicate)
        .await
}
