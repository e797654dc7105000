//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vault_probe::checks::{HealthError, HealthProbe, VaultHealth};
use vault_probe::command::{CommandError, CommandOutput, CommandRunner};
use vault_probe::poll::Sleeper;

/// Scripted reply to one command invocation.
#[derive(Debug, Clone)]
pub enum Reply {
    Output(CommandOutput),
    Timeout,
}

pub fn ok(stdout: &str) -> Reply {
    Reply::Output(CommandOutput {
        exit_status: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub fn fail(exit_status: i32, stderr: &str) -> Reply {
    Reply::Output(CommandOutput {
        exit_status,
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

struct Rule {
    needle: String,
    replies: VecDeque<Reply>,
}

/// Command runner that answers from per-command scripts.
///
/// The first rule whose needle occurs in the command line answers. Replies are
/// consumed in order and the last one repeats.
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, needle: &str, replies: Vec<Reply>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            replies: replies.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let line = format!("{} {}", program, args.join(" "));
        self.calls.lock().unwrap().push(line.clone());

        let mut rules = self.rules.lock().unwrap();
        let reply = rules
            .iter_mut()
            .find(|rule| line.contains(&rule.needle))
            .and_then(|rule| {
                if rule.replies.len() > 1 {
                    rule.replies.pop_front()
                } else {
                    rule.replies.front().cloned()
                }
            });

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Timeout) => Err(CommandError::Timeout {
                program: program.to_string(),
                timeout: Duration::from_secs(1),
            }),
            None => Ok(CommandOutput {
                exit_status: 127,
                stdout: String::new(),
                stderr: format!("unexpected command: {line}"),
            }),
        }
    }
}

/// Sleeper that records requested delays and returns at once.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Health probe answering from a script; `Err` strings become certificate errors.
pub struct ScriptedHealthProbe {
    replies: Mutex<VecDeque<Result<VaultHealth, String>>>,
    hosts: Mutex<Vec<String>>,
}

impl ScriptedHealthProbe {
    pub fn new(replies: Vec<Result<VaultHealth, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            hosts: Mutex::new(Vec::new()),
        }
    }

    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HealthProbe for ScriptedHealthProbe {
    async fn probe(&self, host: &str, port: u16) -> Result<VaultHealth, HealthError> {
        self.hosts.lock().unwrap().push(format!("{host}:{port}"));
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply
            .unwrap_or_else(|| Err("no scripted reply".to_string()))
            .map_err(HealthError::Certificate)
    }
}

pub fn uninitialized_vault(sans: &[&str]) -> VaultHealth {
    VaultHealth {
        status: 501,
        body: serde_json::json!({"initialized": false, "sealed": true, "standby": true}),
        subject_alt_names: sans.iter().map(|s| s.to_string()).collect(),
    }
}
