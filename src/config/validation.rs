//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value ranges (attempt budgets >= 1, timeouts > 0)
//! - Check that the instance group deadline fits inside the command timeout
//!
//! Returns all validation errors, not just the first.

use thiserror::Error;

use crate::config::schema::ProbeConfig;
use crate::poll::PollConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("{field}.max_attempts must be at least 1")]
    ZeroAttempts { field: &'static str },

    #[error("{field} must be greater than 0")]
    ZeroTimeout { field: &'static str },

    #[error(
        "instance_group.deadline_secs ({deadline_secs}) must be less than command.timeout_secs ({timeout_secs})"
    )]
    DeadlineExceedsCommandTimeout { deadline_secs: u64, timeout_secs: u64 },

    #[error("unknown log level '{0}'")]
    InvalidLogLevel(String),
}

pub fn validate_config(config: &ProbeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let names = [
        ("project_id", &config.project_id),
        ("command.gcloud_path", &config.command.gcloud_path),
        ("command.terraform_path", &config.command.terraform_path),
        ("instance_group.name", &config.instance_group.name),
        ("instance_group.region", &config.instance_group.region),
        ("external.name", &config.external.name),
        ("external.region", &config.external.region),
        ("internal.name", &config.internal.name),
        ("internal.region", &config.internal.region),
    ];
    for (field, value) in names {
        if value.trim().is_empty() {
            errors.push(ValidationError::EmptyField { field });
        }
    }

    let polls: [(&'static str, &PollConfig); 3] = [
        ("instance_group.action_poll", &config.instance_group.action_poll),
        ("instance_group.boot_poll", &config.instance_group.boot_poll),
        ("external.health_poll", &config.external.health_poll),
    ];
    for (field, poll) in polls {
        if poll.validate().is_err() {
            errors.push(ValidationError::ZeroAttempts { field });
        }
    }

    let timeouts = [
        ("command.timeout_secs", config.command.timeout_secs),
        ("instance_group.deadline_secs", config.instance_group.deadline_secs),
        ("external.request_timeout_secs", config.external.request_timeout_secs),
    ];
    for (field, secs) in timeouts {
        if secs == 0 {
            errors.push(ValidationError::ZeroTimeout { field });
        }
    }

    if config.instance_group.deadline_secs >= config.command.timeout_secs {
        errors.push(ValidationError::DeadlineExceedsCommandTimeout {
            deadline_secs: config.instance_group.deadline_secs,
            timeout_secs: config.command.timeout_secs,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProbeConfig {
        ProbeConfig {
            project_id: "vault-ci".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_with_project_are_valid() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_missing_project_id() {
        let errors = validate_config(&ProbeConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyField { field: "project_id" }]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.instance_group.boot_poll.max_attempts = 0;
        config.external.health_poll.max_attempts = 0;
        config.internal.region = " ".to_string();
        config.observability.log_level = "verbose".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::ZeroAttempts {
            field: "instance_group.boot_poll"
        }));
        assert!(errors.contains(&ValidationError::ZeroAttempts {
            field: "external.health_poll"
        }));
        assert!(errors.contains(&ValidationError::EmptyField {
            field: "internal.region"
        }));
        assert!(errors.contains(&ValidationError::InvalidLogLevel("verbose".to_string())));
    }

    #[test]
    fn test_deadline_must_fit_command_timeout() {
        let mut config = valid();
        config.command.timeout_secs = 300;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::DeadlineExceedsCommandTimeout {
                deadline_secs: 300,
                timeout_secs: 300,
            }]
        );
    }

    #[test]
    fn test_log_level_case_insensitive() {
        let mut config = valid();
        config.observability.log_level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
