//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProbeConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Deserialize configuration from TOML text. Missing fields take defaults.
pub fn parse_config(content: &str) -> Result<ProbeConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read configuration from a TOML file.
///
/// The result is not validated yet; callers apply overrides first and then
/// run [`validate_config`](crate::config::validate_config).
pub fn load_config(path: &Path) -> Result<ProbeConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
project_id = "vault-ci-1234"

[instance_group]
name = "vault-igm-blue"

[instance_group.boot_poll]
max_attempts = 10
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.project_id, "vault-ci-1234");
        assert_eq!(config.instance_group.name, "vault-igm-blue");
        assert_eq!(config.instance_group.region, "us-east4");
        assert_eq!(config.instance_group.boot_poll.max_attempts, 10);
        assert_eq!(config.instance_group.boot_poll.delay_ms, 5_000);
        assert_eq!(config.external.name, "vault-external");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/probe.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_malformed_file() {
        let err = parse_config("project_id = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::Validation(vec![
            ValidationError::EmptyField { field: "project_id" },
            ValidationError::ZeroAttempts {
                field: "external.health_poll",
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: project_id must not be empty, external.health_poll.max_attempts must be at least 1"
        );
    }
}
