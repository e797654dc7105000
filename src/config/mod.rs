//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (read & deserialize)
//!     → CLI overrides (project id, format)
//!     → validation.rs (semantic checks)
//!     → ProbeConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults matching the reference deployment
//! - Validation separates syntactic (serde) from semantic checks
//! - Validation runs after overrides so the project id may come from the CLI

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CommandConfig, ExternalLbConfig, InstanceGroupConfig, InternalLbConfig, LogFormat,
    ObservabilityConfig, ProbeConfig,
};
pub use validation::{validate_config, ValidationError};
