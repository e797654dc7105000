//! External command execution.
//!
//! # Responsibilities
//! - Spawn CLI programs (gcloud, terraform) with captured output
//! - Enforce a hard deadline per invocation
//! - Provide a trait seam so checks can run against scripted output
//!
//! A non-zero exit status is a normal result at this layer; interpreting it
//! is up to the caller.

pub mod runner;

pub use runner::{CommandError, CommandOutput, CommandRunner, ProcessRunner};
