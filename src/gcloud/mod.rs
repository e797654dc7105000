//! gcloud CLI client.
//!
//! # Data Flow
//! ```text
//! Gcloud::list_managed_instances(group, region)
//!     → CommandRunner::run("gcloud", ["--project=..", "compute", ...])
//!     → CommandOutput
//!     → decode(): exit status, then JSON → typed records
//! ```
//!
//! Only the resources and fields the checks read are modelled.

pub mod client;
pub mod types;

pub use client::Gcloud;
pub use types::{ForwardingRule, Instance, InstanceHealth, ManagedInstance, QueryError};
