//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Poller, checks, command runner produce:
//!     → logging.rs (structured log events on stderr)
//!     → metrics.rs (poll attempts, poll outcomes, check results)
//!
//! Consumers:
//!     → Terminal / CI build log
//!     → Prometheus textfile written at exit (optional)
//! ```
//!
//! # Design Decisions
//! - stdout is reserved for reports and generated commands
//! - JSON log format for CI, pretty format for local runs
//! - Metrics are recorded unconditionally; no recorder means no cost

pub mod logging;
pub mod metrics;
