//! Bounded polling subsystem.
//!
//! # Data Flow
//! ```text
//! Poller::poll(config, name, query, predicate)
//!     → validate PollConfig (max_attempts >= 1)
//!     → query() → Observation (Ok(T) or Err(E))
//!     → predicate(&T) true?  → PollResult { Satisfied }
//!     → attempts left?       → Sleeper::sleep(delay) or cancellation → repeat
//!     → budget spent         → PollResult { Exhausted, last observation }
//! ```
//!
//! # Design Decisions
//! - Query errors are observations, never fatal to the loop
//! - Exhaustion is reported in the result, the caller decides pass/fail
//! - Delay goes through the `Sleeper` trait so tests never wait
//! - Cancellation is observed only while sleeping between attempts

pub mod poller;
pub mod sleeper;

pub use poller::{poll, PollConfig, PollError, PollResult, PollStatus, Poller};
pub use sleeper::{Sleeper, TokioSleeper};
