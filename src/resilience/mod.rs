//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to remote service:
//!     → retries.rs (submit, classify outcome, confirm)
//!     → On rate limit: backoff.rs (compute delay) → sleep → retry
//!     → Terminal: receipt, or RetryError naming why there is none
//! ```
//!
//! # Design Decisions
//! - Only rate-limited submissions are retried
//! - Backoff is deterministic (no jitter) so schedules are testable
//! - Sleeping goes through a trait so tests can observe every delay

pub mod backoff;
pub mod retries;

pub use retries::{
    RetryError, RetryPolicy, RetryableService, RetryingRequestExecutor, Sleeper, SubmitOutcome,
    TokioSleeper,
};
