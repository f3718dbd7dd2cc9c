//! Retry logic for rate-limited remote requests.
//!
//! # Responsibilities
//! - Submit a request to a remote service and confirm it once accepted
//! - Retry with exponential backoff, but only when the service rate-limits
//! - Enforce a fixed attempt budget
//!
//! # Attempt lifecycle
//! ```text
//! Idle → Attempting ─┬─ Success + confirmed      → Succeeded        (terminal)
//!                    ├─ Success + confirm failed → Confirmation     (terminal)
//!                    ├─ RateLimited, budget left → sleep(backoff) → Attempting
//!                    ├─ RateLimited, budget gone → Exhausted        (terminal)
//!                    └─ Fatal                    → Fatal            (terminal)
//! ```
//!
//! # Design Decisions
//! - The service classifies its own failures; the executor never inspects messages
//! - Unclassified failures are fatal, never assumed transient
//! - No sleep after the final attempt

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::schema::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{calculate_backoff, effective_multiplier};

/// Growth factor applied to the delay after every rate-limited attempt.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Immutable retry settings for a single `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of submissions allowed (at least 1).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Factor the delay grows by after each rate-limited attempt.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Policy with the default doubling multiplier.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Set the growth factor. NaN and values below 1.0 are clamped to 1.0.
    pub fn with_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = effective_multiplier(backoff_multiplier);
        self
    }

    /// Delay to wait after the rate-limited attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay, self.backoff_multiplier)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_multiplier: effective_multiplier(config.backoff_multiplier),
        }
    }
}

/// Classified result of a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<R> {
    /// Accepted; carries the receipt used for confirmation.
    Success(R),
    /// Refused because the caller exceeded the allowed request rate.
    RateLimited,
    /// Refused for any other reason.
    Fatal(String),
}

/// Why `execute` produced no receipt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    /// The service refused the request with a non-retryable error.
    #[error("request failed: {0}")]
    Fatal(String),

    /// The request was accepted but could not be confirmed.
    #[error("confirmation failed: {0}")]
    Confirmation(String),

    /// Every attempt was rate limited.
    #[error("rate limited on all {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// A remote service whose submissions can be retried when rate limited.
#[async_trait]
pub trait RetryableService: Send + Sync {
    type Request: Send + Sync;
    type Receipt: Send + Sync;

    /// Submit the request once and classify the result.
    async fn submit(&self, request: &Self::Request) -> SubmitOutcome<Self::Receipt>;

    /// Block until the service confirms the submission behind `receipt`.
    async fn confirm(&self, receipt: &Self::Receipt) -> Result<(), String>;
}

/// Suspends the current flow between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn millis_saturating(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Issues requests against a [`RetryableService`], backing off on rate limits.
pub struct RetryingRequestExecutor<S, Z = TokioSleeper> {
    service: S,
    sleeper: Z,
    operation: &'static str,
}

impl<S: RetryableService> RetryingRequestExecutor<S, TokioSleeper> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            sleeper: TokioSleeper,
            operation: "request",
        }
    }
}

impl<S: RetryableService, Z: Sleeper> RetryingRequestExecutor<S, Z> {
    /// Replace the sleeper (tests inject a recording one).
    pub fn with_sleeper<Z2: Sleeper>(self, sleeper: Z2) -> RetryingRequestExecutor<S, Z2> {
        RetryingRequestExecutor {
            service: self.service,
            sleeper,
            operation: self.operation,
        }
    }

    /// Label used in log lines and metrics.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn sleeper(&self) -> &Z {
        &self.sleeper
    }

    /// Submit `request` until it is confirmed, refused, or the attempt budget runs out.
    ///
    /// A `max_attempts` of zero is treated as one.
    pub async fn execute(
        &self,
        request: &S::Request,
        policy: &RetryPolicy,
    ) -> Result<S::Receipt, RetryError> {
        let operation = self.operation;
        let max_attempts = policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            tracing::info!(
                operation,
                attempt = attempt + 1,
                max_attempts,
                "Submitting request"
            );

            match self.service.submit(request).await {
                SubmitOutcome::Success(receipt) => {
                    if let Err(reason) = self.service.confirm(&receipt).await {
                        metrics::record_retry_attempt(operation, "confirmation_failed");
                        tracing::error!(operation, attempt = attempt + 1, error = %reason, "Confirmation failed");
                        return Err(RetryError::Confirmation(reason));
                    }

                    metrics::record_retry_attempt(operation, "success");
                    tracing::info!(operation, attempt = attempt + 1, "Request confirmed");
                    return Ok(receipt);
                }
                SubmitOutcome::RateLimited => {
                    metrics::record_retry_attempt(operation, "rate_limited");
                    if attempt + 1 == max_attempts {
                        break;
                    }

                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = millis_saturating(delay),
                        "Rate limited, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                }
                SubmitOutcome::Fatal(reason) => {
                    metrics::record_retry_attempt(operation, "fatal");
                    tracing::error!(operation, attempt = attempt + 1, error = %reason, "Request failed");
                    return Err(RetryError::Fatal(reason));
                }
            }
        }

        tracing::error!(operation, attempts = max_attempts, "Max retries reached");
        Err(RetryError::Exhausted {
            attempts: max_attempts,
        })
    }
}
