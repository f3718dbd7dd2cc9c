//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, attempts >= 1)
//! - Check that every endpoint is an http(s) URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::{AppConfig, RetryConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Largest decimals for which a 1000-token test supply fits in a `u64`.
pub const MAX_TEST_TOKEN_DECIMALS: u8 = 16;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be a finite number >= 1.0, got {value}")]
    InvalidMultiplier { field: &'static str, value: f64 },

    #[error("token.decimals must be at most {max}, got {value}")]
    TooManyDecimals { value: u8, max: u8 },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("wallet.path must not be empty")]
    EmptyWalletPath,
}

fn check_url(url: &str, errors: &mut Vec<ValidationError>) {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => errors.push(ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn check_retry(
    retry: &RetryConfig,
    attempts_field: &'static str,
    multiplier_field: &'static str,
    errors: &mut Vec<ValidationError>,
) {
    if retry.max_attempts == 0 {
        errors.push(ValidationError::Zero { field: attempts_field });
    }
    let multiplier = retry.backoff_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        errors.push(ValidationError::InvalidMultiplier {
            field: multiplier_field,
            value: multiplier,
        });
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let network = &config.network;
    check_url(&network.rpc_url, &mut errors);
    for url in &network.failover_urls {
        check_url(url, &mut errors);
    }
    if network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "network.rpc_timeout_secs" });
    }
    if network.confirm_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "network.confirm_timeout_secs" });
    }
    if network.confirm_poll_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "network.confirm_poll_interval_ms" });
    }

    let airdrop = &config.airdrop;
    if airdrop.lamports == 0 {
        errors.push(ValidationError::Zero { field: "airdrop.lamports" });
    }
    check_retry(
        &airdrop.retry,
        "airdrop.retry.max_attempts",
        "airdrop.retry.backoff_multiplier",
        &mut errors,
    );

    let token = &config.token;
    if token.decimals > MAX_TEST_TOKEN_DECIMALS {
        errors.push(ValidationError::TooManyDecimals {
            value: token.decimals,
            max: MAX_TEST_TOKEN_DECIMALS,
        });
    }
    check_retry(
        &token.retry,
        "token.retry.max_attempts",
        "token.retry.backoff_multiplier",
        &mut errors,
    );

    if !LOG_LEVELS.contains(&config.observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.wallet.path.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyWalletPath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
