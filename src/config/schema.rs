//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Public Solana devnet JSON-RPC endpoint.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// RPC endpoints and confirmation settings.
    pub network: NetworkConfig,

    /// Airdrop amount and retry policy.
    pub airdrop: AirdropConfig,

    /// Test token and transaction settings.
    pub token: TokenConfig,

    /// Wallet file location.
    pub wallet: WalletConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Commitment level a transaction must reach before it counts as confirmed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Endpoints tried, in order, when the primary is unreachable.
    pub failover_urls: Vec<String>,

    /// Per-request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Commitment used for queries and confirmation.
    pub commitment: Commitment,

    /// Upper bound on waiting for a transaction to confirm, in seconds.
    pub confirm_timeout_secs: u64,

    /// Interval between signature status polls, in milliseconds.
    pub confirm_poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEVNET_RPC_URL.to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 30,
            commitment: Commitment::Confirmed,
            confirm_timeout_secs: 60,
            confirm_poll_interval_ms: 500,
        }
    }
}

/// Airdrop configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AirdropConfig {
    /// Amount requested per airdrop, in lamports.
    pub lamports: u64,

    /// Retry policy applied to rate-limited requests.
    pub retry: RetryConfig,
}

impl Default for AirdropConfig {
    fn default() -> Self {
        Self {
            lamports: 1_000_000_000, // 1 SOL
            retry: RetryConfig::default(),
        }
    }
}

/// Token operations configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TokenConfig {
    /// Decimals of test mints created by `mint-test-token`.
    pub decimals: u8,

    /// Retry policy applied to rate-limited `sendTransaction` calls.
    pub retry: RetryConfig,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            decimals: 6,
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Factor applied to the delay after each rate-limited attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WalletConfig {
    /// Path of the JSON wallet file.
    pub path: PathBuf,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wallet.json"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format for log lines.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
