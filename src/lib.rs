//! Solana devnet client library.
//!
//! Creates or loads a wallet, queries balances, requests test-network
//! airdrops, and creates, mints and transfers test SPL tokens. Requests the
//! network rate-limits are retried with exponential backoff.

pub mod blockchain;
pub mod config;
pub mod observability;
pub mod resilience;

pub use blockchain::{request_airdrop, SolanaClient, TokenClient, Wallet};
pub use config::schema::AppConfig;
pub use resilience::{RetryError, RetryPolicy, RetryingRequestExecutor};
