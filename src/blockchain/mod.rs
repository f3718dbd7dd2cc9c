//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Wallet file (publicKey, secretKey)
//!     → wallet.rs (load or generate, persist, sign)
//!     → client.rs (JSON-RPC with timeouts and failover)
//!     → airdrop.rs (faucet request through the retry executor, then confirm)
//!     → token.rs (signed SPL token transactions through the retry executor)
//! ```
//!
//! # Security Constraints
//! - Never log secret keys
//! - All RPC calls have configurable timeouts
//! - Rate limiting is classified from status codes, never from message text

pub mod airdrop;
pub mod client;
pub mod token;
pub mod types;
pub mod wallet;

pub use airdrop::{request_airdrop, AirdropRequest, AirdropService};
pub use client::SolanaClient;
pub use token::{TestToken, TokenClient};
pub use types::{BlockchainError, BlockchainResult, Pubkey, TokenAmount, TxSignature};
pub use wallet::{Wallet, WalletFile, WalletSource};
