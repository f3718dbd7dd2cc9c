//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// Re-export Commitment from config module to avoid duplication
pub use crate::config::schema::Commitment;

use crate::resilience::retries::RetryError;

/// Lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert lamports to SOL.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert SOL to lamports, rounding to the nearest lamport.
///
/// Negative and non-finite amounts are rejected; the result saturates at `u64::MAX`.
pub fn sol_to_lamports(sol: f64) -> BlockchainResult<u64> {
    if !sol.is_finite() || sol < 0.0 {
        return Err(BlockchainError::InvalidAmount(format!("{} SOL", sol)));
    }
    // Float to int casts saturate.
    Ok((sol * LAMPORTS_PER_SOL as f64).round() as u64)
}

/// A 32-byte account address, displayed in base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = bs58::decode(s)
            .into_vec()
            .map_err(|e| BlockchainError::InvalidAddress(format!("'{}': {}", s, e)))?;
        let bytes: [u8; 32] = decoded.try_into().map_err(|v: Vec<u8>| {
            BlockchainError::InvalidAddress(format!("'{}': expected 32 bytes, got {}", s, v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Pubkey {
    type Error = BlockchainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pubkey> for String {
    fn from(key: Pubkey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl From<Pubkey> for solana_sdk::pubkey::Pubkey {
    fn from(key: Pubkey) -> Self {
        Self::new_from_array(key.0)
    }
}

impl From<solana_sdk::pubkey::Pubkey> for Pubkey {
    fn from(key: solana_sdk::pubkey::Pubkey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

/// Base58 transaction signature returned by the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxSignature(pub String);

impl TxSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token account balance as reported by `getTokenAccountBalance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    /// Raw balance without decimals, as a decimal string.
    pub amount: String,
    pub decimals: u8,
    /// Balance with decimals applied; absent for some legacy responses.
    pub ui_amount: Option<f64>,
    pub ui_amount_string: String,
}

impl TokenAmount {
    /// Balance with decimals applied, treating an absent value as zero.
    pub fn ui_amount_or_zero(&self) -> f64 {
        self.ui_amount.unwrap_or(0.0)
    }
}

/// Account metadata from `getAccountInfo`; the data field is not decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub lamports: u64,
    /// Program that owns the account.
    pub owner: Pubkey,
    pub executable: bool,
}

/// Blockhash plus the last block height at which it is still valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// One entry of a `getSignatureStatuses` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted.
    pub confirmations: Option<u64>,
    /// Transaction error, if the transaction failed.
    pub err: Option<serde_json::Value>,
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// Whether this status meets or exceeds `commitment`.
    pub fn satisfies(&self, commitment: Commitment) -> bool {
        match self.confirmation_status {
            Some(status) => status >= commitment,
            // Rooted blocks report no confirmation count.
            None => self.confirmations.is_none(),
        }
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// The endpoint answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The endpoint refused the request because of its rate limit.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Connection or HTTP-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Response could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0} seconds")]
    ConfirmationTimeout(u64),

    /// The blockhash used for confirmation is no longer valid.
    #[error("Blockhash expired at block height {last_valid_block_height}")]
    BlockhashExpired { last_valid_block_height: u64 },

    /// Transaction executed but failed on-chain.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A transaction could not be built, signed, or encoded.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Sending a transaction through the retry executor failed.
    #[error("Transaction submission failed: {0}")]
    Submission(#[from] RetryError),

    /// Amount is negative or not a number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Address is not valid base58 or has the wrong length.
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    /// Invalid key material or malformed wallet file.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// The wallet file exists but does not hold a valid keypair.
    #[error("Malformed wallet file {}: {reason}", .path.display())]
    WalletMalformed { path: PathBuf, reason: String },

    /// No wallet file exists at the given path.
    #[error("Wallet file not found: {}", .0.display())]
    WalletNotFound(PathBuf),
}

impl BlockchainError {
    /// Whether retrying after a delay is expected to succeed.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BlockchainError::RateLimited(_))
    }
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

#[cfg(test)]
mod tests {
    use super::*;

    // System program address: 32 zero bytes.
    const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";

    #[test]
    fn test_pubkey_parse_and_display() {
        let key: Pubkey = SYSTEM_PROGRAM.parse().unwrap();
        assert_eq!(key.to_bytes(), [0u8; 32]);
        assert_eq!(key.to_string(), SYSTEM_PROGRAM);
    }

    #[test]
    fn test_pubkey_rejects_bad_input() {
        assert!("0OIl".parse::<Pubkey>().is_err());
        let err = "1111".parse::<Pubkey>().unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
    }

    #[test]
    fn test_pubkey_serde_as_string() {
        let key = Pubkey::new([7u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key));
        let decoded: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_pubkey_converts_to_sdk_pubkey() {
        let key = Pubkey::new([5u8; 32]);
        let sdk: solana_sdk::pubkey::Pubkey = key.into();
        assert_eq!(sdk.to_string(), key.to_string());
        assert_eq!(Pubkey::from(sdk), key);
    }

    #[test]
    fn test_account_info_decoding() {
        let info: AccountInfo = serde_json::from_str(
            r#"{"data":["","base64"],"executable":false,"lamports":2039280,
                "owner":"TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA","rentEpoch":18446744073709551615,"space":165}"#,
        )
        .unwrap();
        assert_eq!(info.lamports, 2_039_280);
        assert_eq!(info.owner.to_string(), "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
    }

    #[test]
    fn test_lamport_conversion() {
        assert_eq!(lamports_to_sol(LAMPORTS_PER_SOL), 1.0);
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
        assert_eq!(sol_to_lamports(0.5).unwrap(), 500_000_000);
        assert_eq!(sol_to_lamports(2.0).unwrap(), 2 * LAMPORTS_PER_SOL);
    }

    #[test]
    fn test_sol_to_lamports_rejects_invalid() {
        for sol in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(sol_to_lamports(sol), Err(BlockchainError::InvalidAmount(_))));
        }
    }

    #[test]
    fn test_signature_status_commitment() {
        let status = SignatureStatus {
            slot: 10,
            confirmations: Some(3),
            err: None,
            confirmation_status: Some(Commitment::Confirmed),
        };
        assert!(status.satisfies(Commitment::Processed));
        assert!(status.satisfies(Commitment::Confirmed));
        assert!(!status.satisfies(Commitment::Finalized));
    }

    #[test]
    fn test_token_amount_decoding() {
        let amount: TokenAmount = serde_json::from_str(
            r#"{"amount":"9864","decimals":2,"uiAmount":98.64,"uiAmountString":"98.64"}"#,
        )
        .unwrap();
        assert_eq!(amount.decimals, 2);
        assert_eq!(amount.ui_amount_or_zero(), 98.64);
    }

    #[test]
    fn test_error_display() {
        let err = BlockchainError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");
        assert!(BlockchainError::RateLimited("429".into()).is_rate_limited());
        assert!(!BlockchainError::Rpc {
            code: -32002,
            message: "insufficient funds".into()
        }
        .is_rate_limited());
    }
}
