//! Wallet management and message signing.
//!
//! # Persisted format
//! ```text
//! {"publicKey":"<base58>","secretKey":"<hex of 64 bytes: secret || public>"}
//! ```
//!
//! # Security
//! - Secret keys are never logged
//! - Wallet files are created owner-readable only on Unix
//! - A malformed wallet file is moved aside to `<path>.bak`, never overwritten

use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::blockchain::types::{BlockchainError, BlockchainResult, Pubkey};

/// On-disk representation of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFile {
    pub public_key: String,
    pub secret_key: String,
}

/// Where [`Wallet::load_or_create`] got its wallet from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletSource {
    /// An existing, valid wallet file.
    Loaded,
    /// No file existed; a new wallet was generated and saved.
    Created,
    /// The file was malformed; it was moved to `backup` and a new wallet saved.
    Recovered { backup: PathBuf },
}

/// Path a malformed wallet file is moved to: `<path>.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Open `path` for writing, truncating it, with owner-only permissions on Unix.
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(path)?;

    // `mode` only applies on creation; tighten files that already existed.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    Ok(file)
}

/// An ed25519 keypair identifying an account.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
}

impl Wallet {
    /// Generate a fresh keypair from OS randomness.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = Self { signing_key };
        tracing::info!(address = %wallet.pubkey(), "Wallet generated");
        wallet
    }

    /// Build a wallet from the hex-encoded 64-byte keypair (with or without 0x prefix).
    pub fn from_secret_hex(secret_hex: &str) -> BlockchainResult<Self> {
        let key_hex = secret_hex.strip_prefix("0x").unwrap_or(secret_hex);
        let bytes = hex::decode(key_hex)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid secret key encoding: {}", e)))?;
        let keypair: [u8; 64] = bytes.try_into().map_err(|v: Vec<u8>| {
            BlockchainError::Wallet(format!("Invalid secret key length: expected 64 bytes, got {}", v.len()))
        })?;
        let signing_key = SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| BlockchainError::Wallet(format!("Invalid keypair: {}", e)))?;

        Ok(Self { signing_key })
    }

    /// Get the wallet's address.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Hex encoding of the 64-byte keypair, as stored in wallet files.
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_keypair_bytes())
    }

    /// Sign arbitrary message bytes.
    pub fn sign_message(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Convert to the persisted representation.
    pub fn to_file(&self) -> WalletFile {
        WalletFile {
            public_key: self.pubkey().to_string(),
            secret_key: self.secret_hex(),
        }
    }

    /// Rebuild from the persisted representation, checking the stored address.
    pub fn from_file(file: &WalletFile) -> BlockchainResult<Self> {
        let wallet = Self::from_secret_hex(&file.secret_key)?;
        let stored: Pubkey = file.public_key.parse()?;
        if stored != wallet.pubkey() {
            return Err(BlockchainError::Wallet(format!(
                "Public key {} does not match secret key (derived {})",
                stored,
                wallet.pubkey()
            )));
        }
        Ok(wallet)
    }

    /// Write the wallet to `path` as JSON.
    pub fn save(&self, path: &Path) -> BlockchainResult<()> {
        let json = serde_json::to_string(&self.to_file())
            .map_err(|e| BlockchainError::Wallet(format!("Failed to encode wallet: {}", e)))?;
        create_private(path)
            .and_then(|mut file| file.write_all(json.as_bytes()))
            .map_err(|e| {
                BlockchainError::Wallet(format!("Failed to write {}: {}", path.display(), e))
            })?;

        tracing::info!(address = %self.pubkey(), path = %path.display(), "Wallet saved");
        Ok(())
    }

    /// Read a wallet from `path`.
    ///
    /// Fails with [`BlockchainError::WalletNotFound`] if the file is absent,
    /// [`BlockchainError::WalletMalformed`] if it cannot be decoded or its
    /// keys do not match, and [`BlockchainError::Wallet`] if it cannot be read.
    pub fn load(path: &Path) -> BlockchainResult<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlockchainError::WalletNotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(BlockchainError::Wallet(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let malformed = |reason: String| BlockchainError::WalletMalformed {
            path: path.to_path_buf(),
            reason,
        };
        let file: WalletFile = serde_json::from_str(&data).map_err(|e| malformed(e.to_string()))?;
        let wallet = Self::from_file(&file).map_err(|e| malformed(e.to_string()))?;
        tracing::debug!(address = %wallet.pubkey(), path = %path.display(), "Wallet loaded");
        Ok(wallet)
    }

    /// Load the wallet at `path`, generating and saving a new one if the file
    /// is absent or malformed.
    ///
    /// A malformed file is renamed to [`backup_path`] first; if that rename
    /// fails the error is returned and nothing is written.
    pub fn load_or_create(path: &Path) -> BlockchainResult<(Self, WalletSource)> {
        let source = match Self::load(path) {
            Ok(wallet) => return Ok((wallet, WalletSource::Loaded)),
            Err(BlockchainError::WalletNotFound(_)) => WalletSource::Created,
            Err(BlockchainError::WalletMalformed { reason, .. }) => {
                let backup = backup_path(path);
                fs::rename(path, &backup).map_err(|e| {
                    BlockchainError::Wallet(format!(
                        "Failed to move malformed wallet {} to {}: {}",
                        path.display(),
                        backup.display(),
                        e
                    ))
                })?;
                tracing::warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    reason = %reason,
                    "Malformed wallet file moved aside"
                );
                WalletSource::Recovered { backup }
            }
            Err(e) => return Err(e),
        };

        let wallet = Self::generate();
        wallet.save(path)?;
        Ok((wallet, source))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}
