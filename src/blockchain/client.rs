//! Solana JSON-RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Send JSON-RPC requests to the primary endpoint, failing over on transport errors
//! - Classify refusals: HTTP 429 / error code 429 become `RateLimited`
//! - Query chain state (balances, accounts, blockhash, signature statuses, token balances)
//! - Submit signed transactions and wait for confirmation

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::transaction::Transaction;
use std::time::Duration;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::blockchain::types::{
    lamports_to_sol, AccountInfo, BlockchainError, BlockchainResult, LatestBlockhash,
    Pubkey, SignatureStatus, TokenAmount, TxSignature,
};
use crate::config::schema::NetworkConfig;
use crate::observability::metrics;

/// JSON-RPC error code used by rate-limiting RPC providers.
const RATE_LIMIT_CODE: i64 = 429;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// Responses of the form `{"context": {...}, "value": T}`.
#[derive(Debug, Deserialize)]
struct Contextual<T> {
    value: T,
}

/// Decode a JSON-RPC response body.
fn decode_response<T: DeserializeOwned>(method: &str, body: &str) -> BlockchainResult<T> {
    let response: RpcResponse<T> = serde_json::from_str(body)
        .map_err(|e| BlockchainError::InvalidResponse(format!("{}: {}", method, e)))?;

    if let Some(err) = response.error {
        if err.code == RATE_LIMIT_CODE {
            return Err(BlockchainError::RateLimited(err.message));
        }
        return Err(BlockchainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    response
        .result
        .ok_or_else(|| BlockchainError::InvalidResponse(format!("{}: missing result", method)))
}

/// Solana JSON-RPC client wrapper with failover support.
#[derive(Clone)]
pub struct SolanaClient {
    http: reqwest::Client,
    /// Endpoints in priority order (primary first).
    endpoints: Vec<url::Url>,
    config: NetworkConfig,
    timeout_duration: Duration,
}

impl SolanaClient {
    /// Create a new client.
    ///
    /// Fails if the primary URL is invalid; invalid failover URLs are skipped.
    pub fn new(config: NetworkConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut endpoints = Vec::new();

        // 1. Add primary endpoint
        let primary: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Transport(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        endpoints.push(primary);

        // 2. Add failover endpoints
        for url_str in &config.failover_urls {
            match url_str.parse() {
                Ok(url) => endpoints.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            rpc_url = %config.rpc_url,
            failovers = endpoints.len() - 1,
            commitment = config.commitment.as_str(),
            "RPC client initialized"
        );

        Ok(Self {
            http: reqwest::Client::new(),
            endpoints,
            config,
            timeout_duration,
        })
    }

    async fn post(&self, endpoint: &url::Url, body: &Value) -> reqwest::Result<(reqwest::StatusCode, String)> {
        let response = self.http.post(endpoint.clone()).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Issue one JSON-RPC call.
    ///
    /// Transport failures, timeouts and 5xx responses move on to the next
    /// endpoint. Any other answer is final.
    async fn call<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> BlockchainResult<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": Uuid::new_v4().to_string(),
            "method": method,
            "params": params,
        });

        let mut last_error = None;
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            match timeout(self.timeout_duration, self.post(endpoint, &body)).await {
                Ok(Ok((status, text))) => {
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        metrics::record_rpc_request(method, "rate_limited");
                        tracing::debug!(method, provider_idx = i, "RPC rate limited");
                        return Err(BlockchainError::RateLimited(format!("{} {}", status, text.trim())));
                    }
                    if status.is_server_error() {
                        metrics::record_rpc_request(method, "transport_error");
                        tracing::warn!(method, provider_idx = i, status = %status, "RPC server error, trying next provider");
                        last_error = Some(BlockchainError::Transport(format!("HTTP {} from {}", status, endpoint)));
                        continue;
                    }

                    let result = decode_response(method, &text);
                    let label = match &result {
                        Ok(_) => "ok",
                        Err(BlockchainError::RateLimited(_)) => "rate_limited",
                        Err(_) => "rpc_error",
                    };
                    metrics::record_rpc_request(method, label);
                    return result;
                }
                Ok(Err(e)) => {
                    metrics::record_rpc_request(method, "transport_error");
                    tracing::warn!(method, provider_idx = i, error = %e, "RPC error, trying next provider");
                    last_error = Some(BlockchainError::Transport(e.to_string()));
                }
                Err(_) => {
                    metrics::record_rpc_request(method, "timeout");
                    tracing::warn!(method, provider_idx = i, "RPC timeout, trying next provider");
                    last_error = Some(BlockchainError::Timeout(self.config.rpc_timeout_secs));
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| BlockchainError::Transport("No RPC endpoints configured".to_string())))
    }

    fn commitment_param(&self) -> Value {
        json!({ "commitment": self.config.commitment.as_str() })
    }

    /// Get the balance of an address in lamports.
    pub async fn get_balance(&self, address: &Pubkey) -> BlockchainResult<u64> {
        let response: Contextual<u64> = self
            .call("getBalance", json!([address.to_string(), self.commitment_param()]))
            .await?;
        Ok(response.value)
    }

    /// Get the balance of an address in SOL.
    pub async fn get_balance_sol(&self, address: &Pubkey) -> BlockchainResult<f64> {
        Ok(lamports_to_sol(self.get_balance(address).await?))
    }

    /// Ask the network faucet to send `lamports` to `address`.
    pub async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> BlockchainResult<TxSignature> {
        self.call(
            "requestAirdrop",
            json!([address.to_string(), lamports, self.commitment_param()]),
        )
        .await
    }

    /// Get account metadata, `None` if the account does not exist.
    pub async fn get_account_info(&self, address: &Pubkey) -> BlockchainResult<Option<AccountInfo>> {
        let response: Contextual<Option<AccountInfo>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.config.commitment.as_str() }
                ]),
            )
            .await?;
        Ok(response.value)
    }

    /// Lamports an account of `data_len` bytes needs to be rent exempt.
    pub async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> BlockchainResult<u64> {
        self.call(
            "getMinimumBalanceForRentExemption",
            json!([data_len, self.commitment_param()]),
        )
        .await
    }

    /// Submit a signed transaction. Returns once the node accepts it, not
    /// once it is confirmed.
    pub async fn send_transaction(&self, transaction: &Transaction) -> BlockchainResult<TxSignature> {
        let wire = bincode::serialize(transaction)
            .map_err(|e| BlockchainError::Transaction(format!("Failed to encode transaction: {}", e)))?;

        self.call(
            "sendTransaction",
            json!([
                BASE64.encode(wire),
                { "encoding": "base64", "preflightCommitment": self.config.commitment.as_str() }
            ]),
        )
        .await
    }

    /// Get the latest blockhash and its validity bound.
    pub async fn get_latest_blockhash(&self) -> BlockchainResult<LatestBlockhash> {
        let response: Contextual<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([self.commitment_param()]))
            .await?;
        Ok(response.value)
    }

    /// Get the current block height.
    pub async fn get_block_height(&self) -> BlockchainResult<u64> {
        self.call("getBlockHeight", json!([self.commitment_param()])).await
    }

    /// Get the status of a single signature, `None` if the network has not seen it.
    pub async fn get_signature_status(&self, signature: &TxSignature) -> BlockchainResult<Option<SignatureStatus>> {
        let response: Contextual<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.as_str()], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    /// Wait for a transaction to reach the configured commitment and return its slot.
    ///
    /// Fails with `TransactionFailed` if the transaction executed with an
    /// error, with `BlockhashExpired` once the block height passes
    /// `blockhash.last_valid_block_height`, and with `ConfirmationTimeout`
    /// after `confirm_timeout_secs`.
    pub async fn confirm_transaction(
        &self,
        signature: &TxSignature,
        blockhash: &LatestBlockhash,
    ) -> BlockchainResult<u64> {
        let commitment = self.config.commitment;
        let poll_interval = Duration::from_millis(self.config.confirm_poll_interval_ms);

        let result = timeout(Duration::from_secs(self.config.confirm_timeout_secs), async {
            let mut ticker = interval(poll_interval);

            loop {
                ticker.tick().await;

                if let Some(status) = self.get_signature_status(signature).await? {
                    if let Some(err) = status.err {
                        return Err(BlockchainError::TransactionFailed(err.to_string()));
                    }
                    if status.satisfies(commitment) {
                        return Ok(status.slot);
                    }
                }

                let height = self.get_block_height().await?;
                if height > blockhash.last_valid_block_height {
                    return Err(BlockchainError::BlockhashExpired {
                        last_valid_block_height: blockhash.last_valid_block_height,
                    });
                }

                tracing::debug!(
                    signature = %signature,
                    block_height = height,
                    last_valid_block_height = blockhash.last_valid_block_height,
                    "Transaction pending"
                );
            }
        })
        .await;

        match result {
            Ok(status) => status,
            Err(_) => Err(BlockchainError::ConfirmationTimeout(self.config.confirm_timeout_secs)),
        }
    }

    /// Get the balance of a token account.
    pub async fn get_token_account_balance(&self, token_account: &Pubkey) -> BlockchainResult<TokenAmount> {
        let response: Contextual<TokenAmount> = self
            .call(
                "getTokenAccountBalance",
                json!([token_account.to_string(), self.commitment_param()]),
            )
            .await?;
        Ok(response.value)
    }

    /// Ask the node for its health (`"ok"` when healthy).
    pub async fn get_health(&self) -> BlockchainResult<String> {
        self.call("getHealth", json!([])).await
    }

    /// Check if the network is reachable and healthy.
    pub async fn is_healthy(&self) -> bool {
        matches!(self.get_health().await.as_deref(), Ok("ok"))
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

impl std::fmt::Debug for SolanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("endpoints", &self.endpoints.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
