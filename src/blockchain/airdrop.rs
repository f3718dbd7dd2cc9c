//! Test-network airdrops with rate-limit aware retry.

use async_trait::async_trait;

use crate::blockchain::client::SolanaClient;
use crate::blockchain::types::{Pubkey, TxSignature};
use crate::config::schema::AirdropConfig;
use crate::resilience::retries::{
    RetryError, RetryPolicy, RetryableService, RetryingRequestExecutor, SubmitOutcome,
};

/// Funds requested from the faucet for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirdropRequest {
    pub recipient: Pubkey,
    pub lamports: u64,
}

/// Faucet access through the RPC client, classified for the retry executor.
#[derive(Debug, Clone, Copy)]
pub struct AirdropService<'a> {
    client: &'a SolanaClient,
}

impl<'a> AirdropService<'a> {
    pub fn new(client: &'a SolanaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a> RetryableService for AirdropService<'a> {
    type Request = AirdropRequest;
    type Receipt = TxSignature;

    async fn submit(&self, request: &AirdropRequest) -> SubmitOutcome<TxSignature> {
        match self
            .client
            .request_airdrop(&request.recipient, request.lamports)
            .await
        {
            Ok(signature) => SubmitOutcome::Success(signature),
            Err(e) if e.is_rate_limited() => SubmitOutcome::RateLimited,
            Err(e) => SubmitOutcome::Fatal(e.to_string()),
        }
    }

    async fn confirm(&self, signature: &TxSignature) -> Result<(), String> {
        let blockhash = self
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| e.to_string())?;

        let slot = self
            .client
            .confirm_transaction(signature, &blockhash)
            .await
            .map_err(|e| e.to_string())?;

        tracing::debug!(signature = %signature, slot, "Airdrop confirmed");
        Ok(())
    }
}

/// Request an airdrop of `config.lamports` to `recipient` and wait for confirmation.
pub async fn request_airdrop(
    client: &SolanaClient,
    recipient: Pubkey,
    config: &AirdropConfig,
) -> Result<TxSignature, RetryError> {
    let request = AirdropRequest {
        recipient,
        lamports: config.lamports,
    };
    let policy = RetryPolicy::from(&config.retry);

    tracing::info!(
        recipient = %recipient,
        lamports = config.lamports,
        max_attempts = policy.max_attempts,
        "Requesting airdrop"
    );

    let signature = RetryingRequestExecutor::new(AirdropService::new(client))
        .with_operation("airdrop")
        .execute(&request, &policy)
        .await?;

    tracing::info!(signature = %signature, "Airdrop successful");
    Ok(signature)
}
