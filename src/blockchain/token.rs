//! SPL token accounts, test mints and token transfers.
//!
//! # Flow
//! ```text
//! instructions (spl-token / associated-token-account)
//!     → sign locally with every required wallet
//!     → sendTransaction through the retry executor (429 → backoff)
//!     → confirm against the blockhash the transaction was built on
//! ```
//!
//! # Security
//! - Keys never leave the process; only signed wire bytes are sent

use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey as SdkPubkey;
use solana_sdk::signature::Signature as SdkSignature;
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Mint;
use std::str::FromStr;

use crate::blockchain::client::SolanaClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, LatestBlockhash, Pubkey, TxSignature};
use crate::blockchain::wallet::Wallet;
use crate::resilience::retries::{
    RetryPolicy, RetryableService, RetryingRequestExecutor, SubmitOutcome,
};

/// Whole tokens minted by [`TokenClient::create_and_mint_test_token`].
pub const TEST_TOKEN_SUPPLY: u64 = 1000;

/// A freshly created test mint and the payer's funded token account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestToken {
    pub mint: Pubkey,
    pub token_account: Pubkey,
    /// Base units minted (`TEST_TOKEN_SUPPLY * 10^decimals`).
    pub amount: u64,
}

/// Base units of a [`TEST_TOKEN_SUPPLY`] supply at `decimals`.
pub fn test_token_amount(decimals: u8) -> BlockchainResult<u64> {
    10u64
        .checked_pow(u32::from(decimals))
        .and_then(|unit| unit.checked_mul(TEST_TOKEN_SUPPLY))
        .ok_or_else(|| {
            BlockchainError::InvalidAmount(format!(
                "{} tokens with {} decimals overflows u64",
                TEST_TOKEN_SUPPLY, decimals
            ))
        })
}

/// Associated token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(&SdkPubkey::from(*owner), &SdkPubkey::from(*mint)).into()
}

/// Build a transaction and sign it with every signer the message requires.
///
/// The first wallet in `signers` pays the fee. Wallets the message does not
/// need are ignored; a required signer missing from `signers` is an error.
pub fn build_transaction(
    instructions: &[Instruction],
    signers: &[&Wallet],
    blockhash: &LatestBlockhash,
) -> BlockchainResult<Transaction> {
    let payer = signers
        .first()
        .ok_or_else(|| BlockchainError::Transaction("No fee payer".to_string()))?;
    let recent_blockhash = Hash::from_str(&blockhash.blockhash).map_err(|e| {
        BlockchainError::Transaction(format!("Invalid blockhash '{}': {}", blockhash.blockhash, e))
    })?;

    let mut message = Message::new(instructions, Some(&SdkPubkey::from(payer.pubkey())));
    message.recent_blockhash = recent_blockhash;
    let mut transaction = Transaction::new_unsigned(message);

    let message_data = transaction.message_data();
    let required = usize::from(transaction.message.header.num_required_signatures);
    let signatures = transaction
        .message
        .account_keys
        .iter()
        .take(required)
        .map(|key| {
            let signer = signers
                .iter()
                .find(|wallet| SdkPubkey::from(wallet.pubkey()) == *key)
                .ok_or_else(|| BlockchainError::Transaction(format!("Missing signer {}", key)))?;
            Ok(SdkSignature::from(signer.sign_message(&message_data).to_bytes()))
        })
        .collect::<BlockchainResult<Vec<_>>>()?;
    transaction.signatures = signatures;

    Ok(transaction)
}

/// A signed transaction and the blockhash it was built on.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub blockhash: LatestBlockhash,
}

/// A transaction the node accepted, awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub signature: TxSignature,
    pub blockhash: LatestBlockhash,
}

/// `sendTransaction` classified for the retry executor.
#[derive(Debug, Clone, Copy)]
pub struct TransactionSender<'a> {
    client: &'a SolanaClient,
}

impl<'a> TransactionSender<'a> {
    pub fn new(client: &'a SolanaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a> RetryableService for TransactionSender<'a> {
    type Request = SignedTransaction;
    type Receipt = PendingTransaction;

    async fn submit(&self, request: &SignedTransaction) -> SubmitOutcome<PendingTransaction> {
        match self.client.send_transaction(&request.transaction).await {
            Ok(signature) => SubmitOutcome::Success(PendingTransaction {
                signature,
                blockhash: request.blockhash.clone(),
            }),
            Err(e) if e.is_rate_limited() => SubmitOutcome::RateLimited,
            Err(e) => SubmitOutcome::Fatal(e.to_string()),
        }
    }

    async fn confirm(&self, pending: &PendingTransaction) -> Result<(), String> {
        let slot = self
            .client
            .confirm_transaction(&pending.signature, &pending.blockhash)
            .await
            .map_err(|e| e.to_string())?;
        tracing::debug!(signature = %pending.signature, slot, "Transaction confirmed");
        Ok(())
    }
}

/// Token account, mint and transfer operations over a [`SolanaClient`].
#[derive(Debug, Clone)]
pub struct TokenClient<'a> {
    client: &'a SolanaClient,
    policy: RetryPolicy,
}

impl<'a> TokenClient<'a> {
    pub fn new(client: &'a SolanaClient, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Sign `instructions`, send them, and wait for confirmation.
    async fn send(
        &self,
        operation: &'static str,
        instructions: &[Instruction],
        signers: &[&Wallet],
    ) -> BlockchainResult<TxSignature> {
        let blockhash = self.client.get_latest_blockhash().await?;
        let transaction = build_transaction(instructions, signers, &blockhash)?;
        let request = SignedTransaction {
            transaction,
            blockhash,
        };

        let pending = RetryingRequestExecutor::new(TransactionSender::new(self.client))
            .with_operation(operation)
            .execute(&request, &self.policy)
            .await?;
        Ok(pending.signature)
    }

    /// Return the associated token account of `owner` for `mint`, creating it
    /// (paid by `payer`) if it does not exist yet.
    pub async fn create_token_account(
        &self,
        payer: &Wallet,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> BlockchainResult<Pubkey> {
        let address = associated_token_address(owner, mint);
        if self.client.get_account_info(&address).await?.is_some() {
            tracing::debug!(token_account = %address, "Token account already exists");
            return Ok(address);
        }

        let instruction = create_associated_token_account_idempotent(
            &SdkPubkey::from(payer.pubkey()),
            &SdkPubkey::from(*owner),
            &SdkPubkey::from(*mint),
            &spl_token::id(),
        );
        let signature = self.send("create_token_account", &[instruction], &[payer]).await?;

        tracing::info!(token_account = %address, mint = %mint, owner = %owner, signature = %signature, "Token account created");
        Ok(address)
    }

    /// Create a new mint controlled by `mint_authority`, open the payer's
    /// token account for it and mint [`TEST_TOKEN_SUPPLY`] whole tokens there.
    pub async fn create_and_mint_test_token(
        &self,
        payer: &Wallet,
        mint_authority: &Wallet,
        decimals: u8,
    ) -> BlockchainResult<TestToken> {
        let amount = test_token_amount(decimals)?;
        let mint = Wallet::generate();
        let mint_key = SdkPubkey::from(mint.pubkey());
        let authority_key = SdkPubkey::from(mint_authority.pubkey());

        // 1. Create and initialize the mint account
        let rent = self
            .client
            .get_minimum_balance_for_rent_exemption(Mint::LEN)
            .await?;
        let initialize = spl_token::instruction::initialize_mint2(
            &spl_token::id(),
            &mint_key,
            &authority_key,
            None,
            decimals,
        )
        .map_err(|e| BlockchainError::Transaction(e.to_string()))?;
        let instructions = [
            system_instruction::create_account(
                &SdkPubkey::from(payer.pubkey()),
                &mint_key,
                rent,
                Mint::LEN as u64,
                &spl_token::id(),
            ),
            initialize,
        ];
        let signature = self.send("create_mint", &instructions, &[payer, &mint]).await?;
        tracing::info!(mint = %mint.pubkey(), decimals, signature = %signature, "Token mint created");

        // 2. Open the payer's token account
        let token_account = self
            .create_token_account(payer, &mint.pubkey(), &payer.pubkey())
            .await?;

        // 3. Mint the test supply into it
        let mint_to = spl_token::instruction::mint_to(
            &spl_token::id(),
            &mint_key,
            &SdkPubkey::from(token_account),
            &authority_key,
            &[],
            amount,
        )
        .map_err(|e| BlockchainError::Transaction(e.to_string()))?;
        let signature = self.send("mint_to", &[mint_to], &[payer, mint_authority]).await?;
        tracing::info!(token_account = %token_account, amount, signature = %signature, "Test tokens minted");

        Ok(TestToken {
            mint: mint.pubkey(),
            token_account,
            amount,
        })
    }

    /// Move `amount` base units between token accounts. `owner` must own `source`.
    pub async fn transfer_tokens(
        &self,
        payer: &Wallet,
        source: &Pubkey,
        destination: &Pubkey,
        owner: &Wallet,
        amount: u64,
    ) -> BlockchainResult<TxSignature> {
        let instruction = spl_token::instruction::transfer(
            &spl_token::id(),
            &SdkPubkey::from(*source),
            &SdkPubkey::from(*destination),
            &SdkPubkey::from(owner.pubkey()),
            &[],
            amount,
        )
        .map_err(|e| BlockchainError::Transaction(e.to_string()))?;

        let signature = self.send("transfer", &[instruction], &[payer, owner]).await?;
        tracing::info!(source = %source, destination = %destination, amount, signature = %signature, "Transfer complete");
        Ok(signature)
    }
}
