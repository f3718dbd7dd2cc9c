//! JSON-RPC client queries against a mock node.

use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use devnet_airdrop::blockchain::token::build_transaction;
use devnet_airdrop::blockchain::types::{BlockchainError, LatestBlockhash, Pubkey, TxSignature};
use devnet_airdrop::config::NetworkConfig;
use devnet_airdrop::{SolanaClient, Wallet};

mod common;

const SIGNATURE: &str = "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSZkQUW";

fn network(rpc_url: String) -> NetworkConfig {
    NetworkConfig {
        rpc_url,
        rpc_timeout_secs: 5,
        confirm_timeout_secs: 5,
        confirm_poll_interval_ms: 10,
        ..NetworkConfig::default()
    }
}

fn blockhash() -> LatestBlockhash {
    LatestBlockhash {
        blockhash: bs58::encode([7u8; 32]).into_string(),
        last_valid_block_height: 3090,
    }
}

#[tokio::test]
async fn test_get_balance() {
    let addr = common::start_rpc_backend(|method| match method {
        "getBalance" => common::rpc_value(json!(2_500_000_000u64)),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let owner = Pubkey::new([1u8; 32]);

    assert_eq!(client.get_balance(&owner).await.unwrap(), 2_500_000_000);
    assert_eq!(client.get_balance_sol(&owner).await.unwrap(), 2.5);
}

#[tokio::test]
async fn test_get_token_account_balance() {
    let addr = common::start_rpc_backend(|method| match method {
        "getTokenAccountBalance" => common::rpc_value(json!({
            "amount": "1000000000",
            "decimals": 6,
            "uiAmount": 1000.0,
            "uiAmountString": "1000"
        })),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let balance = client
        .get_token_account_balance(&Pubkey::new([2u8; 32]))
        .await
        .unwrap();

    assert_eq!(balance.amount, "1000000000");
    assert_eq!(balance.decimals, 6);
    assert_eq!(balance.ui_amount_or_zero(), 1000.0);
}

#[tokio::test]
async fn test_rpc_error_is_not_rate_limit() {
    let addr = common::start_rpc_backend(|_| common::rpc_error(-32602, "Invalid param: could not find account"))
        .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let err = client
        .get_token_account_balance(&Pubkey::new([3u8; 32]))
        .await
        .unwrap_err();

    assert!(matches!(err, BlockchainError::Rpc { code: -32602, .. }));
    assert!(!err.is_rate_limited());
}

#[tokio::test]
async fn test_http_429_is_rate_limit() {
    let addr = common::start_rpc_backend(|_| common::too_many_requests()).await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let err = client.get_block_height().await.unwrap_err();

    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_health() {
    let addr = common::start_rpc_backend(|method| match method {
        "getHealth" => common::rpc_result(json!("ok")),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    assert_eq!(client.get_health().await.unwrap(), "ok");
    assert!(client.is_healthy().await);
}

#[tokio::test]
async fn test_failover_to_secondary() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let addr = common::start_rpc_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        common::rpc_result(json!(42))
    })
    .await;

    let mut config = network("http://127.0.0.1:1".to_string());
    config.failover_urls.push(format!("http://{}", addr));
    let client = SolanaClient::new(config).unwrap();

    assert_eq!(client.get_block_height().await.unwrap(), 42);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_fails_over() {
    let primary = common::start_rpc_backend(|_| (503, "unavailable".to_string())).await;
    let secondary = common::start_rpc_backend(|_| common::rpc_result(json!(7))).await;

    let mut config = network(format!("http://{}", primary));
    config.failover_urls.push(format!("http://{}", secondary));
    let client = SolanaClient::new(config).unwrap();

    assert_eq!(client.get_block_height().await.unwrap(), 7);
}

#[tokio::test]
async fn test_confirm_transaction_returns_slot() {
    let addr = common::start_rpc_backend(|method| match method {
        "getSignatureStatuses" => common::rpc_value(json!([{
            "slot": 72,
            "confirmations": null,
            "err": null,
            "confirmationStatus": "finalized"
        }])),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let slot = client
        .confirm_transaction(&TxSignature(SIGNATURE.to_string()), &blockhash())
        .await
        .unwrap();

    assert_eq!(slot, 72);
}

#[tokio::test]
async fn test_confirm_transaction_failed_on_chain() {
    let addr = common::start_rpc_backend(|method| match method {
        "getSignatureStatuses" => common::rpc_value(json!([{
            "slot": 72,
            "confirmations": 1,
            "err": { "InstructionError": [0, { "Custom": 1 }] },
            "confirmationStatus": "confirmed"
        }])),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let err = client
        .confirm_transaction(&TxSignature(SIGNATURE.to_string()), &blockhash())
        .await
        .unwrap_err();

    assert!(matches!(&err, BlockchainError::TransactionFailed(reason) if reason.contains("InstructionError")));
}

#[tokio::test]
async fn test_get_account_info() {
    let addr = common::start_rpc_backend_with_params(|method, params| match method {
        "getAccountInfo" if params[0] == Pubkey::new([1u8; 32]).to_string() => common::rpc_value(json!({
            "data": ["", "base64"],
            "executable": false,
            "lamports": 2039280,
            "owner": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "rentEpoch": 0,
            "space": 165
        })),
        "getAccountInfo" => common::rpc_value(json!(null)),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();

    let info = client.get_account_info(&Pubkey::new([1u8; 32])).await.unwrap().unwrap();
    assert_eq!(info.lamports, 2_039_280);
    assert!(!info.executable);
    assert!(client.get_account_info(&Pubkey::new([2u8; 32])).await.unwrap().is_none());
}

#[tokio::test]
async fn test_minimum_balance_for_rent_exemption() {
    let addr = common::start_rpc_backend_with_params(|method, params| match method {
        "getMinimumBalanceForRentExemption" if params[0] == 82 => common::rpc_result(json!(1461600)),
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    assert_eq!(client.get_minimum_balance_for_rent_exemption(82).await.unwrap(), 1_461_600);
}

#[tokio::test]
async fn test_send_transaction_wire_format() {
    let payer = Wallet::generate();
    let expected_payer = payer.pubkey();
    let addr = common::start_rpc_backend_with_params(move |method, params| match method {
        "sendTransaction" => {
            let tx = common::decode_sent_transaction(params);
            assert!(tx.verify().is_ok());
            assert_eq!(Pubkey::from(tx.message.account_keys[0]), expected_payer);
            common::rpc_result(json!(tx.signatures[0].to_string()))
        }
        _ => common::rpc_error(-32601, "Method not found"),
    })
    .await;

    let client = SolanaClient::new(network(format!("http://{}", addr))).unwrap();
    let transfer = solana_sdk::system_instruction::transfer(
        &solana_sdk::pubkey::Pubkey::from(payer.pubkey()),
        &solana_sdk::pubkey::Pubkey::new_from_array([8u8; 32]),
        1,
    );
    let tx = build_transaction(&[transfer], &[&payer], &blockhash()).unwrap();

    let signature = client.send_transaction(&tx).await.unwrap();
    assert_eq!(signature.as_str(), tx.signatures[0].to_string());
}
