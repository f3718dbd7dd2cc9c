//! devnet-airdrop command-line client.
//!
//! # Flow
//!
//! ```text
//!  CLI flags ──┐
//!              ├─▶ AppConfig ─▶ logging
//!  config.toml ┘        │
//!                       ▼
//!              ┌─────────────────┐      ┌──────────────────────────┐
//!              │  wallet file    │      │  SolanaClient (JSON-RPC) │
//!              │  load / create  │─────▶│  balance, token balance, │
//!              └─────────────────┘      │  health                  │
//!                                       └────────────┬─────────────┘
//!                                                    │ airdrop, signed token txs
//!                                                    ▼
//!                                       ┌──────────────────────────┐
//!                                       │ RetryingRequestExecutor  │
//!                                       │ 429 → backoff → retry    │
//!                                       │ ok  → confirm → receipt  │
//!                                       └──────────────────────────┘
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use devnet_airdrop::blockchain::types::{lamports_to_sol, sol_to_lamports, BlockchainError, Pubkey};
use devnet_airdrop::blockchain::WalletSource;
use devnet_airdrop::config::validation::validate_config;
use devnet_airdrop::config::{load_or_default, AppConfig, ConfigError};
use devnet_airdrop::observability::logging::init_logging;
use devnet_airdrop::{request_airdrop, RetryPolicy, SolanaClient, TokenClient, Wallet};

#[derive(Parser)]
#[command(name = "devnet-airdrop")]
#[command(version, about = "Wallet, balance and airdrop client for the Solana devnet", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the JSON-RPC endpoint
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Override the wallet file path
    #[arg(short, long, global = true)]
    wallet: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local wallet file
    Wallet {
        #[command(subcommand)]
        action: WalletCommand,
    },
    /// Show the SOL balance of an address (defaults to the wallet)
    Balance { address: Option<String> },
    /// Request test SOL from the faucet (defaults to the wallet, creating it if needed)
    Airdrop {
        address: Option<String>,
        /// Amount in lamports
        #[arg(long, conflicts_with = "sol")]
        lamports: Option<u64>,
        /// Amount in SOL
        #[arg(long)]
        sol: Option<f64>,
    },
    /// Show the balance of a token account
    TokenBalance { account: String },
    /// Get or create the associated token account for a mint
    CreateTokenAccount {
        /// Token mint address
        mint: String,
        /// Account owner (defaults to the wallet)
        #[arg(long)]
        owner: Option<String>,
    },
    /// Create a test token mint and mint 1000 tokens to the wallet
    MintTestToken {
        /// Decimals of the new mint (defaults to token.decimals)
        #[arg(long)]
        decimals: Option<u8>,
    },
    /// Transfer tokens from a token account owned by the wallet
    Transfer {
        /// Source token account
        source: String,
        /// Destination token account
        destination: String,
        /// Amount in base units
        amount: u64,
    },
    /// Check that the RPC endpoint is healthy
    Health,
}

#[derive(Subcommand)]
enum WalletCommand {
    /// Generate a new wallet file
    New {
        /// Overwrite an existing wallet file
        #[arg(long)]
        force: bool,
    },
    /// Print the wallet address
    Show,
}

fn resolve_address(address: Option<String>, config: &AppConfig, create: bool) -> Result<Pubkey, BlockchainError> {
    if let Some(address) = address {
        return address.parse();
    }

    let wallet = if create {
        let (wallet, source) = Wallet::load_or_create(&config.wallet.path)?;
        match source {
            WalletSource::Loaded => {}
            WalletSource::Created => {
                println!("Created new wallet at {}", config.wallet.path.display());
            }
            WalletSource::Recovered { backup } => println!(
                "Wallet file was malformed; moved it to {} and created a new wallet at {}",
                backup.display(),
                config.wallet.path.display()
            ),
        }
        wallet
    } else {
        Wallet::load(&config.wallet.path)?
    };
    Ok(wallet.pubkey())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(rpc_url) = cli.rpc_url {
        config.network.rpc_url = rpc_url;
    }
    if let Some(path) = cli.wallet {
        config.wallet.path = path;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability)?;

    tracing::info!(
        rpc_url = %config.network.rpc_url,
        wallet = %config.wallet.path.display(),
        "devnet-airdrop v0.1.0 starting"
    );

    match cli.command {
        Commands::Wallet { action } => match action {
            WalletCommand::New { force } => {
                if config.wallet.path.exists() && !force {
                    return Err(format!(
                        "{} already exists (use --force to overwrite)",
                        config.wallet.path.display()
                    )
                    .into());
                }
                let wallet = Wallet::generate();
                wallet.save(&config.wallet.path)?;
                println!("{}", wallet.pubkey());
            }
            WalletCommand::Show => {
                let wallet = Wallet::load(&config.wallet.path)?;
                println!("{}", wallet.pubkey());
            }
        },
        Commands::Balance { address } => {
            let address = resolve_address(address, &config, false)?;
            let client = SolanaClient::new(config.network.clone())?;
            let lamports = client.get_balance(&address).await?;
            println!("{} SOL", lamports_to_sol(lamports));
        }
        Commands::Airdrop { address, lamports, sol } => {
            let lamports = match sol {
                Some(sol) => Some(sol_to_lamports(sol)?),
                None => lamports,
            };
            if let Some(lamports) = lamports {
                if lamports == 0 {
                    return Err("airdrop amount must be greater than zero".into());
                }
                config.airdrop.lamports = lamports;
            }
            let address = resolve_address(address, &config, true)?;
            let client = SolanaClient::new(config.network.clone())?;

            let signature = request_airdrop(&client, address, &config.airdrop).await?;
            println!("Airdrop successful! Signature: {}", signature);

            match client.get_balance(&address).await {
                Ok(lamports) => println!("Balance: {} SOL", lamports_to_sol(lamports)),
                Err(e) => tracing::warn!(error = %e, "Failed to fetch balance after airdrop"),
            }
        }
        Commands::TokenBalance { account } => {
            let account: Pubkey = account.parse()?;
            let client = SolanaClient::new(config.network.clone())?;
            let balance = client.get_token_account_balance(&account).await?;
            println!("Token Balance: {}", balance.ui_amount_string);
        }
        Commands::CreateTokenAccount { mint, owner } => {
            let mint: Pubkey = mint.parse()?;
            let wallet = Wallet::load(&config.wallet.path)?;
            let owner = match owner {
                Some(owner) => owner.parse()?,
                None => wallet.pubkey(),
            };
            let client = SolanaClient::new(config.network.clone())?;
            let tokens = TokenClient::new(&client, RetryPolicy::from(&config.token.retry));

            let account = tokens.create_token_account(&wallet, &mint, &owner).await?;
            println!("Token account: {}", account);
        }
        Commands::MintTestToken { decimals } => {
            let decimals = decimals.unwrap_or(config.token.decimals);
            let wallet = Wallet::load(&config.wallet.path)?;
            let client = SolanaClient::new(config.network.clone())?;
            let tokens = TokenClient::new(&client, RetryPolicy::from(&config.token.retry));

            let token = tokens.create_and_mint_test_token(&wallet, &wallet, decimals).await?;
            println!("Mint: {}", token.mint);
            println!("Token account: {}", token.token_account);
            println!("Minted: {} base units", token.amount);
        }
        Commands::Transfer {
            source,
            destination,
            amount,
        } => {
            let source: Pubkey = source.parse()?;
            let destination: Pubkey = destination.parse()?;
            let wallet = Wallet::load(&config.wallet.path)?;
            let client = SolanaClient::new(config.network.clone())?;
            let tokens = TokenClient::new(&client, RetryPolicy::from(&config.token.retry));

            let signature = tokens
                .transfer_tokens(&wallet, &source, &destination, &wallet, amount)
                .await?;
            println!("Transfer complete! Signature: {}", signature);
        }
        Commands::Health => {
            let client = SolanaClient::new(config.network.clone())?;
            let health = client.get_health().await?;
            println!("{}", health);
        }
    }

    Ok(())
}
