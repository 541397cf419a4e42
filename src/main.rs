mod chain;
mod config;
mod db;
mod execution;
mod models;
mod polymarket;
mod services;

use std::str::FromStr;
use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

use crate::chain::CtfRedeemer;
use crate::config::AppConfig;
use crate::execution::copy_engine::{CopyEngine, CopyEngineConfig};
use crate::execution::order_executor::OrderExecutor;
use crate::execution::sizing;
use crate::polymarket::{
    BalanceChecker, ClobClient, DataClient, OrderSigner, PolymarketAuth, PolymarketWallet,
};
use crate::services::ResolutionEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    // Bad strategy config is fatal before anything touches the exchange.
    let violations = sizing::validate(&config.strategy);
    if !violations.is_empty() {
        anyhow::bail!("invalid copy strategy config:\n  {}", violations.join("\n  "));
    }

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    let http = reqwest::Client::new();

    let auth = match (
        config.polymarket_api_key.clone(),
        config.polymarket_api_secret.clone(),
        config.polymarket_passphrase.clone(),
    ) {
        (Some(key), Some(secret), Some(passphrase)) => {
            PolymarketAuth::new(key, secret, passphrase)
        }
        _ => anyhow::bail!(
            "POLYMARKET_API_KEY / POLYMARKET_API_SECRET / POLYMARKET_PASSPHRASE must be set"
        ),
    };

    let data_client = DataClient::new(http.clone());
    let clob_client = ClobClient::new(http.clone(), auth);

    // Wallet: live execution and on-chain redemption both hang off the
    // private key. Without one the engine sizes and logs but submits nothing.
    let (wallet, redeemer) = match &config.private_key {
        Some(key) => {
            let wallet = Arc::new(PolymarketWallet::new(key).await?);
            let signer = PrivateKeySigner::from_str(key)?;
            let redeemer = CtfRedeemer::new(&config.polygon_rpc_url, signer)?;
            (Some(wallet), Some(redeemer))
        }
        None => {
            tracing::warn!("No PRIVATE_KEY — running dry: no orders, no redemptions");
            (None, None)
        }
    };

    let follower_address = match (&wallet, &config.follower_address) {
        (Some(w), _) => w.wallet_address(),
        (None, Some(addr)) => addr.clone(),
        (None, None) => anyhow::bail!("FOLLOWER_ADDRESS must be set when no PRIVATE_KEY is given"),
    };

    let live = config.copy_enabled && wallet.is_some();
    if !live {
        tracing::info!("Dry-run mode: trades will be sized and recorded, not submitted");
    }

    let order_signer = |w: &Option<Arc<PolymarketWallet>>| -> Option<OrderSigner> {
        if live {
            w.as_ref().map(|w| OrderSigner::new(w.clone()))
        } else {
            None
        }
    };

    let balances = BalanceChecker::new(http.clone(), follower_address.clone());

    let copy_executor = OrderExecutor::new(
        clob_client.clone(),
        order_signer(&wallet),
        config.retry_limit,
    );
    let mut copy_engine = CopyEngine::new(
        CopyEngineConfig {
            strategy: config.strategy.clone(),
            trade_multiplier: config.trade_multiplier,
            retry_limit: config.retry_limit,
        },
        pool.clone(),
        data_client.clone(),
        balances,
        copy_executor,
    );

    let resolution_executor = OrderExecutor::new(
        clob_client.clone(),
        order_signer(&wallet),
        config.retry_limit,
    );
    let resolution = ResolutionEngine::new(
        data_client.clone(),
        resolution_executor,
        redeemer,
        follower_address.clone(),
    );

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    tracing::info!(
        follower = %follower_address,
        strategy = %config.strategy.strategy,
        copy_enabled = config.copy_enabled,
        "Copy execution engine started"
    );

    if !config.copy_enabled {
        // Resolution-only mode: the poll loop is the single unit of work.
        resolution.run(token, config.resolution_interval_secs).await;
        return Ok(());
    }

    // One task interleaves copy cycles and resolution passes so no two units
    // of work ever run concurrently against the same wallet. Cancellation is
    // observed between units only.
    let mut trade_ticker = interval(Duration::from_secs(config.trade_poll_secs));
    let mut resolution_ticker = interval(Duration::from_secs(config.resolution_interval_secs));

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::info!("Engine stopping");
                break;
            }
            _ = trade_ticker.tick() => {
                if let Err(e) = copy_engine.run_copy_cycle().await {
                    tracing::error!(error = %e, "Copy cycle failed");
                }
            }
            _ = resolution_ticker.tick() => {
                match resolution.run_pass().await {
                    Ok(results) if !results.is_empty() => {
                        tracing::info!(resolved = results.len(), "Resolution pass complete");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Resolution pass failed"),
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
