use rust_decimal::Decimal;
use std::env;

use crate::execution::sizing::{CopyStrategyConfig, StrategyKind};

const DEFAULT_POLYGON_RPC_URL: &str = "https://polygon-rpc.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,

    // Polymarket CLOB API credentials (required for live execution)
    pub polymarket_api_key: Option<String>,
    pub polymarket_api_secret: Option<String>,
    pub polymarket_passphrase: Option<String>,

    // Wallet / chain
    pub private_key: Option<String>,
    pub polygon_rpc_url: String,
    /// Needed only when no private key is configured (dry-run scans).
    pub follower_address: Option<String>,

    // Engine cadence
    pub trade_poll_secs: u64,
    pub resolution_interval_secs: u64,
    pub retry_limit: u32,

    // Sizing
    pub strategy: CopyStrategyConfig,
    pub trade_multiplier: Decimal,
    pub copy_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let strategy = CopyStrategyConfig {
            strategy: StrategyKind::from_str(
                &env::var("COPY_STRATEGY").unwrap_or_else(|_| "percentage".into()),
            ),
            copy_size: decimal_var("COPY_SIZE", Decimal::from(10)),
            adaptive_min_percent: optional_decimal_var("ADAPTIVE_MIN_PERCENT"),
            adaptive_max_percent: optional_decimal_var("ADAPTIVE_MAX_PERCENT"),
            adaptive_threshold: optional_decimal_var("ADAPTIVE_THRESHOLD"),
            max_order_size_usd: decimal_var("MAX_ORDER_SIZE_USD", Decimal::from(100)),
            min_order_size_usd: decimal_var("MIN_ORDER_SIZE_USD", Decimal::ONE),
            max_position_size_usd: optional_decimal_var("MAX_POSITION_SIZE_USD"),
            max_daily_volume_usd: optional_decimal_var("MAX_DAILY_VOLUME_USD"),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,

            polymarket_api_key: env::var("POLYMARKET_API_KEY").ok(),
            polymarket_api_secret: env::var("POLYMARKET_API_SECRET").ok(),
            polymarket_passphrase: env::var("POLYMARKET_PASSPHRASE").ok(),

            private_key: env::var("PRIVATE_KEY").ok(),
            polygon_rpc_url: env::var("POLYGON_RPC_URL")
                .unwrap_or_else(|_| DEFAULT_POLYGON_RPC_URL.into()),
            follower_address: env::var("FOLLOWER_ADDRESS").ok(),

            trade_poll_secs: env::var("TRADE_POLL_SECS")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .unwrap_or(15),
            resolution_interval_secs: env::var("RESOLUTION_INTERVAL_SECS")
                .unwrap_or_else(|_| "300".into())
                .parse()
                .unwrap_or(300),
            retry_limit: env::var("RETRY_LIMIT")
                .unwrap_or_else(|_| "3".into())
                .parse()
                .unwrap_or(3),

            strategy,
            trade_multiplier: decimal_var("TRADE_MULTIPLIER", Decimal::ONE),
            copy_enabled: env::var("COPY_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        })
    }
}

fn decimal_var(name: &str, default: Decimal) -> Decimal {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn optional_decimal_var(name: &str) -> Option<Decimal> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
