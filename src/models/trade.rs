use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for the copy_trades table: an observed trade on a followed
/// wallet, queued for the execution engine.
///
/// The table is owned by the observer process; this engine only reads pending
/// rows and writes back `processed` / `attempts`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CopyTrade {
    pub id: Uuid,
    /// Followed wallet address.
    pub trader: String,
    /// Market condition ID (CTF contract identifier).
    pub condition_id: String,
    /// Outcome token (asset) ID.
    pub asset_id: String,
    /// "BUY" or "SELL" as reported by the data source.
    pub side: String,
    /// Notional size of the observed trade in USDC.
    pub size_usd: Decimal,
    /// Price the trader got.
    pub price: Decimal,
    /// Trader's position in this token after the trade, in tokens.
    /// Zero means a full exit; absent when the observer could not tell.
    pub trader_remaining_size: Option<Decimal>,
    /// Trader's USDC balance at observation time, for proportional sizing.
    pub trader_balance: Option<Decimal>,
    /// Terminal flag: once true the trade is never executed again.
    pub processed: bool,
    /// Submission attempts consumed so far.
    pub attempts: i32,
    pub observed_at: DateTime<Utc>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CopyTrade {
    /// Observed trade size in tokens, derived from notional and price.
    pub fn size_tokens(&self) -> Decimal {
        if self.price.is_zero() {
            Decimal::ZERO
        } else {
            self.size_usd / self.price
        }
    }
}
