use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position (Data API)
// ---------------------------------------------------------------------------

/// An exchange-reported holding for the follower wallet. Always re-fetched,
/// never cached across polls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPosition {
    /// Outcome token ID.
    pub asset: String,
    pub condition_id: String,
    /// Holding size in tokens.
    pub size: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    #[serde(default)]
    pub cur_price: Decimal,
    #[serde(default)]
    pub current_value: Decimal,
    #[serde(default)]
    pub redeemable: bool,
}

// ---------------------------------------------------------------------------
// Order book (CLOB API)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiOrderBookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl ApiOrderBookLevel {
    /// Notional capacity of this level in USDC.
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiOrderBook {
    pub market: Option<String>,
    pub asset_id: Option<String>,
    #[serde(default)]
    pub bids: Vec<ApiOrderBookLevel>,
    #[serde(default)]
    pub asks: Vec<ApiOrderBookLevel>,
    pub hash: Option<String>,
    pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Order submission (CLOB API)
// ---------------------------------------------------------------------------

/// Parsed result of posting an order. The error payload is kept as raw JSON
/// because the CLOB returns several shapes; see
/// [`clob_client::extract_error_message`](super::clob_client::extract_error_message).
#[derive(Debug, Clone)]
pub struct OrderSubmitOutcome {
    pub success: bool,
    pub order_id: Option<String>,
    pub error: Option<serde_json::Value>,
}
