pub mod calculation;
pub mod resolve;
pub mod trade;

pub use calculation::OrderSizeCalculation;
pub use resolve::{ResolveMethod, ResolveResult};
pub use trade::CopyTrade;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" | "0" => Some(Side::Buy),
            "SELL" | "1" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// TradeIntent
// ---------------------------------------------------------------------------

/// What copying an observed trade means for the follower's book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeIntent {
    /// Copy a buy: open or add to exposure.
    Open,
    /// Copy a partial sell: shrink the follower position by the same fraction.
    Reduce,
    /// Trader fully exited (or explicit liquidation): sell everything held.
    Close,
}

impl fmt::Display for TradeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeIntent::Open => write!(f, "OPEN"),
            TradeIntent::Reduce => write!(f, "REDUCE"),
            TradeIntent::Close => write!(f, "CLOSE"),
        }
    }
}
