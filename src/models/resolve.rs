use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a resolved position was converted to cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveMethod {
    /// Liquidated against the live order book.
    Sold,
    /// Redeemed on-chain via the ConditionalTokens contract.
    Redeemed,
    /// Neither path succeeded this pass.
    Failed,
}

impl fmt::Display for ResolveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveMethod::Sold => write!(f, "SOLD"),
            ResolveMethod::Redeemed => write!(f, "REDEEMED"),
            ResolveMethod::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of resolving one position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResult {
    pub asset_id: String,
    pub condition_id: String,
    pub method: ResolveMethod,
    pub tokens_disposed: Decimal,
    pub proceeds_usd: Decimal,
}
