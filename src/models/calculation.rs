use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::execution::sizing::StrategyKind;

/// Output of one position-size calculation. Created fresh per observed trade
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSizeCalculation {
    /// Notional size of the observed trade, in USDC.
    pub trader_order_size: Decimal,
    /// Strategy-derived amount before any limit was applied.
    pub base_amount: Decimal,
    /// Amount after the limit chain. Either zero or within
    /// [min_order_size_usd, max_order_size_usd].
    pub final_amount: Decimal,
    pub strategy: StrategyKind,
    /// The max_order_size_usd cap shrank the amount.
    pub capped_by_max: bool,
    /// The 0.99 available-balance buffer shrank the amount.
    pub reduced_by_balance: bool,
    /// The result fell under min_order_size_usd and was forced to zero.
    pub below_minimum: bool,
    /// Human-readable trail of every sizing step, for logs and the dashboard.
    pub reasoning: Vec<String>,
}

impl OrderSizeCalculation {
    pub fn new(strategy: StrategyKind, trader_order_size: Decimal) -> Self {
        Self {
            trader_order_size,
            base_amount: Decimal::ZERO,
            final_amount: Decimal::ZERO,
            strategy,
            capped_by_max: false,
            reduced_by_balance: false,
            below_minimum: false,
            reasoning: Vec::new(),
        }
    }
}
