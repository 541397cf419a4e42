use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::OrderSizeCalculation;

/// Default adaptive threshold in USDC when the config leaves it unset.
const DEFAULT_ADAPTIVE_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Fraction of the available balance an order may consume. The 1% headroom
/// absorbs rounding and fees.
const BALANCE_BUFFER: Decimal = Decimal::from_parts(99, 0, 0, false, 2); // 0.99

// ---------------------------------------------------------------------------
// Strategy config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Copy a fixed percentage of the observed trade.
    Percentage,
    /// Always trade `copy_size` USDC regardless of the observed size.
    Fixed,
    /// Percentage that rises for small trades and decays for large ones,
    /// pivoting around a threshold.
    Adaptive,
}

impl StrategyKind {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "percentage" | "percent" => StrategyKind::Percentage,
            "adaptive" => StrategyKind::Adaptive,
            _ => StrategyKind::Fixed,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Percentage => write!(f, "percentage"),
            StrategyKind::Fixed => write!(f, "fixed"),
            StrategyKind::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Copy-sizing strategy configuration. Validated at startup, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyStrategyConfig {
    pub strategy: StrategyKind,
    /// Percentage for PERCENTAGE/ADAPTIVE, flat USDC amount for FIXED.
    pub copy_size: Decimal,
    pub adaptive_min_percent: Option<Decimal>,
    pub adaptive_max_percent: Option<Decimal>,
    pub adaptive_threshold: Option<Decimal>,
    pub max_order_size_usd: Decimal,
    pub min_order_size_usd: Decimal,
    pub max_position_size_usd: Option<Decimal>,
    pub max_daily_volume_usd: Option<Decimal>,
}

impl Default for CopyStrategyConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Percentage,
            copy_size: Decimal::from(10),
            adaptive_min_percent: None,
            adaptive_max_percent: None,
            adaptive_threshold: None,
            max_order_size_usd: Decimal::from(100),
            min_order_size_usd: Decimal::ONE,
            max_position_size_usd: None,
            max_daily_volume_usd: None,
        }
    }
}

/// Check a strategy config, returning every violation rather than the first.
/// A non-empty result is fatal at startup.
pub fn validate(config: &CopyStrategyConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.copy_size <= Decimal::ZERO {
        errors.push(format!("copy_size must be > 0 (got {})", config.copy_size));
    }

    if config.strategy == StrategyKind::Percentage && config.copy_size > Decimal::ONE_HUNDRED {
        errors.push(format!(
            "percentage strategy requires copy_size <= 100 (got {})",
            config.copy_size
        ));
    }

    if config.max_order_size_usd <= Decimal::ZERO {
        errors.push(format!(
            "max_order_size_usd must be > 0 (got {})",
            config.max_order_size_usd
        ));
    }

    if config.min_order_size_usd <= Decimal::ZERO {
        errors.push(format!(
            "min_order_size_usd must be > 0 (got {})",
            config.min_order_size_usd
        ));
    }

    if config.min_order_size_usd > config.max_order_size_usd {
        errors.push(format!(
            "min_order_size_usd {} exceeds max_order_size_usd {}",
            config.min_order_size_usd, config.max_order_size_usd
        ));
    }

    if config.strategy == StrategyKind::Adaptive {
        match (config.adaptive_min_percent, config.adaptive_max_percent) {
            (Some(min), Some(max)) => {
                if min > max {
                    errors.push(format!(
                        "adaptive_min_percent {min} exceeds adaptive_max_percent {max}"
                    ));
                }
            }
            _ => errors.push(
                "adaptive strategy requires both adaptive_min_percent and adaptive_max_percent"
                    .into(),
            ),
        }
    }

    errors
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Turn an observed trade into a bounded order size.
///
/// Pure and deterministic: identical inputs always produce an identical
/// calculation. The result's `final_amount` is either exactly zero or within
/// `[min_order_size_usd, max_order_size_usd]`, and never exceeds 99% of the
/// available balance.
pub fn calculate(
    config: &CopyStrategyConfig,
    trader_order_size: Decimal,
    available_balance: Decimal,
    current_position: Decimal,
) -> OrderSizeCalculation {
    let mut calc = OrderSizeCalculation::new(config.strategy, trader_order_size);

    let base = match config.strategy {
        StrategyKind::Percentage => {
            let amount = trader_order_size * config.copy_size / Decimal::ONE_HUNDRED;
            calc.reasoning.push(format!(
                "percentage: {}% of {trader_order_size} = {amount}",
                config.copy_size
            ));
            amount
        }
        StrategyKind::Fixed => {
            calc.reasoning
                .push(format!("fixed: {} regardless of trade size", config.copy_size));
            config.copy_size
        }
        StrategyKind::Adaptive => {
            let percent = adaptive_percent(config, trader_order_size);
            let amount = trader_order_size * percent / Decimal::ONE_HUNDRED;
            calc.reasoning.push(format!(
                "adaptive: effective {percent}% of {trader_order_size} = {amount}"
            ));
            amount
        }
    };

    calc.base_amount = base;
    apply_limits(config, base, available_balance, current_position, &mut calc);
    calc
}

/// Effective percentage for the ADAPTIVE strategy: threshold-relative linear
/// interpolation. Yields `copy_size` exactly at the threshold, rises toward
/// `adaptive_max_percent` for small orders and decays toward
/// `adaptive_min_percent` for large ones.
fn adaptive_percent(config: &CopyStrategyConfig, trader_order_size: Decimal) -> Decimal {
    let min_p = config.adaptive_min_percent.unwrap_or(config.copy_size);
    let max_p = config.adaptive_max_percent.unwrap_or(config.copy_size);
    let threshold = config
        .adaptive_threshold
        .unwrap_or(DEFAULT_ADAPTIVE_THRESHOLD);

    if threshold <= Decimal::ZERO {
        return config.copy_size;
    }

    if trader_order_size >= threshold {
        let factor = clamp01(trader_order_size / threshold - Decimal::ONE);
        lerp(config.copy_size, min_p, factor)
    } else {
        let factor = trader_order_size / threshold;
        lerp(max_p, config.copy_size, factor)
    }
}

/// Run an externally computed base amount through the fixed-order limit
/// chain. Each step may only shrink the amount.
pub fn apply_limits(
    config: &CopyStrategyConfig,
    base: Decimal,
    available_balance: Decimal,
    current_position: Decimal,
    calc: &mut OrderSizeCalculation,
) {
    let mut amount = base;

    // 1. Hard cap per order.
    if amount > config.max_order_size_usd {
        calc.capped_by_max = true;
        calc.reasoning.push(format!(
            "capped by max_order_size_usd: {amount} -> {}",
            config.max_order_size_usd
        ));
        amount = config.max_order_size_usd;
    }

    // 2. Position headroom.
    if let Some(max_position) = config.max_position_size_usd {
        if current_position + amount > max_position {
            let allowed = (max_position - current_position).max(Decimal::ZERO);
            if allowed < config.min_order_size_usd {
                calc.reasoning.push(format!(
                    "position headroom {allowed} below minimum, nothing to add"
                ));
                amount = Decimal::ZERO;
            } else {
                calc.reasoning.push(format!(
                    "position limit {max_position}: {amount} -> {allowed}"
                ));
                amount = allowed;
            }
        }
    }

    // 3. Balance buffer.
    let spendable = available_balance * BALANCE_BUFFER;
    if amount > spendable {
        calc.reduced_by_balance = true;
        calc.reasoning
            .push(format!("reduced to 99% of balance: {amount} -> {spendable}"));
        amount = spendable;
    }

    // 4. Dust floor. Never execute below the minimum.
    if amount < config.min_order_size_usd {
        calc.below_minimum = true;
        calc.reasoning.push(format!(
            "{amount} below min_order_size_usd {}, forced to 0",
            config.min_order_size_usd
        ));
        amount = Decimal::ZERO;
    }

    calc.final_amount = amount;
}

fn clamp01(t: Decimal) -> Decimal {
    t.max(Decimal::ZERO).min(Decimal::ONE)
}

fn lerp(a: Decimal, b: Decimal, t: Decimal) -> Decimal {
    a + (b - a) * clamp01(t)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn percentage_config() -> CopyStrategyConfig {
        CopyStrategyConfig {
            strategy: StrategyKind::Percentage,
            copy_size: Decimal::from(10),
            max_order_size_usd: Decimal::from(100),
            min_order_size_usd: Decimal::ONE,
            ..Default::default()
        }
    }

    fn adaptive_config() -> CopyStrategyConfig {
        CopyStrategyConfig {
            strategy: StrategyKind::Adaptive,
            copy_size: Decimal::from(10),
            adaptive_min_percent: Some(Decimal::from(5)),
            adaptive_max_percent: Some(Decimal::from(20)),
            adaptive_threshold: Some(Decimal::from(500)),
            ..Default::default()
        }
    }

    #[test]
    fn percentage_base_case() {
        let calc = calculate(
            &percentage_config(),
            Decimal::from(100),
            Decimal::from(1_000),
            Decimal::ZERO,
        );
        assert_eq!(calc.final_amount, Decimal::from(10));
        assert!(!calc.below_minimum);
        assert!(!calc.capped_by_max);
    }

    #[test]
    fn large_trade_hits_max_cap() {
        let calc = calculate(
            &percentage_config(),
            Decimal::from(2_000),
            Decimal::from(10_000),
            Decimal::ZERO,
        );
        assert_eq!(calc.final_amount, Decimal::from(100));
        assert!(calc.capped_by_max);
    }

    #[test]
    fn dust_trade_forced_to_zero() {
        let calc = calculate(
            &percentage_config(),
            Decimal::from(5),
            Decimal::from(1_000),
            Decimal::ZERO,
        );
        assert_eq!(calc.final_amount, Decimal::ZERO);
        assert!(calc.below_minimum);
    }

    #[test]
    fn low_balance_reduces_amount() {
        let calc = calculate(
            &percentage_config(),
            Decimal::from(100),
            Decimal::from(5),
            Decimal::ZERO,
        );
        assert!(calc.reduced_by_balance);
        assert!(calc.final_amount <= Decimal::new(495, 2)); // 4.95
        assert!(calc.final_amount > Decimal::ZERO);
    }

    #[test]
    fn position_limit_shrinks_then_blocks() {
        let mut config = percentage_config();
        config.max_position_size_usd = Some(Decimal::from(50));

        // 40 held + 10 new = 50, exactly within the limit.
        let calc = calculate(
            &config,
            Decimal::from(100),
            Decimal::from(1_000),
            Decimal::from(40),
        );
        assert_eq!(calc.final_amount, Decimal::from(10));

        // Only 5 of headroom remains.
        let calc = calculate(
            &config,
            Decimal::from(100),
            Decimal::from(1_000),
            Decimal::from(45),
        );
        assert!(calc.final_amount <= Decimal::from(5));
        assert!(calc.final_amount > Decimal::ZERO);
    }

    #[test]
    fn position_headroom_under_minimum_yields_zero() {
        let mut config = percentage_config();
        config.max_position_size_usd = Some(Decimal::from(50));

        let calc = calculate(
            &config,
            Decimal::from(100),
            Decimal::from(1_000),
            Decimal::new(4_950, 2), // 49.50 held, 0.50 headroom < $1 min
        );
        assert_eq!(calc.final_amount, Decimal::ZERO);
        assert!(calc.below_minimum);
    }

    #[test]
    fn fixed_ignores_trade_size() {
        let config = CopyStrategyConfig {
            strategy: StrategyKind::Fixed,
            copy_size: Decimal::from(25),
            ..Default::default()
        };
        let a = calculate(&config, Decimal::from(10), Decimal::from(1_000), Decimal::ZERO);
        let b = calculate(&config, Decimal::from(9_999), Decimal::from(1_000), Decimal::ZERO);
        assert_eq!(a.final_amount, Decimal::from(25));
        assert_eq!(b.final_amount, Decimal::from(25));
    }

    #[test]
    fn adaptive_equals_copy_size_at_threshold() {
        let config = adaptive_config();
        assert_eq!(adaptive_percent(&config, Decimal::from(500)), Decimal::from(10));
    }

    #[test]
    fn adaptive_rises_for_small_orders() {
        let config = adaptive_config();
        // At zero size the percent is the max.
        assert_eq!(adaptive_percent(&config, Decimal::ZERO), Decimal::from(20));
        // Halfway to the threshold sits between max and copy_size.
        let p = adaptive_percent(&config, Decimal::from(250));
        assert!(p > Decimal::from(10) && p < Decimal::from(20));
    }

    #[test]
    fn adaptive_decays_for_large_orders() {
        let config = adaptive_config();
        // Twice the threshold fully interpolates to the min.
        assert_eq!(adaptive_percent(&config, Decimal::from(1_000)), Decimal::from(5));
        // Beyond that the factor is clamped; the percent stays at the min.
        assert_eq!(adaptive_percent(&config, Decimal::from(50_000)), Decimal::from(5));
    }

    #[test]
    fn adaptive_percent_stays_in_band() {
        let config = adaptive_config();
        for size in [0u32, 100, 250, 499, 500, 501, 750, 1_000, 10_000] {
            let p = adaptive_percent(&config, Decimal::from(size));
            assert!(
                p >= Decimal::from(5) && p <= Decimal::from(20),
                "percent {p} out of band at size {size}"
            );
        }
    }

    #[test]
    fn percentage_is_monotone_until_cap() {
        let config = percentage_config();
        let mut prev = Decimal::ZERO;
        for size in (0u32..=2_000).step_by(50) {
            let calc = calculate(
                &config,
                Decimal::from(size),
                Decimal::from(100_000),
                Decimal::ZERO,
            );
            assert!(calc.final_amount >= prev || calc.final_amount == Decimal::from(100));
            prev = calc.final_amount;
        }
    }

    #[test]
    fn calculate_is_pure() {
        let config = adaptive_config();
        let a = calculate(&config, Decimal::from(321), Decimal::from(777), Decimal::from(12));
        let b = calculate(&config, Decimal::from(321), Decimal::from(777), Decimal::from(12));
        assert_eq!(a.final_amount, b.final_amount);
        assert_eq!(a.reasoning, b.reasoning);
    }

    #[test]
    fn validate_collects_all_violations() {
        let config = CopyStrategyConfig {
            strategy: StrategyKind::Percentage,
            copy_size: Decimal::from(150),
            max_order_size_usd: Decimal::from(10),
            min_order_size_usd: Decimal::from(20),
            ..Default::default()
        };
        let errors = validate(&config);
        // copy_size > 100 and min > max
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn validate_rejects_nonpositive_copy_size() {
        let config = CopyStrategyConfig {
            copy_size: Decimal::ZERO,
            ..Default::default()
        };
        assert!(!validate(&config).is_empty());
    }

    #[test]
    fn validate_requires_adaptive_percents() {
        let config = CopyStrategyConfig {
            strategy: StrategyKind::Adaptive,
            ..Default::default()
        };
        assert!(!validate(&config).is_empty());

        let config = CopyStrategyConfig {
            strategy: StrategyKind::Adaptive,
            adaptive_min_percent: Some(Decimal::from(30)),
            adaptive_max_percent: Some(Decimal::from(5)),
            ..Default::default()
        };
        assert!(validate(&config)
            .iter()
            .any(|e| e.contains("adaptive_min_percent")));
    }

    #[test]
    fn validate_accepts_sane_config() {
        assert!(validate(&percentage_config()).is_empty());
        assert!(validate(&adaptive_config()).is_empty());
    }
}
