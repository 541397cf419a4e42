//! End-to-end scenarios for the copy-size calculator: strategy bases,
//! the limit chain, and the validation surface.

use rust_decimal::Decimal;

use copybot::execution::sizing::{self, CopyStrategyConfig, StrategyKind};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn base_config() -> CopyStrategyConfig {
    CopyStrategyConfig {
        strategy: StrategyKind::Percentage,
        copy_size: d("10"),
        adaptive_min_percent: None,
        adaptive_max_percent: None,
        adaptive_threshold: None,
        max_order_size_usd: d("100"),
        min_order_size_usd: d("1"),
        max_position_size_usd: None,
        max_daily_volume_usd: None,
    }
}

#[test]
fn ten_percent_of_a_hundred_is_ten() {
    let calc = sizing::calculate(&base_config(), d("100"), d("1000"), Decimal::ZERO);
    assert_eq!(calc.final_amount, d("10"));
    assert!(!calc.below_minimum);
    assert!(!calc.capped_by_max);
    assert!(!calc.reduced_by_balance);
}

#[test]
fn order_cap_binds_before_balance() {
    let calc = sizing::calculate(&base_config(), d("2000"), d("10000"), Decimal::ZERO);
    assert_eq!(calc.final_amount, d("100"));
    assert!(calc.capped_by_max);
}

#[test]
fn dust_orders_never_execute() {
    let calc = sizing::calculate(&base_config(), d("5"), d("1000"), Decimal::ZERO);
    assert_eq!(calc.final_amount, Decimal::ZERO);
    assert!(calc.below_minimum);
}

#[test]
fn balance_buffer_leaves_one_percent() {
    let calc = sizing::calculate(&base_config(), d("100"), d("5"), Decimal::ZERO);
    assert!(calc.reduced_by_balance);
    assert!(calc.final_amount <= d("4.95"));
}

#[test]
fn position_limit_allows_exact_fit() {
    let mut config = base_config();
    config.max_position_size_usd = Some(d("50"));

    let calc = sizing::calculate(&config, d("100"), d("1000"), d("40"));
    assert_eq!(calc.final_amount, d("10"));

    let calc = sizing::calculate(&config, d("100"), d("1000"), d("45"));
    assert!(calc.final_amount <= d("5"));
}

#[test]
fn final_amount_is_zero_or_within_bounds() {
    // Property sweep: the result is either exactly zero or inside
    // [min, max] and under 99% of the balance.
    let config = base_config();
    for trade in [0u32, 1, 5, 50, 100, 500, 2_000, 100_000] {
        for balance in [0u32, 1, 10, 100, 10_000] {
            for position in [0u32, 25, 500] {
                let calc = sizing::calculate(
                    &config,
                    Decimal::from(trade),
                    Decimal::from(balance),
                    Decimal::from(position),
                );
                let amount = calc.final_amount;
                if amount != Decimal::ZERO {
                    assert!(amount >= config.min_order_size_usd, "amount {amount} under min");
                    assert!(amount <= config.max_order_size_usd, "amount {amount} over max");
                    assert!(
                        amount <= Decimal::from(balance) * d("0.99"),
                        "amount {amount} over balance buffer at balance {balance}"
                    );
                }
            }
        }
    }
}

#[test]
fn adaptive_band_and_threshold_pivot() {
    let config = CopyStrategyConfig {
        strategy: StrategyKind::Adaptive,
        copy_size: d("10"),
        adaptive_min_percent: Some(d("4")),
        adaptive_max_percent: Some(d("25")),
        adaptive_threshold: Some(d("500")),
        max_order_size_usd: d("10000"),
        min_order_size_usd: d("0.01"),
        max_position_size_usd: None,
        max_daily_volume_usd: None,
    };

    // At exactly the threshold the effective percent equals copy_size.
    let calc = sizing::calculate(&config, d("500"), d("1000000"), Decimal::ZERO);
    assert_eq!(calc.final_amount, d("50")); // 10% of 500

    // Small orders copy a larger slice, large orders a smaller one.
    let small = sizing::calculate(&config, d("100"), d("1000000"), Decimal::ZERO);
    let pct_small = small.final_amount / d("100") * d("100");
    assert!(pct_small > d("10") && pct_small <= d("25"));

    let large = sizing::calculate(&config, d("5000"), d("1000000"), Decimal::ZERO);
    let pct_large = large.final_amount / d("5000") * d("100");
    assert!(pct_large >= d("4") && pct_large < d("10"));
}

#[test]
fn validate_reports_every_violation() {
    let config = CopyStrategyConfig {
        strategy: StrategyKind::Percentage,
        copy_size: d("0"),
        min_order_size_usd: d("50"),
        max_order_size_usd: d("10"),
        ..base_config()
    };
    let errors = sizing::validate(&config);
    assert!(errors.len() >= 2);
    assert!(errors.iter().any(|e| e.contains("copy_size")));
    assert!(errors.iter().any(|e| e.contains("min_order_size_usd")));
}

#[test]
fn validate_passes_clean_configs() {
    assert!(sizing::validate(&base_config()).is_empty());
}
