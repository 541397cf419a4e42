//! Execution-layer behavior that needs no exchange: the retry state machine,
//! intent math, failure classification, and settlement classification.

use rust_decimal::Decimal;

use copybot::execution::copy_engine::{
    boost_if_dust, classify_intent, open_target, reduce_fraction,
};
use copybot::execution::order_executor::{ExecEvent, ExecPhase, ExecState};
use copybot::models::{Side, TradeIntent};
use copybot::polymarket::clob_client::{extract_error_message, is_terminal_fund_error};
use copybot::services::resolution::{classify, PositionStatus};

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

const MIN: Decimal = Decimal::ONE;
const RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[test]
fn a_trade_fills_across_multiple_chunks() {
    let mut state = ExecState::new(d("100"));

    for _ in 0..4 {
        assert!(state.running(MIN, RETRIES));
        state.step(
            ExecEvent::Fill {
                amount: d("25"),
                notional: d("12.50"),
            },
            MIN,
            RETRIES,
        );
    }

    assert_eq!(state.phase, ExecPhase::Filled);
    assert_eq!(state.filled, d("100"));
    assert_eq!(state.notional, d("50"));
}

#[test]
fn fills_interleaved_with_transients_keep_the_budget_fresh() {
    let mut state = ExecState::new(d("10"));

    // Two failures, then a fill, then two more failures: never exhausts
    // because the fill resets the counter.
    state.step(ExecEvent::Transient, MIN, RETRIES);
    state.step(ExecEvent::Transient, MIN, RETRIES);
    state.step(
        ExecEvent::Fill {
            amount: d("5"),
            notional: d("2.5"),
        },
        MIN,
        RETRIES,
    );
    state.step(ExecEvent::Transient, MIN, RETRIES);
    state.step(ExecEvent::Transient, MIN, RETRIES);

    assert!(state.running(MIN, RETRIES));
    assert_eq!(state.attempts, 2);
}

#[test]
fn fund_exhaustion_is_terminal_even_mid_fill() {
    let mut state = ExecState::new(d("100"));
    state.step(
        ExecEvent::Fill {
            amount: d("30"),
            notional: d("30"),
        },
        MIN,
        RETRIES,
    );
    state.step(ExecEvent::TerminalFunds, MIN, RETRIES);

    assert_eq!(state.phase, ExecPhase::AbortFunds);
    assert!(!state.running(MIN, RETRIES));
    // The partial fill is preserved for the report.
    assert_eq!(state.filled, d("30"));
}

#[test]
fn remaining_under_minimum_counts_as_filled() {
    let mut state = ExecState::new(d("1.50"));
    state.step(
        ExecEvent::Fill {
            amount: d("0.75"),
            notional: d("0.40"),
        },
        MIN,
        RETRIES,
    );
    // 0.75 remaining < $1 floor: nothing more is tradable.
    assert_eq!(state.phase, ExecPhase::Filled);
}

// ---------------------------------------------------------------------------
// Intent math
// ---------------------------------------------------------------------------

#[test]
fn intent_classification_matches_trader_action() {
    assert_eq!(classify_intent(Side::Buy, Some(d("500"))), TradeIntent::Open);
    assert_eq!(
        classify_intent(Side::Sell, Some(d("250"))),
        TradeIntent::Reduce
    );
    assert_eq!(
        classify_intent(Side::Sell, Some(Decimal::ZERO)),
        TradeIntent::Close
    );
}

#[test]
fn open_target_is_proportional_to_account_ratio() {
    // Follower is a tenth the size of the trader pre-trade.
    assert_eq!(open_target(d("100"), d("900"), d("100")), d("10"));
    // Follower as large as the trader copies one-for-one.
    assert_eq!(open_target(d("100"), d("900"), d("1000")), d("100"));
}

#[test]
fn reduce_fraction_and_multiplier_compose() {
    // Trader sold a quarter; follower holds 40 tokens at 0.50.
    let fraction = reduce_fraction(d("25"), d("75"));
    let tokens = d("40") * fraction; // 10 tokens
    let notional = tokens * d("0.50"); // $5, above the floor: untouched
    assert_eq!(boost_if_dust(notional, d("3")), d("5.00"));

    // A dust-sized reduce gets boosted to become executable.
    let dust = d("0.30");
    assert_eq!(boost_if_dust(dust, d("4")), d("1.20"));
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

#[test]
fn every_error_shape_yields_a_message() {
    let shapes = [
        serde_json::json!("not enough balance"),
        serde_json::json!({"error": {"message": "not enough balance"}}),
        serde_json::json!({"errorMsg": "not enough balance / allowance"}),
    ];
    for payload in &shapes {
        let message = extract_error_message(payload).expect("message extracted");
        assert!(is_terminal_fund_error(&message));
    }
}

#[test]
fn transient_errors_are_not_terminal() {
    let payload = serde_json::json!({"error": {"message": "order crossed, retry"}});
    let message = extract_error_message(&payload).unwrap();
    assert!(!is_terminal_fund_error(&message));
}

// ---------------------------------------------------------------------------
// Settlement classification
// ---------------------------------------------------------------------------

#[test]
fn resolution_thresholds_are_symmetric() {
    assert_eq!(classify(d("0.995")), PositionStatus::ResolvedWin);
    assert_eq!(classify(d("0.005")), PositionStatus::ResolvedLoss);
    assert_eq!(classify(d("0.5")), PositionStatus::Active);
    // Just inside the noise band stays active.
    assert_eq!(classify(d("0.989")), PositionStatus::Active);
    assert_eq!(classify(d("0.011")), PositionStatus::Active);
}
