use metrics::counter;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::models::Side;
use crate::polymarket::clob_client::{
    extract_error_message, is_terminal_fund_error, ORDER_TYPE_FAK,
};
use crate::polymarket::types::ApiOrderBookLevel;
use crate::polymarket::{ClobClient, OrderSigner};

/// Buy orders abort when the best ask has moved more than this above the
/// price the copied trader got.
const SLIPPAGE_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Whether the target and remaining amounts are denominated in USDC or in
/// outcome tokens. Resolution sells are token-denominated with a 1-token
/// floor; copy trades are USD-denominated with the exchange's $1 floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Usd,
    Tokens,
}

impl SizeUnit {
    pub fn min_tradable(self) -> Decimal {
        Decimal::ONE
    }
}

// ---------------------------------------------------------------------------
// Execution state machine
// ---------------------------------------------------------------------------

/// Phase of one execution run. Terminal phases map one-to-one onto the
/// persisted exit states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPhase {
    /// Ready for the next attempt.
    Attempting,
    /// Remaining fell under the minimum tradable size.
    Filled,
    /// Last submission failed transiently; the book is re-fetched next loop.
    Retry,
    /// Required book side was empty.
    AbortLiquidity,
    /// Ask moved too far from the copied price.
    AbortSlippage,
    /// Submission rejected for balance/allowance; retrying cannot help.
    AbortFunds,
    /// The order could not be built or signed. A bad key or token id is a
    /// per-trade fact; retrying reproduces it.
    AbortSigning,
}

/// One observed outcome of an execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    EmptyBook,
    SlippageExceeded,
    /// A chunk filled: amount in the run's unit, proceeds/cost in USDC.
    Fill {
        amount: Decimal,
        notional: Decimal,
    },
    TerminalFunds,
    SigningFailed,
    Transient,
}

/// Mutable state threaded through the loop. Transitions are pure; the async
/// loop only produces events.
#[derive(Debug, Clone)]
pub struct ExecState {
    pub remaining: Decimal,
    pub filled: Decimal,
    /// USDC received (sells) or spent (buys).
    pub notional: Decimal,
    pub attempts: u32,
    pub phase: ExecPhase,
}

impl ExecState {
    pub fn new(target: Decimal) -> Self {
        Self {
            remaining: target,
            filled: Decimal::ZERO,
            notional: Decimal::ZERO,
            attempts: 0,
            phase: ExecPhase::Attempting,
        }
    }

    /// Apply one event. A successful fill resets the attempt counter so only
    /// consecutive failures count against the retry budget.
    pub fn step(&mut self, event: ExecEvent, min_tradable: Decimal, retry_limit: u32) {
        match event {
            ExecEvent::EmptyBook => self.phase = ExecPhase::AbortLiquidity,
            ExecEvent::SlippageExceeded => self.phase = ExecPhase::AbortSlippage,
            ExecEvent::TerminalFunds => self.phase = ExecPhase::AbortFunds,
            ExecEvent::SigningFailed => self.phase = ExecPhase::AbortSigning,
            ExecEvent::Fill { amount, notional } => {
                self.attempts = 0;
                self.filled += amount;
                self.notional += notional;
                self.remaining -= amount;
                self.phase = if self.remaining < min_tradable {
                    ExecPhase::Filled
                } else {
                    ExecPhase::Attempting
                };
            }
            ExecEvent::Transient => {
                self.attempts += 1;
                self.phase = if self.attempts >= retry_limit {
                    ExecPhase::Retry
                } else {
                    ExecPhase::Attempting
                };
            }
        }
    }

    /// The loop keeps running only while attempting with budget left.
    pub fn running(&self, min_tradable: Decimal, retry_limit: u32) -> bool {
        self.phase == ExecPhase::Attempting
            && self.remaining >= min_tradable
            && self.attempts < retry_limit
    }
}

/// Summary of a finished run, for the caller to persist.
#[derive(Debug, Clone)]
pub struct ExecReport {
    pub phase: ExecPhase,
    pub filled: Decimal,
    pub notional: Decimal,
    pub attempts: u32,
}

impl ExecReport {
    pub fn any_filled(&self) -> bool {
        self.filled > Decimal::ZERO
    }

    /// Whether the persisted record should carry attempts = retry_limit so
    /// the trade is never picked up again automatically.
    pub fn exhausted(&self) -> bool {
        matches!(
            self.phase,
            ExecPhase::AbortFunds | ExecPhase::Retry | ExecPhase::AbortSigning
        )
    }
}

// ---------------------------------------------------------------------------
// Pure book helpers
// ---------------------------------------------------------------------------

/// Best bid: highest price a buyer is standing at. Linear scan.
pub fn best_bid(levels: &[ApiOrderBookLevel]) -> Option<&ApiOrderBookLevel> {
    levels.iter().max_by(|a, b| a.price.cmp(&b.price))
}

/// Best ask: lowest price a seller is standing at. Linear scan.
pub fn best_ask(levels: &[ApiOrderBookLevel]) -> Option<&ApiOrderBookLevel> {
    levels.iter().min_by(|a, b| a.price.cmp(&b.price))
}

/// Buy-side slippage guard: the opportunity has moved too far once the best
/// ask sits more than the tolerance above the copied price.
pub fn buy_slippage_exceeded(best_ask_price: Decimal, observed_price: Decimal) -> bool {
    best_ask_price - SLIPPAGE_TOLERANCE > observed_price
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Fills a target size against the live order book with immediate-or-cancel
/// orders, re-fetching the book fresh on every attempt.
pub struct OrderExecutor {
    clob: ClobClient,
    /// None means dry-run: size and log, submit nothing.
    signer: Option<OrderSigner>,
    retry_limit: u32,
}

impl OrderExecutor {
    pub fn new(clob: ClobClient, signer: Option<OrderSigner>, retry_limit: u32) -> Self {
        Self {
            clob,
            signer,
            retry_limit,
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Run the execution loop for one trade.
    ///
    /// `observed_price` enables the buy-side slippage guard; sells pass None
    /// and take whatever the bids offer.
    pub async fn execute(
        &self,
        asset_id: &str,
        side: Side,
        target: Decimal,
        observed_price: Option<Decimal>,
        unit: SizeUnit,
    ) -> ExecReport {
        let min_tradable = unit.min_tradable();
        let mut state = ExecState::new(target);

        while state.running(min_tradable, self.retry_limit) {
            let event = self
                .attempt(asset_id, side, &state, observed_price, unit)
                .await;
            state.step(event, min_tradable, self.retry_limit);
        }

        // Ran out of budget without a terminal event.
        if state.phase == ExecPhase::Attempting && state.attempts >= self.retry_limit {
            state.phase = ExecPhase::Retry;
        }

        match state.phase {
            ExecPhase::Filled => counter!("orders_filled").increment(1),
            ExecPhase::AbortFunds | ExecPhase::Retry | ExecPhase::AbortSigning => {
                counter!("orders_failed").increment(1)
            }
            _ => {}
        }

        ExecReport {
            phase: state.phase,
            filled: state.filled,
            notional: state.notional,
            attempts: state.attempts,
        }
    }

    /// One pass: fetch the book, pick the best level, submit a chunk.
    async fn attempt(
        &self,
        asset_id: &str,
        side: Side,
        state: &ExecState,
        observed_price: Option<Decimal>,
        unit: SizeUnit,
    ) -> ExecEvent {
        let book = match self.clob.get_order_book(asset_id).await {
            Ok(b) => b,
            Err(e) => {
                warn!(asset_id, error = %e, "Order book fetch failed");
                return ExecEvent::Transient;
            }
        };

        let level = match side {
            Side::Buy => best_ask(&book.asks),
            Side::Sell => best_bid(&book.bids),
        };
        let Some(level) = level else {
            info!(asset_id, %side, "No liquidity on required book side");
            return ExecEvent::EmptyBook;
        };
        let (price, level_size, level_notional) = (level.price, level.size, level.notional());

        if side == Side::Buy {
            if let Some(observed) = observed_price {
                if buy_slippage_exceeded(price, observed) {
                    warn!(
                        asset_id,
                        best_ask = %price,
                        observed = %observed,
                        "Price moved beyond slippage tolerance"
                    );
                    return ExecEvent::SlippageExceeded;
                }
            }
        }

        if price <= Decimal::ZERO {
            return ExecEvent::Transient;
        }

        // Chunk: as much of the remaining target as the best level holds.
        let (chunk, tokens, notional) = match unit {
            SizeUnit::Usd => {
                let chunk = state.remaining.min(level_notional);
                (chunk, chunk / price, chunk)
            }
            SizeUnit::Tokens => {
                let chunk = state.remaining.min(level_size);
                (chunk, chunk, chunk * price)
            }
        };

        let Some(signer) = &self.signer else {
            info!(
                asset_id,
                %side,
                tokens = %tokens,
                price = %price,
                "[DRY-RUN] Would submit immediate-or-cancel order"
            );
            return ExecEvent::Fill {
                amount: chunk,
                notional,
            };
        };

        let signed = match signer
            .build_signed_order(asset_id, side, tokens, price)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!(asset_id, error = %e, "Order signing failed; not retryable");
                return ExecEvent::SigningFailed;
            }
        };

        match self.clob.post_order(&signed, ORDER_TYPE_FAK).await {
            Ok(outcome) if outcome.success => {
                info!(
                    asset_id,
                    %side,
                    tokens = %tokens,
                    price = %price,
                    order_id = ?outcome.order_id,
                    "Chunk filled"
                );
                ExecEvent::Fill {
                    amount: chunk,
                    notional,
                }
            }
            Ok(outcome) => {
                let message = outcome
                    .error
                    .as_ref()
                    .and_then(extract_error_message)
                    .unwrap_or_else(|| "unknown submission error".into());

                if is_terminal_fund_error(&message) {
                    warn!(asset_id, %message, "Fund exhaustion — aborting trade");
                    ExecEvent::TerminalFunds
                } else {
                    warn!(asset_id, %message, "Submission failed, will retry");
                    ExecEvent::Transient
                }
            }
            Err(e) => {
                warn!(asset_id, error = %e, "Order submission errored");
                ExecEvent::Transient
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: &str, size: &str) -> ApiOrderBookLevel {
        ApiOrderBookLevel {
            price: price.parse().unwrap(),
            size: size.parse().unwrap(),
        }
    }

    #[test]
    fn best_levels_are_found_by_linear_scan() {
        let bids = vec![level("0.40", "10"), level("0.45", "5"), level("0.30", "50")];
        let asks = vec![level("0.55", "10"), level("0.50", "5"), level("0.60", "50")];

        assert_eq!(best_bid(&bids).unwrap().price, "0.45".parse().unwrap());
        assert_eq!(best_ask(&asks).unwrap().price, "0.50".parse().unwrap());
        assert!(best_bid(&[]).is_none());
    }

    #[test]
    fn slippage_guard_uses_five_cent_tolerance() {
        let observed: Decimal = "0.50".parse().unwrap();
        assert!(!buy_slippage_exceeded("0.55".parse().unwrap(), observed));
        assert!(buy_slippage_exceeded("0.56".parse().unwrap(), observed));
    }

    #[test]
    fn fill_resets_attempts_and_decrements_remaining() {
        let mut state = ExecState::new(Decimal::from(100));
        state.step(ExecEvent::Transient, Decimal::ONE, 3);
        assert_eq!(state.attempts, 1);

        state.step(
            ExecEvent::Fill {
                amount: Decimal::from(60),
                notional: Decimal::from(30),
            },
            Decimal::ONE,
            3,
        );
        assert_eq!(state.attempts, 0);
        assert_eq!(state.remaining, Decimal::from(40));
        assert_eq!(state.phase, ExecPhase::Attempting);
    }

    #[test]
    fn full_fill_reaches_filled_phase() {
        let mut state = ExecState::new(Decimal::from(100));
        state.step(
            ExecEvent::Fill {
                amount: Decimal::new(9_950, 2), // 99.50 leaves 0.50 < $1 floor
                notional: Decimal::from(50),
            },
            Decimal::ONE,
            3,
        );
        assert_eq!(state.phase, ExecPhase::Filled);
        assert!(!state.running(Decimal::ONE, 3));
    }

    #[test]
    fn transient_failures_exhaust_retry_budget() {
        let mut state = ExecState::new(Decimal::from(100));
        for _ in 0..2 {
            state.step(ExecEvent::Transient, Decimal::ONE, 3);
            assert_eq!(state.phase, ExecPhase::Attempting);
        }
        state.step(ExecEvent::Transient, Decimal::ONE, 3);
        assert_eq!(state.phase, ExecPhase::Retry);
        assert!(!state.running(Decimal::ONE, 3));
    }

    #[test]
    fn terminal_events_stop_immediately() {
        for (event, phase) in [
            (ExecEvent::EmptyBook, ExecPhase::AbortLiquidity),
            (ExecEvent::SlippageExceeded, ExecPhase::AbortSlippage),
            (ExecEvent::TerminalFunds, ExecPhase::AbortFunds),
            (ExecEvent::SigningFailed, ExecPhase::AbortSigning),
        ] {
            let mut state = ExecState::new(Decimal::from(100));
            state.step(event, Decimal::ONE, 3);
            assert_eq!(state.phase, phase);
            assert!(!state.running(Decimal::ONE, 3));
        }
    }

    #[test]
    fn signing_failure_exhausts_the_trade() {
        // A malformed key or token id fails identically on every attempt, so
        // the record must be pinned at the retry limit and never re-queued.
        let mut state = ExecState::new(Decimal::from(50));
        state.step(ExecEvent::SigningFailed, Decimal::ONE, 3);

        let report = ExecReport {
            phase: state.phase,
            filled: state.filled,
            notional: state.notional,
            attempts: state.attempts,
        };
        assert_eq!(report.phase, ExecPhase::AbortSigning);
        assert!(report.exhausted());
        assert!(!report.any_filled());
    }

    #[test]
    fn partial_fill_then_funds_abort_keeps_fill_totals() {
        let mut state = ExecState::new(Decimal::from(100));
        state.step(
            ExecEvent::Fill {
                amount: Decimal::from(40),
                notional: Decimal::from(40),
            },
            Decimal::ONE,
            3,
        );
        state.step(ExecEvent::TerminalFunds, Decimal::ONE, 3);

        let report = ExecReport {
            phase: state.phase,
            filled: state.filled,
            notional: state.notional,
            attempts: state.attempts,
        };
        assert!(report.any_filled());
        assert!(report.exhausted());
        assert_eq!(report.filled, Decimal::from(40));
    }
}
