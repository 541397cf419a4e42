use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::db::trade_repo;
use crate::models::{CopyTrade, Side, TradeIntent};
use crate::polymarket::{BalanceChecker, DataClient};

use super::order_executor::{ExecPhase, ExecReport, OrderExecutor, SizeUnit};
use super::sizing::{self, CopyStrategyConfig};

/// Exchange-enforced minimum order, in USDC.
const MIN_ORDER_USD: Decimal = Decimal::ONE;

#[derive(Debug, Clone)]
pub struct CopyEngineConfig {
    pub strategy: CopyStrategyConfig,
    /// Boost applied only when a proportional amount would fall under the $1
    /// floor, so tiny trades become executable without over-scaling normal
    /// ones.
    pub trade_multiplier: Decimal,
    pub retry_limit: u32,
}

// ---------------------------------------------------------------------------
// Intent derivation (pure)
// ---------------------------------------------------------------------------

/// A buy copy opens exposure; a sell copy reduces, or closes when the trader
/// walked away with nothing left.
pub fn classify_intent(side: Side, trader_remaining: Option<Decimal>) -> TradeIntent {
    match side {
        Side::Buy => TradeIntent::Open,
        Side::Sell => match trader_remaining {
            Some(remaining) if remaining.is_zero() => TradeIntent::Close,
            _ => TradeIntent::Reduce,
        },
    }
}

/// OPEN target: scale the observed notional by relative account size.
/// The trader's pre-trade balance is their reported balance plus what the
/// trade consumed.
pub fn open_target(
    trade_usd: Decimal,
    trader_balance: Decimal,
    follower_balance: Decimal,
) -> Decimal {
    let denominator = trader_balance + trade_usd;
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    trade_usd * (follower_balance / denominator)
}

/// REDUCE: the fraction of their own position the trader let go.
pub fn reduce_fraction(sell_tokens: Decimal, trader_remaining: Decimal) -> Decimal {
    let pre_trade = trader_remaining + sell_tokens;
    if pre_trade <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    sell_tokens / pre_trade
}

/// Boost deep-sub-dollar amounts by the configured multiplier; leave
/// everything else alone.
pub fn boost_if_dust(amount: Decimal, multiplier: Decimal) -> Decimal {
    if amount < MIN_ORDER_USD && multiplier > Decimal::ONE {
        amount * multiplier
    } else {
        amount
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Daily executed-volume tracker for the optional max_daily_volume_usd cap.
#[derive(Debug, Clone)]
struct DailyVolume {
    day: NaiveDate,
    used: Decimal,
}

impl DailyVolume {
    fn new() -> Self {
        Self {
            day: Utc::now().date_naive(),
            used: Decimal::ZERO,
        }
    }

    fn roll(&mut self) {
        let today = Utc::now().date_naive();
        if today != self.day {
            self.day = today;
            self.used = Decimal::ZERO;
        }
    }
}

/// Drives one trade at a time from the pending queue through sizing and
/// execution, then writes the terminal state back. Strictly sequential:
/// never two orders in flight against the same wallet.
pub struct CopyEngine {
    config: CopyEngineConfig,
    pool: PgPool,
    data: DataClient,
    balances: BalanceChecker,
    executor: OrderExecutor,
    daily: DailyVolume,
}

impl CopyEngine {
    pub fn new(
        config: CopyEngineConfig,
        pool: PgPool,
        data: DataClient,
        balances: BalanceChecker,
        executor: OrderExecutor,
    ) -> Self {
        Self {
            config,
            pool,
            data,
            balances,
            executor,
            daily: DailyVolume::new(),
        }
    }

    /// One engine cycle: process every pending trade in observation order.
    /// Individual trade failures are logged and do not stop the cycle.
    pub async fn run_copy_cycle(&mut self) -> anyhow::Result<()> {
        let pending =
            trade_repo::get_pending_trades(&self.pool, self.config.retry_limit as i32).await?;

        if pending.is_empty() {
            debug!("No pending copy trades");
            return Ok(());
        }

        info!(count = pending.len(), "Processing pending copy trades");

        for trade in &pending {
            if let Err(e) = self.process_trade(trade).await {
                warn!(
                    trade_id = %trade.id,
                    trader = %trade.trader,
                    error = %e,
                    "Copy trade failed; leaving record for next cycle"
                );
            }
        }

        Ok(())
    }

    /// Execute one observed trade end to end.
    pub async fn process_trade(&mut self, trade: &CopyTrade) -> anyhow::Result<()> {
        let Some(side) = Side::from_api_str(&trade.side) else {
            warn!(trade_id = %trade.id, side = %trade.side, "Unknown side; marking processed");
            self.finish(trade, None).await?;
            return Ok(());
        };

        self.daily.roll();
        if let Some(cap) = self.config.strategy.max_daily_volume_usd {
            if self.daily.used >= cap {
                // Leave the record pending; the cap resets at the UTC day roll.
                info!(trade_id = %trade.id, used = %self.daily.used, "Daily volume cap reached");
                return Ok(());
            }
        }

        let intent = classify_intent(side, trade.trader_remaining_size);
        info!(
            trade_id = %trade.id,
            trader = %trade.trader,
            %intent,
            size_usd = %trade.size_usd,
            price = %trade.price,
            "Processing copy trade"
        );

        let report = match intent {
            TradeIntent::Open => self.execute_open(trade).await?,
            TradeIntent::Reduce | TradeIntent::Close => {
                self.execute_sell(trade, intent).await?
            }
        };

        if let Some(report) = &report {
            self.daily.used += report.notional;
            counter!("copy_trades_processed").increment(1);
        }

        self.finish(trade, report.as_ref()).await
    }

    /// OPEN: proportional (or strategy) sizing, limit chain, then the buy
    /// execution loop.
    async fn execute_open(&self, trade: &CopyTrade) -> anyhow::Result<Option<ExecReport>> {
        let balance = self.balances.get_usdc_balance().await?;

        let base = match trade.trader_balance {
            Some(trader_balance) => {
                let proportional = open_target(trade.size_usd, trader_balance, balance);
                boost_if_dust(proportional, self.config.trade_multiplier)
            }
            None => {
                // Observer could not report the trader's balance; fall back
                // to the configured strategy for the base amount.
                let current_position = self
                    .current_position_value(&trade.asset_id)
                    .await
                    .unwrap_or(Decimal::ZERO);
                return self
                    .execute_open_sized(
                        trade,
                        sizing::calculate(
                            &self.config.strategy,
                            trade.size_usd,
                            balance,
                            current_position,
                        )
                        .final_amount,
                    )
                    .await;
            }
        };

        let current_position = self
            .current_position_value(&trade.asset_id)
            .await
            .unwrap_or(Decimal::ZERO);

        let mut calc = crate::models::OrderSizeCalculation::new(
            self.config.strategy.strategy,
            trade.size_usd,
        );
        calc.base_amount = base;
        sizing::apply_limits(&self.config.strategy, base, balance, current_position, &mut calc);

        for step in &calc.reasoning {
            debug!(trade_id = %trade.id, "{step}");
        }

        self.execute_open_sized(trade, calc.final_amount).await
    }

    async fn execute_open_sized(
        &self,
        trade: &CopyTrade,
        target: Decimal,
    ) -> anyhow::Result<Option<ExecReport>> {
        // Exchange minimum; anything smaller is recorded and skipped.
        if target < MIN_ORDER_USD {
            info!(trade_id = %trade.id, %target, "Target below $1 minimum; skipping execution");
            return Ok(None);
        }

        let report = self
            .executor
            .execute(
                &trade.asset_id,
                Side::Buy,
                target,
                Some(trade.price),
                SizeUnit::Usd,
            )
            .await;

        Ok(Some(report))
    }

    /// REDUCE/CLOSE: size in tokens off the follower's actual position and
    /// run the sell loop. Never oversell.
    async fn execute_sell(
        &self,
        trade: &CopyTrade,
        intent: TradeIntent,
    ) -> anyhow::Result<Option<ExecReport>> {
        let held = self.balances.get_token_balance(&trade.asset_id).await?;
        if held <= Decimal::ZERO {
            info!(trade_id = %trade.id, "Nothing held in this token; skipping");
            return Ok(None);
        }

        let target_tokens = match intent {
            TradeIntent::Close => held,
            _ => {
                let fraction = reduce_fraction(
                    trade.size_tokens(),
                    trade.trader_remaining_size.unwrap_or(Decimal::ZERO),
                );
                let raw = held * fraction;
                let boosted_usd =
                    boost_if_dust(raw * trade.price, self.config.trade_multiplier);
                if trade.price.is_zero() {
                    raw
                } else {
                    (boosted_usd / trade.price).min(held)
                }
            }
        };

        if target_tokens * trade.price < MIN_ORDER_USD {
            info!(
                trade_id = %trade.id,
                tokens = %target_tokens,
                "Sell notional below $1 minimum; skipping execution"
            );
            return Ok(None);
        }

        let report = self
            .executor
            .execute(&trade.asset_id, Side::Sell, target_tokens, None, SizeUnit::Tokens)
            .await;

        Ok(Some(report))
    }

    /// Current USDC value of the follower's holding in a token, for the
    /// position-size limit.
    async fn current_position_value(&self, asset_id: &str) -> anyhow::Result<Decimal> {
        let position = self
            .data
            .get_position(self.balances.wallet_address(), asset_id)
            .await?;
        Ok(position.map(|p| p.current_value).unwrap_or(Decimal::ZERO))
    }

    /// Persist the terminal state. processed=true always; attempts pinned to
    /// the retry limit when the run is exhausted so the record is never
    /// retried automatically.
    async fn finish(&self, trade: &CopyTrade, report: Option<&ExecReport>) -> anyhow::Result<()> {
        let attempts = match report {
            Some(r) if r.exhausted() => self.config.retry_limit as i32,
            Some(r) => r.attempts as i32,
            None => trade.attempts,
        };

        trade_repo::mark_processed(&self.pool, trade.id, attempts).await?;

        if let Some(r) = report {
            info!(
                trade_id = %trade.id,
                phase = ?r.phase,
                filled = %r.filled,
                notional = %r.notional,
                attempts,
                "Copy trade recorded"
            );
            match r.phase {
                ExecPhase::AbortFunds => {
                    warn!(trade_id = %trade.id, "Trade exhausted on funds/allowance");
                }
                ExecPhase::AbortSigning => {
                    warn!(trade_id = %trade.id, "Trade exhausted: order could not be signed");
                }
                _ => {}
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
