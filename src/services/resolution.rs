use std::collections::HashSet;

use metrics::counter;
use rust_decimal::Decimal;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chain::CtfRedeemer;
use crate::execution::order_executor::{ExecPhase, OrderExecutor, SizeUnit};
use crate::models::{ResolveMethod, ResolveResult, Side};
use crate::polymarket::types::ApiPosition;
use crate::polymarket::DataClient;

/// A book price at or above this means the outcome settled as a win.
const WIN_THRESHOLD: Decimal = Decimal::from_parts(99, 0, 0, false, 2); // 0.99

/// A book price at or below this means the outcome settled as a loss.
const LOSS_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// Classification of a held position against the settlement extremes.
/// Thresholds are symmetric to tolerate book noise near exact 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Active,
    ResolvedWin,
    ResolvedLoss,
}

pub fn classify(price: Decimal) -> PositionStatus {
    if price >= WIN_THRESHOLD {
        PositionStatus::ResolvedWin
    } else if price <= LOSS_THRESHOLD {
        PositionStatus::ResolvedLoss
    } else {
        PositionStatus::Active
    }
}

/// A holding under the book's 1-token minimum can never be sold; redemption
/// is its only path to cash.
pub fn below_book_minimum(size: Decimal) -> bool {
    size < SizeUnit::Tokens.min_tradable()
}

/// A sell run ending in one of these phases means the book can no longer
/// absorb the position.
fn book_exhausted(phase: ExecPhase) -> bool {
    matches!(phase, ExecPhase::AbortLiquidity | ExecPhase::Retry)
}

/// Conditions already redeemed during the current pass. Redemption settles
/// every outcome of a condition atomically, so sibling outcome rows are
/// skipped once one redeem lands; Sold and Failed outcomes leave the
/// condition eligible for the other row or the next pass.
#[derive(Debug, Default)]
struct RedeemLedger {
    done: HashSet<String>,
}

impl RedeemLedger {
    fn already_redeemed(&self, condition_id: &str) -> bool {
        self.done.contains(condition_id)
    }

    fn record(&mut self, condition_id: &str, method: ResolveMethod) {
        if method == ResolveMethod::Redeemed {
            self.done.insert(condition_id.to_string());
        }
    }
}

/// Scans open positions, liquidates resolved ones through the order book and
/// falls back to on-chain redemption when the book is gone.
pub struct ResolutionEngine {
    data: DataClient,
    executor: OrderExecutor,
    redeemer: Option<CtfRedeemer>,
    /// Follower wallet address whose positions are scanned.
    owner: String,
}

impl ResolutionEngine {
    pub fn new(
        data: DataClient,
        executor: OrderExecutor,
        redeemer: Option<CtfRedeemer>,
        owner: String,
    ) -> Self {
        Self {
            data,
            executor,
            redeemer,
            owner,
        }
    }

    /// Poll loop. The cancellation token is observed only between passes; a
    /// pass that is underway (including transaction waits) always completes.
    pub async fn run(&self, token: CancellationToken, interval_secs: u64) {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        info!(interval_secs, "Resolution engine started");

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Resolution engine stopping");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_pass().await {
                        Ok(results) if !results.is_empty() => {
                            info!(resolved = results.len(), "Resolution pass complete");
                        }
                        Ok(_) => debug!("Resolution pass: nothing to resolve"),
                        // Never fatal; the next scheduled pass retries.
                        Err(e) => error!(error = %e, "Resolution pass failed"),
                    }
                }
            }
        }
    }

    /// One full scan over the position set.
    pub async fn run_pass(&self) -> anyhow::Result<Vec<ResolveResult>> {
        let positions = self.data.get_positions(&self.owner).await?;
        debug!(count = positions.len(), "Scanning positions");

        let mut results = Vec::new();
        let mut ledger = RedeemLedger::default();

        for position in &positions {
            if position.size <= Decimal::ZERO {
                continue;
            }

            let status = classify(position.cur_price);
            if status == PositionStatus::Active {
                continue;
            }

            if ledger.already_redeemed(&position.condition_id) {
                debug!(
                    asset = %position.asset,
                    condition_id = %position.condition_id,
                    "Condition already redeemed this pass; skipping outcome row"
                );
                continue;
            }

            match self.resolve_position(position, status).await {
                Ok(Some(result)) => {
                    ledger.record(&position.condition_id, result.method);
                    results.push(result);
                }
                Ok(None) => {} // left for a later pass
                Err(e) => {
                    warn!(
                        asset = %position.asset,
                        error = %e,
                        "Failed to resolve position; will retry next pass"
                    );
                }
            }
        }

        Ok(results)
    }

    /// Liquidate one resolved position: order book first, then redemption.
    async fn resolve_position(
        &self,
        position: &ApiPosition,
        status: PositionStatus,
    ) -> anyhow::Result<Option<ResolveResult>> {
        info!(
            asset = %position.asset,
            condition_id = %position.condition_id,
            size = %position.size,
            price = %position.cur_price,
            ?status,
            "Resolving settled position"
        );

        let book_closed = if below_book_minimum(position.size) {
            // Dust holdings never enter the sell loop; go straight to the
            // redemption check so their collateral is still recoverable.
            debug!(
                asset = %position.asset,
                size = %position.size,
                "Position under the book minimum; skipping sale"
            );
            true
        } else {
            let report = self
                .executor
                .execute(
                    &position.asset,
                    Side::Sell,
                    position.size,
                    None,
                    SizeUnit::Tokens,
                )
                .await;

            if report.any_filled() {
                counter!("positions_sold").increment(1);
                return Ok(Some(ResolveResult {
                    asset_id: position.asset.clone(),
                    condition_id: position.condition_id.clone(),
                    method: ResolveMethod::Sold,
                    tokens_disposed: report.filled,
                    proceeds_usd: report.notional,
                }));
            }

            // Nothing sold: fall back to the contract only when the book is
            // empty or unreachable and the data source confirms settlement.
            book_exhausted(report.phase)
        };

        if !book_closed {
            return Ok(None);
        }

        if !position.redeemable {
            debug!(
                asset = %position.asset,
                "Book closed but position not yet redeemable; leaving for later"
            );
            return Ok(None);
        }

        let Some(redeemer) = &self.redeemer else {
            warn!(asset = %position.asset, "No chain signer configured; cannot redeem");
            return Ok(None);
        };

        match redeemer.redeem(&position.condition_id).await {
            Ok(tx_hash) => {
                // The contract pays winners their full token value.
                let proceeds = match status {
                    PositionStatus::ResolvedWin => position.size,
                    _ => Decimal::ZERO,
                };
                counter!("positions_redeemed").increment(1);
                info!(
                    asset = %position.asset,
                    %tx_hash,
                    proceeds = %proceeds,
                    "Position redeemed on-chain"
                );
                Ok(Some(ResolveResult {
                    asset_id: position.asset.clone(),
                    condition_id: position.condition_id.clone(),
                    method: ResolveMethod::Redeemed,
                    tokens_disposed: position.size,
                    proceeds_usd: proceeds,
                }))
            }
            Err(e) => {
                warn!(
                    asset = %position.asset,
                    error = %e,
                    "Redemption failed; position left for next scan"
                );
                Ok(Some(ResolveResult {
                    asset_id: position.asset.clone(),
                    condition_id: position.condition_id.clone(),
                    method: ResolveMethod::Failed,
                    tokens_disposed: Decimal::ZERO,
                    proceeds_usd: Decimal::ZERO,
                }))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
