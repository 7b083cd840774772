use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use common::models::{Decision, FeatureSnapshot, LedgerEntry};
use common::traits::{ScoreError, Scorer};
use market_data::feed::{FeedError, MarketFeed};
use sqlx::SqlitePool;
use storage::LedgerError;
use storage::repositories::{DayLock, TradesRepository};
use strategy::admission;
use strategy::inference::checked_probability;
use strategy::planner::OrderPlanner;
use strategy::settlement::{self, SettlementReport};
use strategy::signal::SignalClassifier;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::services::execution_service::ExecutionService;
use crate::services::report::{CycleReport, TradeStatus};

/// Failures that abort a cycle before any order can be sent.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One pass of the pipeline: read, score, decide, admit, submit, settle.
#[derive(Clone)]
pub struct CycleService {
    feed_path: PathBuf,
    pool: SqlitePool,
    scorer: Arc<dyn Scorer>,
    classifier: SignalClassifier,
    planner: OrderPlanner,
    execution: ExecutionService,
    ledger_tail: usize,
    notification_tx: Option<broadcast::Sender<String>>,
}

impl CycleService {
    pub fn new(
        feed_path: impl Into<PathBuf>,
        pool: SqlitePool,
        scorer: Arc<dyn Scorer>,
        classifier: SignalClassifier,
        planner: OrderPlanner,
        execution: ExecutionService,
    ) -> Self {
        Self {
            feed_path: feed_path.into(),
            pool,
            scorer,
            classifier,
            planner,
            execution,
            ledger_tail: 5,
            notification_tx: None,
        }
    }

    pub fn with_ledger_tail(mut self, n: usize) -> Self {
        self.ledger_tail = n;
        self
    }

    pub fn with_notifier(mut self, tx: broadcast::Sender<String>) -> Self {
        self.notification_tx = Some(tx);
        self
    }

    pub async fn run_cycle(&self, today: NaiveDate) -> Result<CycleReport, CycleError> {
        let feed = MarketFeed::from_path(&self.feed_path)?;
        let snapshot = feed.latest_snapshot()?;

        let probability = checked_probability(self.scorer.score(&snapshot.model_features())?)?;
        let signal = self.classifier.classify(probability, &snapshot);
        info!(
            "Signal for {}: p_up={:.4} confidence={:?} trend={} zone={} -> {}",
            snapshot.date, probability, signal.confidence, signal.trend, signal.zone, signal.decision
        );

        let trade = match signal.decision {
            Decision::NoTrade => TradeStatus::NoSignal,
            decision => self.place_trade(today, &snapshot, decision).await?,
        };

        let settlement = self.settle(&feed).await;

        let ledger_tail = match TradesRepository::tail(&self.pool, self.ledger_tail).await {
            Ok(tail) => tail,
            Err(e) => {
                error!("Failed to read ledger tail: {}", e);
                Vec::new()
            }
        };

        Ok(CycleReport {
            today,
            snapshot,
            signal,
            trade,
            settlement,
            ledger_tail,
        })
    }

    /// Admission, planning, submission and the ledger append, all under the
    /// ledger write lock.
    async fn place_trade(
        &self,
        today: NaiveDate,
        snapshot: &FeatureSnapshot,
        decision: Decision,
    ) -> Result<TradeStatus, CycleError> {
        let mut lock = DayLock::acquire(&self.pool).await?;
        let todays_entries = lock.entries_on(today).await?;

        let admission = admission::admit(today, &todays_entries);
        if !admission.is_admitted() {
            info!("{} signal ignored: {}", decision, admission);
            Self::release(lock).await;
            return Ok(TradeStatus::AlreadyTraded { date: today });
        }

        let Some(plan) = self.planner.plan(decision, snapshot.close) else {
            Self::release(lock).await;
            return Ok(TradeStatus::NoSignal);
        };

        let receipt = match self.execution.execute(&plan).await {
            Ok(receipt) => receipt,
            Err(e) => {
                Self::release(lock).await;
                let reason = e.to_string();
                self.notify(&format!(
                    "Order FAILED: {} {} {}: {}",
                    plan.direction, plan.units, plan.instrument, reason
                ));
                return Ok(TradeStatus::SubmissionFailed { plan, reason });
            }
        };

        let entry = LedgerEntry::open(today, &plan);
        match lock.append(&entry).await {
            Ok(()) => {
                self.notify(&format!(
                    "Trade sent: {} {} {} @ {:.5} TP={:.5} SL={:.5} (order {})",
                    plan.direction,
                    plan.units,
                    plan.instrument,
                    plan.entry_price,
                    plan.take_profit_price,
                    plan.stop_loss_price,
                    receipt.order_id
                ));
                Ok(TradeStatus::Placed { plan, receipt })
            }
            Err(e) => {
                let reason = e.to_string();
                error!(
                    "Order {} was accepted by the broker but could not be recorded: {}",
                    receipt.order_id, reason
                );
                self.notify(&format!(
                    "ATTENTION: order {} placed but ledger write failed: {}",
                    receipt.order_id, reason
                ));
                Ok(TradeStatus::Unrecorded {
                    plan,
                    receipt,
                    reason,
                })
            }
        }
    }

    async fn release(lock: DayLock) {
        if let Err(e) = lock.release().await {
            warn!("Failed to release ledger lock cleanly: {}", e);
        }
    }

    /// Settles open entries against the feed. Failures are logged per entry
    /// and the entry is retried next cycle.
    async fn settle(&self, feed: &MarketFeed) -> SettlementReport {
        let mut open = match TradesRepository::unresolved(&self.pool).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Failed to load open trades for settlement: {}", e);
                return SettlementReport::default();
            }
        };
        if open.is_empty() {
            return SettlementReport::default();
        }

        let mut report = settlement::settle(&mut open, &feed.bars());

        let mut persisted = Vec::with_capacity(report.settled.len());
        for settled in report.settled.drain(..) {
            match TradesRepository::record_pnl(&self.pool, &[(settled.date, settled.pnl)]).await {
                Ok(_) => persisted.push(settled),
                Err(e) => {
                    error!("Failed to record PnL for {}: {}", settled.date, e);
                    report.pending.push(settled.date);
                }
            }
        }
        report.settled = persisted;

        for settled in &report.settled {
            self.notify(&format!(
                "Trade {} settled: {:?} PnL {:+.2}",
                settled.date, settled.exit, settled.pnl
            ));
        }
        report
    }

    fn notify(&self, msg: &str) {
        if let Some(ref tx) = self.notification_tx {
            let _ = tx.send(msg.to_string());
        }
    }
}
