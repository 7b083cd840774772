use std::fmt;

use chrono::NaiveDate;
use common::models::{FeatureSnapshot, LedgerEntry, OrderReceipt, TradePlan};
use strategy::settlement::SettlementReport;
use strategy::signal::SignalReport;

/// What happened to the order side of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeStatus {
    NoSignal,
    AlreadyTraded {
        date: NaiveDate,
    },
    Placed {
        plan: TradePlan,
        receipt: OrderReceipt,
    },
    SubmissionFailed {
        plan: TradePlan,
        reason: String,
    },
    /// Broker accepted the order but the ledger write failed.
    Unrecorded {
        plan: TradePlan,
        receipt: OrderReceipt,
        reason: String,
    },
}

/// Read-only summary of one cycle, handed to whatever displays it.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub today: NaiveDate,
    pub snapshot: FeatureSnapshot,
    pub signal: SignalReport,
    pub trade: TradeStatus,
    pub settlement: SettlementReport,
    pub ledger_tail: Vec<LedgerEntry>,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSignal => write!(f, "no order"),
            Self::AlreadyTraded { date } => write!(f, "skipped, already traded on {}", date),
            Self::Placed { plan, receipt } => write!(
                f,
                "placed {} {} {} (order {}) TP={:.5} SL={:.5}",
                plan.direction,
                plan.units.abs(),
                plan.instrument,
                receipt.order_id,
                plan.take_profit_price,
                plan.stop_loss_price
            ),
            Self::SubmissionFailed { plan, reason } => {
                write!(f, "{} {} FAILED: {}", plan.direction, plan.instrument, reason)
            }
            Self::Unrecorded {
                plan,
                receipt,
                reason,
            } => write!(
                f,
                "{} {} placed (order {}) but NOT RECORDED: {}",
                plan.direction, plan.instrument, receipt.order_id, reason
            ),
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Daily signal for {}", self.today)?;
        writeln!(f, "  Bar date:         {}", self.snapshot.date)?;
        writeln!(f, "  Close:            {:.5}", self.snapshot.close)?;
        writeln!(f, "  Model confidence: {:.2}% up", self.signal.probability * 100.0)?;
        writeln!(f, "  Trend:            {}", self.signal.trend)?;
        writeln!(f, "  S/R zone:         {}", self.signal.zone)?;
        writeln!(f, "  Final signal:     {}", self.signal.decision)?;
        writeln!(f, "  Order:            {}", self.trade)?;
        writeln!(
            f,
            "  Settlement:       {} settled ({:+.2}), {} waiting for next-day bar",
            self.settlement.settled.len(),
            self.settlement.realized_pnl(),
            self.settlement.pending.len()
        )?;
        write!(f, "  Ledger tail:")?;
        if self.ledger_tail.is_empty() {
            write!(f, " (empty)")?;
        }
        for entry in &self.ledger_tail {
            let pnl = entry
                .pnl
                .map(|p| format!("{:+.2}", p))
                .unwrap_or_else(|| "open".to_string());
            write!(
                f,
                "\n    {}  {:<4} {:>6}  @ {:.5}  TP {:.5}  SL {:.5}  PnL {}",
                entry.date,
                entry.signal,
                entry.units,
                entry.entry_price,
                entry.take_profit_price,
                entry.stop_loss_price,
                pnl
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Decision, Direction, SrZone};
    use strategy::signal::{Confidence, Trend};

    fn report(trade: TradeStatus, tail: Vec<LedgerEntry>) -> CycleReport {
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        CycleReport {
            today: date,
            snapshot: FeatureSnapshot {
                date,
                close: 1.1,
                wma: 1.1,
                ema: 1.09,
                sar: 1.08,
                rsi: 55.0,
                cci: 90.0,
                macd_signal: 0.001,
                sr_zone: SrZone::NearSupport,
            },
            signal: SignalReport {
                probability: 0.6234,
                confidence: Confidence::Up,
                trend: Trend::Long,
                zone: SrZone::NearSupport,
                decision: Decision::Buy,
            },
            trade,
            settlement: SettlementReport::default(),
            ledger_tail: tail,
        }
    }

    #[test]
    fn renders_dashboard_fields() {
        let text = report(TradeStatus::NoSignal, vec![]).to_string();

        assert!(text.contains("Model confidence: 62.34% up"));
        assert!(text.contains("Trend:            Long"));
        assert!(text.contains("S/R zone:         near_support"));
        assert!(text.contains("Final signal:     LONG"));
        assert!(text.contains("Ledger tail: (empty)"));
    }

    #[test]
    fn renders_open_and_settled_entries() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let entry = LedgerEntry {
            date,
            signal: Direction::Short,
            units: -1000,
            entry_price: 1.1,
            take_profit_price: 1.095,
            stop_loss_price: 1.103,
            pnl: None,
        };
        let settled = LedgerEntry {
            pnl: Some(5.0),
            ..entry.clone()
        };

        let text = report(TradeStatus::AlreadyTraded { date }, vec![entry, settled]).to_string();
        assert!(text.contains("already traded on 2024-05-01"));
        assert!(text.contains("PnL open"));
        assert!(text.contains("PnL +5.00"));
    }
}
