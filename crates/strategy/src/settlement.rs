//! Deferred PnL resolution of ledger entries against the following day's bar.
//!
//! Each entry is judged on exactly one bar: the one dated the calendar day
//! after the trade. Until that bar exists the entry stays open; once it
//! exists the entry is closed at take-profit, stop-loss or flat, and never
//! revisited. Daily OHLC cannot tell which level was touched first, so when
//! both are inside the bar the take-profit is assumed to have filled.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::models::{Bar, LedgerEntry};
use serde::Serialize;
use tracing::debug;

use crate::planner::round_to;

const PNL_PRECISION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SettlementOutcome {
    Resolved { pnl: f64, exit: ExitReason },
    /// The next-day bar is not in the feed yet.
    Pending,
    AlreadySettled { pnl: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settled {
    pub date: NaiveDate,
    pub pnl: f64,
    pub exit: ExitReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettlementReport {
    pub settled: Vec<Settled>,
    pub pending: Vec<NaiveDate>,
}

impl SettlementReport {
    pub fn realized_pnl(&self) -> f64 {
        round_to(self.settled.iter().map(|s| s.pnl).sum(), PNL_PRECISION)
    }
}

/// Resolves a single entry without touching it.
pub fn settle_entry(entry: &LedgerEntry, bars: &BTreeMap<NaiveDate, Bar>) -> SettlementOutcome {
    if let Some(pnl) = entry.pnl {
        return SettlementOutcome::AlreadySettled { pnl };
    }
    let Some(bar) = entry.date.succ_opt().and_then(|next| bars.get(&next)) else {
        return SettlementOutcome::Pending;
    };

    let long = entry.units > 0;
    let (tp_hit, sl_hit) = if long {
        (bar.high >= entry.take_profit_price, bar.low <= entry.stop_loss_price)
    } else {
        (bar.low <= entry.take_profit_price, bar.high >= entry.stop_loss_price)
    };

    let (exit, exit_price) = if tp_hit {
        (ExitReason::TakeProfit, entry.take_profit_price)
    } else if sl_hit {
        (ExitReason::StopLoss, entry.stop_loss_price)
    } else {
        return SettlementOutcome::Resolved {
            pnl: 0.0,
            exit: ExitReason::Flat,
        };
    };

    let pnl = round_to((exit_price - entry.entry_price) * entry.units as f64, PNL_PRECISION);
    SettlementOutcome::Resolved { pnl, exit }
}

/// Settles every open entry in place. Entries that already carry a PnL are
/// skipped, so running this repeatedly is harmless.
pub fn settle(entries: &mut [LedgerEntry], bars: &BTreeMap<NaiveDate, Bar>) -> SettlementReport {
    let mut report = SettlementReport::default();

    for entry in entries.iter_mut() {
        match settle_entry(entry, bars) {
            SettlementOutcome::Resolved { pnl, exit } => {
                debug!("Settled {} {:?}: {:?} pnl={:.2}", entry.date, entry.signal, exit, pnl);
                entry.pnl = Some(pnl);
                report.settled.push(Settled {
                    date: entry.date,
                    pnl,
                    exit,
                });
            }
            SettlementOutcome::Pending => {
                debug!("No bar yet for the day after {}; keeping trade open", entry.date);
                report.pending.push(entry.date);
            }
            SettlementOutcome::AlreadySettled { .. } => {}
        }
    }

    report
}
