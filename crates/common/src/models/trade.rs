use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Direction;

/// Bracket market order ready to be sent to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub instrument: String,
    pub direction: Direction,
    /// Signed: positive for long, negative for short.
    pub units: i64,
    pub entry_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
}

/// What the broker told us after accepting an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub fill_price: Option<f64>,
}

/// One row of the trade ledger. `date` is unique across the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub signal: Direction,
    pub units: i64,
    pub entry_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
    pub pnl: Option<f64>,
}

impl LedgerEntry {
    /// Fresh, unsettled entry for a plan submitted on `date`.
    pub fn open(date: NaiveDate, plan: &TradePlan) -> Self {
        Self {
            date,
            signal: plan.direction,
            units: plan.units,
            entry_price: plan.entry_price,
            take_profit_price: plan.take_profit_price,
            stop_loss_price: plan.stop_loss_price,
            pnl: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.pnl.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_entry_copies_plan_and_is_unsettled() {
        let plan = TradePlan {
            instrument: "EUR_USD".into(),
            direction: Direction::Short,
            units: -1000,
            entry_price: 1.1,
            take_profit_price: 1.095,
            stop_loss_price: 1.103,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let entry = LedgerEntry::open(date, &plan);

        assert_eq!(entry.signal, Direction::Short);
        assert_eq!(entry.units, -1000);
        assert_eq!(entry.take_profit_price, 1.095);
        assert!(!entry.is_settled());
    }
}
