use std::fmt;

use chrono::NaiveDate;
use common::models::LedgerEntry;

/// Outcome of the once-per-day throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    AlreadyTraded { date: NaiveDate },
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        matches!(self, Self::Admitted)
    }
}

impl fmt::Display for Admission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admitted => write!(f, "admitted"),
            Self::AlreadyTraded { date } => write!(f, "already traded on {}", date),
        }
    }
}

/// At most one order per calendar day: admits iff no entry is dated `today`.
pub fn admit(today: NaiveDate, ledger: &[LedgerEntry]) -> Admission {
    if ledger.iter().any(|entry| entry.date == today) {
        Admission::AlreadyTraded { date: today }
    } else {
        Admission::Admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Direction;

    fn entry_on(date: NaiveDate) -> LedgerEntry {
        LedgerEntry {
            date,
            signal: Direction::Long,
            units: 1000,
            entry_price: 1.1,
            take_profit_price: 1.105,
            stop_loss_price: 1.097,
            pnl: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
    }

    #[test]
    fn empty_ledger_admits() {
        assert_eq!(admit(today(), &[]), Admission::Admitted);
    }

    #[test]
    fn other_days_do_not_block() {
        let ledger = [entry_on(today().pred_opt().unwrap()), entry_on(today().succ_opt().unwrap())];
        assert!(admit(today(), &ledger).is_admitted());
    }

    #[test]
    fn same_day_entry_rejects_even_when_settled() {
        let mut settled = entry_on(today());
        settled.pnl = Some(5.0);
        assert_eq!(
            admit(today(), &[settled]),
            Admission::AlreadyTraded { date: today() }
        );
    }
}
