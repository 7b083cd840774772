use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLC bar of the traded instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}
