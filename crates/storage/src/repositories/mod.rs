pub mod trades_repo;

pub use trades_repo::{DayLock, TradesRepository};
