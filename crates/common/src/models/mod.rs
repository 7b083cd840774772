pub mod bar;
pub mod signal;
pub mod snapshot;
pub mod trade;

pub use bar::Bar;
pub use signal::{Decision, Direction};
pub use snapshot::{FeatureSnapshot, MODEL_FEATURES, SrZone};
pub use trade::{LedgerEntry, OrderReceipt, TradePlan};
