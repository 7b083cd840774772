use common::config::BracketConfig;
use common::models::{Decision, TradePlan};

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10_f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Fixed-risk bracket: constant distances to take-profit and stop-loss,
/// constant position size.
#[derive(Debug, Clone)]
pub struct OrderPlanner {
    instrument: String,
    bracket: BracketConfig,
}

impl OrderPlanner {
    pub fn new(instrument: impl Into<String>, bracket: BracketConfig) -> Self {
        Self {
            instrument: instrument.into(),
            bracket,
        }
    }

    /// `None` for `NoTrade`.
    pub fn plan(&self, decision: Decision, entry_price: f64) -> Option<TradePlan> {
        let direction = decision.direction()?;
        let sign = direction.sign();
        let precision = self.bracket.price_precision;

        Some(TradePlan {
            instrument: self.instrument.clone(),
            direction,
            units: sign as i64 * self.bracket.max_units,
            entry_price: round_to(entry_price, precision),
            take_profit_price: round_to(entry_price + sign * self.bracket.take_profit_offset, precision),
            stop_loss_price: round_to(entry_price - sign * self.bracket.stop_loss_offset, precision),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Direction;

    fn planner() -> OrderPlanner {
        OrderPlanner::new("EUR_USD", BracketConfig::default())
    }

    #[test]
    fn buy_bracket_sits_around_entry() {
        let plan = planner().plan(Decision::Buy, 1.10000).unwrap();

        assert_eq!(plan.direction, Direction::Long);
        assert_eq!(plan.units, 1000);
        assert_eq!(plan.take_profit_price, 1.10500);
        assert_eq!(plan.stop_loss_price, 1.09700);
        assert_eq!(plan.instrument, "EUR_USD");
    }

    #[test]
    fn sell_bracket_is_mirrored() {
        let plan = planner().plan(Decision::Sell, 1.10000).unwrap();

        assert_eq!(plan.direction, Direction::Short);
        assert_eq!(plan.units, -1000);
        assert_eq!(plan.take_profit_price, 1.09500);
        assert_eq!(plan.stop_loss_price, 1.10300);
    }

    #[test]
    fn no_trade_has_no_plan() {
        assert!(planner().plan(Decision::NoTrade, 1.1).is_none());
    }

    #[test]
    fn prices_are_rounded_to_instrument_precision() {
        let plan = planner().plan(Decision::Buy, 1.0723456).unwrap();

        assert_eq!(plan.entry_price, 1.07235);
        assert_eq!(plan.take_profit_price, 1.07735);
        assert_eq!(plan.stop_loss_price, 1.06935);
    }

    #[test]
    fn round_to_handles_negative_values() {
        assert_eq!(round_to(-4.996, 2), -5.0);
        assert_eq!(round_to(50.004, 2), 50.0);
    }
}
