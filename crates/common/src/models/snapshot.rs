use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Support/resistance proximity label produced by the upstream detector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SrZone {
    NearSupport,
    NearResistance,
    Neutral,
    Other(String),
}

impl SrZone {
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "near_support" => Self::NearSupport,
            "near_resistance" => Self::NearResistance,
            "neutral" => Self::Neutral,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::NearSupport => "near_support",
            Self::NearResistance => "near_resistance",
            Self::Neutral => "neutral",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for SrZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Model input columns, in training order.
pub const MODEL_FEATURES: [&str; 6] = ["wma", "ema", "sar", "rsi", "cci", "macd_signal"];

/// Validated feature vector of the most recent bar. Every field is present
/// and finite; building one from a partial row is the reader's job to refuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub wma: f64,
    pub ema: f64,
    pub sar: f64,
    pub rsi: f64,
    pub cci: f64,
    pub macd_signal: f64,
    pub sr_zone: SrZone,
}

impl FeatureSnapshot {
    /// Model input laid out as [`MODEL_FEATURES`].
    pub fn model_features(&self) -> [f32; MODEL_FEATURES.len()] {
        [
            self.wma as f32,
            self.ema as f32,
            self.sar as f32,
            self.rsi as f32,
            self.cci as f32,
            self.macd_signal as f32,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_zone_labels_parse() {
        assert_eq!(SrZone::parse("near_support"), SrZone::NearSupport);
        assert_eq!(SrZone::parse(" near_resistance "), SrZone::NearResistance);
        assert_eq!(SrZone::parse("neutral"), SrZone::Neutral);
    }

    #[test]
    fn unknown_zone_label_is_kept() {
        let zone = SrZone::parse("between_levels");
        assert_eq!(zone, SrZone::Other("between_levels".into()));
        assert_eq!(zone.to_string(), "between_levels");
    }
}
