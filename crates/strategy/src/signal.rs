//! Combines model confidence, trend and support/resistance location into a
//! single trade decision. All three families must agree; any dissent yields
//! `NoTrade`.

use std::fmt;

use common::config::SignalThresholds;
use common::models::{Decision, FeatureSnapshot, SrZone};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    Up,
    Down,
    Undecided,
}

impl Confidence {
    /// Both bounds of the dead zone count as undecided.
    pub fn from_probability(p: f64, thresholds: &SignalThresholds) -> Self {
        if p > thresholds.upper {
            Self::Up
        } else if p < thresholds.lower {
            Self::Down
        } else {
            Self::Undecided
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Long,
    Short,
    Neutral,
}

impl Trend {
    pub fn of(snapshot: &FeatureSnapshot) -> Self {
        let FeatureSnapshot { close, ema, sar, .. } = *snapshot;
        if close > ema && close > sar {
            Self::Long
        } else if close < ema && close < sar {
            Self::Short
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Everything the classifier looked at, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalReport {
    pub probability: f64,
    pub confidence: Confidence,
    pub trend: Trend,
    pub zone: SrZone,
    pub decision: Decision,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalClassifier {
    thresholds: SignalThresholds,
}

impl SignalClassifier {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, probability: f64, snapshot: &FeatureSnapshot) -> SignalReport {
        let confidence = Confidence::from_probability(probability, &self.thresholds);
        let trend = Trend::of(snapshot);
        let zone = snapshot.sr_zone.clone();

        let decision = match (confidence, trend, &zone) {
            (Confidence::Up, Trend::Long, SrZone::NearSupport) => Decision::Buy,
            (Confidence::Down, Trend::Short, SrZone::NearResistance) => Decision::Sell,
            _ => Decision::NoTrade,
        };

        SignalReport {
            probability,
            confidence,
            trend,
            zone,
            decision,
        }
    }
}
