use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Final trade decision for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Buy,
    Sell,
    NoTrade,
}

impl Decision {
    /// The order direction this decision asks for, if any.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Buy => Some(Direction::Long),
            Self::Sell => Some(Direction::Short),
            Self::NoTrade => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "LONG"),
            Self::Sell => write!(f, "SHORT"),
            Self::NoTrade => write!(f, "NO TRADE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Sign applied to units and price offsets.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Long => "BUY",
            Self::Short => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "LONG" => Ok(Self::Long),
            "SELL" | "SHORT" => Ok(Self::Short),
            other => Err(format!("unknown trade direction '{}'", other)),
        }
    }
}
