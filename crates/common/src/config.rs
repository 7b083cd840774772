use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";
const LIVE_URL: &str = "https://api-fxtrade.oanda.com";
/// Decimal places beyond this stop meaning anything for an FX quote.
const MAX_PRICE_PRECISION: u32 = 10;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Probability cut-offs around the dead zone. Probabilities in
/// `[lower, upper]` are never acted on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalThresholds {
    pub upper: f64,
    pub lower: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            upper: 0.55,
            lower: 0.45,
        }
    }
}

/// Fixed-risk bracket parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketConfig {
    pub take_profit_offset: f64,
    pub stop_loss_offset: f64,
    pub max_units: i64,
    pub price_precision: u32,
}

impl Default for BracketConfig {
    fn default() -> Self {
        Self {
            take_profit_offset: 0.0050,
            stop_loss_offset: 0.0030,
            max_units: 1000,
            price_precision: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerConfig {
    pub api_key: String,
    pub account_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub workdir: String,
    pub feed_path: String,
    pub model_path: String,
    pub instrument: String,
    pub refresh_interval: Duration,
    pub run_once: bool,
    pub ledger_tail: usize,
    pub thresholds: SignalThresholds,
    pub bracket: BracketConfig,
    pub broker: BrokerConfig,
    pub telegram: Option<TelegramConfig>,
}

impl AppConfig {
    /// Reads the configuration from the process environment (after `.env`
    /// has been loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let workdir = required("WORKDIR")?;
        let feed_path = lookup("FEED_PATH")
            .unwrap_or_else(|| "data/EURUSD_with_SR_enriched.csv".to_string());
        let model_path =
            lookup("MODEL_PATH").unwrap_or_else(|| "models/strategy.onnx".to_string());
        let instrument = lookup("INSTRUMENT").unwrap_or_else(|| "EUR_USD".to_string());

        let refresh_secs: u64 = parse_or(&lookup, "REFRESH_SECS", 300)?;
        if refresh_secs == 0 {
            return Err(invalid("REFRESH_SECS", "0", "must be positive"));
        }
        let run_once: bool = parse_or(&lookup, "RUN_ONCE", false)?;
        let ledger_tail: usize = parse_or(&lookup, "LEDGER_TAIL", 5)?;

        let defaults = SignalThresholds::default();
        let thresholds = SignalThresholds {
            upper: parse_or(&lookup, "PROB_UPPER", defaults.upper)?,
            lower: parse_or(&lookup, "PROB_LOWER", defaults.lower)?,
        };
        if !(0.0..=1.0).contains(&thresholds.lower)
            || !(0.0..=1.0).contains(&thresholds.upper)
            || thresholds.lower >= thresholds.upper
        {
            return Err(invalid(
                "PROB_LOWER",
                thresholds.lower,
                format!("must satisfy 0 <= PROB_LOWER < PROB_UPPER ({}) <= 1", thresholds.upper),
            ));
        }

        let defaults = BracketConfig::default();
        let bracket = BracketConfig {
            take_profit_offset: parse_or(&lookup, "TP_PIPS", defaults.take_profit_offset)?,
            stop_loss_offset: parse_or(&lookup, "SL_PIPS", defaults.stop_loss_offset)?,
            max_units: parse_or(&lookup, "MAX_UNITS", defaults.max_units)?,
            price_precision: parse_or(&lookup, "PRICE_PRECISION", defaults.price_precision)?,
        };
        if !(bracket.take_profit_offset > 0.0) {
            return Err(invalid("TP_PIPS", bracket.take_profit_offset, "must be positive"));
        }
        if !(bracket.stop_loss_offset > 0.0) {
            return Err(invalid("SL_PIPS", bracket.stop_loss_offset, "must be positive"));
        }
        if bracket.max_units <= 0 {
            return Err(invalid("MAX_UNITS", bracket.max_units, "must be positive"));
        }
        if bracket.price_precision > MAX_PRICE_PRECISION {
            return Err(invalid(
                "PRICE_PRECISION",
                bracket.price_precision,
                format!("must be at most {}", MAX_PRICE_PRECISION),
            ));
        }

        let environment = lookup("OANDA_ENVIRONMENT").unwrap_or_else(|| "practice".to_string());
        let base_url = match lookup("OANDA_BASE_URL") {
            Some(url) => url,
            None => match environment.as_str() {
                "practice" => PRACTICE_URL.to_string(),
                "live" => LIVE_URL.to_string(),
                other => {
                    return Err(invalid(
                        "OANDA_ENVIRONMENT",
                        other,
                        "expected 'practice' or 'live'",
                    ));
                }
            },
        };
        let broker = BrokerConfig {
            api_key: required("OANDA_API_KEY")?,
            account_id: required("OANDA_ACCOUNT_ID")?,
            base_url,
        };

        let telegram = match (lookup("TELEGRAM_BOT_TOKEN"), lookup("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat)) => {
                let chat_id = chat
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| invalid("TELEGRAM_CHAT_ID", &chat, e))?;
                Some(TelegramConfig { token, chat_id })
            }
            _ => None,
        };

        Ok(Self {
            workdir,
            feed_path,
            model_path,
            instrument,
            refresh_interval: Duration::from_secs(refresh_secs),
            run_once,
            ledger_tail,
            thresholds,
            bracket,
            broker,
            telegram,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| invalid(key, &raw, e)),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, value: impl Display, reason: impl Display) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
