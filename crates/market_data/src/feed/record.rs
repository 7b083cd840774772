use serde::Deserialize;

/// Raw CSV row. Numeric fields that are blank or unparseable come through
/// as `None`; absent columns default to `None` so the snapshot validator can
/// name them.
#[derive(Debug, Deserialize)]
pub(super) struct FeedRecord {
    pub date: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub open: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub low: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub close: Option<f64>,
    #[serde(default, rename = "wma_wma", alias = "wma", deserialize_with = "csv::invalid_option")]
    pub wma: Option<f64>,
    #[serde(default, rename = "ema_ema", alias = "ema", deserialize_with = "csv::invalid_option")]
    pub ema: Option<f64>,
    #[serde(default, rename = "sar_sar", alias = "sar", deserialize_with = "csv::invalid_option")]
    pub sar: Option<f64>,
    #[serde(default, rename = "rsi_rsi", alias = "rsi", deserialize_with = "csv::invalid_option")]
    pub rsi: Option<f64>,
    #[serde(default, rename = "cci_cci", alias = "cci", deserialize_with = "csv::invalid_option")]
    pub cci: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub macd_signal: Option<f64>,
    #[serde(default)]
    pub sr_zone: Option<String>,
}
