//! Reader for the enriched daily EUR/USD series.
//!
//! The file is produced upstream (indicators and support/resistance labels
//! already computed). We only read it: the last row drives the decision and
//! every row with complete OHLC is a candidate settlement bar.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use common::models::{Bar, FeatureSnapshot, SrZone};
use thiserror::Error;
use tracing::{debug, warn};

mod record;

use record::FeedRecord;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to open feed {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse feed: {0}")]
    Csv(#[from] csv::Error),
    #[error("Row {line} has unreadable date '{value}'")]
    BadDate { line: u64, value: String },
    #[error("Feed contains no rows")]
    Empty,
    #[error("Malformed snapshot for {date}: missing or non-finite {missing:?}")]
    MalformedSnapshot {
        date: NaiveDate,
        missing: Vec<&'static str>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct FeedRow {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    wma: Option<f64>,
    ema: Option<f64>,
    sar: Option<f64>,
    rsi: Option<f64>,
    cci: Option<f64>,
    macd_signal: Option<f64>,
    sr_zone: Option<String>,
}

/// The whole series, in file order.
#[derive(Debug, Clone, Default)]
pub struct MarketFeed {
    rows: Vec<FeedRow>,
}

impl MarketFeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FeedError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let feed = Self::from_reader(file)?;
        debug!("Loaded {} feed rows from {}", feed.len(), path.display());
        if feed.is_empty() {
            warn!("Feed {} has a header but no rows", path.display());
        }
        Ok(feed)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeedError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.deserialize::<FeedRecord>() {
            let record = result?;
            let line = rows.len() as u64 + 2;
            let date = parse_date(&record.date).ok_or_else(|| FeedError::BadDate {
                line,
                value: record.date.clone(),
            })?;
            rows.push(FeedRow {
                date,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                wma: record.wma,
                ema: record.ema,
                sar: record.sar,
                rsi: record.rsi,
                cci: record.cci,
                macd_signal: record.macd_signal,
                sr_zone: record.sr_zone.filter(|z| !z.trim().is_empty()),
            });
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Validated features of the most recent row.
    pub fn latest_snapshot(&self) -> Result<FeatureSnapshot, FeedError> {
        let row = self.rows.last().ok_or(FeedError::Empty)?;

        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: Option<f64>| match value {
            Some(v) if v.is_finite() => v,
            _ => {
                missing.push(name);
                f64::NAN
            }
        };

        let close = take("close", row.close);
        let wma = take("wma", row.wma);
        let ema = take("ema", row.ema);
        let sar = take("sar", row.sar);
        let rsi = take("rsi", row.rsi);
        let cci = take("cci", row.cci);
        let macd_signal = take("macd_signal", row.macd_signal);
        if row.sr_zone.is_none() {
            missing.push("sr_zone");
        }

        if !missing.is_empty() {
            warn!("Latest feed row {} is incomplete: {:?}", row.date, missing);
            return Err(FeedError::MalformedSnapshot {
                date: row.date,
                missing,
            });
        }

        Ok(FeatureSnapshot {
            date: row.date,
            close,
            wma,
            ema,
            sar,
            rsi,
            cci,
            macd_signal,
            sr_zone: SrZone::parse(row.sr_zone.as_deref().unwrap_or_default()),
        })
    }

    /// Every row with a complete, finite OHLC, keyed by date.
    pub fn bars(&self) -> BTreeMap<NaiveDate, Bar> {
        self.rows
            .iter()
            .filter_map(|row| {
                let bar = Bar {
                    date: row.date,
                    open: row.open?,
                    high: row.high?,
                    low: row.low?,
                    close: row.close?,
                };
                [bar.open, bar.high, bar.low, bar.close]
                    .iter()
                    .all(|v| v.is_finite())
                    .then_some((bar.date, bar))
            })
            .collect()
    }
}

/// Accepts `YYYY-MM-DD` with an optional trailing time component.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "date,open,high,low,close,wma_wma,ema_ema,sar_sar,rsi_rsi,cci_cci,macd_signal,sr_zone";

    fn feed(body: &str) -> MarketFeed {
        let text = format!("{}\n{}", HEADER, body);
        MarketFeed::from_reader(text.as_bytes()).unwrap()
    }

    #[test]
    fn latest_row_becomes_snapshot() {
        let feed = feed(
            "2024-05-01,1.07,1.08,1.06,1.071,1.07,1.069,1.065,55,80,0.001,neutral\n\
             2024-05-02 00:00:00,1.071,1.075,1.068,1.0725,1.071,1.070,1.066,58,95,0.002,near_support",
        );
        let snap = feed.latest_snapshot().unwrap();

        assert_eq!(snap.date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(snap.close, 1.0725);
        assert_eq!(snap.sr_zone, SrZone::NearSupport);
        assert_eq!(snap.model_features()[0], 1.071_f32);
    }

    #[test]
    fn nan_and_blank_fields_make_snapshot_malformed() {
        let feed = feed("2024-05-02,1.07,1.08,1.06,1.071,1.07,nan,1.065,,80,0.001,");

        match feed.latest_snapshot() {
            Err(FeedError::MalformedSnapshot { missing, .. }) => {
                assert_eq!(missing, vec!["ema", "rsi", "sr_zone"]);
            }
            other => panic!("expected malformed snapshot, got {:?}", other),
        }
    }

    #[test]
    fn missing_column_makes_snapshot_malformed() {
        let text = "date,open,high,low,close,ema,sar,rsi,cci,macd_signal,sr_zone\n\
                    2024-05-02,1.07,1.08,1.06,1.071,1.07,1.065,50,80,0.001,neutral";
        let feed = MarketFeed::from_reader(text.as_bytes()).unwrap();

        match feed.latest_snapshot() {
            Err(FeedError::MalformedSnapshot { missing, .. }) => assert_eq!(missing, vec!["wma"]),
            other => panic!("expected malformed snapshot, got {:?}", other),
        }
    }

    #[test]
    fn short_column_aliases_are_accepted() {
        let text = "date,open,high,low,close,wma,ema,sar,rsi,cci,macd_signal,sr_zone\n\
                    2024-05-02,1.07,1.08,1.06,1.071,1.07,1.069,1.065,50,80,0.001,near_resistance";
        let feed = MarketFeed::from_reader(text.as_bytes()).unwrap();
        let snap = feed.latest_snapshot().unwrap();

        assert_eq!(snap.ema, 1.069);
        assert_eq!(snap.sr_zone, SrZone::NearResistance);
    }

    #[test]
    fn empty_feed_has_no_snapshot() {
        let feed = MarketFeed::from_reader(HEADER.as_bytes()).unwrap();
        assert!(matches!(feed.latest_snapshot(), Err(FeedError::Empty)));
    }

    #[test]
    fn bad_date_is_reported_with_line() {
        let text = format!("{}\nyesterday,1,1,1,1,1,1,1,1,1,1,neutral", HEADER);
        match MarketFeed::from_reader(text.as_bytes()) {
            Err(FeedError::BadDate { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected bad date, got {:?}", other),
        }
    }

    #[test]
    fn bars_skip_rows_without_full_ohlc() {
        let feed = feed(
            "2024-05-01,1.07,1.08,1.06,1.071,1,1,1,1,1,1,neutral\n\
             2024-05-02,1.07,,1.06,1.071,1,1,1,1,1,1,neutral\n\
             2024-05-03,1.07,1.09,1.05,1.08,1,1,1,1,1,1,neutral",
        );
        let bars = feed.bars();

        assert_eq!(bars.len(), 2);
        assert!(!bars.contains_key(&NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()));
        assert_eq!(bars[&NaiveDate::from_ymd_opt(2024, 5, 3).unwrap()].high, 1.09);
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.csv");
        std::fs::write(
            &path,
            format!("{}\n2024-05-01,1.07,1.08,1.06,1.071,1,1,1,1,1,1,neutral\n", HEADER),
        )
        .unwrap();

        let feed = MarketFeed::from_path(&path).unwrap();
        assert_eq!(feed.len(), 1);
        assert!(matches!(
            MarketFeed::from_path(dir.path().join("absent.csv")),
            Err(FeedError::Open { .. })
        ));
    }
}
