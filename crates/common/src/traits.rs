use async_trait::async_trait;
use thiserror::Error;

use crate::models::{OrderReceipt, TradePlan};

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("Model inference failed: {0}")]
    Inference(String),
    #[error("Model returned probability {0} outside [0, 1]")]
    OutOfRange(f64),
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Broker transport failed: {0}")]
    Transport(String),
    #[error("Broker returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Broker rejected order: {0}")]
    Rejected(String),
    #[error("Unreadable broker response: {0}")]
    Decode(String),
}

/// Maps a model feature vector to the probability that price goes up.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Scorer: Send + Sync {
    fn score(&self, features: &[f32]) -> Result<f64, ScoreError>;
}

/// Places a market order with take-profit and stop-loss attached.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OrderSubmitter: Send + Sync {
    async fn submit(&self, plan: &TradePlan) -> Result<OrderReceipt, SubmissionError>;
}
