use std::sync::Arc;

use common::models::{OrderReceipt, TradePlan};
use common::traits::{OrderSubmitter, SubmissionError};
use tracing::{error, info};

/// Sends planned orders to the broker. One attempt, no retry.
#[derive(Clone)]
pub struct ExecutionService {
    submitter: Arc<dyn OrderSubmitter>,
}

impl ExecutionService {
    pub fn new(submitter: Arc<dyn OrderSubmitter>) -> Self {
        Self { submitter }
    }

    pub async fn execute(&self, plan: &TradePlan) -> Result<OrderReceipt, SubmissionError> {
        info!(
            "EXECUTING: {} {} {} @ {:.5} TP={:.5} SL={:.5}",
            plan.direction,
            plan.units,
            plan.instrument,
            plan.entry_price,
            plan.take_profit_price,
            plan.stop_loss_price
        );

        match self.submitter.submit(plan).await {
            Ok(receipt) => {
                info!(
                    "ORDER EXECUTED: ID={}, Fill={:?}",
                    receipt.order_id, receipt.fill_price
                );
                Ok(receipt)
            }
            Err(e) => {
                error!("ORDER FAILED: {}", e);
                Err(e)
            }
        }
    }
}
