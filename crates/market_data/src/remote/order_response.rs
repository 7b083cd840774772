use common::models::OrderReceipt;
use common::traits::SubmissionError;
use serde::Deserialize;

use crate::traits::RemoteResponse;

#[derive(Debug, Deserialize)]
pub struct TransactionRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct FillTransaction {
    pub id: String,
    #[serde(rename(deserialize = "orderID"))]
    pub order_id: Option<String>,
    pub price: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelTransaction {
    pub reason: Option<String>,
}

/// Body of `POST /v3/accounts/{id}/orders`, success or failure.
#[derive(Debug, Deserialize)]
pub struct OrderCreateResponse {
    #[serde(rename(deserialize = "orderCreateTransaction"))]
    pub create: Option<TransactionRef>,
    #[serde(rename(deserialize = "orderFillTransaction"))]
    pub fill: Option<FillTransaction>,
    #[serde(rename(deserialize = "orderCancelTransaction"))]
    pub cancel: Option<CancelTransaction>,
    #[serde(rename(deserialize = "errorMessage"))]
    pub error_message: Option<String>,
    #[serde(rename(deserialize = "errorCode"))]
    pub error_code: Option<String>,
}

impl RemoteResponse<OrderReceipt> for OrderCreateResponse {
    fn to_domain(&self) -> Result<OrderReceipt, SubmissionError> {
        if let Some(message) = &self.error_message {
            let code = self.error_code.as_deref().unwrap_or("UNKNOWN");
            return Err(SubmissionError::Rejected(format!("{}: {}", code, message)));
        }
        if let Some(cancel) = &self.cancel {
            let reason = cancel.reason.clone().unwrap_or_else(|| "CANCELLED".to_string());
            return Err(SubmissionError::Rejected(reason));
        }
        if let Some(fill) = &self.fill {
            let order_id = fill
                .order_id
                .clone()
                .or_else(|| self.create.as_ref().map(|c| c.id.clone()))
                .unwrap_or_else(|| fill.id.clone());
            let fill_price = match &fill.price {
                Some(p) => Some(p.parse::<f64>().map_err(|e| {
                    SubmissionError::Decode(format!("fill price '{}': {}", p, e))
                })?),
                None => None,
            };
            return Ok(OrderReceipt {
                order_id,
                fill_price,
            });
        }
        match &self.create {
            Some(create) => Ok(OrderReceipt {
                order_id: create.id.clone(),
                fill_price: None,
            }),
            None => Err(SubmissionError::Decode(
                "response carries no order transaction".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> OrderCreateResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn filled_order_yields_receipt_with_price() {
        let resp = parse(
            r#"{
                "orderCreateTransaction": {"id": "6356", "type": "MARKET_ORDER"},
                "orderFillTransaction": {"id": "6357", "orderID": "6356", "price": "1.10012"},
                "lastTransactionID": "6357"
            }"#,
        );
        let receipt = resp.to_domain().unwrap();

        assert_eq!(receipt.order_id, "6356");
        assert_eq!(receipt.fill_price, Some(1.10012));
    }

    #[test]
    fn cancelled_order_is_rejected_with_reason() {
        let resp = parse(
            r#"{
                "orderCreateTransaction": {"id": "6356"},
                "orderCancelTransaction": {"id": "6357", "reason": "INSUFFICIENT_MARGIN"}
            }"#,
        );
        match resp.to_domain() {
            Err(SubmissionError::Rejected(reason)) => assert_eq!(reason, "INSUFFICIENT_MARGIN"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn error_body_is_rejected_with_code() {
        let resp = parse(r#"{"errorCode": "MARKET_HALTED", "errorMessage": "Market is halted"}"#);
        match resp.to_domain() {
            Err(SubmissionError::Rejected(reason)) => {
                assert_eq!(reason, "MARKET_HALTED: Market is halted")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn empty_body_cannot_be_decoded() {
        assert!(matches!(
            parse("{}").to_domain(),
            Err(SubmissionError::Decode(_))
        ));
    }
}
