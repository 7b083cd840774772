use std::time::Duration;

use async_trait::async_trait;
use common::config::BrokerConfig;
use common::models::{OrderReceipt, TradePlan};
use common::traits::{OrderSubmitter, SubmissionError};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use crate::remote::OrderCreateResponse;
use crate::traits::RemoteResponse;

#[derive(Debug, Serialize)]
pub struct PriceBound {
    pub price: String,
}

#[derive(Debug, Serialize)]
pub struct MarketOrder {
    pub instrument: String,
    pub units: String,
    #[serde(rename = "type")]
    pub order_type: &'static str, // MARKET
    #[serde(rename = "positionFill")]
    pub position_fill: &'static str,
    #[serde(rename = "takeProfitOnFill")]
    pub take_profit_on_fill: PriceBound,
    #[serde(rename = "stopLossOnFill")]
    pub stop_loss_on_fill: PriceBound,
}

#[derive(Debug, Serialize)]
pub struct OrderRequest {
    pub order: MarketOrder,
}

impl OrderRequest {
    pub fn market_bracket(plan: &TradePlan, precision: u32) -> Self {
        let price = |p: f64| PriceBound {
            price: format!("{:.*}", precision as usize, p),
        };
        Self {
            order: MarketOrder {
                instrument: plan.instrument.clone(),
                units: plan.units.to_string(),
                order_type: "MARKET",
                position_fill: "DEFAULT",
                take_profit_on_fill: price(plan.take_profit_price),
                stop_loss_on_fill: price(plan.stop_loss_price),
            },
        }
    }
}

/// OANDA v20 REST client, order placement only.
#[derive(Clone)]
pub struct OandaClient {
    client: Client,
    base_url: String,
    api_key: String,
    account_id: String,
    price_precision: u32,
}

/// Upper bound on one order round trip. The ledger stays write-locked for
/// the whole call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

impl OandaClient {
    pub fn new(config: &BrokerConfig, price_precision: u32) -> Result<Self, SubmissionError> {
        Self::with_timeout(config, price_precision, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        config: &BrokerConfig,
        price_precision: u32,
        timeout: Duration,
    ) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            account_id: config.account_id.clone(),
            price_precision,
        })
    }

    fn orders_url(&self) -> String {
        format!("{}/v3/accounts/{}/orders", self.base_url, self.account_id)
    }

    pub async fn post_order(&self, plan: &TradePlan) -> Result<OrderReceipt, SubmissionError> {
        let body = OrderRequest::market_bracket(plan, self.price_precision);
        info!(
            "Placing Order: {} {} {} TP={} SL={}",
            plan.direction,
            plan.units,
            plan.instrument,
            body.order.take_profit_on_fill.price,
            body.order.stop_loss_on_fill.price
        );

        let resp = self
            .client
            .post(self.orders_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SubmissionError::Transport(e.to_string()))?;

        let parsed = serde_json::from_str::<OrderCreateResponse>(&text);
        if !status.is_success() {
            error!("OANDA Order Failed ({}): {}", status, text);
            // Prefer the broker's own reason when the error body is readable.
            return match parsed {
                Ok(body) if body.error_message.is_some() || body.cancel.is_some() => {
                    body.to_domain()
                }
                _ => Err(SubmissionError::Http {
                    status: status.as_u16(),
                    body: text,
                }),
            };
        }

        parsed
            .map_err(|e| SubmissionError::Decode(e.to_string()))?
            .to_domain()
    }
}

#[async_trait]
impl OrderSubmitter for OandaClient {
    async fn submit(&self, plan: &TradePlan) -> Result<OrderReceipt, SubmissionError> {
        self.post_order(plan).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Direction;

    fn short_plan() -> TradePlan {
        TradePlan {
            instrument: "EUR_USD".into(),
            direction: Direction::Short,
            units: -1000,
            entry_price: 1.1,
            take_profit_price: 1.095,
            stop_loss_price: 1.103,
        }
    }

    #[test]
    fn request_body_matches_v20_schema() {
        let body = serde_json::to_value(OrderRequest::market_bracket(&short_plan(), 5)).unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "order": {
                    "instrument": "EUR_USD",
                    "units": "-1000",
                    "type": "MARKET",
                    "positionFill": "DEFAULT",
                    "takeProfitOnFill": {"price": "1.09500"},
                    "stopLossOnFill": {"price": "1.10300"}
                }
            })
        );
    }

    #[test]
    fn orders_url_ignores_trailing_slash() {
        let client = OandaClient::new(
            &BrokerConfig {
                api_key: "k".into(),
                account_id: "101-004-1".into(),
                base_url: "https://api-fxpractice.oanda.com/".into(),
            },
            5,
        )
        .unwrap();
        assert_eq!(
            client.orders_url(),
            "https://api-fxpractice.oanda.com/v3/accounts/101-004-1/orders"
        );
    }

    #[tokio::test]
    async fn unreachable_broker_is_a_transport_failure() {
        let client = OandaClient::new(
            &BrokerConfig {
                api_key: "k".into(),
                account_id: "1".into(),
                base_url: "http://127.0.0.1:9".into(),
            },
            5,
        )
        .unwrap();
        let err = client.submit(&short_plan()).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Transport(_)));
    }

    #[tokio::test]
    async fn silent_broker_times_out_as_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept and hold the socket without ever answering
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = OandaClient::with_timeout(
            &BrokerConfig {
                api_key: "k".into(),
                account_id: "1".into(),
                base_url: format!("http://{}", addr),
            },
            5,
            Duration::from_millis(200),
        )
        .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), client.submit(&short_plan()))
            .await
            .expect("client timeout should fire before the test deadline");
        assert!(matches!(result, Err(SubmissionError::Transport(_))));
        server.abort();
    }
}
