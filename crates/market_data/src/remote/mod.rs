pub mod oanda_client;
pub mod order_response;

pub use oanda_client::OandaClient;
pub use order_response::OrderCreateResponse;
