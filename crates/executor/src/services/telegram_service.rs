use common::config::TelegramConfig;
use teloxide::prelude::*;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Forwards operator notifications to a Telegram chat.
pub struct TelegramService {
    bot: Bot,
    chat_id: ChatId,
    tag: String,
}

impl TelegramService {
    pub fn new(config: &TelegramConfig, instrument: &str) -> Self {
        Self {
            bot: Bot::new(&config.token),
            chat_id: ChatId(config.chat_id),
            tag: format!("[{}]", instrument),
        }
    }

    fn format(&self, msg: &str) -> String {
        format!("{} {}", self.tag, msg)
    }

    /// Delivers messages until every sender is gone.
    pub async fn start(self, mut rx: broadcast::Receiver<String>) {
        info!("Starting Telegram notifications for chat {}", self.chat_id);

        loop {
            match rx.recv().await {
                Ok(msg) => {
                    // delivery failures never reach the trading cycle
                    if let Err(e) = self.bot.send_message(self.chat_id, self.format(&msg)).await {
                        error!("Failed to send Telegram message: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Telegram service lagged behind. Missed {} messages.", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Notification channel closed. Stopping Telegram service.");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged_with_instrument() {
        let svc = TelegramService::new(
            &TelegramConfig {
                token: "123:abc".into(),
                chat_id: 42,
            },
            "EUR_USD",
        );
        assert_eq!(svc.format("Trade sent"), "[EUR_USD] Trade sent");
    }
}
