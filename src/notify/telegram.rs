use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use crate::notify::Notifier;

/// Sends outcome messages through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: Option<String>,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build notifier HTTP client"),
            bot_token,
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, requester_id: i64, text: &str) -> anyhow::Result<()> {
        let token = match &self.bot_token {
            Some(t) => t,
            None => {
                tracing::debug!(requester_id, "no bot token configured, skipping notification");
                return Ok(());
            }
        };

        let resp = self
            .client
            .post(format!("https://api.telegram.org/bot{}/sendMessage", token))
            .json(&SendMessage {
                chat_id: requester_id,
                text,
            })
            .send()
            .await
            .context("failed to send telegram notification")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("telegram returned error: status={}, body={}", status, body);
        }

        tracing::debug!(requester_id, "notification delivered");
        Ok(())
    }
}
