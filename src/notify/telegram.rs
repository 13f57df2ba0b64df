// src/notify/telegram.rs

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::debug;

use crate::errors::Result;

use super::Notifier;

const API_BASE: &str = "https://api.telegram.org";

/// Sends messages to one chat through a bot's `sendMessage` endpoint.
pub struct TelegramNotifier {
    http_client: reqwest::Client,
    token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, chat_id, API_BASE)
    }

    /// Same as [`TelegramNotifier::new`] but against another API host.
    pub fn with_base_url(
        token: impl Into<String>,
        chat_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http_client,
            token: token.into(),
            chat_id: chat_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keep the bot token out of logs.
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Notifier for TelegramNotifier {
    fn notify<'a>(
        &'a self,
        message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            debug!(chat_id = %self.chat_id, "sending telegram message");

            let response = self
                .http_client
                .get(self.endpoint())
                .query(&[("chat_id", self.chat_id.as_str()), ("text", message)])
                .send()
                .await
                .context("sending telegram message")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow!("telegram API returned {}: {}", status.as_u16(), body).into());
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_embeds_token() {
        let n = TelegramNotifier::with_base_url("123:abc", "42", "http://localhost:9/").unwrap();
        assert_eq!(n.endpoint(), "http://localhost:9/bot123:abc/sendMessage");
    }

    #[test]
    fn debug_hides_token() {
        let n = TelegramNotifier::new("secret-token", "42").unwrap();
        assert!(!format!("{n:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error_not_a_panic() {
        // Port 9 (discard) on localhost is closed in test environments.
        let n = TelegramNotifier::with_base_url("t", "c", "http://127.0.0.1:9").unwrap();
        assert!(n.notify("hello").await.is_err());
    }
}
