use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Notifier;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            token,
            chat_id,
            base_url: API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    /// Point at a different Bot API host (local bot server, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }

    async fn send_once(&self, payload: &SendMessage<'_>) -> Result<(), SendFailure> {
        let rsp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let connect = e.is_connect();
                let err = anyhow::Error::new(e).context("telegram request");
                if connect {
                    SendFailure::NotSent(err)
                } else {
                    SendFailure::Unknown(err)
                }
            })?;

        let status = rsp.status();
        let body: TgResponse = rsp
            .json()
            .await
            .map_err(|e| SendFailure::Unknown(anyhow::Error::new(e).context("decode telegram response")))?;
        if !body.ok {
            return Err(SendFailure::Unknown(anyhow!(
                "telegram error {status}: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// Why an attempt failed. Only a connect failure proves the message never
/// left; anything later may already be in the chat.
enum SendFailure {
    NotSent(anyhow::Error),
    Unknown(anyhow::Error),
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, text: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            match self.send_once(&payload).await {
                Ok(()) => return Ok(()),
                Err(SendFailure::NotSent(e)) if attempt < self.max_retries => {
                    tracing::debug!(attempt, error = %format!("{e:#}"), "telegram unreachable, retrying");
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(SendFailure::NotSent(e)) => {
                    return Err(e.context(format!("telegram unreachable after {attempt} attempts")))
                }
                // Timeouts and bad replies are not retried: the message may have landed.
                Err(SendFailure::Unknown(e)) => return Err(e),
            }
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct TgResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}
