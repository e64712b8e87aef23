use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Telegram rejected the message: {0}")]
    Api(String),
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends HTML-formatted messages to one chat through the Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    #[must_use]
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .user_agent("toribot/0.1")
                .build()
                .unwrap_or_else(|_| Client::new()),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub async fn send_message(&self, html: &str) -> Result<(), TelegramError> {
        let url = format!("{TELEGRAM_API}/bot{}/sendMessage", self.bot_token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text: html,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        };

        let response: ApiResponse = self.client.post(url).json(&body).send().await?.json().await?;

        if !response.ok {
            return Err(TelegramError::Api(
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!(chat_id = %self.chat_id, "Telegram message sent");
        Ok(())
    }
}
