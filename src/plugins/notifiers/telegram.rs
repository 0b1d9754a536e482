use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::plugins::traits::{Notification, NotificationResult, NotifierPlugin};
use crate::utils::error::{AppError, Result};

/// Bot API limit for one message.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct BotUser {
    username: Option<String>,
}

/// Telegram Bot API client used both for alerts and for the command loop.
pub struct TelegramNotifier {
    client: Client,
    api_base_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        // long polling holds the request open for poll_timeout_secs
        let client = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 15))
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base_url, self.bot_token, method)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await?;

        // error responses still carry a JSON body with `description`
        let body: ApiResponse<T> = response.json().await?;
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(AppError::Plugin {
                plugin_type: "telegram".to_string(),
                message: body
                    .description
                    .unwrap_or_else(|| format!("{} failed", method)),
            }),
        }
    }

    /// Sends `text`, split into several messages when it exceeds the API limit.
    /// Returns the id of the last message sent.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let mut last_id = 0;
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            let sent: SentMessage = self
                .call(
                    "sendMessage",
                    json!({
                        "chat_id": chat_id,
                        "text": chunk,
                        "disable_web_page_preview": true,
                    }),
                )
                .await?;
            last_id = sent.message_id;
        }
        Ok(last_id)
    }

    /// Long-polls for new updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset);
        }
        self.call("getUpdates", payload).await
    }

    /// Bot username from `getMe`. Fails when the token is rejected.
    pub async fn bot_username(&self) -> Result<Option<String>> {
        let me: BotUser = self.call("getMe", json!({})).await?;
        Ok(me.username)
    }
}

/// Splits on line boundaries so no piece exceeds `limit` characters. A single
/// line longer than the limit is cut hard.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl NotifierPlugin for TelegramNotifier {
    fn name(&self) -> &str {
        "Telegram Notifier"
    }

    fn plugin_type(&self) -> &str {
        "telegram"
    }

    fn description(&self) -> &str {
        "Sends plain-text alerts through the Telegram Bot API"
    }

    async fn notify(&self, notification: &Notification) -> Result<NotificationResult> {
        match self.send_message(notification.channel_id, &notification.message).await {
            Ok(message_id) => Ok(NotificationResult {
                success: true,
                message_id: Some(message_id.to_string()),
                error: None,
            }),
            Err(AppError::Plugin { message, .. }) => Ok(NotificationResult {
                success: false,
                message_id: None,
                error: Some(message),
            }),
            Err(e) => Err(e),
        }
    }

    async fn test_connection(&self) -> Result<bool> {
        Ok(self.bot_username().await.is_ok())
    }
}
