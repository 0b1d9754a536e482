use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// A rendered alert addressed to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub channel_id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Trait for implementing notification channels (Telegram, ...)
#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn plugin_type(&self) -> &str;
    fn description(&self) -> &str;

    async fn notify(&self, notification: &Notification) -> Result<NotificationResult>;

    async fn test_connection(&self) -> Result<bool> {
        Ok(true)
    }
}
