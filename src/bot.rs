use std::sync::Arc;
use std::time::Duration;

use crate::commands::CommandHandler;
use crate::plugins::notifiers::telegram::{TelegramNotifier, Update};
use crate::utils::error::Result;

/// Pause after a failed poll.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polling loop feeding chat messages to the command handler.
pub struct BotRunner {
    telegram: Arc<TelegramNotifier>,
    handler: CommandHandler,
    poll_timeout_secs: u64,
}

impl BotRunner {
    pub fn new(telegram: Arc<TelegramNotifier>, handler: CommandHandler, poll_timeout_secs: u64) -> Self {
        Self {
            telegram,
            handler,
            poll_timeout_secs,
        }
    }

    /// Polls forever. Each update is handled on its own task so a slow `/check`
    /// does not hold up the next poll.
    pub async fn run(&self) {
        let mut offset: Option<i64> = None;
        tracing::info!("Bot polling started");

        loop {
            match self.telegram.get_updates(offset, self.poll_timeout_secs).await {
                Ok(updates) => {
                    for update in updates {
                        offset = Some(update.update_id + 1);

                        let telegram = Arc::clone(&self.telegram);
                        let handler = self.handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = process_update(&telegram, &handler, update).await {
                                tracing::error!(error = %e, "Failed to answer command");
                            }
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Polling for updates failed, retrying");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

/// Answers one update. Returns whether a reply was sent.
pub async fn process_update(
    telegram: &TelegramNotifier,
    handler: &CommandHandler,
    update: Update,
) -> Result<bool> {
    let Some(message) = update.message else {
        return Ok(false);
    };
    let Some(text) = message.text.as_deref() else {
        return Ok(false);
    };

    let chat_id = message.chat.id;
    let Some(reply) = handler.handle(chat_id, text).await else {
        return Ok(false);
    };

    telegram.send_message(chat_id, &reply).await?;
    Ok(true)
}
