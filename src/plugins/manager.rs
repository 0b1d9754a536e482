use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::notifiers::TelegramNotifier;
use super::sources::MercadoLivreSource;
use super::traits::{Notification, NotificationResult, NotifierPlugin, SourceAdapter};
use crate::config::AppConfig;
use crate::utils::error::{AppError, Result};

pub type SourceAdapterRef = Arc<dyn SourceAdapter>;
pub type NotifierPluginRef = Arc<dyn NotifierPlugin>;

/// Registry of source adapters (ordered) and notifiers (by type).
#[derive(Clone)]
pub struct PluginManager {
    sources: Arc<RwLock<Vec<SourceAdapterRef>>>,
    notifiers: Arc<RwLock<HashMap<String, NotifierPluginRef>>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            sources: Arc::new(RwLock::new(Vec::new())),
            notifiers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a source adapter. Registration order is lookup order; registering
    /// a type again replaces the earlier adapter in place.
    pub async fn register_source(&self, source: SourceAdapterRef) {
        let mut sources = self.sources.write().await;
        match sources
            .iter()
            .position(|existing| existing.source_type() == source.source_type())
        {
            Some(index) => sources[index] = source,
            None => sources.push(source),
        }
    }

    /// Register a notifier plugin
    pub async fn register_notifier(&self, plugin: NotifierPluginRef) {
        let plugin_type = plugin.plugin_type().to_string();
        let mut notifiers = self.notifiers.write().await;
        notifiers.insert(plugin_type, plugin);
    }

    /// Registers the Mercado Livre source and the Telegram notifier.
    pub async fn initialize_default_plugins(&self, config: &AppConfig) -> Result<()> {
        self.register_source(Arc::new(MercadoLivreSource::new(&config.scraper)?))
            .await;
        self.register_notifier(Arc::new(TelegramNotifier::new(&config.telegram)?))
            .await;
        Ok(())
    }

    /// First registered adapter claiming the URL.
    pub async fn resolve(&self, url: &str) -> Result<SourceAdapterRef> {
        let sources = self.sources.read().await;
        sources
            .iter()
            .find(|source| source.can_handle(url))
            .cloned()
            .ok_or_else(|| AppError::UnsupportedSource { url: url.to_string() })
    }

    pub async fn has_source(&self, source_type: &str) -> bool {
        let sources = self.sources.read().await;
        sources.iter().any(|source| source.source_type() == source_type)
    }

    pub async fn has_notifier(&self, plugin_type: &str) -> bool {
        let notifiers = self.notifiers.read().await;
        notifiers.contains_key(plugin_type)
    }

    /// Source types in lookup order
    pub async fn list_source_types(&self) -> Vec<String> {
        let sources = self.sources.read().await;
        sources.iter().map(|source| source.source_type().to_string()).collect()
    }

    pub async fn list_notifier_types(&self) -> Vec<String> {
        let notifiers = self.notifiers.read().await;
        notifiers.keys().cloned().collect()
    }

    pub async fn get_notifier(&self, plugin_type: &str) -> Option<NotifierPluginRef> {
        let notifiers = self.notifiers.read().await;
        notifiers.get(plugin_type).cloned()
    }

    /// Send notification using a notifier plugin
    pub async fn send_notification(
        &self,
        plugin_type: &str,
        notification: &Notification,
    ) -> Result<NotificationResult> {
        let notifier = self.get_notifier(plugin_type).await.ok_or_else(|| AppError::Plugin {
            plugin_type: plugin_type.to_string(),
            message: "notifier plugin not registered".to_string(),
        })?;

        let result = notifier.notify(notification).await?;
        if result.success {
            Ok(result)
        } else {
            Err(AppError::Plugin {
                plugin_type: plugin_type.to_string(),
                message: result.error.unwrap_or_else(|| "delivery failed".to_string()),
            })
        }
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
