// Integration tests for promo-watcher
// Components are wired together with scripted sources and a recording notifier,
// HTTP edges are served by wiremock.

pub mod cycle_tests;
pub mod product_manager_tests;
pub mod telegram_tests;

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use promo_watcher::{
    AppError,
    database::ProductStore,
    models::ExtractedObservation,
    plugins::{Notification, NotificationResult, NotifierPlugin, PluginManager, SourceAdapter},
    product_manager::ProductManager,
    tracker::Tracker,
};

pub const CHANNEL_ID: i64 = 4242;
pub const FAKE_HOST: &str = "https://shop.test";

/// One scripted answer for a product page.
#[derive(Debug, Clone)]
pub enum Page {
    Offer(ExtractedObservation),
    /// Page downloads but carries no price.
    NoPrice,
    /// Server answers with this status.
    Status(u16),
}

/// Source adapter for `https://shop.test/...` answering from a per-URL script.
/// The last scripted page repeats once the script runs out.
#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<HashMap<String, VecDeque<Page>>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, pages: Vec<Page>) {
        self.pages.lock().unwrap().insert(url.to_string(), pages.into());
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    fn next_page(&self, url: &str) -> Page {
        let mut pages = self.pages.lock().unwrap();
        match pages.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Page::Status(404)),
            None => Page::Status(404),
        }
    }
}

#[async_trait]
impl SourceAdapter for FakeSource {
    fn name(&self) -> &str {
        "Fake Shop"
    }

    fn source_type(&self) -> &str {
        "fake"
    }

    fn can_handle(&self, url: &str) -> bool {
        url.starts_with(FAKE_HOST)
    }

    async fn fetch(&self, url: &str) -> promo_watcher::Result<String> {
        self.fetches.lock().unwrap().push(url.to_string());
        match self.next_page(url) {
            Page::Offer(observation) => Ok(serde_json::to_string(&observation)?),
            Page::NoPrice => Ok("{}".to_string()),
            Page::Status(status) => Err(AppError::Fetch {
                url: url.to_string(),
                status,
            }),
        }
    }

    fn extract(&self, document: &str) -> promo_watcher::Result<ExtractedObservation> {
        serde_json::from_str(document).map_err(|_| AppError::PriceNotFound)
    }
}

/// Telegram stand-in that keeps every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "telegram"
    }

    fn description(&self) -> &str {
        "Keeps notifications in memory"
    }

    async fn notify(&self, notification: &Notification) -> promo_watcher::Result<NotificationResult> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(NotificationResult {
            success: true,
            message_id: Some(self.sent.lock().unwrap().len().to_string()),
            error: None,
        })
    }
}

pub struct TestContext {
    pub store: ProductStore,
    pub source: Arc<FakeSource>,
    pub notifier: Arc<RecordingNotifier>,
    pub tracker: Tracker,
    pub manager: ProductManager,
}

/// In-memory store, fake source and recording notifier, no request delay.
pub async fn create_test_context() -> anyhow::Result<TestContext> {
    let store = ProductStore::in_memory().await?;
    let source = FakeSource::new();
    let notifier = RecordingNotifier::new();

    let plugins = PluginManager::new();
    plugins.register_source(source.clone()).await;
    plugins.register_notifier(notifier.clone()).await;

    let tracker = Tracker::new(store.clone(), plugins, CHANNEL_ID).with_request_delay(Duration::ZERO);
    let manager = ProductManager::new(tracker.clone());

    Ok(TestContext {
        store,
        source,
        notifier,
        tracker,
        manager,
    })
}

pub fn product_url(slug: &str) -> String {
    format!("{}/{}", FAKE_HOST, slug)
}
