use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::database::ProductStore;
use crate::evaluator::PromotionEvaluator;
use crate::models::{ExtractedObservation, PromotionDecision, TrackedProduct};
use crate::plugins::{Notification, PluginManager};
use crate::utils::error::{AppError, Result};

/// Notifier plugin that receives promotion alerts.
pub const ALERT_NOTIFIER: &str = "telegram";

/// One async mutex per product id.
///
/// Held across read-snapshot, fetch, persist and evaluate so a scheduled cycle and
/// an on-demand check never interleave on the same product.
#[derive(Clone, Default)]
pub struct ProductLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, product_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.entry(product_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCheckResult {
    pub product_id: i64,
    /// Stored state before this check.
    pub previous: TrackedProduct,
    pub observation: ExtractedObservation,
    pub decision: PromotionDecision,
    pub notified: bool,
}

impl ProductCheckResult {
    pub fn price(&self) -> f64 {
        self.observation.price
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub notifications_sent: usize,
}

/// Checks tracked products and dispatches promotion alerts.
#[derive(Clone)]
pub struct Tracker {
    store: ProductStore,
    plugins: PluginManager,
    evaluator: PromotionEvaluator,
    locks: ProductLocks,
    channel_id: i64,
    request_delay: Duration,
}

impl Tracker {
    pub fn new(store: ProductStore, plugins: PluginManager, channel_id: i64) -> Self {
        Self {
            store,
            plugins,
            evaluator: PromotionEvaluator::new(),
            locks: ProductLocks::new(),
            channel_id,
            request_delay: Duration::from_millis(2000),
        }
    }

    /// Pause between two products of one cycle.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    /// Checks every active product once, in id order.
    ///
    /// A failing product is logged and counted; it never stops the cycle.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let started = Instant::now();
        let products = self.store.get_active().await?;
        let mut summary = CycleSummary::default();

        tracing::info!(products = products.len(), "Starting price check cycle");

        for (index, product) in products.iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            summary.checked += 1;
            match self.check_product(product.id).await {
                Ok(result) => {
                    summary.succeeded += 1;
                    if result.notified {
                        summary.notifications_sent += 1;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    if e.is_extraction_failure() {
                        tracing::warn!(product_id = product.id, url = %product.url, error = %e, "Could not read price, keeping stale value");
                    } else {
                        tracing::warn!(product_id = product.id, url = %product.url, error = %e, "Product check failed");
                    }
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            succeeded = summary.succeeded,
            failed = summary.failed,
            notifications = summary.notifications_sent,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Price check cycle finished"
        );
        Ok(summary)
    }

    /// Checks a single active product right away.
    pub async fn check_one(&self, product_id: i64) -> Result<ProductCheckResult> {
        self.check_product(product_id).await
    }

    async fn check_product(&self, product_id: i64) -> Result<ProductCheckResult> {
        let _guard = self.locks.acquire(product_id).await;

        // Re-read under the lock, the caller's copy may be stale
        let previous = self.store.get_by_id(product_id).await?;
        if !previous.is_active {
            return Err(AppError::NotFound {
                resource: format!("product {}", product_id),
            });
        }

        let source = self.plugins.resolve(&previous.url).await?;
        let observation = source.observe(&previous.url).await?;
        tracing::debug!(
            product_id,
            price = observation.price,
            original_price = observation.original_price,
            discount = observation.discount_percent,
            "Observed product"
        );

        self.store.record_observation(product_id, &observation).await?;

        let decision = self.evaluator.decide(&previous, &observation);
        let notified = self.dispatch(&previous, &observation, &decision).await;

        Ok(ProductCheckResult {
            product_id,
            previous,
            observation,
            decision,
            notified,
        })
    }

    async fn dispatch(
        &self,
        product: &TrackedProduct,
        observation: &ExtractedObservation,
        decision: &PromotionDecision,
    ) -> bool {
        let Some(message) = decision.render_message(product, observation) else {
            return false;
        };

        let notification = Notification {
            channel_id: self.channel_id,
            message,
        };

        match self.plugins.send_notification(ALERT_NOTIFIER, &notification).await {
            Ok(_) => {
                tracing::info!(product_id = product.id, kind = decision.kind(), "Promotion notification sent");
                true
            }
            Err(e) => {
                tracing::error!(product_id = product.id, error = %e, "Failed to send promotion notification");
                false
            }
        }
    }
}
