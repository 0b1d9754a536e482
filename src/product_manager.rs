use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::database::ProductStore;
use crate::models::{ExtractedObservation, TargetSpec, TrackedProduct, UNNAMED_PRODUCT};
use crate::plugins::PluginManager;
use crate::tracker::{ProductCheckResult, Tracker};
use crate::utils::error::{AppError, Result};

/// What `add_tracking` learned while registering a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackingOutcome {
    pub product: TrackedProduct,
    /// First reading of the page, `None` when the fetch or price extraction failed.
    pub observation: Option<ExtractedObservation>,
}

/// Front-end operations on tracked products.
#[derive(Clone)]
pub struct ProductManager {
    store: ProductStore,
    plugins: PluginManager,
    tracker: Tracker,
}

impl ProductManager {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            store: tracker.store().clone(),
            plugins: tracker.plugins().clone(),
            tracker,
        }
    }

    /// Starts tracking `url` with the given goals.
    ///
    /// The page is fetched once for the name and a first price. A failed fetch
    /// does not block the add; the product is stored unobserved and the next
    /// cycle tries again. No alert is sent from here.
    pub async fn add_tracking(&self, url: &str, targets: TargetSpec) -> Result<AddTrackingOutcome> {
        let url = url.trim();
        Url::parse(url).map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", url, e)))?;
        targets.validate()?;

        let source = self.plugins.resolve(url).await?;

        let active = self.store.get_active().await?;
        if active.iter().any(|product| product.url == url) {
            return Err(AppError::DuplicateTracking { url: url.to_string() });
        }

        let (name, observation) = match source.fetch(url).await {
            Ok(document) => match source.extract(&document) {
                Ok(observation) => (observation.name.clone(), Some(observation)),
                Err(e) => {
                    tracing::warn!(url, error = %e, "No price on first fetch");
                    (source.extract_name(&document), None)
                }
            },
            Err(e) => {
                tracing::warn!(url, error = %e, "First fetch failed, storing product unobserved");
                (UNNAMED_PRODUCT.to_string(), None)
            }
        };

        // one insert carrying the first reading: a cycle never sees the row unpriced
        let id = self
            .store
            .add_observed_product(
                url,
                &name,
                targets.target_price,
                targets.target_discount_percent,
                observation.as_ref(),
            )
            .await?;

        tracing::info!(product_id = id, url, name = %name, "Started tracking product");

        Ok(AddTrackingOutcome {
            product: self.store.get_by_id(id).await?,
            observation,
        })
    }

    pub async fn list_active(&self) -> Result<Vec<TrackedProduct>> {
        self.store.get_active().await
    }

    /// Stops tracking; returns the product as it was before removal.
    pub async fn remove_tracking(&self, id: i64) -> Result<TrackedProduct> {
        let product = self.active_product(id).await?;
        self.store.deactivate(id).await?;
        tracing::info!(product_id = id, "Stopped tracking product");
        Ok(product)
    }

    /// Fetches, stores and evaluates one product immediately.
    pub async fn check_now(&self, id: i64) -> Result<ProductCheckResult> {
        self.active_product(id).await?;
        self.tracker.check_one(id).await
    }

    pub async fn get_product(&self, id: i64) -> Result<TrackedProduct> {
        self.store.get_by_id(id).await
    }

    async fn active_product(&self, id: i64) -> Result<TrackedProduct> {
        let product = self.store.get_by_id(id).await?;
        if !product.is_active {
            return Err(AppError::NotFound {
                resource: format!("product {}", id),
            });
        }
        Ok(product)
    }
}
