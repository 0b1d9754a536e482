use async_trait::async_trait;

use crate::models::{ExtractedObservation, UNNAMED_PRODUCT};
use crate::utils::error::Result;

/// A marketplace the tracker knows how to read.
///
/// `can_handle` must stay a pure check on the URL; the registry calls it for every
/// adapter on every lookup.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Plugin metadata
    fn name(&self) -> &str;
    fn source_type(&self) -> &str;

    fn can_handle(&self, url: &str) -> bool;

    /// Downloads the raw product page.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Reads an observation out of a downloaded page.
    fn extract(&self, document: &str) -> Result<ExtractedObservation>;

    /// Product name alone, for pages whose price could not be read.
    fn extract_name(&self, document: &str) -> String {
        self.extract(document)
            .map(|observation| observation.name)
            .unwrap_or_else(|_| UNNAMED_PRODUCT.to_string())
    }

    async fn observe(&self, url: &str) -> Result<ExtractedObservation> {
        let document = self.fetch(url).await?;
        self.extract(&document)
    }
}
