use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

use crate::config::ScraperConfig;
use crate::extractor::Extractor;
use crate::models::ExtractedObservation;
use crate::plugins::traits::SourceAdapter;
use crate::utils::error::{AppError, Result};

const MARKETPLACE_DOMAIN: &str = "mercadolivre.com.br";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub struct MercadoLivreSource {
    client: Client,
    extractor: Extractor,
}

impl MercadoLivreSource {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| AppError::Validation(format!("Invalid accept_language: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            extractor: Extractor::mercado_livre()?,
        })
    }

    /// Drops the `#fragment`, which only matters to the browser.
    fn clean_url(url: &str) -> &str {
        url.split('#').next().unwrap_or(url)
    }
}

#[async_trait]
impl SourceAdapter for MercadoLivreSource {
    fn name(&self) -> &str {
        "Mercado Livre"
    }

    fn source_type(&self) -> &str {
        "mercadolivre"
    }

    fn can_handle(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(|host| host.to_ascii_lowercase()))
            .map(|host| {
                host == MARKETPLACE_DOMAIN || host.ends_with(&format!(".{}", MARKETPLACE_DOMAIN))
            })
            .unwrap_or(false)
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let url = Self::clean_url(url);
        tracing::debug!(url, "Fetching product page");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    fn extract(&self, document: &str) -> Result<ExtractedObservation> {
        self.extractor.extract(document)
    }

    fn extract_name(&self, document: &str) -> String {
        self.extractor.extract_name_from(document)
    }
}
