use crate::config::{RegistryConfig, TITLE_API_URL};
use crate::core::projection::registry_segments;
use crate::domain::ports::{DeliveryOutcome, TitleRegistry};
use crate::domain::views::RegistryTitle;
use crate::utils::error::{LedgerApiError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

/// `PUT {base}/titles/{titleID}` against the downstream registry.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base_url: Url,
    client: Client,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            LedgerApiError::InvalidConfigValueError {
                field: TITLE_API_URL.to_string(),
                value: config.base_url.clone(),
                reason: format!("Invalid URL format: {}", e),
            }
        })?;
        if base_url.cannot_be_a_base() {
            return Err(LedgerApiError::InvalidConfigValueError {
                field: TITLE_API_URL.to_string(),
                value: config.base_url.clone(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { base_url, client })
    }

    /// The title number is pushed as a single escaped segment, so `#`, `?`
    /// and `/` stay part of it.
    fn title_url(&self, title_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(registry_segments(title_id));
        }
        url
    }
}

#[async_trait]
impl TitleRegistry for HttpRegistry {
    async fn put_title(&self, title_id: &str, title: &RegistryTitle) -> Result<DeliveryOutcome> {
        let url = self.title_url(title_id);
        tracing::debug!(%url, "Sending title to registry");

        let body = serde_json::to_vec(title)?;
        let response = self
            .client
            .put(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| LedgerApiError::DeliveryFailure {
                title_id: title_id.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(DeliveryOutcome::Accepted {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Ok(DeliveryOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
