//! HTTP access to the storefront's two product retrieval endpoints.

use crate::product::ProductData;
use crate::url::StorefrontBase;
use async_trait::async_trait;
use lb_core::ProductHandle;
use lb_core::WidgetError;
use lb_core::WidgetResult;

const WIDGET_USER_AGENT: &str = "Mozilla/5.0 (compatible; Lookback/0.1; +https://github.com/lookback-widget/lookback)";

/// Retrieval seam between the widget and the storefront.
///
/// One in-flight call per product handle; implementations must not couple
/// sibling retrievals (a failure for one handle never affects another).
#[async_trait]
pub trait StorefrontClient: Send + Sync {
    /// Fetches the server-rendered section document scoped to `handle`.
    async fn fetch_section_html(
        &self,
        handle: &ProductHandle,
        section_id: &str,
    ) -> WidgetResult<String>;

    /// Fetches the product's public JSON representation.
    async fn fetch_product(&self, handle: &ProductHandle) -> WidgetResult<ProductData>;
}

/// `StorefrontClient` backed by a shared `reqwest` connection pool.
///
/// No retries, no backoff, no timeout beyond the transport default.
#[derive(Debug, Clone)]
pub struct HttpStorefrontClient {
    base: StorefrontBase,
    http: reqwest::Client,
}

impl HttpStorefrontClient {
    pub fn new(base: StorefrontBase) -> WidgetResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(WIDGET_USER_AGENT)
            .build()
            .map_err(|error| {
                WidgetError::new(
                    "net.client.build_failed",
                    format!("failed to construct HTTP client: {error}"),
                )
            })?;

        Ok(Self { base, http })
    }

    pub fn base(&self) -> &StorefrontBase {
        &self.base
    }

    async fn get(&self, url: &str) -> WidgetResult<reqwest::Response> {
        tracing::debug!(%url, "storefront request");

        let response = self.http.get(url).send().await.map_err(|error| {
            WidgetError::new(
                "net.request_failed",
                format!("request to `{url}` failed: {error}"),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WidgetError::new(
                "net.status_error",
                format!("request to `{url}` returned {status}"),
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl StorefrontClient for HttpStorefrontClient {
    async fn fetch_section_html(
        &self,
        handle: &ProductHandle,
        section_id: &str,
    ) -> WidgetResult<String> {
        let url = self.base.section_url(handle, section_id);
        let response = self.get(&url).await?;

        response.text().await.map_err(|error| {
            WidgetError::new(
                "net.body_read_failed",
                format!("failed reading section body from `{url}`: {error}"),
            )
        })
    }

    async fn fetch_product(&self, handle: &ProductHandle) -> WidgetResult<ProductData> {
        let url = self.base.product_json_url(handle);
        let response = self.get(&url).await?;

        response.json::<ProductData>().await.map_err(|error| {
            WidgetError::new(
                "net.product_decode_failed",
                format!("failed decoding product JSON from `{url}`: {error}"),
            )
        })
    }
}
