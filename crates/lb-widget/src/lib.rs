//! Recently-viewed-products widget: visit tracking and section rendering.

pub mod card;
pub mod host;

use futures::future::join_all;
use lb_core::ProductHandle;
use lb_net::StorefrontClient;
use lb_net::product_handle;
use lb_storage::SessionStore;
use lb_storage::VisitHistory;

pub use card::render_card;
pub use card::wrap_items;
pub use host::HostSection;

/// Session storage slot shared with the browser original.
pub const DEFAULT_STORAGE_KEY: &str = "shopify-recently-viewed";
/// Section id requested from the storefront's section-render endpoint.
pub const DEFAULT_SECTION_ID: &str = "recently-viewed-products";
pub const DEFAULT_DISPLAY_LIMIT: usize = 4;
pub const DEFAULT_HISTORY_CAP: usize = 20;

/// Marker class of the item container inside the widget subtree.
pub const GRID_CLASS: &str = "recently-viewed-grid";
/// Marker class of the outer wrapper revealed once content is ready.
pub const CONTAINER_CLASS: &str = "recently-viewed-container";
/// Marker class of a product card, both in section responses and in the
/// rendered grid items.
pub const CARD_ITEM_CLASS: &str = "grid__item";

/// How display data is reproduced from a product handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Request the server-rendered section and capture the first product
    /// card fragment out of it.
    SectionFragment,
    /// Request the product's public JSON and render the local card
    /// template.
    ProductJson,
}

/// Widget configuration, read once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    /// Maximum number of products displayed per render pass.
    pub limit: usize,
    /// Maximum number of handles kept in the visit history.
    pub history_cap: usize,
    pub storage_key: String,
    pub section_id: String,
    pub strategy: FetchStrategy,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_DISPLAY_LIMIT,
            history_cap: DEFAULT_HISTORY_CAP,
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            section_id: DEFAULT_SECTION_ID.to_owned(),
            strategy: FetchStrategy::SectionFragment,
        }
    }
}

impl WidgetConfig {
    /// Reads `data-limit` and `data-section-id` off the host element,
    /// keeping defaults for anything absent or unparsable.
    pub fn from_host_markup(markup: &str) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lb_html::first_attribute(markup, "data-limit") {
            if let Ok(limit) = raw.parse::<usize>() {
                if limit > 0 {
                    config.limit = limit;
                }
            }
        }

        if let Some(section_id) = lb_html::first_attribute(markup, "data-section-id") {
            if !section_id.is_empty() {
                config.section_id = section_id;
            }
        }

        config
    }
}

/// A product ready for display: its handle plus rendered card markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayItem {
    pub handle: ProductHandle,
    pub html: String,
}

/// The widget component.
///
/// Generic over its injected session store and storefront client so hosts
/// and tests choose the backends. Every public operation degrades to
/// "show nothing" on failure; nothing here is fatal to the host.
pub struct RecentlyViewedTracker<S, C> {
    config: WidgetConfig,
    store: S,
    client: C,
}

impl<S, C> RecentlyViewedTracker<S, C>
where
    S: SessionStore,
    C: StorefrontClient,
{
    pub fn new(config: WidgetConfig, store: S, client: C) -> Self {
        Self {
            config,
            store,
            client,
        }
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Records the page behind `page_url` into the visit history.
    ///
    /// Non-product pages are ignored without touching storage. Storage
    /// failures are logged and swallowed.
    pub fn record_visit(&self, page_url: &str) {
        let Some(handle) = product_handle(page_url) else {
            return;
        };

        let mut history = match VisitHistory::load(&self.store, &self.config.storage_key) {
            Ok(history) => history,
            Err(error) => {
                tracing::warn!("failed to load visit history: {error}");
                VisitHistory::new()
            }
        };

        history.record(handle.as_str(), self.config.history_cap);

        if let Err(error) = history.save(&self.store, &self.config.storage_key) {
            tracing::warn!("failed to persist visit history: {error}");
        }
    }

    /// Fetches and renders the recently viewed section into `host`.
    ///
    /// Never returns an error: anything that escapes the orchestration is
    /// logged and swallowed, leaving the host markup untouched.
    pub async fn load_and_render(&self, page_url: &str, host: &mut host::HostSection) {
        if let Err(error) = self.try_load_and_render(page_url, host).await {
            tracing::error!("recently viewed render failed: {error}");
        }
    }

    /// Records the current visit, then renders. Mirrors the widget's
    /// page-load entry point.
    pub async fn run(&self, page_url: &str, host: &mut host::HostSection) {
        self.record_visit(page_url);
        self.load_and_render(page_url, host).await;
    }

    async fn try_load_and_render(
        &self,
        page_url: &str,
        host: &mut host::HostSection,
    ) -> lb_core::WidgetResult<()> {
        let history = VisitHistory::load(&self.store, &self.config.storage_key)?;
        if history.is_empty() {
            return Ok(());
        }

        let current = product_handle(page_url);
        let candidates = self.candidates(&history, current.as_ref());
        if candidates.is_empty() {
            return Ok(());
        }

        // Fan out one retrieval per handle before awaiting any of them;
        // the join settles every slot, success or not.
        let fetches = candidates
            .iter()
            .map(|handle| self.fetch_display_item(handle));
        let results = join_all(fetches).await;

        let items: Vec<DisplayItem> = results.into_iter().flatten().collect();
        if items.is_empty() {
            return Ok(());
        }

        if let Err(error) = host.replace_grid_items(&card::wrap_items(&items)) {
            tracing::warn!("skipping grid update: {error}");
        }

        if let Err(error) = host.reveal_container() {
            tracing::warn!("cannot reveal section: {error}");
        }

        Ok(())
    }

    /// History minus the current product, truncated to the display limit.
    fn candidates(&self, history: &VisitHistory, current: Option<&ProductHandle>) -> Vec<ProductHandle> {
        history
            .handles()
            .iter()
            .filter(|handle| current.map(ProductHandle::as_str) != Some(handle.as_str()))
            .filter_map(|handle| ProductHandle::new(handle).ok())
            .take(self.config.limit)
            .collect()
    }

    /// Retrieves display data for one handle, resolving to `None` on any
    /// failure so sibling retrievals are unaffected.
    pub async fn fetch_display_item(&self, handle: &ProductHandle) -> Option<DisplayItem> {
        let fetched = match self.config.strategy {
            FetchStrategy::SectionFragment => self.fetch_section_card(handle).await,
            FetchStrategy::ProductJson => self.fetch_templated_card(handle).await,
        };

        match fetched {
            Ok(Some(html)) => Some(DisplayItem {
                handle: handle.clone(),
                html,
            }),
            Ok(None) => {
                tracing::warn!(%handle, "section response contains no product card");
                None
            }
            Err(error) => {
                tracing::warn!(%handle, "product retrieval failed: {error}");
                None
            }
        }
    }

    async fn fetch_section_card(
        &self,
        handle: &ProductHandle,
    ) -> lb_core::WidgetResult<Option<String>> {
        let document = self
            .client
            .fetch_section_html(handle, &self.config.section_id)
            .await?;
        Ok(lb_html::first_inner_by_class(&document, CARD_ITEM_CLASS))
    }

    async fn fetch_templated_card(
        &self,
        handle: &ProductHandle,
    ) -> lb_core::WidgetResult<Option<String>> {
        let product = self.client.fetch_product(handle).await?;
        Ok(Some(card::render_card(&product)))
    }
}

#[cfg(test)]
mod tests {
    use super::CARD_ITEM_CLASS;
    use super::DEFAULT_STORAGE_KEY;
    use super::FetchStrategy;
    use super::RecentlyViewedTracker;
    use super::WidgetConfig;
    use super::host::HostSection;
    use async_trait::async_trait;
    use lb_core::ProductHandle;
    use lb_core::WidgetError;
    use lb_core::WidgetResult;
    use lb_net::ProductData;
    use lb_net::StorefrontClient;
    use lb_storage::MemorySessionStore;
    use lb_storage::SessionStore;
    use lb_storage::VisitHistory;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct ScriptedClient {
        sections: HashMap<String, String>,
        products: HashMap<String, ProductData>,
    }

    impl ScriptedClient {
        fn with_section(mut self, handle: &str, body: &str) -> Self {
            self.sections.insert(handle.to_owned(), body.to_owned());
            self
        }

        fn with_product(mut self, product: ProductData) -> Self {
            self.products.insert(product.handle.clone(), product);
            self
        }
    }

    #[async_trait]
    impl StorefrontClient for ScriptedClient {
        async fn fetch_section_html(
            &self,
            handle: &ProductHandle,
            _section_id: &str,
        ) -> WidgetResult<String> {
            self.sections.get(handle.as_str()).cloned().ok_or_else(|| {
                WidgetError::new(
                    "net.status_error",
                    format!("request for `{handle}` returned 404 Not Found"),
                )
            })
        }

        async fn fetch_product(&self, handle: &ProductHandle) -> WidgetResult<ProductData> {
            self.products.get(handle.as_str()).cloned().ok_or_else(|| {
                WidgetError::new(
                    "net.status_error",
                    format!("request for `{handle}` returned 404 Not Found"),
                )
            })
        }
    }

    fn section_body(label: &str) -> String {
        format!(
            "<section id=\"shopify-section-recently-viewed-products\">\
             <ul><li class=\"grid__item\"><a href=\"#\">{label}</a></li></ul></section>"
        )
    }

    fn seeded_store(handles_most_recent_first: &[&str]) -> MemorySessionStore {
        let store = MemorySessionStore::default();
        let mut history = VisitHistory::new();
        for handle in handles_most_recent_first.iter().rev() {
            history.record(handle, 20);
        }
        let saved = history.save(&store, DEFAULT_STORAGE_KEY);
        assert!(saved.is_ok());
        store
    }

    fn item_count(markup: &str) -> usize {
        markup
            .matches(&format!("<li class=\"{CARD_ITEM_CLASS}\">"))
            .count()
    }

    #[test]
    fn non_product_pages_leave_storage_untouched() {
        let tracker = RecentlyViewedTracker::new(
            WidgetConfig::default(),
            MemorySessionStore::default(),
            ScriptedClient::default(),
        );

        tracker.record_visit("https://shop.example.com/collections/all");
        tracker.record_visit("https://shop.example.com/cart");

        assert_eq!(tracker.store().get(DEFAULT_STORAGE_KEY), Ok(None));
    }

    #[test]
    fn visits_prepend_dedupe_and_cap() {
        let config = WidgetConfig {
            history_cap: 3,
            ..WidgetConfig::default()
        };
        let tracker = RecentlyViewedTracker::new(
            config,
            MemorySessionStore::default(),
            ScriptedClient::default(),
        );

        for handle in ["a", "b", "c", "d", "b"] {
            tracker.record_visit(&format!("https://shop.example.com/products/{handle}"));
        }

        let history = VisitHistory::load(tracker.store(), DEFAULT_STORAGE_KEY);
        assert!(history.is_ok());
        let history = match history {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(history.handles(), ["b", "d", "c"]);
    }

    #[tokio::test]
    async fn renders_candidates_in_order_excluding_current_product() {
        let store = seeded_store(&["current-product", "alpha-candle", "beta-mug"]);
        let client = ScriptedClient::default()
            .with_section("alpha-candle", &section_body("Alpha Candle"))
            .with_section("beta-mug", &section_body("Beta Mug"))
            .with_section("current-product", &section_body("Current"));

        let tracker = RecentlyViewedTracker::new(WidgetConfig::default(), store, client);
        let mut host = HostSection::with_defaults("recently-viewed-products", 4);

        tracker
            .load_and_render("https://shop.example.com/products/current-product", &mut host)
            .await;

        let markup = host.markup();
        assert_eq!(item_count(markup), 2);
        assert!(!markup.contains("Current"));
        assert!(markup.contains("display: block"));

        let alpha = markup.find("Alpha Candle");
        let beta = markup.find("Beta Mug");
        assert!(alpha.is_some());
        assert!(beta.is_some());
        assert!(alpha < beta);
    }

    #[tokio::test]
    async fn failed_sibling_is_dropped_preserving_order() {
        let store = seeded_store(&["first", "second", "third"]);
        let client = ScriptedClient::default()
            .with_section("first", &section_body("First Item"))
            .with_section("third", &section_body("Third Item"));

        let tracker = RecentlyViewedTracker::new(WidgetConfig::default(), store, client);
        let mut host = HostSection::with_defaults("recently-viewed-products", 4);

        tracker
            .load_and_render("https://shop.example.com/", &mut host)
            .await;

        let markup = host.markup();
        assert_eq!(item_count(markup), 2);
        assert!(!markup.contains("second"));

        let first = markup.find("First Item");
        let third = markup.find("Third Item");
        assert!(first.is_some());
        assert!(third.is_some());
        assert!(first < third);
    }

    #[tokio::test]
    async fn all_failures_leave_host_untouched() {
        let store = seeded_store(&["gone-a", "gone-b"]);
        let tracker =
            RecentlyViewedTracker::new(WidgetConfig::default(), store, ScriptedClient::default());
        let mut host = HostSection::with_defaults("recently-viewed-products", 4);
        let before = host.clone();

        tracker
            .load_and_render("https://shop.example.com/", &mut host)
            .await;

        assert_eq!(host, before);
        assert!(host.markup().contains("display: none"));
    }

    #[tokio::test]
    async fn display_limit_truncates_candidates() {
        let store = seeded_store(&["one", "two", "three"]);
        let client = ScriptedClient::default()
            .with_section("one", &section_body("Item One"))
            .with_section("two", &section_body("Item Two"))
            .with_section("three", &section_body("Item Three"));

        let config = WidgetConfig {
            limit: 2,
            ..WidgetConfig::default()
        };
        let tracker = RecentlyViewedTracker::new(config, store, client);
        let mut host = HostSection::with_defaults("recently-viewed-products", 2);

        tracker
            .load_and_render("https://shop.example.com/", &mut host)
            .await;

        let markup = host.markup();
        assert_eq!(item_count(markup), 2);
        assert!(markup.contains("Item One"));
        assert!(markup.contains("Item Two"));
        assert!(!markup.contains("Item Three"));
    }

    #[tokio::test]
    async fn empty_history_renders_nothing() {
        let tracker = RecentlyViewedTracker::new(
            WidgetConfig::default(),
            MemorySessionStore::default(),
            ScriptedClient::default(),
        );
        let mut host = HostSection::with_defaults("recently-viewed-products", 4);
        let before = host.clone();

        tracker
            .load_and_render("https://shop.example.com/products/anything", &mut host)
            .await;

        assert_eq!(host, before);
    }

    #[tokio::test]
    async fn json_strategy_renders_local_template() {
        let store = seeded_store(&["aurora-mug"]);
        let client = ScriptedClient::default().with_product(ProductData {
            title: "Aurora Mug".to_owned(),
            handle: "aurora-mug".to_owned(),
            featured_image: Some("//cdn.example.com/aurora-mug.jpg".to_owned()),
            price: 2450,
        });

        let config = WidgetConfig {
            strategy: FetchStrategy::ProductJson,
            ..WidgetConfig::default()
        };
        let tracker = RecentlyViewedTracker::new(config, store, client);
        let mut host = HostSection::with_defaults("recently-viewed-products", 4);

        tracker
            .load_and_render("https://shop.example.com/", &mut host)
            .await;

        let markup = host.markup();
        assert_eq!(item_count(markup), 1);
        assert!(markup.contains("Aurora Mug"));
        assert!(markup.contains("$25"));
        assert!(markup.contains("href=\"/products/aurora-mug\""));
        assert!(markup.contains("display: block"));
    }

    #[tokio::test]
    async fn run_records_current_page_before_rendering() {
        let client = ScriptedClient::default()
            .with_section("earlier-visit", &section_body("Earlier Visit"));
        let tracker = RecentlyViewedTracker::new(
            WidgetConfig::default(),
            seeded_store(&["earlier-visit"]),
            client,
        );
        let mut host = HostSection::with_defaults("recently-viewed-products", 4);

        tracker
            .run("https://shop.example.com/products/current-product", &mut host)
            .await;

        assert_eq!(item_count(host.markup()), 1);
        assert!(host.markup().contains("Earlier Visit"));

        let history = VisitHistory::load(tracker.store(), DEFAULT_STORAGE_KEY);
        assert!(history.is_ok());
        let history = match history {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(history.handles(), ["current-product", "earlier-visit"]);
    }

    #[test]
    fn config_reads_host_attributes_with_fallbacks() {
        let markup = "<recently-viewed-products data-section-id=\"rv-section\" data-limit=\"6\"></recently-viewed-products>";
        let config = WidgetConfig::from_host_markup(markup);
        assert_eq!(config.limit, 6);
        assert_eq!(config.section_id, "rv-section");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);

        let config = WidgetConfig::from_host_markup("<recently-viewed-products data-limit=\"zero\">");
        assert_eq!(config.limit, super::DEFAULT_DISPLAY_LIMIT);
        assert_eq!(config.section_id, super::DEFAULT_SECTION_ID);
    }
}
