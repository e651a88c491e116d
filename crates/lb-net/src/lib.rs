//! Storefront access: page URL inspection, product data contracts, and the
//! HTTP client behind the widget's retrievals.

pub mod client;
pub mod product;
pub mod url;

pub use client::HttpStorefrontClient;
pub use client::StorefrontClient;
pub use product::ProductData;
pub use url::StorefrontBase;
pub use url::product_handle;
