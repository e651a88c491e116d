//! Product JSON contract served by `/products/{handle}.js`.

use serde::Deserialize;

/// Public product fields the widget renders from.
///
/// The endpoint returns many more fields; everything unknown is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductData {
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    /// Price in minor currency units (cents).
    pub price: u64,
}

impl ProductData {
    /// Price in whole currency units, rounded to the nearest unit per the
    /// platform's minor-unit convention.
    pub fn price_units(&self) -> u64 {
        (self.price.saturating_add(50)) / 100
    }
}
