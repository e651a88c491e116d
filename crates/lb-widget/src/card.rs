//! Local product card template used by the JSON fetch strategy.

use crate::CARD_ITEM_CLASS;
use crate::DisplayItem;
use lb_html::escape_attribute;
use lb_html::escape_text;
use lb_net::ProductData;

/// Renders a product card from public product fields.
///
/// The markup mirrors the storefront theme's card structure closely enough
/// that both fetch strategies produce interchangeable grid items.
pub fn render_card(product: &ProductData) -> String {
    let image = product
        .featured_image
        .as_deref()
        .map(|src| {
            format!(
                "<img class=\"product-card__image\" src=\"{}\" alt=\"{}\" loading=\"lazy\">",
                escape_attribute(src),
                escape_attribute(&product.title),
            )
        })
        .unwrap_or_default();

    format!(
        "<div class=\"card product-card\">\
         <a class=\"product-card__link\" href=\"/products/{handle}\">\
         {image}\
         <h3 class=\"product-card__title\">{title}</h3>\
         <span class=\"product-card__price\">${price}</span>\
         </a></div>",
        handle = product.handle,
        title = escape_text(&product.title),
        price = product.price_units(),
    )
}

/// Wraps each display item in a grid list item, preserving input order.
pub fn wrap_items(items: &[DisplayItem]) -> String {
    items
        .iter()
        .map(|item| format!("<li class=\"{CARD_ITEM_CLASS}\">{}</li>", item.html))
        .collect::<Vec<_>>()
        .join("")
}
