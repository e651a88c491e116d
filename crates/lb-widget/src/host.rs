//! Host markup handle the widget renders into.

use crate::CONTAINER_CLASS;
use crate::GRID_CLASS;
use lb_core::WidgetError;
use lb_core::WidgetResult;
use lb_html::escape_attribute;

/// The widget's own DOM subtree, held as owned markup.
///
/// Host shells hand the widget its section markup and read the updated
/// markup back after a render pass. The container is expected to start
/// hidden (`display: none`) and is only revealed once content is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSection {
    markup: String,
}

impl HostSection {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    /// Stock section markup for hosts that do not supply their own.
    pub fn with_defaults(section_id: &str, limit: usize) -> Self {
        let markup = format!(
            "<recently-viewed-products data-section-id=\"{section}\" data-limit=\"{limit}\">\
             <div class=\"{CONTAINER_CLASS}\" style=\"display: none\">\
             <h2 class=\"recently-viewed-heading\">Recently viewed</h2>\
             <ul class=\"{GRID_CLASS}\"></ul>\
             </div>\
             </recently-viewed-products>",
            section = escape_attribute(section_id),
        );

        Self { markup }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn into_markup(self) -> String {
        self.markup
    }

    /// Replaces the grid's contents with the rendered item list.
    pub fn replace_grid_items(&mut self, items_markup: &str) -> WidgetResult<()> {
        match lb_html::replace_inner_by_class(&self.markup, GRID_CLASS, items_markup) {
            Some(updated) => {
                self.markup = updated;
                Ok(())
            }
            None => Err(WidgetError::new(
                "widget.grid_missing",
                format!("no `{GRID_CLASS}` element in host markup"),
            )),
        }
    }

    /// Makes the outer container visible.
    pub fn reveal_container(&mut self) -> WidgetResult<()> {
        match lb_html::set_display_by_class(&self.markup, CONTAINER_CLASS, "block") {
            Some(updated) => {
                self.markup = updated;
                Ok(())
            }
            None => Err(WidgetError::new(
                "widget.container_missing",
                format!("no `{CONTAINER_CLASS}` element in host markup"),
            )),
        }
    }
}
