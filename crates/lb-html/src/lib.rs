//! Byte-walking HTML helpers for fragment capture and in-place markup edits.
//!
//! These operate on raw markup without building a tree: the widget only ever
//! needs to find one class-marked element, read or replace its contents, or
//! rewrite one attribute on its start tag.

/// Elements that never have closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text until the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Returns the inner markup of the first element carrying `class`.
pub fn first_inner_by_class(html: &str, class: &str) -> Option<String> {
    let element = find_element_by_class(html, class)?;
    Some(html[element.inner_start..element.inner_end].to_owned())
}

/// Replaces the inner markup of the first element carrying `class`,
/// returning the updated document. `None` if no such element exists.
pub fn replace_inner_by_class(html: &str, class: &str, new_inner: &str) -> Option<String> {
    let element = find_element_by_class(html, class)?;

    let mut out = String::with_capacity(html.len().saturating_add(new_inner.len()));
    out.push_str(&html[..element.inner_start]);
    out.push_str(new_inner);
    out.push_str(&html[element.inner_end..]);
    Some(out)
}

/// Rewrites the inline `display` style on the first element carrying
/// `class`, returning the updated document. Other declarations in an
/// existing `style` attribute are preserved.
pub fn set_display_by_class(html: &str, class: &str, display: &str) -> Option<String> {
    let element = find_element_by_class(html, class)?;
    let rebuilt = rebuild_start_tag_with_display(&element.tag, display);

    let mut out = String::with_capacity(html.len().saturating_add(rebuilt.len()));
    out.push_str(&html[..element.tag.start]);
    out.push_str(&rebuilt);
    out.push_str(&html[element.tag.end..]);
    Some(out)
}

/// Returns the value of `name` on the first start tag in the markup.
///
/// Host shells put widget configuration attributes on the component's own
/// root element, so "first start tag" is the lookup that matters.
pub fn first_attribute(html: &str, name: &str) -> Option<String> {
    let mut pos = 0_usize;
    while let Some(tag) = next_tag(html, pos) {
        pos = tag.end;
        if tag.is_end {
            continue;
        }
        return attribute_value(&tag, name);
    }
    None
}

/// Escapes text for element content.
pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes text for a double-quoted attribute value.
pub fn escape_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    name: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TagToken {
    name: String,
    attributes: Vec<Attribute>,
    is_end: bool,
    self_closing: bool,
    /// Byte index of the opening `<`.
    start: usize,
    /// Byte index just past the closing `>`.
    end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ElementSpan {
    tag: TagToken,
    inner_start: usize,
    inner_end: usize,
}

fn find_element_by_class(html: &str, class: &str) -> Option<ElementSpan> {
    let mut pos = 0_usize;

    while let Some(tag) = next_tag(html, pos) {
        pos = tag.end;

        if tag.is_end {
            continue;
        }

        if has_class(&tag, class) {
            if tag.self_closing || is_void_element(&tag.name) {
                let at = tag.end;
                return Some(ElementSpan {
                    tag,
                    inner_start: at,
                    inner_end: at,
                });
            }

            let inner_start = tag.end;
            let inner_end = find_subtree_end(html, &tag);
            return Some(ElementSpan {
                tag,
                inner_start,
                inner_end,
            });
        }

        if !tag.self_closing && is_raw_text_element(&tag.name) {
            pos = skip_raw_text(html, tag.end, &tag.name);
        }
    }

    None
}

/// Walks forward from an open tag to the matching end tag, tracking nesting
/// depth by tag name. Returns the byte index of the matching `</…`, or the
/// end of input when the element is left unterminated.
fn find_subtree_end(html: &str, open: &TagToken) -> usize {
    let mut depth = 1_usize;
    let mut pos = open.end;

    while let Some(tag) = next_tag(html, pos) {
        pos = tag.end;

        if !tag.is_end && !tag.self_closing && is_raw_text_element(&tag.name) {
            pos = skip_raw_text(html, pos, &tag.name);
            continue;
        }

        if tag.name != open.name {
            continue;
        }

        if tag.is_end {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return tag.start;
            }
        } else if !tag.self_closing && !is_void_element(&tag.name) {
            depth = depth.saturating_add(1);
        }
    }

    html.len()
}

/// Finds and parses the next tag at or after `from`, skipping text,
/// comments, doctypes, and processing instructions.
fn next_tag(html: &str, from: usize) -> Option<TagToken> {
    let bytes = html.as_bytes();
    let mut idx = from;

    while idx < bytes.len() {
        if bytes[idx] != b'<' {
            idx = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
            continue;
        }

        if starts_with(bytes, idx, b"<!--") {
            idx = skip_comment(bytes, idx);
            continue;
        }

        if starts_with(bytes, idx, b"<!") {
            idx = skip_to_gt(bytes, idx.saturating_add(2));
            continue;
        }

        if starts_with(bytes, idx, b"<?") {
            idx = skip_to_gt(bytes, idx.saturating_add(2));
            continue;
        }

        match parse_tag(html, idx) {
            Some(tag) => return Some(tag),
            None => idx = idx.saturating_add(1),
        }
    }

    None
}

fn parse_tag(html: &str, start: usize) -> Option<TagToken> {
    let bytes = html.as_bytes();
    if bytes.get(start).copied() != Some(b'<') {
        return None;
    }

    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    idx = skip_spaces(bytes, idx);
    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }

    if idx == name_start {
        return None;
    }

    let name = html[name_start..idx].to_ascii_lowercase();
    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx).copied() {
            None => return None,
            Some(b'>') => {
                return Some(TagToken {
                    name,
                    attributes,
                    is_end,
                    self_closing,
                    start,
                    end: idx.saturating_add(1),
                });
            }
            Some(b'/') => {
                self_closing = true;
                idx = idx.saturating_add(1);
            }
            Some(_) => {
                let (attribute, next_idx) = parse_attribute(html, idx)?;
                attributes.push(attribute);
                idx = next_idx;
                self_closing = false;
            }
        }
    }
}

fn parse_attribute(html: &str, start: usize) -> Option<(Attribute, usize)> {
    let bytes = html.as_bytes();
    let mut idx = start;

    let name_start = idx;
    while idx < bytes.len() && is_attribute_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }

    if idx == name_start {
        return None;
    }

    let name = html[name_start..idx].to_ascii_lowercase();
    let after_name = skip_spaces(bytes, idx);

    if bytes.get(after_name).copied() != Some(b'=') {
        return Some((
            Attribute {
                name,
                value: String::new(),
            },
            idx,
        ));
    }

    idx = skip_spaces(bytes, after_name.saturating_add(1));
    match bytes.get(idx).copied() {
        Some(quote @ (b'"' | b'\'')) => {
            let value_start = idx.saturating_add(1);
            let value_end = find_byte(bytes, value_start, quote)?;
            Some((
                Attribute {
                    name,
                    value: html[value_start..value_end].to_owned(),
                },
                value_end.saturating_add(1),
            ))
        }
        Some(_) => {
            let value_start = idx;
            while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>' {
                idx = idx.saturating_add(1);
            }
            Some((
                Attribute {
                    name,
                    value: html[value_start..idx].to_owned(),
                },
                idx,
            ))
        }
        None => None,
    }
}

fn has_class(tag: &TagToken, class: &str) -> bool {
    attribute_value(tag, "class")
        .map(|value| value.split_ascii_whitespace().any(|token| token == class))
        .unwrap_or(false)
}

fn attribute_value(tag: &TagToken, name: &str) -> Option<String> {
    tag.attributes
        .iter()
        .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
        .map(|attribute| attribute.value.clone())
}

fn rebuild_start_tag_with_display(tag: &TagToken, display: &str) -> String {
    let mut attributes = tag.attributes.clone();
    let mut rewrote = false;

    for attribute in &mut attributes {
        if attribute.name.eq_ignore_ascii_case("style") {
            attribute.value = rewrite_display_declaration(&attribute.value, display);
            rewrote = true;
        }
    }

    if !rewrote {
        attributes.push(Attribute {
            name: "style".to_owned(),
            value: format!("display: {display}"),
        });
    }

    let mut out = String::new();
    out.push('<');
    out.push_str(&tag.name);
    for attribute in &attributes {
        out.push(' ');
        out.push_str(&attribute.name);
        if !attribute.value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attribute(&attribute.value));
            out.push('"');
        }
    }
    if tag.self_closing {
        out.push_str(" /");
    }
    out.push('>');
    out
}

fn rewrite_display_declaration(style: &str, display: &str) -> String {
    let mut declarations: Vec<String> = style
        .split(';')
        .map(str::trim)
        .filter(|declaration| !declaration.is_empty())
        .filter(|declaration| !is_display_declaration(declaration))
        .map(|declaration| declaration.to_owned())
        .collect();

    declarations.push(format!("display: {display}"));
    declarations.join("; ")
}

fn is_display_declaration(declaration: &str) -> bool {
    declaration
        .split(':')
        .next()
        .map(|property| property.trim().eq_ignore_ascii_case("display"))
        .unwrap_or(false)
}

fn skip_raw_text(html: &str, from: usize, tag_name: &str) -> usize {
    let bytes = html.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = from;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2).saturating_add(tag_bytes.len()))
        {
            return idx;
        }

        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    find_subslice(bytes, start.saturating_add(4), b"-->")
        .map(|end| end.saturating_add(3))
        .unwrap_or(bytes.len())
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn is_attribute_name_char(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !matches!(byte, b'=' | b'>' | b'/' | b'"' | b'\'')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }

    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::first_attribute;
    use super::first_inner_by_class;
    use super::replace_inner_by_class;
    use super::set_display_by_class;

    #[test]
    fn captures_inner_markup_of_first_class_match() {
        let html = concat!(
            "<ul><li class=\"grid__item\"><a href=\"/products/mug\">Mug</a></li>",
            "<li class=\"grid__item\">Second</li></ul>",
        );

        let inner = first_inner_by_class(html, "grid__item");
        assert_eq!(
            inner,
            Some("<a href=\"/products/mug\">Mug</a>".to_owned())
        );
    }

    #[test]
    fn matches_class_among_multiple_tokens() {
        let html = "<div class=\"card grid__item featured\">payload</div>";
        assert_eq!(
            first_inner_by_class(html, "grid__item"),
            Some("payload".to_owned())
        );
    }

    #[test]
    fn tracks_nesting_of_same_named_elements() {
        let html = "<div class=\"outer\"><div>inner</div><div></div></div><div>after</div>";
        assert_eq!(
            first_inner_by_class(html, "outer"),
            Some("<div>inner</div><div></div>".to_owned())
        );
    }

    #[test]
    fn missing_class_yields_none() {
        assert_eq!(first_inner_by_class("<div>no cards here</div>", "grid__item"), None);
    }

    #[test]
    fn ignores_angle_brackets_inside_script() {
        let html = concat!(
            "<script>if (a < b) { render(\"<li class='grid__item'>\"); }</script>",
            "<li class=\"grid__item\">real</li>",
        );
        assert_eq!(
            first_inner_by_class(html, "grid__item"),
            Some("real".to_owned())
        );
    }

    #[test]
    fn unterminated_element_captures_to_end_of_input() {
        let html = "<div class=\"grid__item\">tail without close";
        assert_eq!(
            first_inner_by_class(html, "grid__item"),
            Some("tail without close".to_owned())
        );
    }

    #[test]
    fn replaces_inner_markup_in_place() {
        let html = "<section><ul class=\"recently-viewed-grid\"></ul></section>";
        let updated = replace_inner_by_class(html, "recently-viewed-grid", "<li>one</li>");
        assert_eq!(
            updated,
            Some("<section><ul class=\"recently-viewed-grid\"><li>one</li></ul></section>".to_owned())
        );
    }

    #[test]
    fn replace_on_missing_grid_yields_none() {
        assert_eq!(replace_inner_by_class("<div></div>", "recently-viewed-grid", "x"), None);
    }

    #[test]
    fn reveal_rewrites_existing_display_declaration() {
        let html = "<div class=\"recently-viewed-container\" style=\"display: none; margin: 0\">x</div>";
        let updated = set_display_by_class(html, "recently-viewed-container", "block");
        assert_eq!(
            updated,
            Some(
                "<div class=\"recently-viewed-container\" style=\"margin: 0; display: block\">x</div>"
                    .to_owned()
            )
        );
    }

    #[test]
    fn reveal_adds_style_attribute_when_absent() {
        let html = "<div class=\"recently-viewed-container\">x</div>";
        let updated = set_display_by_class(html, "recently-viewed-container", "block");
        assert_eq!(
            updated,
            Some(
                "<div class=\"recently-viewed-container\" style=\"display: block\">x</div>"
                    .to_owned()
            )
        );
    }

    #[test]
    fn reads_configuration_attributes_off_the_root_element() {
        let html = concat!(
            "<!-- widget root -->",
            "<recently-viewed-products data-section-id=\"recently-viewed-products\" data-limit=\"6\">",
            "<div class=\"recently-viewed-container\"></div></recently-viewed-products>",
        );

        assert_eq!(first_attribute(html, "data-limit"), Some("6".to_owned()));
        assert_eq!(
            first_attribute(html, "data-section-id"),
            Some("recently-viewed-products".to_owned())
        );
        assert_eq!(first_attribute(html, "data-missing"), None);
    }
}
