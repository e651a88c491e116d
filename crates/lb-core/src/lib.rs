//! Shared primitives used across Lookback crates.

use core::fmt;

/// Result alias used across the workspace.
pub type WidgetResult<T> = Result<T, WidgetError>;

/// Top-level error type carried by every fallible widget operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetError {
    pub code: &'static str,
    pub message: String,
}

impl WidgetError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for WidgetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for WidgetError {}

/// Product handle as it appears in a product detail page path.
///
/// A handle is the path remainder after the `/products/` marker, with the
/// query already stripped. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductHandle(String);

impl ProductHandle {
    pub fn new(raw: &str) -> WidgetResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WidgetError::new(
                "core.handle_empty",
                "product handle must not be empty",
            ));
        }

        if trimmed.contains('?') || trimmed.contains('#') {
            return Err(WidgetError::new(
                "core.handle_invalid",
                format!("product handle `{trimmed}` contains URL delimiters"),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProductHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ProductHandle;

    #[test]
    fn accepts_plain_handles() {
        let handle = ProductHandle::new("aurora-mug");
        assert!(handle.is_ok());

        let handle = match handle {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(handle.as_str(), "aurora-mug");
    }

    #[test]
    fn rejects_empty_and_whitespace_handles() {
        assert!(ProductHandle::new("").is_err());
        assert!(ProductHandle::new("   ").is_err());
    }

    #[test]
    fn rejects_handles_with_url_delimiters() {
        assert!(ProductHandle::new("mug?variant=1").is_err());
        assert!(ProductHandle::new("mug#reviews").is_err());
    }
}
