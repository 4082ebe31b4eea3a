//! HTTP request types and builders.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

/// Common HTTP headers.
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const PLAYGROUND_INSTANCE: &str = "playground-instance";
}

/// A request builder with common patterns.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    headers: HeaderMap,
    base_url: Option<String>,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
            base_url: None,
        }
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Target a policy playground instance instead of the deployed policies.
    pub fn playground_instance(self, instance: impl AsRef<str>) -> Self {
        self.header(headers::PLAYGROUND_INSTANCE, instance)
    }

    /// Set content type to JSON.
    pub fn json_content(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(headers::CONTENT_TYPE_JSON));
        self
    }

    /// Get the built headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Build the URL.
    pub fn url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_url() {
        let builder = RequestBuilder::new().base_url("https://pdp.example.com");
        assert_eq!(builder.url("/api/check"), "https://pdp.example.com/api/check");
    }

    #[test]
    fn test_request_builder_url_trailing_slash() {
        let builder = RequestBuilder::new().base_url("https://pdp.example.com/");
        assert_eq!(builder.url("/api/check"), "https://pdp.example.com/api/check");
    }

    #[test]
    fn test_request_builder_no_base_url() {
        let builder = RequestBuilder::new();
        assert_eq!(builder.url("/api/check"), "/api/check");
    }

    #[test]
    fn test_playground_instance() {
        let builder = RequestBuilder::new().playground_instance("abc123");
        let value = builder.headers().get(headers::PLAYGROUND_INSTANCE).unwrap();
        assert_eq!(value.to_str().unwrap(), "abc123");
    }

    #[test]
    fn test_invalid_header_is_skipped() {
        let builder = RequestBuilder::new().header("bad header", "value");
        assert!(builder.headers().is_empty());
    }

    #[test]
    fn test_builder_chaining() {
        let builder = RequestBuilder::new()
            .base_url("https://pdp.example.com")
            .json_content()
            .header("Custom", "value");

        assert_eq!(builder.url("/x"), "https://pdp.example.com/x");
        assert!(builder.headers().contains_key(CONTENT_TYPE));
        assert!(builder.headers().contains_key("Custom"));
    }
}
