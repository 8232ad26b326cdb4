//! Request/response value types and injected cache metadata

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Header recording when the response was written to the cache (epoch millis)
pub const HEADER_CACHED_AT: &str = "sw-cached-at";

/// Header recording which strategy wrote the response
pub const HEADER_STRATEGY: &str = "sw-strategy";

/// Header recording the rule's max-age in milliseconds (0 = never expires)
pub const HEADER_MAX_AGE: &str = "sw-max-age";

/// HTTP method of an intercepted request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    /// Only GET requests are routed through caching logic
    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }
}

/// What the request is fetching, as reported by the requesting client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Full navigable document (gets the offline page on failure)
    Document,
    Script,
    Style,
    Image,
    Font,
    #[default]
    Other,
}

/// An intercepted outgoing request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method
    pub method: Method,

    /// Full request URL
    pub url: String,

    /// Request destination
    #[serde(default)]
    pub destination: Destination,
}

impl Request {
    /// Create a GET request for a URL
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            destination: Destination::Other,
        }
    }

    /// Create a GET navigation request (destination: document)
    pub fn navigation(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            destination: Destination::Document,
        }
    }

    /// Whether the URL uses an http(s) scheme
    ///
    /// Relative paths (no scheme) are considered same-origin http requests.
    pub fn is_http(&self) -> bool {
        match self.url.split_once("://") {
            Some((scheme, _)) => scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"),
            None => !self.url.contains(':'),
        }
    }
}

/// A response, either from the network or the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,

    /// Status text
    pub status_text: String,

    /// Response headers (lowercase names)
    pub headers: HashMap<String, String>,

    /// Response body
    pub body: Vec<u8>,
}

impl Response {
    /// Create a 200 OK response with a body
    pub fn ok_with_body(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header lookup by lowercase name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Builder-style header insertion
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Inject the cache metadata headers carried by every stored entry
    pub fn with_cache_metadata(self, strategy: &str, max_age_ms: i64, now_ms: i64) -> Self {
        self.with_header(HEADER_CACHED_AT, now_ms.to_string())
            .with_header(HEADER_STRATEGY, strategy.to_string())
            .with_header(HEADER_MAX_AGE, max_age_ms.to_string())
    }

    /// When this response was cached, if metadata is present
    pub fn cached_at(&self) -> Option<i64> {
        self.header(HEADER_CACHED_AT).and_then(|v| v.parse().ok())
    }

    /// Max-age recorded at write time (0 when absent or unparseable)
    pub fn recorded_max_age(&self) -> i64 {
        self.header(HEADER_MAX_AGE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Strategy name recorded at write time
    pub fn recorded_strategy(&self) -> Option<&str> {
        self.header(HEADER_STRATEGY)
    }

    /// Whether the entry is older than `max_age_ms` at time `now_ms`
    ///
    /// Entries with no timestamp or a max-age of zero never expire.
    pub fn is_expired(&self, max_age_ms: i64, now_ms: i64) -> bool {
        let Some(cached_at) = self.cached_at() else {
            return false;
        };
        if max_age_ms <= 0 {
            return false;
        }
        now_ms - cached_at > max_age_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_scheme_detection() {
        assert!(Request::get("https://example.com/app.js").is_http());
        assert!(Request::get("http://example.com/").is_http());
        assert!(Request::get("/api/lessons").is_http());
        assert!(!Request::get("chrome-extension://abc/page.html").is_http());
        assert!(!Request::get("data:text/plain,hello").is_http());
    }

    #[test]
    fn test_metadata_round_trip() {
        let response = Response::ok_with_body("body").with_cache_metadata("cache-first", 1000, 42);

        assert_eq!(response.cached_at(), Some(42));
        assert_eq!(response.recorded_max_age(), 1000);
        assert_eq!(response.recorded_strategy(), Some("cache-first"));
    }

    #[test]
    fn test_expiry() {
        let response = Response::ok_with_body("x").with_cache_metadata("cache-first", 1000, 0);

        assert!(!response.is_expired(1000, 500));
        assert!(response.is_expired(1000, 1001));
        // max-age 0 never expires
        assert!(!response.is_expired(0, i64::MAX));
        // no timestamp never expires
        assert!(!Response::ok_with_body("x").is_expired(1000, i64::MAX));
    }
}
