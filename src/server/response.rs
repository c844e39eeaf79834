use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered header list; duplicate names are allowed.
///
/// Header names use `Arc<str>`: they repeat across responses and
/// `Arc::clone()` is cheaper than copying the string.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Response produced by a resource or error resource.
///
/// The body is opaque to routing; a JSON string is written as plain text and
/// anything else as JSON by whatever transport sits in front of the router.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers in the order they were added
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body
    pub body: Value,
}

impl Response {
    /// Create a response with the given status, headers and body.
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type: application/json` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Plain-text response with a `content-type: text/plain` header.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/plain".to_string()));
        Self {
            status,
            headers,
            body: Value::String(body.into()),
        }
    }

    /// JSON error response: `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// First header with this name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every header with this name by a single value.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Append a header, keeping any existing values for the same name.
    pub fn add_header(&mut self, name: &str, value: String) {
        self.headers.push((Arc::from(name), value));
    }

    /// The body as text, if it is a JSON string.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        self.body.as_str()
    }
}
