use crate::ids::RequestId;
use crate::router::{EndpointMatch, EndpointTemplate, ParamValue};
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::response::HeaderVec;

/// Maximum number of query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Ordered query parameter storage.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Incoming request as seen by the router.
///
/// Built by the transport layer from the raw method, target, headers and
/// body. The endpoint binding is written at most once: the first successful
/// [`match_endpoint`](Request::match_endpoint) wins and later calls return
/// that binding without matching again.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request ID for log correlation
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Literal path, without query string or fragment
    pub path: String,
    /// Decoded query string parameters
    pub query_params: ParamVec,
    /// Parameters derived from the request body
    pub private_params: Option<Value>,
    /// Request headers
    pub headers: HeaderVec,
    /// Fragment (text after `#`), if the target carried one
    pub fragment: Option<String>,
    matched: OnceLock<EndpointMatch>,
}

impl Request {
    /// Create a request from a method and a request target
    /// (`/path?query#fragment`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (rest, fragment) = match target.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (target, None),
        };
        let (path, query_params) = match rest.split_once('?') {
            Some((path, query)) => (path, parse_query_params(query)),
            None => (rest, ParamVec::new()),
        };

        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query_params,
            private_params: None,
            headers: HeaderVec::new(),
            fragment,
            matched: OnceLock::new(),
        }
    }

    /// Add a header. An `x-request-id` header that carries a ULID becomes
    /// the request ID.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    /// Attach body-derived parameters.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.private_params = Some(body);
        self
    }

    /// Get a query parameter by name ("last write wins" for duplicates).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a top-level field of a JSON object body.
    #[must_use]
    pub fn get_private_param(&self, name: &str) -> Option<&Value> {
        self.private_params.as_ref()?.get(name)
    }

    /// Match this request against `template` and bind the result.
    ///
    /// If the request is already bound, the existing binding is returned and
    /// `template` is not consulted.
    pub fn match_endpoint(&self, template: &EndpointTemplate) -> Option<&EndpointMatch> {
        if let Some(bound) = self.matched.get() {
            return Some(bound);
        }

        let params = template.match_path(&self.path)?;
        debug!(
            request_id = %self.request_id,
            path = %self.path,
            template = %template.as_str(),
            path_params = ?params,
            "Endpoint bound to request"
        );
        Some(self.matched.get_or_init(|| EndpointMatch {
            template: template.source(),
            params,
        }))
    }

    /// The bound endpoint, if matching has succeeded.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Option<&EndpointMatch> {
        self.matched.get()
    }

    /// Get a bound path parameter by name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&ParamValue> {
        self.endpoint()?.get_param(name)
    }
}

/// Parse a raw query string (without the leading `?`), URL-decoding names
/// and values and keeping their order.
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_split() {
        let req = Request::new(Method::GET, "/items/42?sort=asc&tag=a%20b#top");
        assert_eq!(req.path, "/items/42");
        assert_eq!(req.get_query_param("sort"), Some("asc"));
        assert_eq!(req.get_query_param("tag"), Some("a b"));
        assert_eq!(req.fragment.as_deref(), Some("top"));
    }

    #[test]
    fn test_duplicate_query_last_wins() {
        let req = Request::new(Method::GET, "/users?limit=10&limit=20");
        assert_eq!(req.get_query_param("limit"), Some("20"));
        assert_eq!(req.query_params.len(), 2);
    }

    #[test]
    fn test_request_id_header_is_adopted() {
        let id = RequestId::new();
        let req = Request::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(req.request_id, id);
        assert_eq!(req.get_header("x-request-id"), Some(id.to_string().as_str()));
    }

    #[test]
    fn test_private_params_from_body() {
        let req = Request::new(Method::POST, "/pets")
            .with_body(serde_json::json!({"name": "Fluffy"}));
        assert_eq!(
            req.get_private_param("name"),
            Some(&serde_json::json!("Fluffy"))
        );
        assert_eq!(req.get_private_param("missing"), None);
    }
}
