use std::fmt;

/// Declared HTTP failure raised by a resource.
///
/// Carries the status code together with a short human-facing reason and a
/// longer developer-facing one. The router never inspects the reasons; they
/// are for error resources to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// HTTP status code (4xx/5xx)
    pub status: u16,
    /// Short reason shown to clients
    pub reason: String,
    /// Detailed reason for developers and logs
    pub detailed_reason: String,
}

impl HttpError {
    /// Create an error with explicit reasons.
    #[must_use]
    pub fn new(status: u16, reason: impl Into<String>, detailed_reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            detailed_reason: detailed_reason.into(),
        }
    }

    /// 404 Not Found
    #[must_use]
    pub fn not_found(detailed_reason: impl Into<String>) -> Self {
        Self::new(404, "Not Found", detailed_reason)
    }

    /// 405 Method Not Allowed
    #[must_use]
    pub fn method_not_allowed(detailed_reason: impl Into<String>) -> Self {
        Self::new(405, "Method Not Allowed", detailed_reason)
    }

    /// 406 Not Acceptable
    #[must_use]
    pub fn not_acceptable(detailed_reason: impl Into<String>) -> Self {
        Self::new(406, "Not Acceptable", detailed_reason)
    }

    /// 500 Internal Server Error
    #[must_use]
    pub fn internal(detailed_reason: impl Into<String>) -> Self {
        Self::new(500, "Internal Server Error", detailed_reason)
    }

    /// 501 Not Implemented
    #[must_use]
    pub fn not_implemented(detailed_reason: impl Into<String>) -> Self {
        Self::new(501, "Not Implemented", detailed_reason)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} {}: {}", self.status, self.reason, self.detailed_reason)
    }
}

impl std::error::Error for HttpError {}
