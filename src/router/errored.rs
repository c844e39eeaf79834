use crate::resource::Resource;
use crate::server::{HttpError, Request};
use std::fmt;
use std::sync::Arc;

/// A request whose handling failed, as seen by error resources.
///
/// Immutable once built. It holds the original request, the failure, and
/// (when a resource raised the failure) a reference to that resource. The
/// resource is only referenced; its lifetime is owned by the router.
pub struct ErroredRequest {
    request: Arc<Request>,
    error: HttpError,
    resource: Option<Arc<dyn Resource>>,
}

impl ErroredRequest {
    /// Wrap a request and the failure it produced.
    #[must_use]
    pub fn new(request: Arc<Request>, error: HttpError, resource: Option<Arc<dyn Resource>>) -> Self {
        Self {
            request,
            error,
            resource,
        }
    }

    /// The original request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The failure.
    #[must_use]
    pub fn error(&self) -> &HttpError {
        &self.error
    }

    /// The resource that raised the failure, if any.
    #[must_use]
    pub fn resource(&self) -> Option<&Arc<dyn Resource>> {
        self.resource.as_ref()
    }

    /// Status an error response is expected to carry: the failure's status
    /// rather than the usual 200.
    #[must_use]
    pub fn expected_status(&self) -> u16 {
        self.error.status
    }
}

impl fmt::Debug for ErroredRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErroredRequest")
            .field("request_id", &self.request.request_id)
            .field("path", &self.request.path)
            .field("error", &self.error)
            .field("resource", &self.resource.as_ref().map(|r| r.name()))
            .finish()
    }
}
