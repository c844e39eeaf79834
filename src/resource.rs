//! # Resources
//!
//! The handler contracts the router dispatches to, and the stock
//! implementations shipped with the crate.
//!
//! | Trait | Receives | May fail? |
//! |-------|----------|-----------|
//! | [`Resource`] | [`Request`] | yes, with [`HttpError`] |
//! | [`ErrorResource`] | [`ErroredRequest`] | yes; the cascade moves on |
//! | [`GlobalErrorResource`] | [`ErroredRequest`] | no |
//!
//! All three are implemented for plain closures of the matching shape.
//!
//! ## Stock resources
//!
//! - [`DefaultErrorResource`]: the router's built-in global error resource
//! - [`MethodResource`]: per-method dispatch raising `405` for unknown methods
//! - [`EchoResource`]: reflects the matched request as JSON

use crate::dispatcher::{Candidate, DefaultPolicy, DispatchError, Dispatcher, Key};
use crate::router::ErroredRequest;
use crate::server::{HttpError, Request, Response};
use http::Method;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Handles requests matched to an endpoint template.
pub trait Resource: Send + Sync + 'static {
    /// Produce a response or a declared HTTP failure.
    fn handle(&self, request: &Request) -> Result<Response, HttpError>;

    /// Name used in logs and error records.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl<F> Resource for F
where
    F: Fn(&Request) -> Result<Response, HttpError> + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> Result<Response, HttpError> {
        self(request)
    }
}

/// Handles a failed request for one endpoint template or one status code.
///
/// Any error returned here is swallowed by the router, which moves on to the
/// next stage of the cascade.
pub trait ErrorResource: Send + Sync + 'static {
    /// Render the failure, or give up with an error.
    fn handle(&self, errored: &ErroredRequest) -> Result<Response, HttpError>;
}

impl<F> ErrorResource for F
where
    F: Fn(&ErroredRequest) -> Result<Response, HttpError> + Send + Sync + 'static,
{
    fn handle(&self, errored: &ErroredRequest) -> Result<Response, HttpError> {
        self(errored)
    }
}

/// Last stage of the error cascade.
///
/// Cannot fail: the return type leaves no room for an error. A panic in
/// `handle` is a contract violation that ends the cascade and is not caught.
pub trait GlobalErrorResource: Send + Sync + 'static {
    /// Render the failure.
    fn handle(&self, errored: &ErroredRequest) -> Response;
}

impl<F> GlobalErrorResource for F
where
    F: Fn(&ErroredRequest) -> Response + Send + Sync + 'static,
{
    fn handle(&self, errored: &ErroredRequest) -> Response {
        self(errored)
    }
}

/// Built-in global error resource: `HTTP {code} Error` as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorResource {
    expose_details: bool,
}

impl DefaultErrorResource {
    /// Create the resource; with `expose_details` the detailed reason is
    /// appended to the body after a blank line.
    #[must_use]
    pub fn new(expose_details: bool) -> Self {
        Self { expose_details }
    }
}

impl GlobalErrorResource for DefaultErrorResource {
    fn handle(&self, errored: &ErroredRequest) -> Response {
        let status = errored.expected_status();
        let mut body = format!("HTTP {status} Error");
        if self.expose_details && !errored.error().detailed_reason.is_empty() {
            body.push_str("\n\n");
            body.push_str(&errored.error().detailed_reason);
        }
        Response::text(status, body)
    }
}

/// Dispatches on the request method.
///
/// `HEAD` falls back to the `GET` resource when no `HEAD` resource is
/// registered. Any other unregistered method fails with `405 Method Not
/// Allowed`, listing the registered methods in the detailed reason.
pub struct MethodResource {
    methods: Dispatcher<(), Arc<dyn Resource>, Infallible>,
}

impl Default for MethodResource {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodResource {
    /// Create a resource with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: Dispatcher::new(DefaultPolicy::None),
        }
    }

    /// Register `resource` for `method`, replacing any previous one.
    #[must_use]
    pub fn on(mut self, method: Method, resource: impl Resource) -> Self {
        let resource: Arc<dyn Resource> = Arc::new(resource);
        self.methods.register(method.as_str(), move |_: ()| {
            Ok::<_, Infallible>(Arc::clone(&resource))
        });
        self
    }

    /// Registered methods in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<String> {
        self.methods.keys().map(Key::to_string).collect()
    }
}

impl Resource for MethodResource {
    fn handle(&self, request: &Request) -> Result<Response, HttpError> {
        let fallback: Option<Candidate<()>> =
            (request.method == Method::HEAD).then(|| Candidate::from(Method::GET.as_str()));

        match self
            .methods
            .dispatch_to_key(request.method.as_str(), (), fallback)
        {
            Ok(resource) => {
                debug!(
                    request_id = %request.request_id,
                    method = %request.method,
                    resource = resource.name(),
                    "Method resource selected"
                );
                resource.handle(request)
            }
            Err(DispatchError::Undispatchable(_)) => Err(HttpError::method_not_allowed(format!(
                "Method {} is not allowed for '{}'; allowed: {}",
                request.method,
                request.path,
                self.allowed_methods().join(", ")
            ))),
            Err(DispatchError::Handler(never)) => match never {},
        }
    }

    fn name(&self) -> &str {
        "method_resource"
    }
}

/// Reflects the request back as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResource;

impl Resource for EchoResource {
    fn handle(&self, request: &Request) -> Result<Response, HttpError> {
        let query: serde_json::Map<String, serde_json::Value> = request
            .query_params
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        let endpoint = request.endpoint();

        Ok(Response::json(
            200,
            json!({
                "method": request.method.as_str(),
                "path": request.path,
                "template": endpoint.map(|m| m.template.to_string()),
                "params": endpoint.map(|m| m.params_json()).unwrap_or_else(|| json!({})),
                "query": query,
                "body": request.private_params,
            }),
        ))
    }

    fn name(&self) -> &str {
        "echo"
    }
}
