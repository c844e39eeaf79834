//! Router core module - resource dispatch and the error cascade.
//!
//! A request moves through at most four stages:
//!
//! ```text
//! Dispatching ──ok──────────────────────────────────────────────▶ response
//!      │ failure
//!      ▼
//! EndpointError ──ok──▶ response
//!      │ missing / failed
//!      ▼
//! CodeError ──────ok──▶ response
//!      │ missing / failed
//!      ▼
//! GlobalError ────────▶ response (cannot fail)
//! ```
//!
//! Each of the first three stages is a single-key dispatch on its own
//! [`Dispatcher`]: resources and endpoint error resources are keyed by the
//! template source, code error resources by status code.

use super::endpoint::{EndpointMatcher, EndpointTemplate, TemplateError};
use super::errored::ErroredRequest;
use crate::dispatcher::{DefaultPolicy, DispatchError, Dispatcher, Key};
use crate::resource::{DefaultErrorResource, ErrorResource, GlobalErrorResource, Resource};
use crate::runtime_config::RuntimeConfig;
use crate::server::{HttpError, Request, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stage of the dispatch/cascade state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStage {
    /// Resolving the endpoint and invoking its resource
    Dispatching,
    /// Error resource registered for the endpoint template
    EndpointError,
    /// Error resource registered for the status code
    CodeError,
    /// The mandatory global error resource
    GlobalError,
}

impl fmt::Display for CascadeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CascadeStage::Dispatching => "dispatching",
            CascadeStage::EndpointError => "endpoint_error",
            CascadeStage::CodeError => "code_error",
            CascadeStage::GlobalError => "global_error",
        })
    }
}

/// A resource failure together with the resource that raised it.
#[derive(Clone)]
pub struct ResourceFailure {
    /// The declared HTTP failure
    pub error: HttpError,
    /// The resource that raised it
    pub resource: Arc<dyn Resource>,
}

impl fmt::Debug for ResourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFailure")
            .field("error", &self.error)
            .field("resource", &self.resource.name())
            .finish()
    }
}

impl fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (raised by {})", self.error, self.resource.name())
    }
}

impl std::error::Error for ResourceFailure {}

/// Endpoint router with a non-failing error cascade.
///
/// Registries are populated during a build phase through `&mut self`;
/// [`dispatch`](Self::dispatch) takes `&self`, so a fully built router can be
/// shared (e.g. behind an `Arc`) and serve any number of requests
/// concurrently.
pub struct Router {
    config: RuntimeConfig,
    matcher: EndpointMatcher,
    resources: Dispatcher<Arc<Request>, Response, ResourceFailure>,
    endpoint_errors: Dispatcher<Arc<ErroredRequest>, Response, HttpError>,
    code_errors: Dispatcher<Arc<ErroredRequest>, Response, HttpError>,
    global_error: Arc<dyn GlobalErrorResource>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("templates", &self.templates().collect::<Vec<_>>())
            .field("endpoint_errors", &self.endpoint_errors.len())
            .field("code_errors", &self.code_errors.len())
            .finish()
    }
}

impl Router {
    /// Create a router with the default runtime configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a router; the global error resource starts as
    /// [`DefaultErrorResource`].
    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            matcher: EndpointMatcher::new(),
            resources: Dispatcher::new(DefaultPolicy::None),
            endpoint_errors: Dispatcher::new(DefaultPolicy::None),
            code_errors: Dispatcher::new(DefaultPolicy::None),
            global_error: Arc::new(DefaultErrorResource::new(config.expose_error_details)),
        }
    }

    /// The configuration this router was built with.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register `resource` for `template`, and optionally the template's
    /// error resource in the same call.
    ///
    /// Re-registering a template replaces its resource but keeps its
    /// matching priority.
    ///
    /// # Errors
    ///
    /// [`TemplateError`] if the template does not compile; nothing is
    /// registered in that case.
    pub fn register(
        &mut self,
        template: &str,
        resource: impl Resource,
        error_resource: Option<Arc<dyn ErrorResource>>,
    ) -> Result<(), TemplateError> {
        let source = self.matcher.insert(template)?.source();
        let resource: Arc<dyn Resource> = Arc::new(resource);
        let threshold = self.config.slow_dispatch_threshold;

        info!(
            template = %source,
            resource = resource.name(),
            "Registering endpoint resource"
        );

        self.resources
            .register(Arc::clone(&source), move |request: Arc<Request>| {
                let started = Instant::now();
                let result = resource.handle(&request);
                let elapsed = started.elapsed();
                if elapsed > threshold {
                    warn!(
                        request_id = %request.request_id,
                        resource = resource.name(),
                        duration_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
                        threshold_us = u64::try_from(threshold.as_micros()).unwrap_or(u64::MAX),
                        "Slow resource invocation"
                    );
                }
                result.map_err(|error| ResourceFailure {
                    error,
                    resource: Arc::clone(&resource),
                })
            });

        if let Some(error_resource) = error_resource {
            self.register_endpoint_error_arc(source, error_resource);
        }
        Ok(())
    }

    /// Register or replace the error resource for one endpoint template.
    ///
    /// The template is used as given; it does not need a resource yet.
    pub fn register_endpoint_error(&mut self, template: &str, error_resource: impl ErrorResource) {
        self.register_endpoint_error_arc(Arc::from(template), Arc::new(error_resource));
    }

    fn register_endpoint_error_arc(&mut self, template: Arc<str>, error_resource: Arc<dyn ErrorResource>) {
        debug!(template = %template, "Registering endpoint error resource");
        self.endpoint_errors
            .register(template, move |errored: Arc<ErroredRequest>| {
                error_resource.handle(&errored)
            });
    }

    /// Register or replace the error resource for one status code.
    pub fn register_code_error(&mut self, code: u16, error_resource: impl ErrorResource) {
        debug!(code, "Registering code error resource");
        self.code_errors
            .register(code, move |errored: Arc<ErroredRequest>| {
                error_resource.handle(&errored)
            });
    }

    /// Replace the global error resource. It can be replaced but never unset.
    pub fn register_global_error(&mut self, global_error: impl GlobalErrorResource) {
        info!("Replacing global error resource");
        self.global_error = Arc::new(global_error);
    }

    /// Registered template sources in matching order.
    pub fn templates(&self) -> impl Iterator<Item = &str> {
        self.matcher.templates().map(EndpointTemplate::as_str)
    }

    /// Route an owned request.
    #[must_use]
    pub fn dispatch_request(&self, request: Request) -> Response {
        self.dispatch(Arc::new(request))
    }

    /// Route a request and always produce a response.
    ///
    /// Success returns the resource's response. Any failure runs the
    /// cascade, which terminates after at most three more stages.
    #[must_use]
    pub fn dispatch(&self, request: Arc<Request>) -> Response {
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            stage = %CascadeStage::Dispatching,
            "Dispatching request"
        );

        match self.dispatch_resource(request) {
            Ok(response) => response,
            Err((errored, endpoint)) => self.cascade(errored, endpoint),
        }
    }

    /// Stage 1. On failure returns the errored request and the endpoint
    /// template it should be escalated under, if one was identified.
    fn dispatch_resource(
        &self,
        request: Arc<Request>,
    ) -> Result<Response, (ErroredRequest, Option<Arc<str>>)> {
        let Some(candidate) = self.matcher.find_candidate(&request.path) else {
            let error = HttpError::not_found(format!("No endpoint matches path '{}'", request.path));
            return Err((ErroredRequest::new(request, error, None), None));
        };

        let template = match request.match_endpoint(candidate) {
            Some(bound) => Arc::clone(&bound.template),
            None => {
                let error = HttpError::not_found(format!(
                    "Path '{}' does not satisfy endpoint template '{}'",
                    request.path, candidate
                ));
                let source = candidate.source();
                return Err((ErroredRequest::new(request, error, None), Some(source)));
            }
        };

        match self
            .resources
            .dispatch_to_key(Arc::clone(&template), Arc::clone(&request), None)
        {
            Ok(response) => {
                debug!(
                    request_id = %request.request_id,
                    template = %template,
                    status = response.status,
                    "Request handled"
                );
                Ok(response)
            }
            Err(DispatchError::Handler(failure)) => Err((
                ErroredRequest::new(request, failure.error, Some(failure.resource)),
                Some(template),
            )),
            Err(DispatchError::Undispatchable(_)) => {
                let error = HttpError::not_found(format!(
                    "No resource registered for endpoint template '{template}'"
                ));
                Err((ErroredRequest::new(request, error, None), Some(template)))
            }
        }
    }

    /// Stages 2-4.
    fn cascade(&self, errored: ErroredRequest, endpoint: Option<Arc<str>>) -> Response {
        let errored = Arc::new(errored);
        let request_id = errored.request().request_id;
        let status = errored.expected_status();

        warn!(
            request_id = %request_id,
            path = %errored.request().path,
            status,
            reason = %errored.error().reason,
            detail = %errored.error().detailed_reason,
            resource = errored.resource().map(|r| r.name()),
            "Request failed, entering error cascade"
        );

        // Stage 2: endpoint error resource
        if let Some(template) = endpoint {
            let key = Key::from(template);
            if let Some(response) = self.try_error_stage(
                CascadeStage::EndpointError,
                &self.endpoint_errors,
                key,
                &errored,
            ) {
                return response;
            }
        }

        // Stage 3: code error resource
        if let Some(response) = self.try_error_stage(
            CascadeStage::CodeError,
            &self.code_errors,
            Key::from(status),
            &errored,
        ) {
            return response;
        }

        // Stage 4: global error resource, cannot fail
        debug!(
            request_id = %request_id,
            stage = %CascadeStage::GlobalError,
            "Falling back to global error resource"
        );
        self.global_error.handle(&errored)
    }

    fn try_error_stage(
        &self,
        stage: CascadeStage,
        registry: &Dispatcher<Arc<ErroredRequest>, Response, HttpError>,
        key: Key,
        errored: &Arc<ErroredRequest>,
    ) -> Option<Response> {
        let request_id = errored.request().request_id;

        if !registry.contains(&key) {
            debug!(request_id = %request_id, stage = %stage, key = %key, "No error resource registered");
            return None;
        }

        match registry.dispatch_to_key(key, Arc::clone(errored), None) {
            Ok(response) => {
                info!(
                    request_id = %request_id,
                    stage = %stage,
                    status = response.status,
                    "Error handled"
                );
                Some(response)
            }
            Err(err) => {
                warn!(
                    request_id = %request_id,
                    stage = %stage,
                    error = %err,
                    "Error resource failed, escalating"
                );
                None
            }
        }
    }
}
