//! # Route Tables
//!
//! Declarative router setup from YAML.
//!
//! ```yaml
//! routes:
//!   - template: /items/:id<int>
//!     methods: [GET]
//!     status: 200
//!     body: { kind: item }
//!   - template: /orders/:id<int>
//!     fail_with: { status: 422, detail: "order is locked" }
//!     on_error: { body: "order unavailable" }
//!   - template: /echo/:name
//! code_errors:
//!   404: { body: { error: "not here" } }
//! ```
//!
//! A route without `body` or `fail_with` echoes the request (see
//! [`EchoResource`]). `methods` wraps the route in a [`MethodResource`];
//! without it every method is accepted. Error bodies keep the failure's
//! status unless they set their own. String bodies are sent as plain text,
//! anything else as JSON.

use crate::resource::{EchoResource, ErrorResource, MethodResource, Resource};
use crate::router::{ErroredRequest, Router};
use crate::runtime_config::RuntimeConfig;
use crate::server::{HttpError, Request, Response};
use anyhow::Context;
use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A parsed route table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    /// Routes in matching order
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    /// Error bodies keyed by status code
    #[serde(default)]
    pub code_errors: BTreeMap<u16, ErrorBody>,
}

/// One endpoint template and what it serves.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    /// Endpoint template, e.g. `/items/:id<int>`
    pub template: String,
    /// Accepted methods; empty accepts any
    #[serde(default)]
    pub methods: Vec<String>,
    /// Status of the static response (default 200)
    #[serde(default)]
    pub status: Option<u16>,
    /// Static response body
    #[serde(default)]
    pub body: Option<Value>,
    /// Fail every request with this error instead of responding
    #[serde(default)]
    pub fail_with: Option<FailWith>,
    /// Endpoint error body
    #[serde(default)]
    pub on_error: Option<ErrorBody>,
}

/// A declared failure raised by a route.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailWith {
    /// HTTP status
    pub status: u16,
    /// Short reason; defaults to the canonical reason phrase
    #[serde(default)]
    pub reason: Option<String>,
    /// Developer-facing detail
    #[serde(default)]
    pub detail: String,
}

/// Body served by an endpoint or code error resource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorBody {
    /// Overrides the failure's status
    #[serde(default)]
    pub status: Option<u16>,
    /// Response body
    pub body: Value,
}

impl RouteTable {
    /// Parse a route table from YAML text.
    ///
    /// # Errors
    ///
    /// Malformed YAML or unknown fields.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse route table")
    }

    /// Read and parse a route table file.
    ///
    /// # Errors
    ///
    /// The file cannot be read or does not parse.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route table: {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid route table: {}", path.display()))
    }

    /// Build a router serving this table.
    ///
    /// # Errors
    ///
    /// A template does not compile or a method name is invalid.
    pub fn into_router(self, config: RuntimeConfig) -> anyhow::Result<Router> {
        let mut router = Router::with_config(config);

        for route in self.routes {
            let resource = route_resource(&route)?;
            let on_error = route
                .on_error
                .map(|body| Arc::new(StaticErrorResource(body)) as Arc<dyn ErrorResource>);
            router
                .register(&route.template, BoxedResource(resource), on_error)
                .with_context(|| format!("Invalid route template: {}", route.template))?;
        }

        for (code, body) in self.code_errors {
            router.register_code_error(code, StaticErrorResource(body));
        }

        info!(
            routes = router.templates().count(),
            "Router built from route table"
        );
        Ok(router)
    }
}

fn route_resource(route: &RouteSpec) -> anyhow::Result<Box<dyn Resource>> {
    let base: Box<dyn Resource> = match (&route.fail_with, &route.body) {
        (Some(fail), _) => Box::new(FailingResource(fail.clone())),
        (None, Some(body)) => Box::new(StaticResource {
            status: route.status.unwrap_or(200),
            body: body.clone(),
        }),
        (None, None) => Box::new(EchoResource),
    };

    if route.methods.is_empty() {
        return Ok(base);
    }

    let base: Arc<dyn Resource> = Arc::from(base);
    let mut methods = MethodResource::new();
    for name in &route.methods {
        let method = Method::from_bytes(name.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("Invalid method '{}' for {}", name, route.template))?;
        methods = methods.on(method, SharedResource(Arc::clone(&base)));
    }
    Ok(Box::new(methods))
}

fn render(status: u16, body: &Value) -> Response {
    match body {
        Value::String(text) => Response::text(status, text.as_str()),
        other => Response::json(status, other.clone()),
    }
}

struct StaticResource {
    status: u16,
    body: Value,
}

impl Resource for StaticResource {
    fn handle(&self, _request: &Request) -> Result<Response, HttpError> {
        Ok(render(self.status, &self.body))
    }

    fn name(&self) -> &str {
        "static"
    }
}

struct FailingResource(FailWith);

impl Resource for FailingResource {
    fn handle(&self, _request: &Request) -> Result<Response, HttpError> {
        let reason = self.0.reason.clone().unwrap_or_else(|| {
            StatusCode::from_u16(self.0.status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .unwrap_or("Error")
                .to_string()
        });
        Err(HttpError::new(self.0.status, reason, self.0.detail.as_str()))
    }

    fn name(&self) -> &str {
        "fail_with"
    }
}

struct BoxedResource(Box<dyn Resource>);

impl Resource for BoxedResource {
    fn handle(&self, request: &Request) -> Result<Response, HttpError> {
        self.0.handle(request)
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

struct SharedResource(Arc<dyn Resource>);

impl Resource for SharedResource {
    fn handle(&self, request: &Request) -> Result<Response, HttpError> {
        self.0.handle(request)
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

struct StaticErrorResource(ErrorBody);

impl ErrorResource for StaticErrorResource {
    fn handle(&self, errored: &ErroredRequest) -> Result<Response, HttpError> {
        let status = self.0.status.unwrap_or_else(|| errored.expected_status());
        Ok(render(status, &self.0.body))
    }
}
