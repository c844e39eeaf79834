//! # brrtdispatch
//!
//! **brrtdispatch** is an ordered key-to-handler dispatch engine and a typed
//! endpoint router built on top of it, with an error cascade that always
//! produces a response.
//!
//! ## Overview
//!
//! A [`Dispatcher`] maps keys to handlers and decides which handler(s) run
//! for an invocation, in what order, and what happens when a requested key
//! is missing. The [`Router`] owns three dispatchers (resources, endpoint
//! error resources and code error resources) plus one global error
//! resource, and resolves each request's path against typed templates such
//! as `/items/:id<int>`.
//!
//! ## Architecture
//!
//! - **[`dispatcher`]** - Ordered registry, three-tier fallback and the four
//!   dispatch strategies (key, first, all, pipe), plus curried handles
//! - **[`resolve`]** - Composable key mutators used during resolution
//! - **[`router`]** - Endpoint templates, typed matching and the error cascade
//! - **[`resource`]** - Resource contracts and stock resources
//! - **[`server`]** - Request/response records exchanged with a transport
//! - **[`route_table`]** - Declarative router setup from YAML
//! - **[`runtime_config`]** / **[`logging`]** - Environment-driven configuration
//! - **[`cli`]** - The `brrtdispatch` command-line tool
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Router
//!     participant Matcher as EndpointMatcher
//!     participant Resources as Dispatcher<br/>(resources)
//!     participant Errors as Dispatcher<br/>(endpoint / code errors)
//!     participant Global as GlobalErrorResource
//!
//!     Transport->>Router: dispatch(request)
//!     Router->>Matcher: find_candidate(path)
//!     alt No candidate or typed match fails
//!         Router->>Errors: 404 cascade
//!     end
//!     Router->>Resources: dispatch_to_key(template)
//!     alt Resource succeeds
//!         Resources-->>Transport: response
//!     else Resource raises HttpError
//!         Router->>Errors: endpoint error resource
//!         Router->>Errors: code error resource
//!         Router->>Global: global error resource (cannot fail)
//!         Global-->>Transport: response
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtdispatch::resource::{EchoResource, MethodResource};
//! use brrtdispatch::router::{ErroredRequest, Router};
//! use brrtdispatch::server::{HttpError, Request, Response};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router
//!     .register(
//!         "/pets/:id<int>",
//!         MethodResource::new().on(Method::GET, EchoResource),
//!         None,
//!     )
//!     .expect("valid template");
//! router.register_code_error(405, |e: &ErroredRequest| -> Result<Response, HttpError> {
//!     Ok(Response::text(405, format!("{} not allowed", e.request().method)))
//! });
//!
//! let ok = router.dispatch_request(Request::new(Method::GET, "/pets/7"));
//! assert_eq!(ok.status, 200);
//! assert_eq!(ok.body["params"]["id"], 7);
//!
//! let denied = router.dispatch_request(Request::new(Method::DELETE, "/pets/7"));
//! assert_eq!(denied.status, 405);
//! assert_eq!(denied.body_text(), Some("DELETE not allowed"));
//! ```
//!
//! ## Concurrency
//!
//! Registries have a build phase (`&mut self` registration) and a serve phase
//! (`&self` dispatch). Once built, a [`Router`] or [`Dispatcher`] can be shared
//! across threads and dispatched concurrently. Handlers run synchronously on
//! the caller's thread; there is no timeout or cancellation at this layer.

pub mod cli;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod resolve;
pub mod resource;
pub mod route_table;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{
    Candidate, DefaultPolicy, DispatchError, Dispatcher, Handler, Key, Slot, UndispatchableError,
};
pub use ids::RequestId;
pub use resource::{DefaultErrorResource, ErrorResource, GlobalErrorResource, Resource};
pub use route_table::RouteTable;
pub use router::{EndpointTemplate, ErroredRequest, Router};
pub use runtime_config::RuntimeConfig;
pub use server::{HttpError, Request, Response};
