//! # Router Module
//!
//! Typed endpoint templates and the request router built on three
//! [`Dispatcher`](crate::dispatcher::Dispatcher) instances.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling endpoint templates such as `/items/:id<int>` into segments
//! - Picking the candidate template for a literal path and extracting typed
//!   parameters from it
//! - Invoking the resource registered for the matched template
//! - Running the error cascade (endpoint → code → global) when anything fails
//!
//! ## Matching
//!
//! Matching is two-phase:
//!
//! 1. **Candidate selection**: every template is turned into an anchored
//!    regex with each parameter replaced by a single-segment wildcard. The
//!    first template (in registration order) whose regex matches wins.
//!
//! 2. **Typed matching**: the winner's parameters are extracted and coerced.
//!    If coercion fails (`/items/abc` against `/items/:id<int>`) the request
//!    fails with `404`; later templates are not tried.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::router::Router;
//! use brrtdispatch::server::{HttpError, Request, Response};
//! use http::Method;
//! use serde_json::json;
//!
//! let mut router = Router::new();
//! router
//!     .register(
//!         "/items/:id<int>",
//!         |req: &Request| -> Result<Response, HttpError> {
//!             let id = req.get_path_param("id").and_then(|v| v.as_int());
//!             Ok(Response::json(200, json!({ "id": id })))
//!         },
//!         None,
//!     )
//!     .expect("valid template");
//!
//! let ok = router.dispatch_request(Request::new(Method::GET, "/items/42"));
//! assert_eq!(ok.status, 200);
//! assert_eq!(ok.body, json!({ "id": 42 }));
//!
//! let missing = router.dispatch_request(Request::new(Method::GET, "/items/abc"));
//! assert_eq!(missing.status, 404);
//! assert_eq!(missing.body_text(), Some("HTTP 404 Error"));
//! ```

mod core;
mod endpoint;
mod errored;

pub use core::{CascadeStage, ResourceFailure, Router};
pub use endpoint::{
    EndpointMatch, EndpointMatcher, EndpointTemplate, ParamKind, ParamValue, PathParams, Segment,
    TemplateError,
};
pub use errored::ErroredRequest;
