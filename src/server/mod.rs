//! # Server Types
//!
//! The request and response records exchanged between a transport and the
//! router. Reading bytes off the wire and writing status lines back is the
//! transport's job; this module only defines the shapes:
//!
//! - [`Request`]: `(method, path, query, body-derived params, headers, fragment)`
//!   plus a write-once endpoint binding
//! - [`Response`]: `(status, ordered headers, body)`
//! - [`HttpError`]: a declared failure `(status, reason, detailed reason)`

mod error;
mod request;
mod response;

pub use error::HttpError;
pub use request::{parse_query_params, ParamVec, Request, MAX_INLINE_PARAMS};
pub use response::{HeaderVec, Response, MAX_INLINE_HEADERS};
