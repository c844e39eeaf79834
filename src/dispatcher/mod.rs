//! # Dispatcher Module
//!
//! The dispatcher module provides the generic key-to-handler dispatch engine
//! that the router is built on.
//!
//! ## Overview
//!
//! A [`Dispatcher`] is an insertion-ordered registry mapping [`Key`]s to
//! handlers. It:
//! - Registers handlers under explicit keys or anonymous numeric slots
//! - Resolves requested keys, including keys computed from the call arguments
//! - Falls back from the requested key to an explicit default and then to a
//!   registry-wide default key
//! - Offers four invocation strategies over that fallback chain
//!
//! ## Strategies
//!
//! | Strategy | Runs | Returns |
//! |----------|------|---------|
//! | [`Dispatcher::dispatch_to_key`] | one key | its result |
//! | [`Dispatcher::dispatch_to_first`] | first dispatchable key | its result |
//! | [`Dispatcher::dispatch_to_all`] | every key, in order | key → result map |
//! | [`Dispatcher::dispatch_to_pipe`] | every key, chaining results | last result |
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::dispatcher::{Candidate, DefaultPolicy, Dispatcher, Slot};
//! use std::convert::Infallible;
//!
//! let mut dispatcher: Dispatcher<i64, i64, Infallible> =
//!     Dispatcher::new(DefaultPolicy::AutoFirstRegistered);
//! dispatcher.register("double", |x: i64| Ok(x * 2));
//! dispatcher.register("square", |x: i64| Ok(x * x));
//! dispatcher.register(Slot::Auto, |x: i64| Ok(-x));
//!
//! assert_eq!(dispatcher.dispatch_to_key("square", 3, None).ok(), Some(9));
//! // Unknown key: falls back to the first registered key ("double")
//! assert_eq!(dispatcher.dispatch_to_key("cube", 3, None).ok(), Some(6));
//! // Pipeline: double, then square
//! let pipe: Vec<Candidate<i64>> = vec!["double".into(), "square".into()];
//! assert_eq!(dispatcher.dispatch_to_pipe(Some(pipe.as_slice()), 3, None).ok(), Some(36));
//! ```
//!
//! ## Concurrency
//!
//! Registration needs `&mut self`; dispatch needs only `&self`. Build the
//! registry first, then share it. Strategies that run several handlers run
//! them sequentially on the calling thread, because handler side effects and
//! pipeline order are significant. There is no timeout at this layer: a
//! handler that never returns blocks its caller.

mod core;
mod error;
mod handle;
mod key;

pub use core::{Broadcast, Dispatcher, Handler, ReturnKeys, Spread};
pub use error::{DispatchError, UndispatchableError};
pub use handle::{AllHandle, FirstHandle, Invocable, KeyHandle, PipeHandle};
pub use key::{Candidate, ComputeKey, DefaultPolicy, Key, Slot};
