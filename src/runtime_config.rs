//! # Runtime Configuration Module
//!
//! Environment-variable configuration for router behavior.
//!
//! ## Environment Variables
//!
//! ### `BRRTD_SLOW_DISPATCH_US`
//!
//! Resource invocations slower than this many microseconds are logged at
//! `warn` with their duration. Default: `1000` (1 ms).
//!
//! ### `BRRTD_EXPOSE_ERROR_DETAILS`
//!
//! When `true`, the built-in global error resource appends the
//! developer-facing reason to its plain-text body. Default: `false`.
//! Leave this off for anything reachable by untrusted clients.
//!
//! ## Usage
//!
//! ```rust
//! use brrtdispatch::runtime_config::RuntimeConfig;
//! use brrtdispatch::router::Router;
//!
//! let config = RuntimeConfig::from_env();
//! let router = Router::with_config(config);
//! ```
//!
//! Invalid values fall back to the defaults rather than failing startup.

use std::env;
use std::time::Duration;

const DEFAULT_SLOW_DISPATCH_US: u64 = 1000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Resource invocations slower than this are logged as slow
    pub slow_dispatch_threshold: Duration,
    /// Include detailed reasons in default error bodies
    pub expose_error_details: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            slow_dispatch_threshold: Duration::from_micros(DEFAULT_SLOW_DISPATCH_US),
            expose_error_details: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Used by [`from_env`](Self::from_env) and by tests that must not touch
    /// the process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let slow_us = lookup("BRRTD_SLOW_DISPATCH_US")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SLOW_DISPATCH_US);
        let expose_error_details = lookup("BRRTD_EXPOSE_ERROR_DETAILS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        RuntimeConfig {
            slow_dispatch_threshold: Duration::from_micros(slow_us),
            expose_error_details,
        }
    }
}
