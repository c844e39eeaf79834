//! # CLI Module
//!
//! Command-line access to endpoint matching and route tables, for trying
//! templates and error cascades without writing a transport.
//!
//! ## Commands
//!
//! ### `match`
//!
//! Match a literal path against one template and print the typed parameters:
//!
//! ```bash
//! brrtdispatch match --template '/items/:id<int>' /items/42
//! # {"id":42}
//! ```
//!
//! Exits non-zero when the path does not match.
//!
//! ### `route`
//!
//! Build a router from a YAML route table and dispatch one request:
//!
//! ```bash
//! brrtdispatch route --table routes.yaml --method POST '/orders/7?dry_run=1'
//! ```
//!
//! Options:
//! - `--table <FILE>` - Route table (required)
//! - `--method <METHOD>` - Request method (default: GET)
//! - `--header <NAME:VALUE>` - Request header, repeatable
//! - `--body <JSON>` - Body-derived parameters as JSON
//!
//! Prints the status line, headers and body of the response, whatever the
//! status. Only an unreadable table or bad arguments exit non-zero.
//!
//! ## Usage from Code
//!
//! ```rust,no_run
//! use brrtdispatch::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod commands;
#[cfg(test)]
mod tests;

pub use commands::{format_response, match_template, route_request, run_cli, Cli, Commands};
