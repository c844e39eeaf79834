use crate::route_table::RouteTable;
use crate::router::EndpointTemplate;
use crate::runtime_config::RuntimeConfig;
use crate::server::{Request, Response};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Command-line interface for brrtdispatch
#[derive(Debug, Parser)]
#[command(name = "brrtdispatch")]
#[command(about = "Endpoint matching and routing from the command line", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Match a literal path against an endpoint template
    Match {
        /// Endpoint template, e.g. `/items/:id<int>`
        #[arg(short, long)]
        template: String,

        /// Literal path to match
        path: String,
    },
    /// Dispatch one request through a router built from a route table
    Route {
        /// Path to the YAML route table
        #[arg(short, long)]
        table: PathBuf,

        /// Request method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request header as `name:value` (repeatable)
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Body-derived parameters as JSON
        #[arg(long)]
        body: Option<String>,

        /// Request target: path with optional query and fragment
        target: String,
    },
}

/// Run a parsed command, printing its output to stdout.
///
/// # Errors
///
/// Invalid arguments, an unreadable route table, or (for `match`) a path
/// that does not match the template.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Match { template, path } => {
            println!("{}", match_template(&template, &path)?);
        }
        Commands::Route {
            table,
            method,
            headers,
            body,
            target,
        } => {
            let response = route_request(
                &table,
                &method,
                &target,
                &headers,
                body.as_deref(),
                RuntimeConfig::from_env(),
            )?;
            print!("{}", format_response(&response));
        }
    }
    Ok(())
}

/// Match `path` against `template` and render the parameters as JSON.
///
/// # Errors
///
/// The template does not compile or the path does not match it.
pub fn match_template(template: &str, path: &str) -> anyhow::Result<String> {
    let compiled = EndpointTemplate::compile(template)
        .with_context(|| format!("Invalid endpoint template: {template}"))?;

    let Some(params) = compiled.match_path(path) else {
        bail!("Path '{path}' does not match template '{template}'");
    };

    let mut map = serde_json::Map::new();
    for (name, value) in params {
        map.insert(name.to_string(), serde_json::to_value(value)?);
    }
    Ok(serde_json::Value::Object(map).to_string())
}

/// Build a router from the route table at `table` and dispatch one request.
///
/// # Errors
///
/// The table cannot be loaded or built, or an argument is malformed.
pub fn route_request(
    table: &Path,
    method: &str,
    target: &str,
    headers: &[String],
    body: Option<&str>,
    config: RuntimeConfig,
) -> anyhow::Result<Response> {
    let router = RouteTable::load(table)?.into_router(config)?;

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid method: {method}"))?;
    let mut request = Request::new(method, target);

    for header in headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("Header must be NAME:VALUE, got '{header}'");
        };
        request = request.with_header(name.trim(), value.trim());
    }

    if let Some(body) = body {
        let value = serde_json::from_str(body).context("Request body is not valid JSON")?;
        request = request.with_body(value);
    }

    debug!(request_id = %request.request_id, target, "Routing CLI request");
    Ok(router.dispatch_request(request))
}

/// Render a response as a status line, headers, a blank line and the body.
#[must_use]
pub fn format_response(response: &Response) -> String {
    let mut out = String::new();
    out.push_str(&format!("HTTP {}\n", response.status));
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\n"));
    }
    out.push('\n');
    match response.body_text() {
        Some(text) => out.push_str(text),
        None => out.push_str(
            &serde_json::to_string_pretty(&response.body).unwrap_or_else(|_| response.body.to_string()),
        ),
    }
    out.push('\n');
    out
}
