//! Unit tests for CLI commands

use crate::cli::{format_response, match_template, Cli, Commands};
use crate::server::Response;
use clap::Parser;
use serde_json::json;

#[test]
fn test_match_command_parses() {
    let cli = Cli::try_parse_from([
        "brrtdispatch",
        "match",
        "--template",
        "/items/:id<int>",
        "/items/42",
    ])
    .unwrap();

    match cli.command {
        Commands::Match { template, path } => {
            assert_eq!(template, "/items/:id<int>");
            assert_eq!(path, "/items/42");
        }
        other => panic!("Expected Match command, got {other:?}"),
    }
}

#[test]
fn test_route_command_defaults_to_get() {
    let cli = Cli::try_parse_from(["brrtdispatch", "route", "--table", "routes.yaml", "/x"]).unwrap();

    match cli.command {
        Commands::Route {
            table,
            method,
            headers,
            body,
            target,
        } => {
            assert_eq!(table.to_string_lossy(), "routes.yaml");
            assert_eq!(method, "GET");
            assert!(headers.is_empty());
            assert!(body.is_none());
            assert_eq!(target, "/x");
        }
        other => panic!("Expected Route command, got {other:?}"),
    }
}

#[test]
fn test_route_command_repeated_headers() {
    let cli = Cli::try_parse_from([
        "brrtdispatch",
        "route",
        "--table",
        "routes.yaml",
        "--header",
        "accept:text/plain",
        "--header",
        "x-trace:1",
        "/x",
    ])
    .unwrap();

    match cli.command {
        Commands::Route { headers, .. } => {
            assert_eq!(headers, vec!["accept:text/plain", "x-trace:1"]);
        }
        other => panic!("Expected Route command, got {other:?}"),
    }
}

#[test]
fn test_match_template_prints_typed_params() {
    let out = match_template("/users/:name/posts/:id<int>", "/users/ada/posts/7").unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value, json!({ "name": "ada", "id": 7 }));
}

#[test]
fn test_match_template_no_match_is_error() {
    let err = match_template("/items/:id<int>", "/items/abc").unwrap_err();
    assert!(err.to_string().contains("does not match"));
}

#[test]
fn test_match_template_bad_template_is_error() {
    assert!(match_template("/items/:id<float>", "/items/1").is_err());
}

#[test]
fn test_format_response_text_body() {
    let out = format_response(&Response::text(404, "HTTP 404 Error"));
    assert_eq!(out, "HTTP 404\ncontent-type: text/plain\n\nHTTP 404 Error\n");
}
