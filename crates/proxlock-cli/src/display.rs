//! Display utilities for CLI output formatting
//!
//! Renders proxy requests and proxied responses

use colored::Colorize;
use reqwest::StatusCode;
use serde_json::{Map, Value, json};

use proxlock_client::ProxyRequest;
use proxlock_client::transform::{identity_header_names, proxlock_headers};

/// Headers the transformer did not set, in map order.
fn passthrough_headers(request: &ProxyRequest) -> Vec<(String, String)> {
    let owned = identity_header_names();
    request
        .headers()
        .iter()
        .filter(|(name, _)| !owned.iter().any(|o| *o == *name))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

fn body_text(request: &ProxyRequest) -> Option<String> {
    request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

/// Display a proxy request in a readable form
pub fn display_proxy_request(request: &ProxyRequest) {
    println!(
        "{} {}",
        request.method().as_str().bright_white().bold(),
        request.url().as_str().bright_white()
    );

    for (name, value) in proxlock_headers(request.headers()) {
        println!("  {}: {}", name.bright_cyan(), value);
    }
    for (name, value) in passthrough_headers(request) {
        println!("  {}: {}", name.dimmed(), value);
    }

    if let Some(body) = body_text(request) {
        println!();
        println!("{body}");
    }
}

/// Machine-readable form of a proxy request
pub fn proxy_request_json(request: &ProxyRequest) -> Value {
    let mut headers = Map::new();
    for (name, value) in proxlock_headers(request.headers()) {
        headers.insert(name.to_string(), Value::String(value.to_string()));
    }
    for (name, value) in passthrough_headers(request) {
        headers.insert(name, Value::String(value));
    }

    json!({
        "method": request.method().as_str(),
        "url": request.url().as_str(),
        "headers": headers,
        "body": body_text(request),
    })
}

/// Display a proxied response
pub fn display_response(status: StatusCode, body: &str) {
    let label = status.to_string();
    let label = if status.is_success() {
        label.bright_green()
    } else if status.is_client_error() || status.is_server_error() {
        label.bright_red()
    } else {
        label.yellow()
    };
    println!("{} {label}", "●".bright_blue());

    if !body.is_empty() {
        println!("{body}");
    }
}
