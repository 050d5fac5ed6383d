//! Command implementations for the CLI.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use reqwest::Method;

use proxlock_client::{OutboundRequest, ProxLockClient};
use proxlock_common::SessionContext;

use crate::RequestArgs;
use crate::display::{display_proxy_request, display_response, proxy_request_json};

/// Splits a `Name: Value` header argument.
fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Header '{raw}' must look like 'Name: Value'");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Header '{raw}' has an empty name");
    }
    Ok((name, value.trim()))
}

/// Builds the outbound request from command-line arguments.
pub fn build_request(args: &RequestArgs) -> Result<OutboundRequest> {
    let method = Method::from_bytes(args.method.as_bytes())
        .with_context(|| format!("Invalid HTTP method '{}'", args.method))?;

    let mut request = OutboundRequest::parse(method, &args.url)?;
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value)?;
    }
    if let Some(data) = &args.data {
        request = request.with_body(data.clone());
    }

    Ok(request)
}

/// Rewrites the request and prints the result without sending it.
pub async fn inspect(client: &ProxLockClient, args: &RequestArgs, json: bool) -> Result<()> {
    let proxied = client.process(build_request(args)?).await?;

    if json {
        let value = proxy_request_json(&proxied);
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        display_proxy_request(&proxied);
    }

    Ok(())
}

/// Sends the request through the proxy and prints the response.
pub async fn send(client: &ProxLockClient, args: &RequestArgs) -> Result<()> {
    let response = client.send(build_request(args)?).await?;

    let status = response.status();
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;
    display_response(status, &body);

    Ok(())
}

/// Prints the bearer-token placeholder.
pub fn placeholder(session: &SessionContext) {
    println!("{}", session.bearer_token_placeholder().bright_cyan());
}
