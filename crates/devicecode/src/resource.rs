//! Call to the protected resource with the acquired token.

use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Response from the protected resource.
#[derive(Debug)]
pub enum ResourceResponse {
    /// Success with a JSON object body.
    Object(Map<String, Value>),
    /// Non-success status with the raw body.
    Failed {
        /// HTTP status.
        status: StatusCode,
        /// Response body as text.
        body: String,
    },
    /// `cancel` fired before the response arrived.
    Cancelled,
}

/// Sends `GET url` with the token as a bearer credential, giving up as soon
/// as `cancel` fires.
///
/// # Errors
///
/// Returns an error on transport failure, or when a successful response is
/// not a JSON object.
pub async fn fetch(
    client: &Client,
    url: Url,
    access_token: &str,
    cancel: &CancellationToken,
) -> Result<ResourceResponse> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!("Resource call cancelled");
            Ok(ResourceResponse::Cancelled)
        }
        response = send(client, url, access_token) => response,
    }
}

async fn send(client: &Client, url: Url, access_token: &str) -> Result<ResourceResponse> {
    debug!("GET {url}");
    let response = client
        .get(url.clone())
        .bearer_auth(access_token)
        .send()
        .await
        .with_context(|| format!("failed to call {url}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .with_context(|| format!("failed to read response from {url}"))?;

    if !status.is_success() {
        return Ok(ResourceResponse::Failed { status, body });
    }

    match serde_json::from_str::<Value>(&body).context("resource response is not JSON")? {
        Value::Object(object) => Ok(ResourceResponse::Object(object)),
        _ => bail!("resource response is not a JSON object"),
    }
}
