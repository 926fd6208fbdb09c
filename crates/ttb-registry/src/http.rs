//! Shared request plumbing for the registry and geocoder clients.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::RegistryError;

const MAX_UPSTREAM_MESSAGE_CHARS: usize = 200;

pub(crate) fn build_client(timeout_secs: u64, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()
}

/// Parses `raw` with exactly one trailing slash so `Url::join` appends to
/// the base path instead of replacing its last segment.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, String> {
    let normalised = format!("{}/", raw.trim().trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| e.to_string())
}

pub(crate) fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Pulls a short human-readable message out of an error body without
/// echoing arbitrary upstream payloads.
pub(crate) fn upstream_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "erreur", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(serde_json::Value::as_str).map(str::to_owned))
        });
    let message = from_json.unwrap_or_else(|| body.trim().to_owned());
    if message.is_empty() {
        return "no details".to_owned();
    }
    message.chars().take(MAX_UPSTREAM_MESSAGE_CHARS).collect()
}

/// Sends `request`, maps non-2xx statuses onto [`RegistryError`], and
/// deserialises the body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    registry: &'static str,
    request: RequestBuilder,
    context: &str,
) -> Result<T, RegistryError> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| RegistryError::Http { registry, source })?;
    let status = response.status();

    if !status.is_success() {
        let retry_after = retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(RegistryError::from_status(
            registry,
            status,
            retry_after,
            upstream_message(&body),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|source| RegistryError::Http { registry, source })?;
    serde_json::from_str(&body).map_err(|source| RegistryError::Deserialize {
        context: context.to_owned(),
        source,
    })
}
