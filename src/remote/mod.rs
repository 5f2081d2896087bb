// sdeupdater/src/remote/mod.rs
//! Freshness metadata for the published dump, fetched without pulling the
//! dump body itself.

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::LAST_MODIFIED;
use reqwest::Client;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDumpMetadata {
    pub last_modified: DateTime<Utc>,
    pub checksum: Option<String>,
}

/// Shared HTTP client for every request one invocation makes.
pub fn build_http_client() -> Result<Client> {
    let client = Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// HEAD request against the dump; only the `Last-Modified` header matters.
pub async fn fetch_metadata(client: &Client, dump_url: &str) -> Result<RemoteDumpMetadata> {
    let response = client.head(dump_url).send().await?;
    debug!("HEAD {} -> {}", dump_url, response.status());

    let last_modified = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_http_date)
        .ok_or_else(|| AppError::MetadataUnavailable {
            url: dump_url.to_string(),
        })?;

    Ok(RemoteDumpMetadata {
        last_modified,
        checksum: None,
    })
}

/// Looks for the `<dump_url>.md5` side file. The checksum is advisory, so
/// any failure just means there is none.
pub async fn fetch_checksum(client: &Client, dump_url: &str) -> Option<String> {
    let checksum_url = format!("{}.md5", dump_url);
    let response = match client.get(&checksum_url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("Checksum request to {} failed: {}", checksum_url, e);
            return None;
        }
    };

    if !response.status().is_success() {
        debug!("No checksum at {} ({})", checksum_url, response.status());
        return None;
    }

    match response.text().await {
        Ok(body) => body.split_whitespace().next().map(str::to_string),
        Err(e) => {
            debug!("Could not read checksum body from {}: {}", checksum_url, e);
            None
        }
    }
}

fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
