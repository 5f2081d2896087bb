// sdeupdater/src/dispatch/mod.rs
//! Alternate mode: instead of restoring locally, ask GitHub Actions to
//! build fresh images for the new dump.

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::DispatchConfig;
use crate::errors::{AppError, Result};
use crate::ledger::Ledger;
use crate::remote::RemoteDumpMetadata;

/// Checksum tag used when the dump has no `.md5` side file.
pub const ABSENT_CHECKSUM_TAG: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildTags {
    #[serde(rename = "date-tag")]
    pub date_tag: String,
    #[serde(rename = "checksum-tag")]
    pub checksum_tag: String,
}

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: &'a BuildTags,
}

pub fn derive_tags(metadata: &RemoteDumpMetadata) -> BuildTags {
    BuildTags {
        date_tag: metadata.last_modified.format("%Y-%m-%d_%H-%M").to_string(),
        checksum_tag: metadata
            .checksum
            .clone()
            .unwrap_or_else(|| ABSENT_CHECKSUM_TAG.to_string()),
    }
}

fn dispatch_url(config: &DispatchConfig) -> String {
    format!(
        "{}/repos/{}/actions/workflows/{}/dispatches",
        config.api_url, config.repository, config.workflow
    )
}

/// POSTs a workflow_dispatch event. Only 204 counts as accepted; anything
/// else comes back as `AppError::Dispatch` with the response body.
pub async fn dispatch_workflow(client: &Client, config: &DispatchConfig, tags: &BuildTags) -> Result<()> {
    let url = dispatch_url(config);
    debug!("Dispatching {} on {} with {:?}", config.workflow, config.branch, tags);

    let response = client
        .post(&url)
        .header(AUTHORIZATION, format!("Bearer {}", config.token))
        .header(ACCEPT, "application/vnd.github+json")
        .json(&DispatchRequest {
            git_ref: &config.branch,
            inputs: tags,
        })
        .send()
        .await?;

    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(());
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable body: {}>", e),
    };
    Err(AppError::Dispatch {
        status: status.as_u16(),
        body,
    })
}

/// Dispatches the build for `metadata` and advances the ledger once GitHub
/// has accepted it.
pub async fn trigger_build(
    client: &Client,
    config: &DispatchConfig,
    metadata: &RemoteDumpMetadata,
    ledger: &Ledger,
) -> Result<DateTime<Utc>> {
    let tags = derive_tags(metadata);
    println!(
        "Starting workflow {} on {} (date-tag {}, checksum-tag {})",
        config.workflow, config.branch, tags.date_tag, tags.checksum_tag
    );
    dispatch_workflow(client, config, &tags).await?;
    let updated_at = ledger.advance()?;
    println!("✅ Workflow started.");
    Ok(updated_at)
}
