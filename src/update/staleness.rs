// sdeupdater/src/update/staleness.rs
use chrono::{DateTime, Utc};
use log::info;
use reqwest::Client;

use crate::errors::Result;
use crate::ledger::Ledger;
use crate::remote::{fetch_metadata, RemoteDumpMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessReport {
    pub last_update: DateTime<Utc>,
    pub metadata: RemoteDumpMetadata,
    pub stale: bool,
}

/// Strictly older than the dump means stale; equal is up to date.
pub fn is_stale(last_update: DateTime<Utc>, metadata: &RemoteDumpMetadata) -> bool {
    last_update < metadata.last_modified
}

pub async fn check_staleness(client: &Client, dump_url: &str, ledger: &Ledger) -> Result<StalenessReport> {
    let last_update = ledger.current_timestamp();
    let metadata = fetch_metadata(client, dump_url).await?;
    let stale = is_stale(last_update, &metadata);
    info!(
        "Last update {}, dump modified {}, stale: {}",
        last_update, metadata.last_modified, stale
    );
    Ok(StalenessReport {
        last_update,
        metadata,
        stale,
    })
}
