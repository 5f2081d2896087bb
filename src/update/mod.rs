// sdeupdater/src/update/mod.rs
pub(crate) mod staleness; // Ledger vs Last-Modified comparison

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::Client;
use std::path::Path;

use crate::config::{AppConfig, DispatchConfig, RestoreConfig};
use crate::dispatch::trigger_build;
use crate::errors::Result;
use crate::fetch::{decompress_dump, download_dump};
use crate::ledger::Ledger;
use crate::remote::fetch_checksum;
use crate::restore::replace_database;

pub use staleness::check_staleness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate,
    Restored(DateTime<Utc>),
    Dispatched(DateTime<Utc>),
}

/// One check-and-restore cycle: probe, download, decompress, restore,
/// advance. Each stage's temp file lives until the stage after it is done.
/// With `keep_dump` the decompressed dump is moved there afterwards instead
/// of being deleted, whether or not the restore worked.
pub async fn run_update(
    client: &Client,
    app_config: &AppConfig,
    restore_config: &RestoreConfig,
    ledger: &Ledger,
    keep_dump: Option<&Path>,
) -> Result<UpdateOutcome> {
    let report = check_staleness(client, &app_config.dump_url, ledger).await?;
    if !report.stale {
        println!("Already up to date");
        return Ok(UpdateOutcome::UpToDate);
    }

    println!("🔄 Database out of date. Downloading dump...");
    let compressed = download_dump(client, &app_config.dump_url).await?;
    debug!("Compressed dump is {} bytes", compressed.size()?);
    let dump = decompress_dump(&compressed).await?;
    drop(compressed);

    println!("🔄 Restoring dump...");
    let restored = replace_database(restore_config, dump.path(), ledger);

    if let Some(destination) = keep_dump {
        match dump.hand_off(destination) {
            Ok(kept) => println!("Decompressed dump kept at {}", kept.display()),
            Err(e) => eprintln!("⚠️  Could not keep dump at {}: {}", destination.display(), e),
        }
    }
    Ok(UpdateOutcome::Restored(restored?))
}

/// One check-and-dispatch cycle: probe, then hand the build to GitHub
/// Actions tagged with the dump's date and checksum.
pub async fn run_poll(
    client: &Client,
    app_config: &AppConfig,
    dispatch_config: &DispatchConfig,
    ledger: &Ledger,
) -> Result<UpdateOutcome> {
    let report = check_staleness(client, &app_config.dump_url, ledger).await?;
    if !report.stale {
        println!("Already up to date.");
        return Ok(UpdateOutcome::UpToDate);
    }

    println!("🔄 Database out of date. Starting GHA workflow.");
    let mut metadata = report.metadata;
    metadata.checksum = fetch_checksum(client, &app_config.dump_url).await;
    let updated_at = trigger_build(client, dispatch_config, &metadata, ledger).await?;
    Ok(UpdateOutcome::Dispatched(updated_at))
}
