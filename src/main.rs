//! EVE SDE Postgres updater
//!
//! Keeps a local PostgreSQL database in step with the published Static
//! Data Export, or triggers a GitHub Actions image build when it changes.

// sdeupdater/src/main.rs
mod config;
mod dispatch;
mod errors;
mod fetch;
mod ledger;
mod remote;
mod restore;
mod update;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use config::{env_lookup, load_app_config, load_dispatch_config, load_env_file, load_restore_config};
use errors::{AppError, Result};
use ledger::Ledger;
use remote::build_http_client;
use update::{check_staleness, run_poll, run_update, UpdateOutcome};

#[derive(Debug, Parser)]
#[command(name = "sdeupdater", version, about = "EVE SDE Postgres updater")]
struct Cli {
    /// Env file to load from the config/ directory
    #[arg(short, long, value_name = "ENV FILE NAME", default_value = ".env", global = true)]
    env: String,

    #[command(subcommand)]
    command: Option<Operation>,
}

#[derive(Debug, Subcommand)]
enum Operation {
    /// Download and restore the dump if it is newer than the last update (default)
    Update {
        /// Keep the decompressed dump at this path instead of deleting it
        #[arg(long, value_name = "PATH")]
        keep_dump: Option<PathBuf>,
    },
    /// Start the image build workflow if the dump is newer than the last update
    Poll {
        /// Git branch to run the workflow on [env: GITHUB_BRANCH, default: master]
        #[arg(short, long, value_name = "GIT BRANCH")]
        branch: Option<String>,
        /// GitHub auth token [env: GITHUB_TOKEN]
        #[arg(short, long, value_name = "AUTH TOKEN")]
        token: Option<String>,
    },
    /// Report whether an update is due without changing anything
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run_app(cli).await {
        Ok(outcome) => {
            match outcome {
                UpdateOutcome::Restored(at) | UpdateOutcome::Dispatched(at) => {
                    println!("✓ Ledger advanced to {}", at.to_rfc3339());
                }
                UpdateOutcome::UpToDate => {}
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_failure(&mut std::io::stderr(), &e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run_app(cli: Cli) -> Result<UpdateOutcome> {
    load_env_file(&cli.env)?;
    let app_config = load_app_config(env_lookup).context("Failed to load configuration")?;
    let ledger = Ledger::new(&app_config.ledger_path);
    let client = build_http_client()?;

    match cli.command.unwrap_or(Operation::Update { keep_dump: None }) {
        Operation::Update { keep_dump } => {
            let restore_config = load_restore_config(env_lookup).context("Failed to load restore configuration")?;
            run_update(&client, &app_config, &restore_config, &ledger, keep_dump.as_deref()).await
        }
        Operation::Poll { branch, token } => {
            let dispatch_config =
                load_dispatch_config(env_lookup, branch, token).context("Failed to load workflow configuration")?;
            run_poll(&client, &app_config, &dispatch_config, &ledger).await
        }
        Operation::Status => {
            let report = check_staleness(&client, &app_config.dump_url, &ledger).await?;
            println!("Ledger:        {}", ledger.path().display());
            println!("Last update:   {}", report.last_update.to_rfc3339());
            println!("Dump modified: {}", report.metadata.last_modified.to_rfc3339());
            if report.stale {
                println!("Database out of date.");
            } else {
                println!("Already up to date.");
            }
            Ok(UpdateOutcome::UpToDate)
        }
    }
}

fn report_failure(out: &mut impl Write, error: &AppError) {
    let _ = match error {
        AppError::Restore { stdout, stderr, .. } => writeln!(
            out,
            "--- FAILED TO RESTORE DUMP ---\nError output:\n{}\n{}",
            stdout, stderr
        ),
        AppError::Dispatch { .. } => writeln!(out, "❌ {}\nFailed to start workflow.", error),
        _ => writeln!(out, "❌ Error: {:#}", error),
    };
}
