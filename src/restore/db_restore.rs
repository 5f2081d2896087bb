// sdeupdater/src/restore/db_restore.rs
use chrono::{DateTime, Utc};
use log::debug;
use std::fs::File;
use std::path::Path;
use std::process::Stdio;

use super::command::ToolInvocation;
use crate::config::{RestoreConfig, RestoreStyle};
use crate::errors::{AppError, Result};
use crate::ledger::Ledger;

/// Drops and recreates the target database. Failures are only logged:
/// pg_restore is still attempted against whatever is there.
pub fn prepare_database(config: &RestoreConfig) {
    for invocation in [
        ToolInvocation::drop_database(config),
        ToolInvocation::create_database(config),
    ] {
        println!("Running: {}", invocation);
        let output = invocation
            .to_command()
            .and_then(|mut command| Ok(command.stdin(Stdio::null()).output()?));
        match output {
            Ok(output) if output.status.success() => {
                debug!("{} succeeded", invocation.program);
            }
            Ok(output) => eprintln!(
                "⚠️  '{}' exited with {}: {}",
                invocation,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => eprintln!("⚠️  '{}' could not be run: {:#}", invocation, e),
        }
    }
}

/// Runs pg_restore with the decompressed dump on stdin, capturing its
/// output. A non-zero exit becomes `AppError::Restore` carrying the tool's
/// exit code and everything it printed.
pub fn restore_dump(config: &RestoreConfig, dump_path: &Path) -> Result<()> {
    let invocation = ToolInvocation::restore(config);
    println!("Running: {} < {}", invocation, dump_path.display());

    let dump = File::open(dump_path)?;
    let output = invocation.to_command()?.stdin(Stdio::from(dump)).output()?;

    if !output.status.success() {
        return Err(AppError::Restore {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    debug!("pg_restore output:\n{}", String::from_utf8_lossy(&output.stderr));
    Ok(())
}

/// Replaces the target database with the dump at `dump_path` and, only if
/// the restore succeeded, advances the ledger.
pub fn replace_database(config: &RestoreConfig, dump_path: &Path, ledger: &Ledger) -> Result<DateTime<Utc>> {
    if config.style == RestoreStyle::Recreate {
        prepare_database(config);
    }
    restore_dump(config, dump_path)?;
    let updated_at = ledger.advance()?;
    println!("✅ Database dump restored successfully!");
    Ok(updated_at)
}
