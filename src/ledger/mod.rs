// sdeupdater/src/ledger/mod.rs
//! Append-only record of when the local database was last brought up to
//! date. One timestamp per line; the newest line wins.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

/// EVE Online's release date. Anything the SDE endpoint serves is newer.
pub fn sentinel_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2003, 5, 6, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Ledger { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Instant of the last successful update. A missing, empty or garbled
    /// log means "never updated" and yields the sentinel.
    pub fn current_timestamp(&self) -> DateTime<Utc> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Ledger {} unreadable ({}), treating as stale", self.path.display(), e);
                return sentinel_epoch();
            }
        };

        let Some(last_line) = content.lines().map(str::trim).filter(|l| !l.is_empty()).last() else {
            debug!("Ledger {} is empty, treating as stale", self.path.display());
            return sentinel_epoch();
        };

        match parse_timestamp(last_line) {
            Some(ts) => ts,
            None => {
                warn!(
                    "Last ledger entry '{}' in {} is not a timestamp, treating as stale",
                    last_line,
                    self.path.display()
                );
                sentinel_epoch()
            }
        }
    }

    /// Appends the current instant. Never writes a value older than the
    /// current one, so the ledger cannot move backwards with the clock.
    pub fn advance(&self) -> Result<DateTime<Utc>> {
        // Truncated to what the log line can represent.
        let now = Utc::now().trunc_subsecs(6).max(self.current_timestamp());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut log = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(log, "{}", now.to_rfc3339_opts(SecondsFormat::Micros, true))?;
        log.sync_all()?;

        debug!("Ledger {} advanced to {}", self.path.display(), now);
        Ok(now)
    }
}

/// Accepts RFC 3339 and the naive ISO-8601 form older logs were written in
/// (no offset, implicitly UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
