//! Generation history log.
//!
//! Successful generations append one JSON line to
//! `$HOME/.gitscribe/history.jsonl`. The log is best-effort: failures are
//! logged at debug level and never interrupt the flow that produced the
//! artifact.

use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::dot_dir;

/// One history record.
#[derive(Debug, Serialize)]
pub struct HistoryEntry<'a> {
    /// When the artifact was produced.
    pub timestamp: DateTime<Utc>,
    /// Kind of artifact: "commit", "tag", or "pr".
    pub kind: &'a str,
    /// First line of the generated artifact.
    pub subject: &'a str,
}

/// Records a generated artifact, swallowing any I/O failure.
pub fn record(kind: &str, subject: &str) {
    if let Err(error) = try_record(kind, subject) {
        debug!(%error, kind, "failed to append history entry");
    }
}

fn try_record(kind: &str, subject: &str) -> Result<()> {
    let dir = dot_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let entry = HistoryEntry {
        timestamp: Utc::now(),
        kind,
        subject,
    };
    let line = serde_json::to_string(&entry).context("Failed to serialize history entry")?;

    let path = dir.join("history.jsonl");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{line}").context("Failed to write history entry")?;

    Ok(())
}
