//! Append-only JSONL run log at `<temp>/events.jsonl`.

use crate::core::error::{Error, Result};
use crate::core::types::{RunEvent, TimestampedEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn now_iso8601() -> String {
    format_iso8601(Utc::now())
}

/// Format an instant as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Event log location inside the temp directory.
pub fn event_log_path(temp_dir: &Path) -> PathBuf {
    temp_dir.join("events.jsonl")
}

/// Append one timestamped event.
pub fn append_event(temp_dir: &Path, event: RunEvent) -> Result<()> {
    let path = event_log_path(temp_dir);
    std::fs::create_dir_all(temp_dir).map_err(|e| Error::io(temp_dir, e))?;

    let line = serde_json::to_string(&TimestampedEvent {
        ts: now_iso8601(),
        event,
    })
    .map_err(|e| Error::Parse {
        file: path.clone(),
        message: e.to_string(),
    })?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| Error::io(&path, e))?;
    writeln!(file, "{}", line).map_err(|e| Error::io(&path, e))
}

/// Append an event, logging instead of failing. The run log never aborts a command.
pub fn record(temp_dir: &Path, event: RunEvent) {
    if let Err(e) = append_event(temp_dir, event) {
        tracing::warn!("cannot write run log: {}", e);
    }
}
