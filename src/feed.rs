//! JSON-lines update feed
//!
//! Stand-in for the device transport. Each line is one network message:
//! either a single `{"path": ..., "value": ...}` object or an array of them.
//! Blank lines and lines starting with `#` are ignored.

use crate::session::SessionHandle;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// One `(path, value)` leaf
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedUpdate {
    pub path: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedLine {
    Batch(Vec<FeedUpdate>),
    Single(FeedUpdate),
}

/// Parse one line, `Ok(None)` for blank lines and comments
pub fn parse_line(line: &str) -> Result<Option<Vec<(String, Value)>>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let parsed: FeedLine = serde_json::from_str(line).context("Invalid feed line")?;
    let updates = match parsed {
        FeedLine::Batch(updates) => updates,
        FeedLine::Single(update) => vec![update],
    };

    Ok(Some(
        updates.into_iter().map(|u| (u.path, u.value)).collect(),
    ))
}

/// Forward every message of `reader` to the session
///
/// Malformed lines are logged and skipped. Returns the number of messages
/// forwarded.
pub async fn pump<R>(reader: R, session: &SessionHandle) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read feed")? {
        line_no += 1;
        match parse_line(&line) {
            Ok(Some(updates)) => {
                debug!("Feed line {}: {} update(s)", line_no, updates.len());
                session.apply_message(updates);
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping feed line {}: {:#}", line_no, e),
        }
    }

    Ok(forwarded)
}
