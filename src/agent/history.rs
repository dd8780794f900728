//! Handler history persistence.
//!
//! Every handler that fires appends one line, successful or not, so an
//! operator can see what an event cycle actually did. The file is append-only;
//! rotating it is left to the host's log rotation.
use super::StatePaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const TAIL_CHUNK_BYTES: u64 = 4096;

/// One fired handler as recorded in `history.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub schema_version: u32,
    pub started_at_epoch_ms: u128,
    pub finished_at_epoch_ms: u128,
    pub handler: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append a history entry as JSONL.
pub fn append_history(state_dir: &Path, entry: &HistoryEntry) -> Result<()> {
    let paths = StatePaths::new(state_dir.to_path_buf());
    let path = paths.history_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create state dir")?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let line = serde_json::to_string(entry).context("serialize history entry")?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Read the most recent history entry without parsing the rest of the file.
///
/// The file is read backwards in fixed-size chunks until the start of the
/// last line is found. A missing or empty file reads as `None`.
pub fn load_last_history(state_dir: &Path) -> Result<Option<HistoryEntry>> {
    let paths = StatePaths::new(state_dir.to_path_buf());
    let path = paths.history_path();
    if !path.is_file() {
        return Ok(None);
    }
    let mut file = fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let mut offset = file
        .metadata()
        .with_context(|| format!("inspect {}", path.display()))?
        .len();
    let mut tail: Vec<u8> = Vec::new();
    loop {
        let content_len = tail
            .iter()
            .rposition(|byte| !byte.is_ascii_whitespace())
            .map_or(0, |idx| idx + 1);
        let content = &tail[..content_len];
        let line_start = content.iter().rposition(|&byte| byte == b'\n');
        if line_start.is_some() || offset == 0 {
            let line = &content[line_start.map_or(0, |idx| idx + 1)..];
            if line.is_empty() {
                return Ok(None);
            }
            let entry = serde_json::from_slice(line).context("parse history entry")?;
            return Ok(Some(entry));
        }
        let chunk = TAIL_CHUNK_BYTES.min(offset);
        offset -= chunk;
        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("seek {}", path.display()))?;
        let mut buf = vec![0; chunk as usize];
        file.read_exact(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        buf.extend_from_slice(&tail);
        tail = buf;
    }
}

/// Current epoch time in milliseconds for history timestamps.
pub fn now_epoch_ms() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("compute timestamp")?
        .as_millis())
}
