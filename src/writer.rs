use anyhow::{Context as AnyhowContext, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::FailureReason;
use crate::ratings::ScoreRecord;

#[derive(Debug, Deserialize)]
struct ProcessedRow {
    listing_id: i64,
}

#[derive(Debug, Serialize)]
struct FailureRow<'a> {
    listing_id: i64,
    reason_kind: &'a str,
    reason: String,
}

/// Listing ids already present in an output file. A missing file yields an empty set.
pub fn processed_ids(path: &Path) -> Result<HashSet<i64>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;
    let mut ids = HashSet::new();

    for result in reader.deserialize::<ProcessedRow>() {
        match result {
            Ok(row) => {
                ids.insert(row.listing_id);
            }
            Err(e) if e.is_io_error() => {
                return Err(e)
                    .with_context(|| format!("Failed to read output file: {}", path.display()));
            }
            Err(e) => warn!("Ignoring unreadable row in {}: {}", path.display(), e),
        }
    }

    debug!("{} listings already in {}", ids.len(), path.display());
    Ok(ids)
}

/// Append rows to `path`, writing the header only when the file is new or empty.
/// Existing rows are never rewritten. Returns the number of rows written.
pub fn append_records(path: &Path, records: &[ScoreRecord]) -> Result<usize> {
    append_rows(path, records)
}

/// Append `listing_id, reason_kind, reason` rows for degraded outcomes.
pub fn append_failures(path: &Path, failures: &[(i64, FailureReason)]) -> Result<usize> {
    let rows: Vec<FailureRow> = failures
        .iter()
        .map(|(listing_id, reason)| FailureRow {
            listing_id: *listing_id,
            reason_kind: reason.kind(),
            reason: reason.to_string(),
        })
        .collect();
    append_rows(path, &rows)
}

fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let existing_len = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let needs_header = existing_len == 0;

    // A torn last row must not swallow the first appended one
    let mut buffer = Vec::new();
    if existing_len > 0 && !ends_with_newline(path)? {
        warn!("{} does not end with a newline; starting a new row", path.display());
        buffer.push(b'\n');
    }

    // Serialize up front so the whole batch lands in a single append
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(buffer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    let buffer = csv_writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for append", path.display()))?;
    file.write_all(&buffer)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Appended {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))
        .and_then(|_| file.read_exact(&mut last))
        .with_context(|| format!("Failed to read the end of {}", path.display()))?;
    Ok(last[0] == b'\n')
}
