//! Embedded metadata and filesystem timestamp stamping
//!
//! After an attachment lands on disk its metadata still says "downloaded
//! now" instead of "taken then". This module rewrites the file so both the
//! embedded creation time (JPEG Exif, PNG text chunk) and the filesystem
//! timestamps reflect the event's `event_time`.
//!
//! The in-place rewrites are retried a bounded number of times; the final
//! filesystem touch is best-effort and never fails the attachment.

pub mod exif;
pub mod png;

use std::path::Path;

use chrono::{DateTime, Local};
use filetime::FileTime;

use crate::error::{Error, Result};
use crate::retry::{with_retries, WRITE_ATTEMPTS};
use crate::types::Event;

/// Format an epoch timestamp as `YYYY:MM:DD HH:MM:SS` in the local timezone,
/// the form both Exif and the PNG `Creation Time` keyword expect.
pub fn format_event_time(event_time: i64) -> Result<String> {
    let utc = DateTime::from_timestamp(event_time, 0).ok_or_else(|| Error::Format {
        format: "timestamp",
        message: format!("event time {} out of range", event_time),
    })?;
    Ok(utc
        .with_timezone(&Local)
        .format("%Y:%m:%d %H:%M:%S")
        .to_string())
}

/// Stamp one archived file with its event's original timestamp.
///
/// JPEG and PNG files get their embedded metadata rewritten in place (with
/// bounded retry on the write); MP4 and PDF are left as-is. All formats then
/// get their filesystem access/modification times set to the event time.
pub fn stamp(path: &Path, event: &Event) -> Result<()> {
    let formatted = format_event_time(event.event_time)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") => {
            let original = std::fs::read(path)?;
            let rewritten = exif::set_datetime_original(&original, &formatted)?;
            with_retries("exif rewrite", WRITE_ATTEMPTS, || {
                std::fs::write(path, &rewritten)
            })?;
        }
        Some("png") => {
            let original = std::fs::read(path)?;
            let rewritten = png::insert_creation_time(&original, &formatted)?;
            with_retries("png rewrite", WRITE_ATTEMPTS, || {
                std::fs::write(path, &rewritten)
            })?;
        }
        _ => {}
    }

    touch(path, event.event_time);
    Ok(())
}

/// Set the file's access and modification times to the event time.
///
/// Best-effort: failure is logged and swallowed. Birth time is not portably
/// settable and is left to the filesystem.
fn touch(path: &Path, event_time: i64) {
    let stamp = FileTime::from_unix_time(event_time, 0);
    if let Err(e) = filetime::set_file_times(path, stamp, stamp) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to set file times");
    }
}
