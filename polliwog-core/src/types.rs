//! Wire types for the remote event feed
//!
//! These mirror the JSON shapes the feed returns. Events are immutable once
//! received and are never persisted as structured records; they only drive
//! the filesystem artifacts the archive produces.
//!
//! Two timestamps travel with each event and are deliberately kept apart:
//!
//! | Field | Source | Used for |
//! |-------|--------|----------|
//! | `event_time` | epoch seconds, authoritative ordering key | pagination cursor, metadata stamping |
//! | `event_date` | calendar string supplied by the server | directory/filename templating |
//!
//! The two are not cross-validated; the server owns both.

use serde::Deserialize;

/// Account overview: the pagination bounds for a full run.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Overview {
    /// Epoch seconds of the earliest known event
    pub first_event_time: i64,
    /// Epoch seconds of the latest known event
    pub last_event_time: i64,
}

/// One page of events from the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsPage {
    /// Events in server order, newest first
    #[serde(default)]
    pub events: Vec<Event>,
}

/// One feed item: an activity with a timestamp, an optional comment, and
/// zero or more attachment keys.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// When the event occurred (epoch seconds)
    pub event_time: i64,
    /// Calendar date as the server reports it (`YYYY-MM-DD`)
    pub event_date: String,
    /// Display name of the child the event belongs to
    pub parent_member_display: String,
    /// Caregiver comment, if any
    #[serde(default)]
    pub comment: Option<String>,
    /// Opaque keys for the event's binary objects
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl Event {
    /// Splits `event_date` into (year, month, day) strings.
    ///
    /// Missing components come back empty so template expansion stays total.
    pub fn date_parts(&self) -> (&str, &str, &str) {
        let mut parts = self.event_date.splitn(3, '-');
        let year = parts.next().unwrap_or("");
        let month = parts.next().unwrap_or("");
        let day = parts.next().unwrap_or("");
        (year, month, day)
    }

    /// Returns the comment if it is present and non-empty.
    pub fn nonempty_comment(&self) -> Option<&str> {
        self.comment.as_deref().filter(|c| !c.is_empty())
    }
}

/// A downloaded attachment payload: the server's declared content type plus
/// the raw bytes.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Value of the `content-type` response header
    pub content_type: String,
    /// Raw body bytes
    pub bytes: Vec<u8>,
}

/// The four media kinds the archive accepts. Anything else is filtered out
/// before a file is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Jpeg,
    Png,
    Mp4,
    Pdf,
}

impl MediaKind {
    /// Map a declared content type to a media kind.
    ///
    /// Parameters after `;` are ignored; an unrecognized type yields `None`
    /// (intentional filtering, not an error).
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" => Some(MediaKind::Jpeg),
            "image/png" => Some(MediaKind::Png),
            "video/mp4" => Some(MediaKind::Mp4),
            "application/pdf" => Some(MediaKind::Pdf),
            _ => None,
        }
    }

    /// Canonical file extension (no dot).
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Jpeg => "jpg",
            MediaKind::Png => "png",
            MediaKind::Mp4 => "mp4",
            MediaKind::Pdf => "pdf",
        }
    }

    /// All accepted extensions, in idempotency-check order.
    pub const EXTENSIONS: [&'static str; 4] = ["jpg", "png", "mp4", "pdf"];
}
