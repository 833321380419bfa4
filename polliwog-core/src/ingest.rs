//! Ingestion driver: one full mirror pass over the feed
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │  Event feed  │ ──► │ IngestCoordinator │ ──► │   Archive tree   │
//! │ (paginated)  │     │                   │     │ (date-organized) │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//!                              │
//!                              ▼
//!               fetch ─► sniff/correct ─► stamp
//! ```
//!
//! Per page, per event, per attachment, strictly in order: download (or
//! skip), correct the extension, stamp the metadata. Each step gates the
//! next, and nothing runs concurrently; the archive tree has exactly one
//! writer.
//!
//! A failed download is logged and skipped; the run continues. Everything
//! after a successful download (rename, metadata rewrite) propagates its
//! failure and ends the run, as does any session-level feed error.

use crate::client::EventFeed;
use crate::config::ArchiveConfig;
use crate::error::Result;
use crate::fetch::{ArchiveLayout, AttachmentFetcher};
use crate::paginate::{PageCursor, PaginationState};
use crate::sniff;
use crate::stamp;
use crate::types::Event;

/// Result of one full ingestion pass.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Number of event pages fetched
    pub pages_fetched: usize,
    /// Number of events seen across all pages
    pub events_seen: usize,
    /// Number of attachments downloaded and stamped
    pub attachments_downloaded: usize,
    /// Number of attachments skipped (already archived or filtered)
    pub attachments_skipped: usize,
    /// Download errors encountered (attachment key → error message)
    pub errors: Vec<(String, String)>,
}

/// Walks the feed backward and mirrors every attachment into the archive.
pub struct IngestCoordinator<F> {
    feed: F,
    layout: ArchiveLayout,
}

impl<F: EventFeed> IngestCoordinator<F> {
    pub fn new(feed: F, archive: &ArchiveConfig) -> Self {
        Self {
            feed,
            layout: ArchiveLayout::new(archive),
        }
    }

    /// Run one full pass from the latest event back to the earliest.
    pub async fn run(&self) -> Result<RunSummary> {
        let overview = self.feed.overview().await?;
        tracing::info!(
            first_event_time = overview.first_event_time,
            last_event_time = overview.last_event_time,
            "Starting mirror pass"
        );

        let mut state = PaginationState::new(overview.last_event_time, overview.first_event_time);
        let mut summary = RunSummary::default();

        loop {
            let cursor = match state.begin_page() {
                PageCursor::Next(cursor) => cursor,
                PageCursor::Complete => break,
                PageCursor::CycleDetected(cursor) => {
                    tracing::info!(cursor, "Cursor made no further progress, ending pass");
                    break;
                }
            };

            let page = self.feed.events_page(state.floor(), cursor).await?;
            summary.pages_fetched = state.pages_begun();

            for event in &page.events {
                state.observe_event(event.event_time);
                summary.events_seen += 1;
                self.process_event(event, &mut summary).await?;
            }
        }

        tracing::info!(
            pages = summary.pages_fetched,
            events = summary.events_seen,
            downloaded = summary.attachments_downloaded,
            skipped = summary.attachments_skipped,
            errors = summary.errors.len(),
            "Mirror pass complete"
        );
        Ok(summary)
    }

    /// Process every attachment of one event, sequentially.
    async fn process_event(&self, event: &Event, summary: &mut RunSummary) -> Result<()> {
        let fetcher = AttachmentFetcher::new(&self.feed, &self.layout);

        for key in &event.attachments {
            match fetcher.fetch(key, event).await {
                Ok(Some(path)) => {
                    let path = sniff::correct_extension(&path)?;
                    stamp::stamp(&path, event)?;
                    summary.attachments_downloaded += 1;
                }
                Ok(None) => {
                    summary.attachments_skipped += 1;
                }
                Err(e) => {
                    // A single failed download never ends the run.
                    tracing::warn!(
                        key,
                        child = %event.parent_member_display,
                        event_date = %event.event_date,
                        error = %e,
                        "Attachment download failed, continuing"
                    );
                    summary.errors.push((key.clone(), e.to_string()));
                }
            }
        }
        Ok(())
    }
}
