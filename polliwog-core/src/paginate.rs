//! Backward pagination over the event feed
//!
//! The feed is walked from "now" back to the earliest known event using a
//! moving upper cursor (`lastitem`) and a fixed floor (`finalitem`). The
//! server offers no opaque continuation token; the only way to make progress
//! is to lower the cursor to the oldest event time seen so far and ask again.
//!
//! Termination rests on two rules:
//! - the cursor must strictly decrease on every page that contains at least
//!   one older event, and
//! - a cursor value is never requested twice. A page that yields no older
//!   events leaves the cursor in place, and the revisit check ends the run.
//!   That is the designed "no more data" path, not an error.
//!
//! All state lives in an explicit [`PaginationState`] value owned by the
//! driver; nothing here performs I/O.

use std::collections::HashSet;

/// Seconds added to the server-reported latest event time when seeding the
/// cursor, so the boundary event itself lands in the first page.
pub const CURSOR_HEADROOM: i64 = 1000;

/// Events requested per page. Fixed, not adaptive.
pub const PAGE_SIZE: u32 = 78;

/// What the driver should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// Request a page anchored at this `latest_event_time`
    Next(i64),
    /// Cursor reached the floor; every event has been covered
    Complete,
    /// This cursor value was already requested; no further progress is
    /// possible
    CycleDetected(i64),
}

/// Cursor pair plus the visited-cursor history for one run.
///
/// Scoped to a single run; nothing is persisted across runs. The visited set
/// grows monotonically and never shrinks.
#[derive(Debug)]
pub struct PaginationState {
    /// Moving upper bound, lowered as older events are observed
    lastitem: i64,
    /// Fixed lower bound for the run
    finalitem: i64,
    /// Every `lastitem` value a page request has been anchored at
    visited: HashSet<i64>,
}

impl PaginationState {
    /// Create pagination state for the range `(first_event_time, last_event_time]`.
    ///
    /// The upper cursor is seeded with [`CURSOR_HEADROOM`] past the reported
    /// latest event.
    pub fn new(last_event_time: i64, first_event_time: i64) -> Self {
        Self {
            lastitem: last_event_time + CURSOR_HEADROOM,
            finalitem: first_event_time,
            visited: HashSet::new(),
        }
    }

    /// Decide whether another page should be requested.
    ///
    /// On `Next`, the returned cursor is recorded as visited; the caller must
    /// anchor exactly one page request at it.
    pub fn begin_page(&mut self) -> PageCursor {
        if self.lastitem <= self.finalitem {
            return PageCursor::Complete;
        }
        if !self.visited.insert(self.lastitem) {
            return PageCursor::CycleDetected(self.lastitem);
        }
        PageCursor::Next(self.lastitem)
    }

    /// Lower the cursor to an observed event time, if it is older.
    ///
    /// Called for every event in a page, attachments or not; the cursor is
    /// never raised.
    pub fn observe_event(&mut self, event_time: i64) {
        if event_time < self.lastitem {
            self.lastitem = event_time;
        }
    }

    /// Current upper cursor.
    pub fn cursor(&self) -> i64 {
        self.lastitem
    }

    /// Fixed lower bound for the run.
    pub fn floor(&self) -> i64 {
        self.finalitem
    }

    /// Number of page requests begun so far.
    pub fn pages_begun(&self) -> usize {
        self.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_seeded_with_headroom() {
        let state = PaginationState::new(5000, 1000);
        assert_eq!(state.cursor(), 5000 + CURSOR_HEADROOM);
        assert_eq!(state.floor(), 1000);
    }

    #[test]
    fn test_walks_down_to_floor() {
        // Overview: earliest=1000, latest=5000. First page carries events at
        // {5000, 4000, 3000}; the cursor must land on 3000 afterwards.
        let mut state = PaginationState::new(5000, 1000);

        let PageCursor::Next(cursor) = state.begin_page() else {
            panic!("expected first page");
        };
        assert_eq!(cursor, 6000);

        for t in [5000, 4000, 3000] {
            state.observe_event(t);
        }
        assert_eq!(state.cursor(), 3000);

        // Second page: {3000, 2000, 1000}.
        assert_eq!(state.begin_page(), PageCursor::Next(3000));
        for t in [3000, 2000, 1000] {
            state.observe_event(t);
        }
        assert_eq!(state.cursor(), 1000);

        assert_eq!(state.begin_page(), PageCursor::Complete);
        assert_eq!(state.pages_begun(), 2);
    }

    #[test]
    fn test_empty_page_trips_cycle_guard() {
        let mut state = PaginationState::new(5000, 1000);

        assert!(matches!(state.begin_page(), PageCursor::Next(_)));
        // Page came back empty; cursor did not move.
        assert_eq!(state.begin_page(), PageCursor::CycleDetected(6000));
    }

    #[test]
    fn test_newer_events_do_not_raise_cursor() {
        let mut state = PaginationState::new(5000, 1000);
        assert!(matches!(state.begin_page(), PageCursor::Next(_)));

        state.observe_event(4000);
        state.observe_event(9999);
        assert_eq!(state.cursor(), 4000);
    }

    #[test]
    fn test_cursor_monotonically_non_increasing_across_pages() {
        let mut state = PaginationState::new(5000, 1000);
        let mut cursors = Vec::new();

        // Synthetic feed: each page returns one event 500s older than its
        // anchor until the floor is passed.
        loop {
            match state.begin_page() {
                PageCursor::Next(cursor) => {
                    cursors.push(cursor);
                    state.observe_event(cursor - 500);
                }
                PageCursor::Complete | PageCursor::CycleDetected(_) => break,
            }
        }

        assert!(cursors.windows(2).all(|w| w[1] < w[0]));
        assert!(state.cursor() <= state.floor() + 500);
    }

    #[test]
    fn test_terminates_on_all_newer_page() {
        let mut state = PaginationState::new(5000, 1000);
        let mut pages = 0;

        loop {
            match state.begin_page() {
                PageCursor::Next(cursor) => {
                    pages += 1;
                    // Server misbehaves: only returns events at or above the
                    // anchor. Must still terminate in finite pages.
                    state.observe_event(cursor);
                    state.observe_event(cursor + 100);
                }
                PageCursor::Complete | PageCursor::CycleDetected(_) => break,
            }
            assert!(pages < 10, "paginator failed to terminate");
        }

        assert_eq!(pages, 1);
    }
}
