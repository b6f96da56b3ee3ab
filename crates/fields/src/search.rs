use std::time::{Duration, Instant};

/// Quiescence window before typed text becomes the active query.
pub const DEBOUNCE_MS: u64 = 250;
/// Records requested per page unless the field overrides it.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// A fetch the controller wants executed. The generation stamps the query
/// session it belongs to; responses for superseded generations are dropped
/// by the caller instead of mutating the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub query: String,
    pub offset: usize,
    pub limit: usize,
    pub generation: u64,
}

/// Debounces free-text input and tracks the pagination offset for one
/// related field. Timing is injected (`Instant` arguments) so the debounce
/// window is testable without sleeping; the egui loop passes `Instant::now()`
/// each frame, the same way the command palette debounces its rebuilds.
#[derive(Debug)]
pub struct SearchController {
    buffer: String,
    query: String,
    changed_at: Option<Instant>,
    debounce: Duration,
    offset: usize,
    page_size: usize,
    generation: u64,
}

impl Default for SearchController {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            query: String::new(),
            changed_at: None,
            debounce: Duration::from_millis(DEBOUNCE_MS),
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
            generation: 0,
        }
    }
}

impl SearchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The raw text the input widget displays.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// The committed (debounced) query.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Record keystrokes. The query only commits once [`poll`] observes a
    /// quiet window.
    pub fn set_text(&mut self, text: &str, now: Instant) {
        if text != self.buffer {
            self.buffer = text.to_string();
            self.changed_at = Some(now);
        }
    }

    /// Commit the buffered text if it has been quiescent long enough.
    /// At most one fetch comes out of any burst of edits.
    pub fn poll(&mut self, now: Instant) -> Option<FetchPlan> {
        let t0 = self.changed_at?;
        if now.duration_since(t0) < self.debounce {
            return None;
        }
        self.changed_at = None;
        Some(self.commit(self.buffer.clone()))
    }

    /// Fresh session on menu open: query cleared, offset zeroed, and any
    /// pending debounced fetch cancelled so the forced refetch cannot race a
    /// just-typed query.
    pub fn open_menu(&mut self) -> FetchPlan {
        self.buffer.clear();
        self.changed_at = None;
        self.commit(String::new())
    }

    /// Advance to the next page of the current query.
    pub fn next_page(&mut self) -> FetchPlan {
        self.offset += self.page_size;
        self.plan()
    }

    fn commit(&mut self, query: String) -> FetchPlan {
        self.query = query;
        self.offset = 0;
        self.generation += 1;
        self.plan()
    }

    fn plan(&self) -> FetchPlan {
        FetchPlan {
            query: self.query.clone(),
            offset: self.offset,
            limit: self.page_size,
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn burst_of_edits_yields_one_fetch_with_last_text() {
        let mut ctl = SearchController::new();
        let t0 = Instant::now();
        ctl.set_text("a", t0);
        ctl.set_text("ab", t0 + ms(80));
        ctl.set_text("abc", t0 + ms(160));
        // Still inside the window measured from the last edit.
        assert!(ctl.poll(t0 + ms(300)).is_none());
        let plan = ctl.poll(t0 + ms(160 + 250)).expect("debounce elapsed");
        assert_eq!(plan.query, "abc");
        assert_eq!(plan.offset, 0);
        // Nothing further without new input.
        assert!(ctl.poll(t0 + ms(1000)).is_none());
    }

    #[test]
    fn committing_a_query_resets_offset() {
        let mut ctl = SearchController::new().with_page_size(10);
        let t0 = Instant::now();
        ctl.set_text("bolt", t0);
        let first = ctl.poll(t0 + ms(250)).unwrap();
        assert_eq!(first.offset, 0);
        assert_eq!(ctl.next_page().offset, 10);
        assert_eq!(ctl.next_page().offset, 20);
        ctl.set_text("nut", t0 + ms(500));
        let plan = ctl.poll(t0 + ms(750)).unwrap();
        assert_eq!(plan.query, "nut");
        assert_eq!(plan.offset, 0);
        assert!(plan.generation > first.generation);
    }

    #[test]
    fn open_menu_cancels_pending_debounce() {
        let mut ctl = SearchController::new();
        let t0 = Instant::now();
        ctl.set_text("half-typ", t0);
        let plan = ctl.open_menu();
        assert_eq!(plan.query, "");
        assert_eq!(plan.offset, 0);
        assert_eq!(ctl.text(), "");
        // The buffered text no longer commits.
        assert!(ctl.poll(t0 + ms(1000)).is_none());
    }

    #[test]
    fn pagination_keeps_the_generation() {
        let mut ctl = SearchController::new().with_page_size(10);
        let opened = ctl.open_menu();
        let next = ctl.next_page();
        assert_eq!(next.generation, opened.generation);
        assert!(ctl.is_current(next.generation));
        ctl.open_menu();
        assert!(!ctl.is_current(next.generation));
    }
}
