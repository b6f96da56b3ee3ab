#![forbid(unsafe_code)]

use formant_core::{RecordId, RemoteRecord};
use formant_fields::RelatedField;
use tokio::task::JoinHandle;

/// Messages async fetch tasks send back to the UI loop.
#[derive(Debug)]
pub enum FieldUpdate {
    /// Single-record resolution finished; `record` is `None` on failure
    /// (a non-fatal display state, not an error banner).
    RecordResolved {
        field: String,
        id: RecordId,
        record: Option<RemoteRecord>,
    },
    /// A page of list results arrived. `full_page` is false once the
    /// backend returned fewer records than requested.
    PageLoaded {
        field: String,
        generation: u64,
        records: Vec<RemoteRecord>,
        full_page: bool,
    },
    PageFailed {
        field: String,
        generation: u64,
        error: String,
    },
}

/// Per-mount runtime state of one related-entity picker.
#[derive(Default)]
pub(crate) struct RelatedState {
    pub related: RelatedField,
    pub menu_open: bool,
    pub need_focus: bool,
    /// A list fetch is in flight; gates scroll-to-bottom refires.
    pub loading: bool,
    /// The backend ran out of pages for the current query.
    pub exhausted: bool,
    pub task: Option<JoinHandle<()>>,
}

impl RelatedState {
    pub(crate) fn with_page_size(page_size: usize) -> Self {
        Self {
            related: RelatedField::with_page_size(page_size),
            ..Default::default()
        }
    }
}
