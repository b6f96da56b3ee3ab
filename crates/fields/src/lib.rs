//! Formant headless form engine.
//!
//! Everything here is independent of the rendering layer: field definitions,
//! the shared form-state container, the per-field option cache, the debounced
//! search controller, and the related-field reconciliation state machine. The
//! GUI crate drives these from the egui loop and runs the actual fetches.

#![forbid(unsafe_code)]

mod cache;
mod definition;
mod form;
mod related;
mod search;

pub use cache::OptionCache;
pub use definition::{Choice, FieldDefinition, WidgetAttrs};
pub use definition::{ChangeCallback, FilterAdjust, RecordRenderer};
pub use form::FormState;
pub use related::{query_allowed, RelatedAction, RelatedField};
pub use search::{FetchPlan, SearchController, DEBOUNCE_MS, DEFAULT_PAGE_SIZE};
