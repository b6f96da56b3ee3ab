use std::time::Instant;

use formant_core::{RecordId, RemoteRecord};
use serde_json::Value;
use tracing::debug;

use crate::cache::OptionCache;
use crate::definition::FieldDefinition;
use crate::search::{FetchPlan, SearchController};

/// Work the state machine wants the async layer to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelatedAction {
    /// Resolve a single record by identifier (externally bound value not yet
    /// in the cache).
    FetchRecord(RecordId),
    /// Run a paged list query.
    FetchPage(FetchPlan),
}

/// Queries run only while the field is enabled, visible, and actually has a
/// resource endpoint configured.
pub fn query_allowed(def: &FieldDefinition) -> bool {
    !def.disabled && !def.hidden && def.endpoint.is_some()
}

/// Reconciliation state for one related-entity field: composes the option
/// cache with the debounced search controller and tracks the selected
/// identifier across query resets.
#[derive(Debug, Default)]
pub struct RelatedField {
    pub cache: OptionCache,
    pub search: SearchController,
    selected: Option<RecordId>,
    resolving: Option<RecordId>,
}

impl RelatedField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            search: SearchController::new().with_page_size(page_size),
            ..Default::default()
        }
    }

    pub fn selected(&self) -> Option<&RecordId> {
        self.selected.as_ref()
    }

    pub fn selected_record(&self) -> Option<&RemoteRecord> {
        self.selected.as_ref().and_then(|id| self.cache.get(id))
    }

    /// True while a single-record resolution fetch is outstanding.
    pub fn resolving(&self) -> bool {
        self.resolving.is_some()
    }

    /// Reconcile the externally bound form value against local state. Called
    /// every frame; returns a fetch at most when the bound identifier is
    /// unknown to the cache.
    pub fn sync_value(&mut self, bound: Option<&Value>) -> Option<RelatedAction> {
        let id = match bound {
            None | Some(Value::Null) => {
                // External clear: drop the selection, keep cached options
                // for reuse when the menu reopens.
                self.selected = None;
                self.resolving = None;
                return None;
            }
            Some(raw) => RecordId::from_value(raw)?,
        };
        if self.selected.as_ref() == Some(&id) || self.resolving.as_ref() == Some(&id) {
            return None;
        }
        if self.cache.contains(&id) {
            self.selected = Some(id);
            return None;
        }
        debug!(id = %id, "related: resolving bound value");
        self.resolving = Some(id.clone());
        Some(RelatedAction::FetchRecord(id))
    }

    /// Single-record resolution succeeded: seed the cache with exactly that
    /// record and select it.
    pub fn record_resolved(&mut self, record: RemoteRecord) {
        let id = record.id.clone();
        if self.resolving.as_ref() == Some(&id) {
            self.resolving = None;
        }
        self.cache.merge(vec![record]);
        self.selected = Some(id);
    }

    /// Single-record resolution failed: non-fatal, the field just shows no
    /// selection.
    pub fn record_failed(&mut self, id: &RecordId) {
        if self.resolving.as_ref() == Some(id) {
            self.resolving = None;
        }
    }

    pub fn input(&mut self, text: &str, now: Instant) {
        self.search.set_text(text, now);
    }

    /// Commit a debounced query if due. The accumulated options always
    /// reflect a single query's result set, so a commit clears them.
    pub fn poll(&mut self, now: Instant) -> Option<FetchPlan> {
        let plan = self.search.poll(now)?;
        self.cache.clear();
        Some(plan)
    }

    /// Menu reopened: empty query, offset 0, forced fresh fetch. Options
    /// loaded under the previous query are discarded here.
    pub fn open_menu(&mut self) -> FetchPlan {
        let plan = self.search.open_menu();
        self.cache.clear();
        plan
    }

    /// Bottom of the option list reached: fetch the next page of the same
    /// query session.
    pub fn next_page(&mut self) -> FetchPlan {
        self.search.next_page()
    }

    /// Append a page of results. Responses stamped with a superseded
    /// generation are dropped so a slow stale fetch cannot pollute the
    /// current query's options. Returns the number of new entries.
    pub fn page_loaded(&mut self, generation: u64, records: Vec<RemoteRecord>) -> usize {
        if !self.search.is_current(generation) {
            debug!(generation, "related: dropping stale page");
            return 0;
        }
        self.cache.merge(records)
    }

    /// A list fetch failed: show an empty result set and allow retry on the
    /// next query or scroll.
    pub fn page_failed(&mut self, generation: u64) {
        if self.search.is_current(generation) {
            self.cache.clear();
        }
    }

    /// User picked an option (or cleared the selection). The caller writes
    /// the corresponding value into the form container.
    pub fn select(&mut self, id: Option<RecordId>) {
        self.selected = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn rec(pk: i64, name: &str) -> RemoteRecord {
        RemoteRecord::from_payload(json!({"pk": pk, "name": name})).unwrap()
    }

    #[test]
    fn bound_value_not_in_cache_triggers_one_record_fetch() {
        let mut field = RelatedField::new();
        let action = field.sync_value(Some(&json!(42)));
        assert_eq!(action, Some(RelatedAction::FetchRecord(RecordId::Int(42))));
        // Still in flight: no duplicate fetch on subsequent frames.
        assert_eq!(field.sync_value(Some(&json!(42))), None);
        field.record_resolved(rec(42, "Resistors"));
        assert_eq!(field.selected(), Some(&RecordId::Int(42)));
        assert_eq!(
            field.selected_record().unwrap().text("name"),
            Some("Resistors")
        );
    }

    #[test]
    fn bound_value_already_cached_selects_without_fetch() {
        let mut field = RelatedField::new();
        field.cache.merge(vec![rec(7, "Caps")]);
        assert_eq!(field.sync_value(Some(&json!(7))), None);
        assert_eq!(field.selected(), Some(&RecordId::Int(7)));
    }

    #[test]
    fn resolution_failure_leaves_field_unresolved() {
        let mut field = RelatedField::new();
        field.sync_value(Some(&json!(5)));
        field.record_failed(&RecordId::Int(5));
        assert_eq!(field.selected(), None);
        assert!(!field.resolving());
        // The bound value is retried on a later frame.
        assert!(field.sync_value(Some(&json!(5))).is_some());
    }

    #[test]
    fn null_bound_value_clears_selection_but_not_cache() {
        let mut field = RelatedField::new();
        field.cache.merge(vec![rec(1, "a")]);
        field.sync_value(Some(&json!(1)));
        assert!(field.selected().is_some());
        field.sync_value(Some(&json!(null)));
        assert_eq!(field.selected(), None);
        assert_eq!(field.cache.len(), 1);
    }

    #[test]
    fn query_commit_clears_accumulated_options() {
        let mut field = RelatedField::new();
        let t0 = Instant::now();
        let plan = field.open_menu();
        field.page_loaded(plan.generation, vec![rec(1, "a"), rec(2, "b")]);
        assert_eq!(field.cache.len(), 2);
        field.input("bo", t0);
        let plan = field.poll(t0 + Duration::from_millis(250)).unwrap();
        assert_eq!(plan.query, "bo");
        assert!(field.cache.is_empty());
    }

    #[test]
    fn stale_generation_pages_are_dropped() {
        let mut field = RelatedField::new();
        let old = field.open_menu();
        let fresh = field.open_menu();
        assert_eq!(field.page_loaded(old.generation, vec![rec(1, "stale")]), 0);
        assert!(field.cache.is_empty());
        assert_eq!(field.page_loaded(fresh.generation, vec![rec(2, "live")]), 1);
    }

    #[test]
    fn next_page_appends_instead_of_replacing() {
        let mut field = RelatedField::with_page_size(10);
        let p0 = field.open_menu();
        assert_eq!(p0.offset, 0);
        field.page_loaded(p0.generation, vec![rec(1, "a")]);
        let p1 = field.next_page();
        assert_eq!(p1.offset, 10);
        field.page_loaded(p1.generation, vec![rec(1, "a"), rec(2, "b")]);
        assert_eq!(field.cache.len(), 2);
    }

    #[test]
    fn selection_persists_across_query_resets() {
        let mut field = RelatedField::new();
        let plan = field.open_menu();
        field.page_loaded(plan.generation, vec![rec(3, "picked")]);
        field.select(Some(RecordId::Int(3)));
        field.open_menu();
        assert_eq!(field.selected(), Some(&RecordId::Int(3)));
    }

    #[test]
    fn list_failure_clears_current_options_only() {
        let mut field = RelatedField::new();
        let plan = field.open_menu();
        field.page_loaded(plan.generation, vec![rec(1, "a")]);
        field.page_failed(plan.generation - 1); // stale failure: ignored
        assert_eq!(field.cache.len(), 1);
        field.page_failed(plan.generation);
        assert!(field.cache.is_empty());
    }

    #[test]
    fn query_gating_by_definition_state() {
        let def = FieldDefinition::new("related-entity").with_endpoint("stock/location/", "stocklocation");
        assert!(query_allowed(&def));
        let mut hidden = def.clone();
        hidden.hidden = true;
        assert!(!query_allowed(&hidden));
        let mut disabled = def.clone();
        disabled.disabled = true;
        assert!(!query_allowed(&disabled));
        assert!(!query_allowed(&FieldDefinition::new("related-entity")));
    }
}
