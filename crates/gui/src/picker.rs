#![forbid(unsafe_code)]

use std::sync::{mpsc, Arc};
use std::time::Instant;

use eframe::egui;
use formant_api::DataApi;
use formant_core::RecordId;
use formant_fields::{query_allowed, FetchPlan, FieldDefinition, RelatedAction};

use crate::model::{FieldUpdate, RelatedState};
use crate::renderers::display_record;
use crate::{tasks, FormUi};

impl FormUi {
    /// Reconcile the externally bound value against the field's local state,
    /// spawning a single-record fetch when the cache has not seen it yet.
    /// Shared by the interactive picker and read-only display.
    pub(crate) fn sync_related(&mut self, name: &str, def: &FieldDefinition) {
        let bound = self.form.value(name).cloned();
        let page_size = self.page_size;
        let state = self
            .related
            .entry(name.to_string())
            .or_insert_with(|| RelatedState::with_page_size(page_size));
        if let Some(RelatedAction::FetchRecord(id)) = state.related.sync_value(bound.as_ref()) {
            if let Some(endpoint) = def.endpoint.clone() {
                state.task = Some(tasks::start_record_fetch(
                    self.api.clone(),
                    self.updates_tx.clone(),
                    name.to_string(),
                    endpoint,
                    id,
                ));
            } else {
                state.related.record_failed(&id);
            }
        }
    }

    /// Searchable single-select bound to a foreign-key scalar. Returns
    /// `Some(selection)` when the user picked or cleared an option; the
    /// dispatcher writes the corresponding value into the form container.
    pub(crate) fn ui_related(
        &mut self,
        ui: &mut egui::Ui,
        name: &str,
        def: &FieldDefinition,
    ) -> Option<Option<RecordId>> {
        let now = Instant::now();
        self.sync_related(name, def);
        let state = match self.related.get_mut(name) {
            Some(state) => state,
            None => return None,
        };

        let mut result = None;
        let header = state
            .related
            .selected_record()
            .map(|r| display_record(def, r))
            .unwrap_or_else(|| {
                def.placeholder
                    .clone()
                    .unwrap_or_else(|| "Select…".to_string())
            });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!def.disabled, egui::Button::new(header))
                .clicked()
            {
                state.menu_open = !state.menu_open;
                if state.menu_open {
                    state.need_focus = true;
                    // Fresh session: query emptied, offset zeroed, options
                    // from the previous query discarded.
                    let plan = state.related.open_menu();
                    Self::spawn_page_fetch(
                        &self.api,
                        &self.updates_tx,
                        name,
                        def,
                        state,
                        plan,
                    );
                }
            }
            if !def.required
                && state.related.selected().is_some()
                && ui.small_button("✕").clicked()
            {
                state.related.select(None);
                result = Some(None);
            }
        });

        if !state.menu_open {
            return result;
        }

        let mut text = state.related.search.text().to_string();
        let resp = ui.add(
            egui::TextEdit::singleline(&mut text)
                .hint_text("Search…")
                .desired_width(f32::INFINITY),
        );
        if state.need_focus {
            resp.request_focus();
            state.need_focus = false;
        }
        if resp.changed() {
            state.related.input(&text, now);
        }
        if let Some(plan) = state.related.poll(now) {
            Self::spawn_page_fetch(&self.api, &self.updates_tx, name, def, state, plan);
        }

        let rows: Vec<(RecordId, String)> = state
            .related
            .cache
            .entries()
            .iter()
            .map(|r| (r.id.clone(), display_record(def, r)))
            .collect();
        let selected = state.related.selected().cloned();
        let mut clicked: Option<RecordId> = None;
        let mut bottom_visible = false;
        egui::ScrollArea::vertical()
            .max_height(200.0)
            .show(ui, |ui| {
                for (idx, (id, label)) in rows.iter().enumerate() {
                    let is_sel = selected.as_ref() == Some(id);
                    let resp = ui.selectable_label(is_sel, label);
                    if resp.clicked() {
                        clicked = Some(id.clone());
                    }
                    if idx + 1 == rows.len() && ui.is_rect_visible(resp.rect) {
                        bottom_visible = true;
                    }
                }
                if rows.is_empty() && !state.loading {
                    ui.weak("no results");
                }
            });

        if let Some(id) = clicked {
            state.related.select(Some(id.clone()));
            state.menu_open = false;
            result = Some(Some(id));
        } else if bottom_visible && !rows.is_empty() && !state.loading && !state.exhausted {
            // Reached the end of the loaded options: fetch the next page of
            // the same query session; results append to the cache.
            let plan = state.related.next_page();
            Self::spawn_page_fetch(&self.api, &self.updates_tx, name, def, state, plan);
        }
        result
    }

    fn spawn_page_fetch(
        api: &Arc<dyn DataApi>,
        tx: &mpsc::Sender<FieldUpdate>,
        name: &str,
        def: &FieldDefinition,
        state: &mut RelatedState,
        plan: FetchPlan,
    ) {
        if !query_allowed(def) {
            return;
        }
        let endpoint = match def.endpoint.clone() {
            Some(endpoint) => endpoint,
            None => return,
        };
        state.loading = true;
        state.exhausted = false;
        state.task = Some(tasks::start_page_fetch(
            api.clone(),
            tx.clone(),
            name.to_string(),
            endpoint,
            plan,
            def.query_filters(),
        ));
    }
}
