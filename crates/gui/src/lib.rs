//! Formant GUI: schema-driven form-field renderer on eframe/egui.
//!
//! [`FormUi`] owns the shared form-state container plus the per-field
//! runtime state (related-field caches, in-flight fetch tasks) and renders
//! any set of field definitions. Remote fetches run as tokio tasks and
//! report back over an mpsc channel drained once per frame.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use eframe::egui;
use formant_api::DataApi;
use formant_fields::{FieldDefinition, FormState, DEFAULT_PAGE_SIZE};
use serde_json::Value;
use tracing::info;

mod model;
mod picker;
mod render;
mod renderers;
mod tasks;

pub use model::FieldUpdate;
pub use renderers::render_record;

use model::RelatedState;

pub struct FormUi {
    api: Arc<dyn DataApi>,
    pub form: FormState,
    related: HashMap<String, RelatedState>,
    /// Last definition value observed per field, to detect server refreshes.
    seen_values: HashMap<String, Option<Value>>,
    updates_tx: mpsc::Sender<FieldUpdate>,
    updates_rx: mpsc::Receiver<FieldUpdate>,
    page_size: usize,
    /// Most recent non-fatal fetch problem, for the status line.
    pub log: String,
}

impl FormUi {
    pub fn new(api: Arc<dyn DataApi>) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel();
        Self {
            api,
            form: FormState::new(),
            related: HashMap::new(),
            seen_values: HashMap::new(),
            updates_tx,
            updates_rx,
            page_size: DEFAULT_PAGE_SIZE,
            log: String::new(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Drain completed fetches into field state. Called once per frame,
    /// before rendering.
    pub fn poll_updates(&mut self) {
        while let Ok(update) = self.updates_rx.try_recv() {
            match update {
                FieldUpdate::RecordResolved { field, id, record } => {
                    if let Some(state) = self.related.get_mut(&field) {
                        match record {
                            Some(record) => state.related.record_resolved(record),
                            None => state.related.record_failed(&id),
                        }
                    }
                }
                FieldUpdate::PageLoaded {
                    field,
                    generation,
                    records,
                    full_page,
                } => {
                    if let Some(state) = self.related.get_mut(&field) {
                        // A stale page must not unlatch the scroll gate while
                        // the current generation's fetch is still in flight.
                        if state.related.search.is_current(generation) {
                            state.loading = false;
                            state.exhausted = !full_page;
                        }
                        state.related.page_loaded(generation, records);
                    }
                }
                FieldUpdate::PageFailed {
                    field,
                    generation,
                    error,
                } => {
                    if let Some(state) = self.related.get_mut(&field) {
                        if state.related.search.is_current(generation) {
                            state.loading = false;
                        }
                        state.related.page_failed(generation);
                    }
                    self.log = format!("fetch failed for '{}': {}", field, error);
                }
            }
        }
    }
}

/// Entry point used by the app binary to show a form.
pub fn run_native(
    api: Arc<dyn DataApi>,
    title: &str,
    fields: Vec<(String, FieldDefinition)>,
) -> eframe::Result<()> {
    info!(fields = fields.len(), "formant gui starting");
    let options = eframe::NativeOptions::default();
    let app = FormantApp {
        form: FormUi::new(api),
        fields,
    };
    eframe::run_native(title, options, Box::new(|_cc| Ok(Box::new(app))))
}

struct FormantApp {
    form: FormUi,
    fields: Vec<(String, FieldDefinition)>,
}

impl eframe::App for FormantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.form.poll_updates();
        egui::CentralPanel::default().show(ctx, |ui| {
            for (name, def) in &self.fields {
                self.form.ui_field(ui, name, def);
                ui.add_space(8.0);
            }
            if !self.form.log.is_empty() {
                ui.separator();
                ui.weak(&self.form.log);
            }
        });
        // Debounce timers and async results need frames even without input.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
