#![forbid(unsafe_code)]

use eframe::egui;
use formant_core::{
    coerce, coerce_float, coerce_int, format_numeric, FieldKind, FieldTypeError, RemoteRecord,
};
use formant_fields::{Choice, FieldDefinition, WidgetAttrs};
use serde_json::Value;

use crate::renderers::display_record;
use crate::FormUi;

/// Inline banner text for a definition whose type tag cannot be resolved.
/// Rendering this is the error path; the rest of the form keeps working.
pub(crate) fn invalid_type_message(name: &str, err: &FieldTypeError) -> String {
    match err {
        FieldTypeError::Missing => format!("cannot render field '{}': no field type set", name),
        FieldTypeError::Unknown(tag) => {
            format!("cannot render field '{}': invalid field type '{}'", name, tag)
        }
    }
}

pub(crate) fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Optional fields holding a non-empty value get a quick-clear control;
/// required fields never do.
pub(crate) fn shows_quick_clear(required: bool, value: &Value) -> bool {
    !required && !value_is_empty(value)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "—".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The value a field's slot is forced to when the definition (re)syncs:
/// the server value, else the declared default.
pub(crate) fn bound_sync_value(def: &FieldDefinition) -> Value {
    def.value
        .clone()
        .or_else(|| def.default.clone())
        .unwrap_or(Value::Null)
}

/// Read-only text for a field. Relational and choice values resolve to their
/// display labels, falling back to the raw value while unresolved.
pub(crate) fn read_only_display(
    kind: FieldKind,
    def: &FieldDefinition,
    current: &Value,
    record: Option<&RemoteRecord>,
) -> String {
    match kind {
        FieldKind::Related => record
            .map(|r| display_record(def, r))
            .unwrap_or_else(|| display_value(current)),
        FieldKind::Choice => def
            .choices
            .iter()
            .find(|c| &c.value == current)
            .map(|c| c.display.clone())
            .unwrap_or_else(|| display_value(current)),
        _ if kind.is_numeric() => format_numeric(current),
        _ => display_value(current),
    }
}

impl FormUi {
    /// Render one field from its definition, bound to the form container's
    /// value under `name`. Dispatches on the definition's type tag.
    pub fn ui_field(&mut self, ui: &mut egui::Ui, name: &str, def: &FieldDefinition) {
        let kind = def.kind();

        // Server-supplied definition values override user edits whenever
        // they change, for every kind except nested objects (whose children
        // own their own slots). Hidden fields keep receiving these syncs.
        if !matches!(kind, Ok(FieldKind::Nested)) {
            let stale = self
                .seen_values
                .get(name)
                .map(|seen| seen != &def.value)
                .unwrap_or(true);
            if stale {
                self.form.set_value(name, bound_sync_value(def));
                self.seen_values.insert(name.to_string(), def.value.clone());
            }
        }
        if def.hidden {
            return;
        }

        let kind = match kind {
            Ok(kind) => kind,
            Err(err) => {
                ui.colored_label(
                    ui.visuals().error_fg_color,
                    invalid_type_message(name, &err),
                );
                return;
            }
        };

        let attrs = def.widget_attrs();
        if let Some(label) = &attrs.label {
            let text = if attrs.required {
                format!("{} *", label)
            } else {
                label.clone()
            };
            ui.label(egui::RichText::new(text).strong());
        }

        let current = self.form.value(name).cloned().unwrap_or(Value::Null);

        // Read-only is renderer-internal: show the value, skip the widget.
        // Related fields still resolve their bound identifier so the label
        // can show the record instead of a bare foreign key.
        if def.read_only {
            if matches!(kind, FieldKind::Related) {
                self.sync_related(name, def);
            }
            let record = self
                .related
                .get(name)
                .and_then(|s| s.related.selected_record());
            ui.label(read_only_display(kind, def, &current, record));
            return;
        }

        let changed = match kind {
            FieldKind::String | FieldKind::Email | FieldKind::Url => {
                text_widget(ui, &attrs, &current)
            }
            FieldKind::Boolean => bool_widget(ui, &attrs, &current),
            FieldKind::Date => date_widget(ui, &attrs, &current),
            FieldKind::Integer => int_widget(ui, &attrs, &current),
            FieldKind::Decimal | FieldKind::Float | FieldKind::Number => {
                float_widget(ui, &attrs, &current)
            }
            FieldKind::Choice => choice_widget(ui, name, &attrs, &def.choices, &current),
            FieldKind::File => file_widget(ui, &attrs, &current),
            FieldKind::Nested => {
                self.ui_nested(ui, name, def);
                None
            }
            FieldKind::Related => self
                .ui_related(ui, name, def)
                .map(|sel| sel.map(|id| id.to_value()).unwrap_or(Value::Null)),
        };

        // Single change path: the form container is written first, then the
        // definition's callback sees the new value.
        if let Some(new_value) = changed {
            let new_value = coerce(kind, &new_value);
            self.form.set_value(name, new_value.clone());
            def.notify_change(&new_value);
        }

        if let Some(desc) = &attrs.description {
            ui.label(egui::RichText::new(desc).weak().small());
        }
        for err in self.form.errors_for(name) {
            ui.colored_label(ui.visuals().error_fg_color, err);
        }
    }

    fn ui_nested(&mut self, ui: &mut egui::Ui, name: &str, def: &FieldDefinition) {
        ui.indent(name, |ui| {
            for (child, child_def) in &def.children {
                self.ui_field(ui, &format!("{}.{}", name, child), child_def);
            }
        });
    }
}

fn text_widget(ui: &mut egui::Ui, attrs: &WidgetAttrs, current: &Value) -> Option<Value> {
    let mut text = current.as_str().unwrap_or("").to_string();
    let mut out = None;
    ui.horizontal(|ui| {
        let mut edit = egui::TextEdit::singleline(&mut text);
        if let Some(hint) = &attrs.placeholder {
            edit = edit.hint_text(hint.clone());
        }
        if ui.add_enabled(!attrs.disabled, edit).changed() {
            out = Some(Value::from(text.clone()));
        }
        if shows_quick_clear(attrs.required, current) && ui.small_button("✕").clicked() {
            out = Some(Value::from(""));
        }
    });
    out
}

fn bool_widget(ui: &mut egui::Ui, attrs: &WidgetAttrs, current: &Value) -> Option<Value> {
    let mut checked = current.as_bool().unwrap_or(false);
    let resp = ui.add_enabled(!attrs.disabled, egui::Checkbox::without_text(&mut checked));
    resp.changed().then(|| Value::from(checked))
}

/// ISO `YYYY-MM-DD` entry; values round-trip as strings, clearable unless
/// required.
fn date_widget(ui: &mut egui::Ui, attrs: &WidgetAttrs, current: &Value) -> Option<Value> {
    let mut text = current.as_str().unwrap_or("").to_string();
    let mut out = None;
    ui.horizontal(|ui| {
        let edit = egui::TextEdit::singleline(&mut text)
            .hint_text("YYYY-MM-DD")
            .desired_width(110.0);
        if ui.add_enabled(!attrs.disabled, edit).changed() {
            out = Some(Value::from(text.clone()));
        }
        if !attrs.required && !text.is_empty() && ui.small_button("✕").clicked() {
            out = Some(Value::Null);
        }
    });
    if !text.is_empty() && parse_iso_date(&text).is_none() {
        ui.colored_label(ui.visuals().warn_fg_color, "expected YYYY-MM-DD");
    }
    out
}

pub(crate) fn parse_iso_date(text: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn int_widget(ui: &mut egui::Ui, attrs: &WidgetAttrs, current: &Value) -> Option<Value> {
    let mut v = coerce_int(current);
    let resp = ui.add_enabled(
        !attrs.disabled,
        egui::DragValue::new(&mut v).speed(1).max_decimals(0),
    );
    resp.changed().then(|| Value::from(v))
}

fn float_widget(ui: &mut egui::Ui, attrs: &WidgetAttrs, current: &Value) -> Option<Value> {
    let mut v = coerce_float(current);
    let resp = ui.add_enabled(
        !attrs.disabled,
        egui::DragValue::new(&mut v).speed(0.1).max_decimals(10),
    );
    resp.changed().then(|| Value::from(v))
}

fn choice_widget(
    ui: &mut egui::Ui,
    name: &str,
    attrs: &WidgetAttrs,
    choices: &[Choice],
    current: &Value,
) -> Option<Value> {
    let selected_text = choices
        .iter()
        .find(|c| &c.value == current)
        .map(|c| c.display.clone())
        .unwrap_or_else(|| {
            attrs
                .placeholder
                .clone()
                .unwrap_or_else(|| "Select…".to_string())
        });
    let mut out = None;
    ui.add_enabled_ui(!attrs.disabled, |ui| {
        egui::ComboBox::from_id_salt(name)
            .selected_text(selected_text)
            .show_ui(ui, |ui| {
                for choice in choices {
                    let is_sel = &choice.value == current;
                    if ui.selectable_label(is_sel, &choice.display).clicked() && !is_sel {
                        out = Some(choice.value.clone());
                    }
                }
            });
    });
    out
}

fn file_widget(ui: &mut egui::Ui, attrs: &WidgetAttrs, current: &Value) -> Option<Value> {
    let mut out = None;
    ui.horizontal(|ui| {
        let shown = current.as_str().filter(|s| !s.is_empty());
        ui.label(shown.unwrap_or("no file selected"));
        if ui
            .add_enabled(!attrs.disabled, egui::Button::new("Browse…"))
            .clicked()
        {
            if let Some(path) = rfd::FileDialog::new().pick_file() {
                out = Some(Value::from(path.display().to_string()));
            }
        }
        if shows_quick_clear(attrs.required, current) && ui.small_button("✕").clicked() {
            out = Some(Value::from(""));
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn invalid_type_banner_names_field_and_tag() {
        let msg = invalid_type_message("supplier", &FieldTypeError::Unknown("hologram".into()));
        assert!(msg.contains("supplier"));
        assert!(msg.contains("hologram"));
        let msg = invalid_type_message("supplier", &FieldTypeError::Missing);
        assert!(msg.contains("supplier"));
        assert!(msg.contains("no field type"));
    }

    #[test]
    fn quick_clear_rules() {
        // Required text bound to "" gets no clear control.
        assert!(!shows_quick_clear(true, &json!("")));
        assert!(!shows_quick_clear(true, &json!("foo")));
        // Optional non-empty value does.
        assert!(shows_quick_clear(false, &json!("foo")));
        assert!(!shows_quick_clear(false, &json!("")));
        assert!(!shows_quick_clear(false, &json!(null)));
    }

    #[test]
    fn default_seeds_the_slot_when_no_value_is_set() {
        let mut def = FieldDefinition::new("integer");
        def.default = Some(json!(3));
        assert_eq!(bound_sync_value(&def), json!(3));
        // A server value wins over the default.
        def.value = Some(json!(7));
        assert_eq!(bound_sync_value(&def), json!(7));
        assert_eq!(bound_sync_value(&FieldDefinition::new("integer")), json!(null));
    }

    #[test]
    fn read_only_fields_show_display_labels_not_raw_values() {
        let mut choice = FieldDefinition::new("choice");
        choice.choices = vec![Choice {
            value: json!("num"),
            display: "Numeric".into(),
        }];
        assert_eq!(
            read_only_display(FieldKind::Choice, &choice, &json!("num"), None),
            "Numeric"
        );
        // Value outside the choice list falls back to the raw value.
        assert_eq!(
            read_only_display(FieldKind::Choice, &choice, &json!("odd"), None),
            "odd"
        );

        let related =
            FieldDefinition::new("related-entity").with_endpoint("part/category/", "partcategory");
        let rec =
            RemoteRecord::from_payload(json!({"pk": 17, "pathstring": "Electronics/Passives"}))
                .unwrap();
        assert_eq!(
            read_only_display(FieldKind::Related, &related, &json!(17), Some(&rec)),
            "Electronics/Passives"
        );
        // Unresolved: the bare foreign key is all there is to show.
        assert_eq!(
            read_only_display(FieldKind::Related, &related, &json!(17), None),
            "17"
        );

        assert_eq!(
            read_only_display(FieldKind::Integer, &related, &json!("junk"), None),
            "0"
        );
    }

    #[test]
    fn iso_dates_round_trip() {
        let d = parse_iso_date("2026-08-29").unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2026-08-29");
        assert!(parse_iso_date("29/08/2026").is_none());
        assert!(parse_iso_date("2026-13-01").is_none());
    }
}
