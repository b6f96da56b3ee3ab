#![forbid(unsafe_code)]

use std::collections::HashMap;

use formant_core::RemoteRecord;
use formant_fields::FieldDefinition;
use once_cell::sync::Lazy;

/// Payload fields tried in order when rendering a record of a known model.
static MODEL_TITLE_KEYS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("part", &["full_name", "name", "description"]);
    m.insert("partcategory", &["pathstring", "name"]);
    m.insert("stocklocation", &["pathstring", "name"]);
    m.insert("company", &["name", "description"]);
    m.insert("owner", &["name", "username"]);
    m
});

const GENERIC_TITLE_KEYS: &[&str] = &["name", "title", "username", "description"];

/// Default display for a remote record, keyed by its model tag. Used when a
/// field definition supplies no custom renderer.
pub fn render_record(model: Option<&str>, record: &RemoteRecord) -> String {
    let keys = model
        .and_then(|m| MODEL_TITLE_KEYS.get(m).copied())
        .unwrap_or(GENERIC_TITLE_KEYS);
    for key in keys.iter().chain(GENERIC_TITLE_KEYS) {
        if let Some(text) = record.text(key) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    match model {
        Some(m) => format!("{} #{}", m, record.id),
        None => format!("#{}", record.id),
    }
}

/// Display for a record in the context of one field: the definition's custom
/// renderer when present, else the model-keyed default.
pub(crate) fn display_record(def: &FieldDefinition, record: &RemoteRecord) -> String {
    match &def.render_option {
        Some(render) => render(record),
        None => render_record(def.model.as_deref(), record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_specific_keys_win_over_generic() {
        let rec = RemoteRecord::from_payload(
            json!({"pk": 1, "name": "Bolts", "pathstring": "Fasteners/Bolts"}),
        )
        .unwrap();
        assert_eq!(render_record(Some("partcategory"), &rec), "Fasteners/Bolts");
        assert_eq!(render_record(None, &rec), "Bolts");
    }

    #[test]
    fn unknown_payload_falls_back_to_identifier() {
        let rec = RemoteRecord::from_payload(json!({"pk": 42, "qty": 7})).unwrap();
        assert_eq!(render_record(Some("stockitem"), &rec), "stockitem #42");
        assert_eq!(render_record(None, &rec), "#42");
    }
}
