use std::collections::BTreeMap;
use std::sync::Arc;

use formant_core::{FieldKind, FieldTypeError, RemoteRecord};
use serde_json::Value;

/// Invoked after a field writes its new value into the form container.
pub type ChangeCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Transforms the filter map immediately before each related-field request,
/// e.g. to exclude a record's own identifier from its parent choices.
pub type FilterAdjust =
    Arc<dyn Fn(BTreeMap<String, String>) -> BTreeMap<String, String> + Send + Sync>;

/// Custom display for a remote record, used for both the selected value and
/// option rows.
pub type RecordRenderer = Arc<dyn Fn(&RemoteRecord) -> String + Send + Sync>;

/// One entry of a choice field's enumerated value set.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub value: Value,
    pub display: String,
}

/// Declarative description of a single form field, supplied by the caller
/// (typically generated from an API schema) and consumed by the renderer.
#[derive(Clone, Default)]
pub struct FieldDefinition {
    /// Semantic type tag. Its absence is a configuration error, not a
    /// default; the renderer surfaces it inline.
    pub field_type: Option<String>,
    /// Server-supplied current value; overrides user edits when it changes.
    pub value: Option<Value>,
    pub default: Option<Value>,
    pub required: bool,
    pub hidden: bool,
    pub disabled: bool,
    pub read_only: bool,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub description: Option<String>,
    /// Related-entity config: resource endpoint and model tag.
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Merged into every related-field query's parameters.
    pub filters: BTreeMap<String, String>,
    pub adjust_filters: Option<FilterAdjust>,
    pub render_option: Option<RecordRenderer>,
    /// Allowed values for choice fields.
    pub choices: Vec<Choice>,
    /// Child definitions for nested-object fields.
    pub children: BTreeMap<String, FieldDefinition>,
    pub on_value_change: Option<ChangeCallback>,
}

impl FieldDefinition {
    pub fn new(field_type: &str) -> Self {
        Self {
            field_type: Some(field_type.to_string()),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str, model: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self.model = Some(model.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Resolve the type tag to a [`FieldKind`].
    pub fn kind(&self) -> Result<FieldKind, FieldTypeError> {
        match &self.field_type {
            None => Err(FieldTypeError::Missing),
            Some(tag) => FieldKind::parse(tag).ok_or_else(|| FieldTypeError::Unknown(tag.clone())),
        }
    }

    /// The filter map that accompanies the next request, with the
    /// adjust hook applied.
    pub fn query_filters(&self) -> BTreeMap<String, String> {
        let filters = self.filters.clone();
        match &self.adjust_filters {
            Some(adjust) => adjust(filters),
            None => filters,
        }
    }

    /// The explicit allow-list of attributes forwarded to widget code.
    /// Renderer-internal attributes (value-change callback, filter-adjust
    /// hook, read-only flag, child definitions) are structurally excluded.
    pub fn widget_attrs(&self) -> WidgetAttrs {
        WidgetAttrs {
            label: self.label.clone(),
            placeholder: self.placeholder.clone(),
            description: self.description.clone(),
            required: self.required,
            disabled: self.disabled,
        }
    }

    /// Notify the caller of a value change. Always invoked *after* the form
    /// container has been updated.
    pub fn notify_change(&self, value: &Value) {
        if let Some(cb) = &self.on_value_change {
            cb(value);
        }
    }
}

/// Attributes a widget is allowed to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetAttrs {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn kind_resolution_distinguishes_missing_and_unknown() {
        let def = FieldDefinition::default();
        assert_eq!(def.kind(), Err(FieldTypeError::Missing));
        let def = FieldDefinition::new("quaternion");
        assert_eq!(
            def.kind(),
            Err(FieldTypeError::Unknown("quaternion".into()))
        );
        let def = FieldDefinition::new("integer");
        assert_eq!(def.kind(), Ok(FieldKind::Integer));
    }

    #[test]
    fn adjust_hook_transforms_query_filters() {
        let mut def = FieldDefinition::new("related-entity").with_endpoint("part/category/", "partcategory");
        def.filters.insert("structural".into(), "true".into());
        def.adjust_filters = Some(Arc::new(|mut f| {
            f.insert("exclude_id".into(), "42".into());
            f
        }));
        let filters = def.query_filters();
        assert_eq!(filters.get("structural").map(String::as_str), Some("true"));
        assert_eq!(filters.get("exclude_id").map(String::as_str), Some("42"));
        // The definition's own map is untouched.
        assert!(!def.filters.contains_key("exclude_id"));
    }

    #[test]
    fn change_callback_fires_with_new_value() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut def = FieldDefinition::new("string");
        def.on_value_change = Some(Arc::new(|v| {
            assert_eq!(v, &json!("edited"));
            CALLS.fetch_add(1, Ordering::SeqCst);
        }));
        def.notify_change(&json!("edited"));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn widget_attrs_exclude_renderer_internals() {
        let mut def = FieldDefinition::new("string");
        def.label = Some("Name".into());
        def.read_only = true;
        def.on_value_change = Some(Arc::new(|_| {}));
        def.children
            .insert("child".into(), FieldDefinition::new("string"));
        let attrs = def.widget_attrs();
        assert_eq!(attrs.label.as_deref(), Some("Name"));
        // Only the allow-listed attributes exist on WidgetAttrs; this mainly
        // documents that read_only and callbacks stay renderer-side.
        assert_eq!(
            attrs,
            WidgetAttrs {
                label: Some("Name".into()),
                placeholder: None,
                description: None,
                required: false,
                disabled: false,
            }
        );
    }
}
