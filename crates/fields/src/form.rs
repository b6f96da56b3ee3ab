use std::collections::BTreeMap;

use serde_json::Value;

/// Shared form-state container. Each field owns exactly one named slot and
/// mutates it only through [`FormState::set_value`]; validation errors are
/// attached per field for widgets to display.
#[derive(Debug, Default)]
pub struct FormState {
    values: BTreeMap<String, Value>,
    errors: BTreeMap<String, Vec<String>>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set_value(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// All current values, e.g. for submission.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn errors_for(&self, name: &str) -> &[String] {
        self.errors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_errors(&mut self, name: &str, errors: Vec<String>) {
        if errors.is_empty() {
            self.errors.remove(name);
        } else {
            self.errors.insert(name.to_string(), errors);
        }
    }

    pub fn clear_errors(&mut self, name: &str) {
        self.errors.remove(name);
    }
}
