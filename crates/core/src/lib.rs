//! Formant core types: field kinds, value coercion, remote records.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type tag of a form field. Exactly one per definition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldKind {
    Related,
    Email,
    Url,
    String,
    Boolean,
    Date,
    Integer,
    Decimal,
    Float,
    Number,
    Choice,
    File,
    Nested,
}

impl FieldKind {
    /// Parse a definition's type tag. Unknown tags are kept as data so the
    /// renderer can show them inline instead of failing the whole form.
    pub fn parse(tag: &str) -> Option<FieldKind> {
        Some(match tag {
            "related-entity" => FieldKind::Related,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "string" => FieldKind::String,
            "boolean" => FieldKind::Boolean,
            "date" => FieldKind::Date,
            "integer" => FieldKind::Integer,
            "decimal" => FieldKind::Decimal,
            "float" => FieldKind::Float,
            "number" => FieldKind::Number,
            "choice" => FieldKind::Choice,
            "file" => FieldKind::File,
            "nested-object" => FieldKind::Nested,
            _ => return None,
        })
    }

    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Related => "related-entity",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Float => "float",
            FieldKind::Number => "number",
            FieldKind::Choice => "choice",
            FieldKind::File => "file",
            FieldKind::Nested => "nested-object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Integer | FieldKind::Decimal | FieldKind::Float | FieldKind::Number
        )
    }
}

/// Why a definition's type tag could not be resolved to a [`FieldKind`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FieldTypeError {
    #[error("field has no type tag")]
    Missing,
    #[error("unrecognized field type '{0}'")]
    Unknown(String),
}

/// Primary identifier of a remote record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Extract the identifier from a raw payload: `pk` first, then `id`.
    pub fn from_payload(payload: &Value) -> Option<RecordId> {
        let raw = payload.get("pk").or_else(|| payload.get("id"))?;
        RecordId::from_value(raw)
    }

    pub fn from_value(raw: &Value) -> Option<RecordId> {
        match raw {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) => Some(RecordId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(n) => Value::from(*n),
            RecordId::Str(s) => Value::from(s.clone()),
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Str(s) => write!(f, "{}", s),
        }
    }
}

/// A cached remote record: identifier plus the raw payload it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRecord {
    pub id: RecordId,
    pub payload: Value,
}

impl RemoteRecord {
    /// Wrap a raw payload, extracting its identifier. Payloads without a
    /// usable `pk`/`id` are skipped by callers.
    pub fn from_payload(payload: Value) -> Option<RemoteRecord> {
        let id = RecordId::from_payload(&payload)?;
        Some(RemoteRecord { id, payload })
    }

    /// Best-effort display string for a payload field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

fn parse_f64(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    n.is_finite().then_some(n)
}

/// Integer coercion: parse failures and non-finite results fall back to 0,
/// so the widget always holds a definite numeric value.
pub fn coerce_int(raw: &Value) -> i64 {
    if let Value::Number(n) = raw {
        if let Some(i) = n.as_i64() {
            return i;
        }
    }
    parse_f64(raw).map(|f| f.trunc() as i64).unwrap_or(0)
}

/// Floating-point coercion with the same fallback-to-zero policy.
pub fn coerce_float(raw: &Value) -> f64 {
    parse_f64(raw).unwrap_or(0.0)
}

/// Coerce a raw form value by field kind. Non-numeric kinds pass through.
pub fn coerce(kind: FieldKind, raw: &Value) -> Value {
    match kind {
        FieldKind::Integer => Value::from(coerce_int(raw)),
        FieldKind::Decimal | FieldKind::Float | FieldKind::Number => {
            serde_json::Number::from_f64(coerce_float(raw))
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0))
        }
        _ => raw.clone(),
    }
}

/// Display form of a numeric value: values that parse are shown as-is,
/// anything else collapses to its whole-number coercion.
pub fn format_numeric(raw: &Value) -> String {
    match parse_f64(raw) {
        Some(_) => match raw {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        },
        None => coerce_int(raw).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parse_round_trips_all_tags() {
        for tag in [
            "related-entity",
            "email",
            "url",
            "string",
            "boolean",
            "date",
            "integer",
            "decimal",
            "float",
            "number",
            "choice",
            "file",
            "nested-object",
        ] {
            let kind = FieldKind::parse(tag).expect(tag);
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(FieldKind::parse("telepathy"), None);
    }

    #[test]
    fn integer_coercion_falls_back_to_zero() {
        assert_eq!(coerce_int(&json!("17")), 17);
        assert_eq!(coerce_int(&json!(17.9)), 17);
        assert_eq!(coerce_int(&json!("3.7")), 3);
        assert_eq!(coerce_int(&json!("not a number")), 0);
        assert_eq!(coerce_int(&json!(null)), 0);
        assert_eq!(coerce_int(&json!({"a": 1})), 0);
    }

    #[test]
    fn float_coercion_falls_back_to_zero() {
        assert_eq!(coerce_float(&json!("2.5")), 2.5);
        assert_eq!(coerce_float(&json!(4)), 4.0);
        assert_eq!(coerce_float(&json!("")), 0.0);
        assert_eq!(coerce_float(&json!("inf")), 0.0);
        assert_eq!(coerce_float(&json!(true)), 0.0);
    }

    #[test]
    fn coerce_passes_non_numeric_kinds_through() {
        let v = json!("hello");
        assert_eq!(coerce(FieldKind::String, &v), v);
        let v = json!({"nested": true});
        assert_eq!(coerce(FieldKind::Nested, &v), v);
        assert_eq!(coerce(FieldKind::Integer, &json!("x")), json!(0));
        assert_eq!(coerce(FieldKind::Number, &json!("x")), json!(0.0));
    }

    #[test]
    fn numeric_display_truncates_unparseable_values() {
        assert_eq!(format_numeric(&json!("12.5")), "12.5");
        assert_eq!(format_numeric(&json!(3)), "3");
        assert_eq!(format_numeric(&json!("garbage")), "0");
    }

    #[test]
    fn record_id_prefers_pk_over_id() {
        let rec = RemoteRecord::from_payload(json!({"pk": 7, "id": 9, "name": "bolt"})).unwrap();
        assert_eq!(rec.id, RecordId::Int(7));
        let rec = RemoteRecord::from_payload(json!({"id": "abc"})).unwrap();
        assert_eq!(rec.id, RecordId::Str("abc".into()));
        assert!(RemoteRecord::from_payload(json!({"name": "no key"})).is_none());
    }
}
