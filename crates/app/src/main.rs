use std::str::FromStr;
use std::sync::Arc;

use formant_api::MockApi;
use formant_fields::{Choice, FieldDefinition};
use serde_json::json;

fn init_tracing() {
    let env = std::env::var("FORMANT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn sample_api() -> MockApi {
    let categories = (1..=40)
        .map(|pk| {
            json!({
                "pk": pk,
                "name": format!("Category {pk:02}"),
                "pathstring": format!("Inventory/Category {pk:02}"),
            })
        })
        .collect();
    MockApi::new().with_records("part/category/", categories)
}

fn sample_fields() -> Vec<(String, FieldDefinition)> {
    let mut name = FieldDefinition::new("string").required();
    name.label = Some("Name".into());
    name.placeholder = Some("Parameter name".into());

    let mut units = FieldDefinition::new("string");
    units.label = Some("Units".into());
    units.description = Some("Physical units for this parameter".into());

    let mut category = FieldDefinition::new("related-entity")
        .with_endpoint("part/category/", "partcategory")
        .with_value(json!(17));
    category.label = Some("Category".into());

    let mut checkbox = FieldDefinition::new("boolean");
    checkbox.label = Some("Checkbox".into());
    checkbox.description = Some("Render this parameter as a checkbox".into());

    let mut precision = FieldDefinition::new("integer").with_value(json!(2));
    precision.label = Some("Decimal places".into());

    let mut kind = FieldDefinition::new("choice");
    kind.label = Some("Data type".into());
    kind.choices = vec![
        Choice {
            value: json!("text"),
            display: "Text".into(),
        },
        Choice {
            value: json!("numeric"),
            display: "Numeric".into(),
        },
        Choice {
            value: json!("date"),
            display: "Date".into(),
        },
    ];

    let mut valid_from = FieldDefinition::new("date");
    valid_from.label = Some("Valid from".into());

    vec![
        ("name".into(), name),
        ("units".into(), units),
        ("category".into(), category),
        ("checkbox".into(), checkbox),
        ("precision".into(), precision),
        ("data_type".into(), kind),
        ("valid_from".into(), valid_from),
    ]
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("formant demo starting");
    let api = Arc::new(sample_api());
    formant_gui::run_native(api, "Formant", sample_fields())
        .map_err(|e| anyhow::anyhow!("gui: {e}"))?;
    Ok(())
}
