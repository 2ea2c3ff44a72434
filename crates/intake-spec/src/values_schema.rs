use serde_json::{Map, Value, json};

use crate::{
    locale::Locale,
    spec::{
        field::{FieldDescriptor, FieldType},
        form::CompiledForm,
    },
};

/// JSON Schema describing the values object a form submits.
///
/// Fields gated by a checkbox are never listed as required because the
/// requirement depends on another answer.
pub fn generate(form: &CompiledForm, locale: Locale) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in form
        .fields
        .iter()
        .filter(|field| field.enabled && field.holds_value() && !field.name.is_empty())
    {
        properties.insert(field.name.clone(), property_schema(form, field, locale));

        let statically_required = form
            .ruleset
            .rule(&field.name)
            .is_some_and(|rule| rule.required && rule.gate.is_none());
        if statically_required {
            required.push(Value::String(field.name.clone()));
        }
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": true,
    })
}

fn property_schema(form: &CompiledForm, field: &FieldDescriptor, locale: Locale) -> Value {
    let mut schema = Map::new();
    schema.insert(
        "title".into(),
        Value::String(field.label_in(locale).to_string()),
    );

    match &field.kind {
        Some(FieldType::Boolean | FieldType::Checkbox) => {
            schema.insert("type".into(), Value::String("boolean".into()));
        }
        Some(FieldType::Number) => {
            schema.insert("type".into(), json!(["number", "string"]));
        }
        Some(FieldType::Date) => {
            schema.insert("type".into(), Value::String("string".into()));
            schema.insert("format".into(), Value::String("date".into()));
        }
        Some(FieldType::Select) => {
            schema.insert("type".into(), Value::String("string".into()));
            let options = field.options_in(locale);
            if !options.is_empty() {
                schema.insert(
                    "enum".into(),
                    Value::Array(options.into_iter().map(Value::String).collect()),
                );
            }
        }
        _ => {
            schema.insert("type".into(), Value::String("string".into()));
            if let Some(pattern) = form
                .ruleset
                .rule(&field.name)
                .and_then(|rule| rule.pattern.get(locale).as_ref())
            {
                schema.insert("pattern".into(), Value::String(pattern.source().into()));
            }
        }
    }

    Value::Object(schema)
}

/// JSON Schema of a raw field descriptor record.
pub fn descriptor_schema() -> Value {
    serde_json::to_value(schemars::schema_for!(FieldDescriptor)).unwrap_or(Value::Null)
}
