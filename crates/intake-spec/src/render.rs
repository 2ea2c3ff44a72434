use serde_json::{Map, Value, json};

use crate::{
    evaluate::ValidationResult,
    group::{RenderMode, SectionItem, group_fields},
    locale::Locale,
    spec::{field::FieldDescriptor, form::CompiledForm},
    values::FormValues,
    values_schema,
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// At least one field fails validation.
    NeedInput,
    /// Every rule passes.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Describes a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub name: String,
    pub kind: String,
    pub label: String,
    pub required: bool,
    pub enabled: bool,
    pub options: Vec<String>,
    pub current_value: Option<Value>,
    pub error: Option<String>,
    pub children: Vec<RenderField>,
}

#[derive(Debug, Clone)]
pub struct RenderSection {
    pub label: Option<String>,
    pub fields: Vec<RenderField>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub locale: Locale,
    pub status: RenderStatus,
    pub progress: RenderProgress,
    pub sections: Vec<RenderSection>,
    pub schema: Value,
}

/// Build the renderer payload from a compiled form and the current values.
pub fn build_render_payload(
    form: &CompiledForm,
    values: &FormValues,
    locale: Locale,
    mode: RenderMode,
) -> RenderPayload {
    let validation = form.evaluate(values, locale);
    let builder = FieldBuilder {
        form,
        values,
        validation: &validation,
        locale,
    };

    let sections = group_fields(&form.fields, locale, mode)
        .into_iter()
        .map(|section| RenderSection {
            label: section.label,
            fields: section
                .items
                .iter()
                .map(|item| builder.item(item))
                .collect(),
        })
        .collect::<Vec<_>>();

    let inputs = sections
        .iter()
        .flat_map(|section| section.fields.iter())
        .flat_map(|field| std::iter::once(field).chain(field.children.iter()))
        .filter(|field| !matches!(field.kind.as_str(), "placeholder" | "checkmenu"))
        .collect::<Vec<_>>();
    let answered = inputs
        .iter()
        .filter(|field| {
            field
                .current_value
                .as_ref()
                .is_some_and(|value| !FormValues::value_is_empty(value))
        })
        .count();

    let status = if validation.is_valid() {
        RenderStatus::Complete
    } else {
        RenderStatus::NeedInput
    };

    RenderPayload {
        locale,
        status,
        progress: RenderProgress {
            answered,
            total: inputs.len(),
        },
        sections,
        schema: values_schema::generate(form, locale),
    }
}

struct FieldBuilder<'a> {
    form: &'a CompiledForm,
    values: &'a FormValues,
    validation: &'a ValidationResult,
    locale: Locale,
}

impl FieldBuilder<'_> {
    fn item(&self, item: &SectionItem<'_>) -> RenderField {
        match item {
            SectionItem::Input(field) | SectionItem::Heading(field) => self.field(field),
            SectionItem::Checkmenu { field, children } => {
                let mut rendered = self.field(field);
                rendered.children = children.iter().map(|child| self.field(child)).collect();
                rendered
            }
        }
    }

    fn field(&self, field: &FieldDescriptor) -> RenderField {
        let kind = field
            .kind
            .as_ref()
            .map(|kind| kind.as_str().to_string())
            .unwrap_or_else(|| "text".into());
        let holds_value = field.holds_value();
        RenderField {
            name: field.name.clone(),
            kind,
            label: field.label_in(self.locale).to_string(),
            required: self
                .form
                .ruleset
                .effective_required(&field.name, self.values),
            enabled: field.enabled,
            options: field.options_in(self.locale),
            current_value: holds_value
                .then(|| self.values.get(&field.name).cloned())
                .flatten(),
            error: self.validation.error(&field.name).map(String::from),
            children: Vec::new(),
        }
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let sections = payload
        .sections
        .iter()
        .map(|section| {
            json!({
                "label": section.label,
                "fields": section.fields.iter().map(field_json).collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "locale": payload.locale.as_str(),
        "status": payload.status.as_str(),
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "sections": sections,
        "schema": payload.schema,
    })
}

fn field_json(field: &RenderField) -> Value {
    let mut map = Map::new();
    map.insert("name".into(), Value::String(field.name.clone()));
    map.insert("type".into(), Value::String(field.kind.clone()));
    map.insert("label".into(), Value::String(field.label.clone()));
    map.insert("required".into(), Value::Bool(field.required));
    map.insert("enabled".into(), Value::Bool(field.enabled));
    if !field.options.is_empty() {
        map.insert(
            "options".into(),
            Value::Array(field.options.iter().cloned().map(Value::String).collect()),
        );
    }
    if let Some(current_value) = &field.current_value {
        map.insert("current_value".into(), current_value.clone());
    }
    if let Some(error) = &field.error {
        map.insert("error".into(), Value::String(error.clone()));
    }
    if !field.children.is_empty() {
        map.insert(
            "children".into(),
            Value::Array(field.children.iter().map(field_json).collect()),
        );
    }
    Value::Object(map)
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));

    for section in &payload.sections {
        if let Some(label) = &section.label {
            lines.push(format!("[{}]", label));
        }
        for field in &section.fields {
            push_field_lines(&mut lines, field, 1);
        }
    }

    lines.join("\n")
}

fn push_field_lines(lines: &mut Vec<String>, field: &RenderField, depth: usize) {
    let indent = "  ".repeat(depth);
    if field.kind == "placeholder" {
        lines.push(format!("{}## {}", indent, field.label));
        return;
    }

    let mut entry = format!("{}- {} ({})", indent, field.name, field.label);
    if field.required {
        entry.push_str(" [required]");
    }
    if !field.enabled {
        entry.push_str(" [disabled]");
    }
    if let Some(current_value) = &field.current_value {
        entry.push_str(&format!(" = {}", value_to_display(current_value)));
    }
    lines.push(entry);
    if !field.options.is_empty() {
        lines.push(format!("{}    options: {}", indent, field.options.join(", ")));
    }
    if let Some(error) = &field.error {
        lines.push(format!("{}    ! {}", indent, error));
    }
    for child in &field.children {
        push_field_lines(lines, child, depth + 1);
    }
}

pub(crate) fn value_to_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => num.to_string(),
        other => other.to_string(),
    }
}
