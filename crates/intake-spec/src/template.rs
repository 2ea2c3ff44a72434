use handlebars::Handlebars;
use serde_json::json;
use std::sync::LazyLock;
use tracing::debug;

use crate::locale::{Locale, LocalePair};

static ENGINE: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut engine = Handlebars::new();
    engine.register_escape_fn(handlebars::no_escape);
    engine
});

/// Fallback messages used when a descriptor leaves its own message blank.
///
/// Messages are handlebars templates and may reference `{{label}}` and `{{name}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultMessages {
    pub required: LocalePair<String>,
    pub pattern: LocalePair<String>,
    pub email: LocalePair<String>,
    pub date: LocalePair<String>,
}

impl Default for DefaultMessages {
    fn default() -> Self {
        Self {
            required: LocalePair::from(("{{label}} es obligatorio", "{{label}} is required")),
            pattern: LocalePair::from((
                "{{label}} no tiene un formato válido",
                "{{label}} has an invalid format",
            )),
            email: LocalePair::from((
                "{{label}} debe ser un correo válido",
                "{{label}} must be a valid email address",
            )),
            date: LocalePair::from((
                "{{label}} debe ser una fecha válida",
                "{{label}} must be a valid date",
            )),
        }
    }
}

/// Picks the descriptor's own message for `locale`, else the default, and renders it.
pub fn resolve_message(
    own: &LocalePair<String>,
    fallback: &LocalePair<String>,
    locale: Locale,
    name: &str,
    label: &str,
) -> String {
    let template = own
        .text(locale)
        .or_else(|| fallback.text(locale))
        .unwrap_or_default();
    render_message(template, name, label)
}

/// Renders `{{label}}`/`{{name}}` placeholders. Returns the raw text if rendering fails.
pub fn render_message(template: &str, name: &str, label: &str) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    let label = if label.trim().is_empty() { name } else { label };
    ENGINE
        .render_template(template, &json!({ "name": name, "label": label }))
        .unwrap_or_else(|err| {
            debug!(template, error = %err, "message template failed to render");
            template.to_string()
        })
}
