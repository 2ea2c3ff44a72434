use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    rules::{FieldRule, Ruleset},
    source::{SourceError, records_from_value},
    spec::{
        field::{FieldDescriptor, FieldType},
        form::CompiledForm,
    },
};

/// Compiles raw field records into a render list and a validation ruleset.
///
/// Every record is kept in the render list, in input order. Only records that
/// carry a type, a pattern or a gating checkbox get a rule, so a record with
/// none of them is never required even when it says `required: true`.
/// Disabled records, headings and checkmenus never get a rule.
pub fn compile(raw: &[Value]) -> CompiledForm {
    let fields = raw
        .iter()
        .map(FieldDescriptor::from_value)
        .collect::<Vec<_>>();

    for field in &fields {
        if field.options_mismatch() {
            warn!(
                field = %field.name,
                "option lists differ in length between locales"
            );
        }
    }

    let rules = fields
        .iter()
        .filter(|field| has_rule(field))
        .map(FieldRule::from_descriptor)
        .collect::<Vec<_>>();

    debug!(fields = fields.len(), rules = rules.len(), "compiled form");

    CompiledForm {
        fields,
        ruleset: Ruleset::new(rules),
    }
}

/// Parses a JSON document (array or `{ "fields": [...] }`) and compiles it.
pub fn compile_from_str(json: &str) -> Result<CompiledForm, SourceError> {
    let value = serde_json::from_str(json).map_err(|source| SourceError::Parse {
        origin: "inline".into(),
        source,
    })?;
    let records = records_from_value("inline", value)?;
    Ok(compile(&records))
}

fn has_rule(field: &FieldDescriptor) -> bool {
    if !field.enabled {
        return false;
    }
    if field.is_kind(&FieldType::Placeholder) || field.is_kind(&FieldType::Checkmenu) {
        return false;
    }
    field.kind.is_some() || field.has_pattern() || field.checkbox_name.is_some()
}
