use serde::Serialize;

use crate::{
    evaluate::ValidationResult,
    locale::Locale,
    rules::Ruleset,
    spec::field::FieldDescriptor,
    values::FormValues,
};

/// Output of the schema compiler: the render list and its validation ruleset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledForm {
    pub fields: Vec<FieldDescriptor>,
    #[serde(rename = "rules")]
    pub ruleset: Ruleset,
}

impl CompiledForm {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields that render in a patient-facing form.
    pub fn enabled_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.enabled)
    }

    pub fn default_values(&self) -> FormValues {
        FormValues::defaults(&self.fields)
    }

    pub fn evaluate(&self, values: &FormValues, locale: Locale) -> ValidationResult {
        self.ruleset.evaluate(values, locale)
    }
}
