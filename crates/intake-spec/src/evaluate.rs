use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::locale::Locale;

/// Result of evaluating one field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FieldOutcome {
    Valid,
    /// Required but empty.
    Missing(String),
    /// Present but failing a date, pattern or email check.
    Mismatch(String),
}

impl FieldOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldOutcome::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FieldOutcome::Valid => None,
            FieldOutcome::Missing(message) | FieldOutcome::Mismatch(message) => Some(message),
        }
    }

    /// `"valid"` or the localized error message.
    pub fn display(&self) -> &str {
        self.message().unwrap_or("valid")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub name: String,
    pub outcome: FieldOutcome,
}

/// Outcome of one validation pass, in ruleset order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub locale: Locale,
    pub fields: Vec<FieldReport>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|report| report.outcome.is_valid())
    }

    pub fn get(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|report| report.name == name)
            .map(|report| &report.outcome)
    }

    /// Error message for `name`, if that field is invalid.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldOutcome::message)
    }

    /// Invalid fields only, keyed by name.
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|report| {
                report
                    .outcome
                    .message()
                    .map(|message| (report.name.clone(), message.to_string()))
            })
            .collect()
    }

    pub fn first_error(&self) -> Option<&FieldReport> {
        self.fields.iter().find(|report| !report.outcome.is_valid())
    }

    /// Every evaluated field mapped to `"valid"` or its message.
    pub fn report(&self) -> Value {
        let map = self
            .fields
            .iter()
            .map(|report| {
                (
                    report.name.clone(),
                    Value::String(report.outcome.display().to_string()),
                )
            })
            .collect::<Map<_, _>>();
        Value::Object(map)
    }
}
