use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    evaluate::ValidationResult,
    locale::Locale,
    rules::Ruleset,
    spec::field::{FieldDescriptor, loose_bool},
};

/// Current value of every field, keyed by field name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(Map<String, Value>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON object. Anything else yields an empty set.
    pub fn from_value(value: &Value) -> Self {
        Self(value.as_object().cloned().unwrap_or_default())
    }

    /// Initial values for a blank form: booleans start unchecked, the rest use
    /// `defaultValue` or an empty string. Headings and checkmenus hold nothing.
    pub fn defaults(fields: &[FieldDescriptor]) -> Self {
        let mut values = Self::new();
        for field in fields.iter().filter(|field| field.holds_value()) {
            if field.name.is_empty() {
                continue;
            }
            let value = match (&field.default_value, &field.kind) {
                (Some(default), _) => default.clone(),
                (None, Some(kind)) if kind.is_boolean() => Value::Bool(false),
                _ => Value::String(String::new()),
            };
            values.0.insert(field.name.clone(), value);
        }
        values
    }

    /// Defaults overlaid with a fetched record. Record keys without a field are kept.
    pub fn from_record(record: &Value, fields: &[FieldDescriptor]) -> Self {
        let mut values = Self::defaults(fields);
        if let Some(map) = record.as_object() {
            for (key, value) in map {
                values.0.insert(key.clone(), value.clone());
            }
        }
        values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Checkbox semantics follow descriptor flags: `true`, non-zero numbers and
    /// `"true"`/`"1"`/`"yes"`/`"on"` count as checked.
    pub fn is_checked(&self, name: &str) -> bool {
        self.0.get(name).and_then(loose_bool).unwrap_or(false)
    }

    pub fn is_empty(&self, name: &str) -> bool {
        self.0.get(name).is_none_or(Self::value_is_empty)
    }

    pub fn value_is_empty(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(text) => text.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Editing state of one form screen: live values plus the snapshot restored on cancel.
#[derive(Debug, Clone, Default)]
pub struct FormSession {
    values: FormValues,
    snapshot: Option<FormValues>,
}

impl FormSession {
    pub fn new(values: FormValues) -> Self {
        Self {
            values,
            snapshot: None,
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.set(name, value);
    }

    /// Captures the current values so `cancel` can return to them.
    pub fn begin_edit(&mut self) {
        self.snapshot = Some(self.values.clone());
    }

    /// Restores the snapshot. Returns `false` when no edit was in progress.
    pub fn cancel(&mut self) -> bool {
        match self.snapshot.take() {
            Some(snapshot) => {
                self.values = snapshot;
                true
            }
            None => false,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot != &self.values)
    }

    /// Validates the whole form. On success the edit is committed and the
    /// values are returned as one JSON object ready to send.
    pub fn submit(&mut self, ruleset: &Ruleset, locale: Locale) -> Result<Value, ValidationResult> {
        let result = ruleset.evaluate(&self.values, locale);
        if result.is_valid() {
            self.snapshot = None;
            Ok(self.values.to_value())
        } else {
            Err(result)
        }
    }
}
