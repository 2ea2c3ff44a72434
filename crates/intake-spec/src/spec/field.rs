use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::locale::{Locale, LocalePair};

/// Declared input kind of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Select,
    /// Boolean input that may gate other fields through `checkboxName`.
    Checkbox,
    /// Section sub-heading; never holds a value.
    Placeholder,
    /// Umbrella label over boolean fields that name it as `parent`.
    Checkmenu,
    Other(String),
}

impl FieldType {
    /// Parses a type tag. Blank tags mean "no type".
    pub fn parse(tag: &str) -> Option<Self> {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return None;
        }
        let kind = match trimmed.to_lowercase().as_str() {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "checkbox" | "checkbox-gated" => FieldType::Checkbox,
            "placeholder" => FieldType::Placeholder,
            "checkmenu" => FieldType::Checkmenu,
            _ => FieldType::Other(trimmed.to_string()),
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Checkbox => "checkbox",
            FieldType::Placeholder => "placeholder",
            FieldType::Checkmenu => "checkmenu",
            FieldType::Other(tag) => tag,
        }
    }

    /// Whether the kind stores a value in the form.
    pub fn holds_value(&self) -> bool {
        !matches!(self, FieldType::Placeholder | FieldType::Checkmenu)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, FieldType::Boolean | FieldType::Checkbox)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One server-supplied form field record.
///
/// Records are decoded loosely: missing attributes and attributes of an
/// unexpected JSON type fall back to empty strings or `false`, except
/// `enabled`, which is only `false` when the record says so.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub kind: Option<FieldType>,
    pub required: bool,
    pub enabled: bool,
    pub label: String,
    pub label_alt: String,
    /// Comma separated choices for `select` fields.
    pub options: String,
    pub options_alt: String,
    pub matches: String,
    pub matches_alt: String,
    pub matches_message: String,
    pub matches_message_alt: String,
    pub required_message: String,
    pub required_message_alt: String,
    pub group: String,
    pub group_alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkbox_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl Default for FieldDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: None,
            required: false,
            enabled: true,
            label: String::new(),
            label_alt: String::new(),
            options: String::new(),
            options_alt: String::new(),
            matches: String::new(),
            matches_alt: String::new(),
            matches_message: String::new(),
            matches_message_alt: String::new(),
            required_message: String::new(),
            required_message_alt: String::new(),
            group: String::new(),
            group_alt: String::new(),
            checkbox_name: None,
            parent: None,
            default_value: None,
        }
    }
}

impl FieldDescriptor {
    /// Decodes a raw record. Never fails; non-object records yield the defaults.
    pub fn from_value(value: &Value) -> Self {
        let Some(record) = value.as_object() else {
            return Self::default();
        };

        Self {
            name: read_string(record, &["name"]).trim().to_string(),
            kind: FieldType::parse(&read_string(record, &["type"])),
            required: read_bool(record, &["required"]).unwrap_or(false),
            enabled: read_bool(record, &["enabled"]).unwrap_or(true),
            label: read_string(record, &["label"]),
            label_alt: read_string(record, &alternate_keys("label")),
            options: read_string(record, &["options"]),
            options_alt: read_string(record, &alternate_keys("options")),
            matches: read_string(record, &["matches"]),
            matches_alt: read_string(record, &alternate_keys("matches")),
            matches_message: read_string(record, &["matchesMessage"]),
            matches_message_alt: read_string(record, &alternate_keys("matchesMessage")),
            required_message: read_string(record, &["requiredMessage"]),
            required_message_alt: read_string(record, &alternate_keys("requiredMessage")),
            group: read_string(record, &["group"]),
            group_alt: read_string(record, &alternate_keys("group")),
            checkbox_name: read_reference(record, "checkboxName"),
            parent: read_reference(record, "parent"),
            default_value: record
                .get("defaultValue")
                .filter(|value| !value.is_null())
                .cloned(),
        }
    }

    pub fn label(&self) -> LocalePair<String> {
        LocalePair::new(self.label.clone(), self.label_alt.clone())
    }

    /// Label in the given locale, or the field name when that locale has none.
    pub fn label_in(&self, locale: Locale) -> &str {
        let label = match locale {
            Locale::Primary => &self.label,
            Locale::Alternate => &self.label_alt,
        };
        if label.trim().is_empty() {
            &self.name
        } else {
            label
        }
    }

    pub fn matches(&self) -> LocalePair<String> {
        LocalePair::new(self.matches.clone(), self.matches_alt.clone())
    }

    pub fn matches_message(&self) -> LocalePair<String> {
        LocalePair::new(
            self.matches_message.clone(),
            self.matches_message_alt.clone(),
        )
    }

    pub fn required_message(&self) -> LocalePair<String> {
        LocalePair::new(
            self.required_message.clone(),
            self.required_message_alt.clone(),
        )
    }

    pub fn group(&self) -> LocalePair<String> {
        LocalePair::new(self.group.clone(), self.group_alt.clone())
    }

    /// Split choices for both locales.
    pub fn option_lists(&self) -> LocalePair<Vec<String>> {
        LocalePair::new(split_options(&self.options), split_options(&self.options_alt))
    }

    pub fn options_in(&self, locale: Locale) -> Vec<String> {
        match locale {
            Locale::Primary => split_options(&self.options),
            Locale::Alternate => split_options(&self.options_alt),
        }
    }

    /// True when the two locales declare a different number of choices.
    pub fn options_mismatch(&self) -> bool {
        let lists = self.option_lists();
        lists.primary.len() != lists.alternate.len()
    }

    /// True when either locale carries a pattern source.
    pub fn has_pattern(&self) -> bool {
        !self.matches().is_blank()
    }

    pub fn holds_value(&self) -> bool {
        self.kind.as_ref().is_none_or(FieldType::holds_value)
    }

    pub fn is_kind(&self, kind: &FieldType) -> bool {
        self.kind.as_ref() == Some(kind)
    }
}

impl<'de> Deserialize<'de> for FieldDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldDescriptor::from_value(&value))
    }
}

fn alternate_keys(base: &str) -> [String; 3] {
    [
        format!("{base}Alt"),
        format!("{base}EN"),
        format!("{base}En"),
    ]
}

fn read_string<K: AsRef<str>>(record: &Map<String, Value>, keys: &[K]) -> String {
    keys.iter()
        .find_map(|key| record.get(key.as_ref()).and_then(loose_string))
        .unwrap_or_default()
}

fn read_bool(record: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .find_map(|key| record.get(*key).and_then(loose_bool))
}

fn read_reference(record: &Map<String, Value>, key: &str) -> Option<String> {
    let reference = read_string(record, &[key]);
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn loose_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Shared truthiness for descriptor flags and checkbox values.
pub(crate) fn loose_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|number| number != 0.0),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn split_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|option| !option.is_empty())
        .map(String::from)
        .collect()
}
