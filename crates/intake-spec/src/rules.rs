use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::{
    evaluate::{FieldOutcome, FieldReport, ValidationResult},
    locale::{Locale, LocalePair},
    spec::field::{FieldDescriptor, FieldType},
    template::{DefaultMessages, resolve_message},
    values::FormValues,
};

/// Field name that always carries an email-format check.
pub const EMAIL_FIELD: &str = "email";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Type-level rule a field starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseRule {
    String,
    Date,
    Untyped,
}

impl BaseRule {
    pub fn for_kind(kind: Option<&FieldType>) -> Self {
        match kind {
            Some(FieldType::Text | FieldType::Select) => BaseRule::String,
            Some(FieldType::Date) => BaseRule::Date,
            _ => BaseRule::Untyped,
        }
    }
}

/// A compiled regular expression that remembers its source.
///
/// Sources are written for browser engines, so lookaround and backreferences
/// are supported and the `\d`/`\w` shorthands only match ASCII.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: fancy_regex::Regex,
}

impl Pattern {
    /// Compiles `source`; blank or invalid sources mean "no pattern".
    pub fn compile(source: &str) -> Option<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return None;
        }
        match fancy_regex::Regex::new(&ascii_shorthands(trimmed)) {
            Ok(regex) => Some(Self {
                source: trimmed.to_string(),
                regex,
            }),
            Err(err) => {
                warn!(pattern = trimmed, error = %err, "dropping unparseable pattern");
                None
            }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// A value the engine gives up on (backtrack limit) does not match.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text).unwrap_or_else(|err| {
            warn!(pattern = %self.source, error = %err, "pattern evaluation aborted");
            false
        })
    }
}

/// Rewrites `\d`, `\D`, `\w` and `\W` to ASCII classes.
fn ascii_shorthands(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    let mut in_class = false;
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push(ch);
                    break;
                };
                match (next, in_class) {
                    ('d', false) => out.push_str("[0-9]"),
                    ('w', false) => out.push_str("[A-Za-z0-9_]"),
                    ('d', true) => out.push_str("0-9"),
                    ('w', true) => out.push_str("A-Za-z0-9_"),
                    ('D', _) => out.push_str("[^0-9]"),
                    ('W', _) => out.push_str("[^A-Za-z0-9_]"),
                    _ => {
                        out.push(ch);
                        out.push(next);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(ch);
            }
            ']' if in_class => {
                in_class = false;
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Validation logic for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRule {
    pub name: String,
    pub label: LocalePair<String>,
    pub base: BaseRule,
    pub required: bool,
    /// Only populated for `text` fields.
    pub pattern: LocalePair<Option<Pattern>>,
    pub pattern_message: LocalePair<String>,
    pub email: bool,
    /// Gating checkbox; when checked the field is exempt from every check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    pub required_message: LocalePair<String>,
}

impl FieldRule {
    pub fn from_descriptor(field: &FieldDescriptor) -> Self {
        let pattern = if field.is_kind(&FieldType::Text) {
            field.matches().map(|source| Pattern::compile(source))
        } else {
            LocalePair::default()
        };

        Self {
            name: field.name.clone(),
            label: field.label(),
            base: BaseRule::for_kind(field.kind.as_ref()),
            required: field.required,
            pattern,
            pattern_message: field.matches_message(),
            email: field.name == EMAIL_FIELD,
            gate: field.checkbox_name.clone(),
            required_message: field.required_message(),
        }
    }

    /// True when the gating checkbox is checked.
    pub fn is_exempt(&self, values: &FormValues) -> bool {
        self.gate
            .as_deref()
            .is_some_and(|checkbox| values.is_checked(checkbox))
    }

    pub fn is_required(&self, values: &FormValues) -> bool {
        self.required && !self.is_exempt(values)
    }

    pub fn evaluate(
        &self,
        values: &FormValues,
        locale: Locale,
        defaults: &DefaultMessages,
    ) -> FieldOutcome {
        if self.is_exempt(values) {
            return FieldOutcome::Valid;
        }

        let value = match values.get(&self.name) {
            Some(value) if !FormValues::value_is_empty(value) => value,
            _ => {
                return if self.required {
                    FieldOutcome::Missing(self.message(
                        &self.required_message,
                        &defaults.required,
                        locale,
                    ))
                } else {
                    FieldOutcome::Valid
                };
            }
        };

        if self.base == BaseRule::Date && !is_date(value) {
            return FieldOutcome::Mismatch(self.message(
                &LocalePair::default(),
                &defaults.date,
                locale,
            ));
        }

        let text = value_text(value);

        if let Some(pattern) = self.pattern.get(locale)
            && !pattern.is_match(&text)
        {
            return FieldOutcome::Mismatch(self.message(
                &self.pattern_message,
                &defaults.pattern,
                locale,
            ));
        }

        if self.email && !EMAIL_PATTERN.is_match(&text) {
            return FieldOutcome::Mismatch(self.message(
                &self.pattern_message,
                &defaults.email,
                locale,
            ));
        }

        FieldOutcome::Valid
    }

    fn message(
        &self,
        own: &LocalePair<String>,
        fallback: &LocalePair<String>,
        locale: Locale,
    ) -> String {
        let label = self.label.text(locale).unwrap_or(&self.name);
        resolve_message(own, fallback, locale, &self.name, label)
    }
}

/// Ordered validation rules keyed by field name.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Ruleset {
    rules: Vec<FieldRule>,
    #[serde(skip)]
    messages: DefaultMessages,
}

impl Ruleset {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self {
            rules,
            messages: DefaultMessages::default(),
        }
    }

    pub fn with_messages(mut self, messages: DefaultMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule against `values` in a single locale.
    pub fn evaluate(&self, values: &FormValues, locale: Locale) -> ValidationResult {
        let fields = self
            .rules
            .iter()
            .map(|rule| FieldReport {
                name: rule.name.clone(),
                outcome: rule.evaluate(values, locale, &self.messages),
            })
            .collect();
        ValidationResult { locale, fields }
    }

    /// Whether `name` is currently required, taking its gating checkbox into account.
    pub fn effective_required(&self, name: &str, values: &FormValues) -> bool {
        self.rule(name)
            .is_some_and(|rule| rule.is_required(values))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_date(value: &Value) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(record: Value) -> FieldRule {
        FieldRule::from_descriptor(&FieldDescriptor::from_value(&record))
    }

    #[test]
    fn invalid_pattern_source_is_ignored() {
        let rule = rule(json!({ "name": "code", "type": "text", "matches": "([" }));
        assert_eq!(rule.pattern, LocalePair::default());
    }

    fn check(pattern: &str, value: &str) -> FieldOutcome {
        let rule = rule(json!({
            "name": "code",
            "type": "text",
            "label": "Code",
            "matches": pattern
        }));
        let mut values = FormValues::new();
        values.set("code", value);
        rule.evaluate(&values, Locale::Primary, &DefaultMessages::default())
    }

    #[test]
    fn lookahead_patterns_are_enforced() {
        let pattern = "^(?=.*[0-9]).{8,}$";
        let pin = rule(json!({ "name": "pin", "type": "text", "matches": pattern }));
        assert!(pin.pattern.primary.is_some());
        assert_eq!(
            check(pattern, "abcdefgh"),
            FieldOutcome::Mismatch("Code no tiene un formato válido".into())
        );
        assert!(check(pattern, "abcdefg1").is_valid());
    }

    #[test]
    fn backreferences_are_supported() {
        assert!(check(r"^(\w)\1$", "aa").is_valid());
        assert!(!check(r"^(\w)\1$", "ab").is_valid());
    }

    #[test]
    fn word_and_digit_shorthands_are_ascii_only() {
        assert!(!check(r"^\w+$", "José").is_valid());
        assert!(check(r"^\w+$", "Jose_1").is_valid());
        assert!(!check(r"^\d+$", "١٢٣").is_valid());
        assert!(check(r"^[\d-]+$", "555-1234").is_valid());
        assert!(check(r"^\W$", "é").is_valid());
    }

    #[test]
    fn shorthand_rewrite_keeps_other_escapes() {
        assert_eq!(ascii_shorthands(r"^\d{3}\.\s[\w.]$"), r"^[0-9]{3}\.\s[A-Za-z0-9_.]$");
        assert_eq!(ascii_shorthands(r"\\d"), r"\\d");
    }

    #[test]
    fn patterns_only_attach_to_text_fields() {
        let rule = rule(json!({ "name": "kind", "type": "select", "matches": "^a$" }));
        assert!(rule.pattern.primary.is_none());
        assert_eq!(rule.base, BaseRule::String);
    }

    #[test]
    fn date_rule_rejects_garbage() {
        let rule = rule(json!({ "name": "dob", "type": "date", "label": "Nacimiento" }));
        let mut values = FormValues::new();
        values.set("dob", "1990-02-30");
        assert_eq!(
            rule.evaluate(&values, Locale::Primary, &DefaultMessages::default()),
            FieldOutcome::Mismatch("Nacimiento debe ser una fecha válida".into())
        );
        values.set("dob", "1990-02-28");
        assert!(
            rule.evaluate(&values, Locale::Primary, &DefaultMessages::default())
                .is_valid()
        );
    }

    #[test]
    fn email_check_applies_by_name_without_pattern() {
        let rule = rule(json!({
            "name": "email",
            "type": "text",
            "matchesMessage": "correo inválido",
            "matchesMessageAlt": "invalid email"
        }));
        let mut values = FormValues::new();
        values.set("email", "not-an-email");
        assert_eq!(
            rule.evaluate(&values, Locale::Alternate, &DefaultMessages::default()),
            FieldOutcome::Mismatch("invalid email".into())
        );
    }

    #[test]
    fn optional_empty_fields_skip_format_checks() {
        let rule = rule(json!({ "name": "zip", "type": "text", "matches": "^[0-9]{5}$" }));
        let values = FormValues::new();
        assert!(
            rule.evaluate(&values, Locale::Primary, &DefaultMessages::default())
                .is_valid()
        );
    }
}
