use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Active language for one evaluation or render pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Primary,
    Alternate,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Primary => "primary",
            Locale::Alternate => "alternate",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "primary" | "default" | "es" | "pt" => Ok(Locale::Primary),
            "alternate" | "alt" | "en" => Ok(Locale::Alternate),
            _ => Err(format!("unknown locale '{}'", value)),
        }
    }
}

/// Two parallel values, one per locale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct LocalePair<T> {
    pub primary: T,
    pub alternate: T,
}

impl<T> LocalePair<T> {
    pub fn new(primary: T, alternate: T) -> Self {
        Self { primary, alternate }
    }

    pub fn get(&self, locale: Locale) -> &T {
        match locale {
            Locale::Primary => &self.primary,
            Locale::Alternate => &self.alternate,
        }
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> LocalePair<U> {
        LocalePair {
            primary: f(&self.primary),
            alternate: f(&self.alternate),
        }
    }
}

impl LocalePair<String> {
    /// Returns the locale's text when it is not blank. Never borrows from the other locale.
    pub fn text(&self, locale: Locale) -> Option<&str> {
        let text = self.get(locale).trim();
        if text.is_empty() { None } else { Some(text) }
    }

    pub fn is_blank(&self) -> bool {
        self.primary.trim().is_empty() && self.alternate.trim().is_empty()
    }
}

impl From<(&str, &str)> for LocalePair<String> {
    fn from((primary, alternate): (&str, &str)) -> Self {
        Self::new(primary.to_string(), alternate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_aliases() {
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::Alternate));
        assert_eq!("primary".parse::<Locale>(), Ok(Locale::Primary));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn text_does_not_fall_back_across_locales() {
        let pair = LocalePair::from(("obligatorio", " "));
        assert_eq!(pair.text(Locale::Primary), Some("obligatorio"));
        assert_eq!(pair.text(Locale::Alternate), None);
    }
}
