//! Structural validation of a resolved [`SabnzbdConfig`].
//!
//! Every field is checked independently and all failures are reported
//! together. Field names are reported as their flag names where those differ
//! from the struct field names.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::SabnzbdConfig;

const API_KEY_PATTERN: &str = r"^[a-zA-Z0-9]{20,32}$";

static API_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(API_KEY_PATTERN).expect("API key pattern is a valid regex"));

/// Field names as shown to users.
const FIELD_NAMES: &[(&str, &str)] = &[("INIConfig", "config"), ("ApiKey", "api-key")];

/// Messages replacing the generic one for a `<field>.<rule>` pair.
const MESSAGES: &[(&str, &str)] = &[(
    "ApiKey.regex",
    "api-key must be a 20-32 character alphanumeric string",
)];

enum Rule {
    Required,
    Url,
    Regex(&'static Regex),
}

impl Rule {
    fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Url => "url",
            Rule::Regex(_) => "regex",
        }
    }

    fn check(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.is_empty(),
            Rule::Url => Url::parse(value).is_ok(),
            Rule::Regex(regex) => regex.is_match(value),
        }
    }

    fn message(&self, field: &str) -> String {
        let key = format!("{}.{}", field, self.name());
        if let Some((_, message)) = MESSAGES.iter().find(|(k, _)| *k == key) {
            return message.to_string();
        }

        let name = translate(field);
        match self {
            Rule::Required => format!("{} is required to not be empty", name),
            Rule::Url => format!("{} must be a valid URL", name),
            Rule::Regex(regex) => format!("{} must match pattern {}", name, regex.as_str()),
        }
    }
}

fn translate(field: &str) -> &str {
    FIELD_NAMES
        .iter()
        .find(|(internal, _)| *internal == field)
        .map_or(field, |(_, external)| external)
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// User-facing field name
    pub field: String,
    /// Name of the rule that failed
    pub rule: &'static str,
    /// Human-readable message
    pub message: String,
}

/// Every validation failure of a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Failure reported for the user-facing field `name`, if any.
    pub fn field(&self, name: &str) -> Option<&FieldError> {
        self.errors.iter().find(|error| error.field == name)
    }

    /// Check `value` against `rules`, recording the first rule that fails.
    fn check(&mut self, field: &str, value: &str, rules: &[Rule]) {
        if let Some(rule) = rules.iter().find(|rule| !rule.check(value)) {
            self.errors.push(FieldError {
                field: translate(field).to_string(),
                rule: rule.name(),
                message: rule.message(field),
            });
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl SabnzbdConfig {
    /// Validate the resolved configuration.
    ///
    /// `url` must be a valid URL and `api_key` a 20-32 character alphanumeric
    /// string. Both are required.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors.check("URL", &self.url, &[Rule::Required, Rule::Url]);
        errors.check(
            "ApiKey",
            &self.api_key,
            &[Rule::Required, Rule::Regex(&API_KEY_REGEX)],
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
