//! Field validators run on a form block's values before submission.
//!
//! A failing form never reaches the resource client: every failing field
//! is reported back so the view can show it inline.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validation rule for one form field.
///
/// # Examples
///
/// ```
/// use manual_tasks::validation::{validate_values, FieldRule};
/// use serde_json::{json, Map};
///
/// let rules = vec![FieldRule::required("comment")];
/// let values = Map::new();
/// let errors = validate_values(&rules, &values).unwrap_err();
/// assert_eq!(errors[0].field, "comment");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Field name inside the form values.
    pub name: String,

    /// Whether the field must hold a non-empty value.
    #[serde(default)]
    pub required: bool,

    /// Regular expression string values must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Message reported instead of the default one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FieldRule {
    /// A rule requiring a non-empty value.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            pattern: None,
            message: None,
        }
    }

    /// A rule requiring string values to match `pattern`.
    pub fn pattern(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            pattern: Some(pattern.into()),
            message: None,
        }
    }

    /// Overrides the reported message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn check(&self, values: &Map<String, Value>) -> Option<FieldError> {
        let value = values.get(&self.name);

        if is_empty(value) {
            return self.required.then(|| self.error(Rule::Required, "is required"));
        }

        let (Some(pattern), Some(Value::String(text))) = (&self.pattern, value) else {
            return None;
        };
        match Regex::new(pattern) {
            Ok(re) if re.is_match(text) => None,
            Ok(_) => Some(self.error(Rule::Pattern, "has an invalid format")),
            Err(e) => {
                tracing::warn!(field = %self.name, pattern = %pattern, error = %e, "invalid validation pattern");
                Some(self.error(Rule::Pattern, "cannot be validated"))
            },
        }
    }

    fn error(&self, rule: Rule, default_message: &str) -> FieldError {
        FieldError {
            field: self.name.clone(),
            rule,
            message: self
                .message
                .clone()
                .unwrap_or_else(|| format!("{} {default_message}", self.name)),
        }
    }
}

fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Which rule a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The field was missing or empty.
    Required,
    /// The field did not match its pattern.
    Pattern,
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name.
    pub field: String,
    /// Failed rule.
    pub rule: Rule,
    /// Message for the view.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Runs every rule and collects all failures.
pub fn validate_values(rules: &[FieldRule], values: &Map<String, Value>) -> Result<(), Vec<FieldError>> {
    let errors: Vec<FieldError> = rules.iter().filter_map(|rule| rule.check(values)).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
