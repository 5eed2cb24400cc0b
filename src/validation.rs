//! Validation engine.
//!
//! Runs field validators against current values. A form-level pass always
//! re-runs every registered validator, since validators may depend on state
//! outside the field itself.

use crate::error::{Error, Result};
use crate::registry::FieldRegistry;
use crate::types::{Errors, Value, Values};

/// Outcome of validating every registered field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Error per registered field; `None` when the field is valid.
    pub errors_by_field: Vec<(String, Option<String>)>,
    /// Invalid field names in registration order.
    pub invalid_fields: Vec<String>,
}

impl ValidationReport {
    /// Whether every field passed.
    pub fn is_valid(&self) -> bool {
        self.invalid_fields.is_empty()
    }

    /// The field to surface: the first invalid one in registration order.
    pub fn first_invalid(&self) -> Option<&str> {
        self.invalid_fields.first().map(String::as_str)
    }

    /// Errors of the invalid fields only.
    pub fn errors(&self) -> Errors {
        self.errors_by_field
            .iter()
            .filter_map(|(name, error)| error.clone().map(|e| (name.clone(), e)))
            .collect()
    }
}

/// Validate a single value for a registered field.
///
/// Returns [`Error::UnregisteredField`] if `name` was never registered;
/// callers that may race an unmount check the registry first.
pub fn validate_field(
    registry: &FieldRegistry,
    name: &str,
    value: Option<&Value>,
    values: &Values,
) -> Result<Option<String>> {
    let field = registry
        .get(name)
        .ok_or_else(|| Error::UnregisteredField(name.to_string()))?;
    Ok((field.validator())(value, values))
}

/// Validate every registered field against `values`.
pub fn validate_form(registry: &FieldRegistry, values: &Values) -> ValidationReport {
    let mut report = ValidationReport::default();

    for field in registry.iter() {
        let error = (field.validator())(values.get(field.name()), values);
        if error.is_some() {
            report.invalid_fields.push(field.name().to_string());
        }
        report.errors_by_field.push((field.name().to_string(), error));
    }

    report
}

/// Stock validators.
pub mod validators {
    use std::rc::Rc;

    use crate::types::{Validator, Value};

    fn is_blank(value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            _ => false,
        }
    }

    /// Rejects undefined, null, blank strings and empty arrays.
    pub fn required(message: impl Into<String>) -> Validator {
        let message = message.into();
        Rc::new(move |value, _| is_blank(value).then(|| message.clone()))
    }

    /// Rejects strings longer than `max` characters.
    pub fn max_length(max: usize, message: impl Into<String>) -> Validator {
        let message = message.into();
        Rc::new(move |value, _| match value {
            Some(Value::String(s)) if s.chars().count() > max => Some(message.clone()),
            _ => None,
        })
    }

    /// Rejects strings that do not match `pattern`.
    ///
    /// Blank values pass; combine with [`required`] to reject them. An invalid
    /// pattern rejects every non-blank value.
    #[cfg(feature = "regex")]
    pub fn pattern(pattern: &str, message: impl Into<String>) -> Validator {
        let compiled = regex::Regex::new(pattern).ok();
        let message = message.into();
        Rc::new(move |value, _| {
            if is_blank(value) {
                return None;
            }
            let matched = match (value, compiled.as_ref()) {
                (Some(Value::String(s)), Some(re)) => re.is_match(s),
                _ => false,
            };
            (!matched).then(|| message.clone())
        })
    }

    /// Runs validators in order and returns the first error.
    pub fn all(validators: Vec<Validator>) -> Validator {
        Rc::new(move |value, values| validators.iter().find_map(|v| v(value, values)))
    }
}
