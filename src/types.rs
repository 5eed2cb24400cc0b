//! Core types used throughout the form session controller.
//!
//! Values are dynamically typed JSON values. An undefined value is modelled as
//! absence: stores hold no entry for it and lookups return `None`.

use std::collections::BTreeMap;
use std::rc::Rc;

pub use serde_json::Value;

/// Current field values of a session, keyed by field name.
pub type Values = BTreeMap<String, Value>;

/// Current field errors of a session, keyed by field name.
pub type Errors = BTreeMap<String, String>;

/// Payload handed to a submit action.
pub type FormData = serde_json::Map<String, Value>;

/// Field validator.
///
/// Called with the candidate value and all current values of the session.
/// Returns an error message if the value is invalid.
pub type Validator = Rc<dyn Fn(Option<&Value>, &Values) -> Option<String>>;

/// Build a [`Validator`] from a closure.
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(Option<&Value>, &Values) -> Option<String> + 'static,
{
    Rc::new(f)
}

/// A validator that accepts every value.
pub fn no_validation() -> Validator {
    Rc::new(|_, _| None)
}

/// Properties of a form session as supplied by its host.
///
/// A snapshot of these is passed to the error, submitted and abandoned
/// callbacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormProps {
    /// Session id.
    pub id: String,
    /// Initial field values supplied at creation.
    pub initial_values: Values,
    /// Externally managed "submitting" flag.
    pub submitting: bool,
    /// Free-form host attributes, passed through to callbacks untouched.
    pub attributes: serde_json::Map<String, Value>,
}

impl FormProps {
    /// Create props for a session with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Set the initial field values.
    pub fn with_initial_values(mut self, values: Values) -> Self {
        self.initial_values = values;
        self
    }

    /// Set the externally managed "submitting" flag.
    pub fn with_submitting(mut self, submitting: bool) -> Self {
        self.submitting = submitting;
        self
    }

    /// Add a host attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// An event-like object delivered with a submit request.
pub trait SubmitEvent {
    /// Suppress the event's default behavior.
    fn prevent_default(&mut self);
}

/// A plain submit event that records whether its default was prevented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormEvent {
    default_prevented: bool,
}

impl FormEvent {
    /// Create a new event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `prevent_default` was called.
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl SubmitEvent for FormEvent {
    fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}
