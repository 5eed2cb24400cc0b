//! Field registry.
//!
//! Holds the initial value and validator of every field registered in a
//! session, in registration order. Entries are never removed while the
//! session is alive: a field that unmounts and mounts again keeps its
//! original initial value.

use std::collections::HashMap;
use std::fmt;

use crate::types::{Validator, Value};

/// A registered field.
#[derive(Clone)]
pub struct Field {
    name: String,
    initial_value: Option<Value>,
    validate: Validator,
}

impl Field {
    /// Create a field entry.
    pub fn new(name: impl Into<String>, initial_value: Option<Value>, validate: Validator) -> Self {
        Self {
            name: name.into(),
            initial_value,
            validate,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value the field was first registered with.
    pub fn initial_value(&self) -> Option<&Value> {
        self.initial_value.as_ref()
    }

    /// The field's validator.
    pub fn validator(&self) -> &Validator {
        &self.validate
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("initial_value", &self.initial_value)
            .finish_non_exhaustive()
    }
}

/// Registered fields of one session.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    first_registered: Option<String>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field.
    ///
    /// Returns `false` if a field with this name is already registered, in
    /// which case the first registration is kept untouched.
    pub fn register(
        &mut self,
        name: &str,
        initial_value: Option<Value>,
        validate: Validator,
    ) -> bool {
        if self.first_registered.is_none() {
            self.first_registered = Some(name.to_string());
        }

        if self.index.contains_key(name) {
            return false;
        }

        self.index.insert(name.to_string(), self.fields.len());
        self.fields.push(Field::new(name, initial_value, validate));
        true
    }

    /// Unregistering a field does nothing.
    ///
    /// Fields may unmount and remount during a single render pass; keeping
    /// the entry preserves the original initial value.
    pub fn unregister(&mut self, _name: &str) {}

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|&idx| &self.fields[idx])
    }

    /// Whether a field is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The first field ever registered.
    pub fn first_registered(&self) -> Option<&str> {
        self.first_registered.as_deref()
    }

    /// Registered fields in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Registered field names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
