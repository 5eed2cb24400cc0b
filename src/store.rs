//! The keyed store behind form sessions.
//!
//! A [`FormStore`] persists per-session, per-field values, errors and
//! metadata. Sessions only talk to it through the commands and queries of
//! this trait. Implementations use interior mutability: a store is shared
//! between all sessions of a controller and is only ever touched from one
//! thread.
//!
//! [`MemoryStore`] is an in-process implementation that also keeps a
//! journal of every command it received.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::types::{Errors, Value, Values};

// ============================================================================
// Store interface
// ============================================================================

/// Command and query interface of the form store.
pub trait FormStore {
    /// Create state for a new session.
    fn initialize_form(&self, id: &str, initial_values: &Values);

    /// Remove all state of a session.
    fn destroy_form(&self, id: &str);

    /// Write one field's value and validation error.
    fn set_field(&self, id: &str, field: &str, value: Option<Value>, error: Option<String>);

    /// Reset one field's value to undefined with the given error.
    fn clear_field(&self, id: &str, field: &str, error: Option<String>);

    /// Mark a field as the surfaced invalid field.
    fn indicate_invalid_field(&self, id: &str, field: &str);

    /// Toggle whether prior submission-time errors are suppressed.
    fn set_form_validation_passed(&self, id: &str, passed: bool);

    /// Clear the surfaced invalid field and make the form untouched.
    fn reset_form_invalid_indication(&self, id: &str);

    /// Request UI focus on a field.
    fn focus_field(&self, id: &str, field: &str);

    /// Request UI scroll to a field.
    fn scroll_to_field(&self, id: &str, field: &str);

    /// Record that a field received focus.
    fn field_focused(&self, id: &str, field: &str);

    /// Record that a field lost focus.
    fn field_visited(&self, id: &str, field: &str);

    /// Current value of one field.
    fn value(&self, id: &str, field: &str) -> Option<Value>;

    /// Current values of all fields.
    fn values(&self, id: &str) -> Values;

    /// Current error of one field.
    fn error(&self, id: &str, field: &str) -> Option<String>;

    /// Current errors of all fields.
    fn errors(&self, id: &str) -> Errors;

    /// Whether all fields of the session have reported initialization.
    fn is_initialized(&self, id: &str) -> bool;

    /// Whether the field has been visited (focused and left).
    fn is_visited(&self, id: &str, field: &str) -> bool;

    /// The most recently focused field.
    fn latest_focused_field(&self, id: &str) -> Option<String>;
}

// ============================================================================
// Memory store
// ============================================================================

bitflags::bitflags! {
    /// Per-field status flags kept by [`MemoryStore`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FieldFlags: u32 {
        /// Field has been focused and left.
        const VISITED = 0x0001;
        /// Field currently holds UI focus.
        const FOCUSED = 0x0002;
        /// Field is the surfaced invalid field.
        const INDICATED = 0x0004;
        /// Field was the target of the latest scroll request.
        const SCROLLED = 0x0008;
    }
}

/// A command received by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// `initialize_form`
    InitializeForm(String),
    /// `destroy_form`
    DestroyForm(String),
    /// `set_field`
    SetField {
        /// Session id.
        id: String,
        /// Field name.
        field: String,
        /// New value.
        value: Option<Value>,
        /// New error.
        error: Option<String>,
    },
    /// `clear_field`
    ClearField {
        /// Session id.
        id: String,
        /// Field name.
        field: String,
        /// New error.
        error: Option<String>,
    },
    /// `indicate_invalid_field`
    IndicateInvalidField(String, String),
    /// `set_form_validation_passed`
    SetFormValidationPassed(String, bool),
    /// `reset_form_invalid_indication`
    ResetFormInvalidIndication(String),
    /// `focus_field`
    FocusField(String, String),
    /// `scroll_to_field`
    ScrollToField(String, String),
}

/// State of one session inside [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct FormState {
    /// Field values.
    pub values: Values,
    /// Field errors.
    pub errors: Errors,
    /// Field status flags.
    pub flags: HashMap<String, FieldFlags>,
    /// The surfaced invalid field.
    pub invalid_indication: Option<String>,
    /// Whether the last validation passed.
    pub validation_passed: bool,
    /// Whether all fields have reported initialization.
    pub initialized: bool,
    /// The most recently focused field.
    pub latest_focused_field: Option<String>,
}

impl FormState {
    fn flags_mut(&mut self, field: &str) -> &mut FieldFlags {
        self.flags.entry(field.to_string()).or_default()
    }

    fn clear_flag(&mut self, flag: FieldFlags) {
        for flags in self.flags.values_mut() {
            flags.remove(flag);
        }
    }
}

/// An in-process [`FormStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    forms: RefCell<HashMap<String, FormState>>,
    journal: RefCell<Vec<StoreCommand>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether state exists for a session.
    pub fn contains(&self, id: &str) -> bool {
        self.forms.borrow().contains_key(id)
    }

    /// Snapshot of a session's state.
    pub fn state(&self, id: &str) -> Option<FormState> {
        self.forms.borrow().get(id).cloned()
    }

    /// Status flags of one field.
    pub fn flags(&self, id: &str, field: &str) -> FieldFlags {
        self.forms
            .borrow()
            .get(id)
            .and_then(|form| form.flags.get(field).copied())
            .unwrap_or_default()
    }

    /// Mark a session as initialized (all fields mounted).
    pub fn mark_initialized(&self, id: &str) {
        self.with_form(id, |form| form.initialized = true);
    }

    /// Commands received so far, oldest first.
    pub fn journal(&self) -> Vec<StoreCommand> {
        self.journal.borrow().clone()
    }

    /// Number of commands received so far.
    pub fn journal_len(&self) -> usize {
        self.journal.borrow().len()
    }

    /// Forget all recorded commands.
    pub fn clear_journal(&self) {
        self.journal.borrow_mut().clear();
    }

    fn record(&self, command: StoreCommand) {
        self.journal.borrow_mut().push(command);
    }

    fn with_form<R>(&self, id: &str, f: impl FnOnce(&mut FormState) -> R) -> Option<R> {
        let mut forms = self.forms.borrow_mut();
        match forms.get_mut(id) {
            Some(form) => Some(f(form)),
            None => {
                tracing::warn!(form = %id, "store command for an unknown form");
                None
            }
        }
    }

    fn read<R>(&self, id: &str, f: impl FnOnce(&FormState) -> R) -> Option<R> {
        self.forms.borrow().get(id).map(f)
    }
}

impl FormStore for MemoryStore {
    fn initialize_form(&self, id: &str, initial_values: &Values) {
        self.record(StoreCommand::InitializeForm(id.to_string()));
        let state = FormState {
            values: initial_values.clone(),
            ..FormState::default()
        };
        self.forms.borrow_mut().insert(id.to_string(), state);
    }

    fn destroy_form(&self, id: &str) {
        self.record(StoreCommand::DestroyForm(id.to_string()));
        self.forms.borrow_mut().remove(id);
    }

    fn set_field(&self, id: &str, field: &str, value: Option<Value>, error: Option<String>) {
        self.record(StoreCommand::SetField {
            id: id.to_string(),
            field: field.to_string(),
            value: value.clone(),
            error: error.clone(),
        });
        self.with_form(id, |form| {
            match value {
                Some(value) => form.values.insert(field.to_string(), value),
                None => form.values.remove(field),
            };
            match error {
                Some(error) => form.errors.insert(field.to_string(), error),
                None => form.errors.remove(field),
            };
        });
    }

    fn clear_field(&self, id: &str, field: &str, error: Option<String>) {
        self.record(StoreCommand::ClearField {
            id: id.to_string(),
            field: field.to_string(),
            error: error.clone(),
        });
        self.with_form(id, |form| {
            form.values.remove(field);
            match error {
                Some(error) => form.errors.insert(field.to_string(), error),
                None => form.errors.remove(field),
            };
        });
    }

    fn indicate_invalid_field(&self, id: &str, field: &str) {
        self.record(StoreCommand::IndicateInvalidField(
            id.to_string(),
            field.to_string(),
        ));
        self.with_form(id, |form| {
            form.clear_flag(FieldFlags::INDICATED);
            form.flags_mut(field).insert(FieldFlags::INDICATED);
            form.invalid_indication = Some(field.to_string());
        });
    }

    fn set_form_validation_passed(&self, id: &str, passed: bool) {
        self.record(StoreCommand::SetFormValidationPassed(id.to_string(), passed));
        self.with_form(id, |form| form.validation_passed = passed);
    }

    fn reset_form_invalid_indication(&self, id: &str) {
        self.record(StoreCommand::ResetFormInvalidIndication(id.to_string()));
        self.with_form(id, |form| {
            form.clear_flag(FieldFlags::INDICATED | FieldFlags::VISITED);
            form.invalid_indication = None;
        });
    }

    fn focus_field(&self, id: &str, field: &str) {
        self.record(StoreCommand::FocusField(id.to_string(), field.to_string()));
    }

    fn scroll_to_field(&self, id: &str, field: &str) {
        self.record(StoreCommand::ScrollToField(id.to_string(), field.to_string()));
        self.with_form(id, |form| {
            form.clear_flag(FieldFlags::SCROLLED);
            form.flags_mut(field).insert(FieldFlags::SCROLLED);
        });
    }

    fn field_focused(&self, id: &str, field: &str) {
        self.with_form(id, |form| {
            form.clear_flag(FieldFlags::FOCUSED);
            form.flags_mut(field).insert(FieldFlags::FOCUSED);
            form.latest_focused_field = Some(field.to_string());
        });
    }

    fn field_visited(&self, id: &str, field: &str) {
        self.with_form(id, |form| {
            let flags = form.flags_mut(field);
            flags.remove(FieldFlags::FOCUSED);
            flags.insert(FieldFlags::VISITED);
        });
    }

    fn value(&self, id: &str, field: &str) -> Option<Value> {
        self.read(id, |form| form.values.get(field).cloned()).flatten()
    }

    fn values(&self, id: &str) -> Values {
        self.read(id, |form| form.values.clone()).unwrap_or_default()
    }

    fn error(&self, id: &str, field: &str) -> Option<String> {
        self.read(id, |form| form.errors.get(field).cloned()).flatten()
    }

    fn errors(&self, id: &str) -> Errors {
        self.read(id, |form| form.errors.clone()).unwrap_or_default()
    }

    fn is_initialized(&self, id: &str) -> bool {
        self.read(id, |form| form.initialized).unwrap_or(false)
    }

    fn is_visited(&self, id: &str, field: &str) -> bool {
        self.flags(id, field).contains(FieldFlags::VISITED)
    }

    fn latest_focused_field(&self, id: &str) -> Option<String> {
        self.read(id, |form| form.latest_focused_field.clone()).flatten()
    }
}
