//! Form sessions.
//!
//! A [`FormSession`] is one logical form instance. It owns the field
//! registry, the submission state and the abandonment detector, and issues
//! commands to the shared [`FormStore`]. Field values themselves live only in
//! the store.
//!
//! `FormSession` is a cheap handle: clones refer to the same session. All
//! user callbacks (validators, actions, error handlers, completion callbacks)
//! run with no internal borrow held, so they may call back into the session.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::abandon::{AbandonmentDetector, NavigationHook};
use crate::config::{ErrorDisposition, ErrorHandler, ResolvedConfig, SubmitOptions};
use crate::error::{Error, Result};
use crate::registry::FieldRegistry;
use crate::store::FormStore;
use crate::submit::{SubmitAction, SubmitHandler, SubmitPhase};
use crate::types::{FormData, FormProps, Validator, Value};
use crate::validation::{validate_form, ValidationReport};

pub(crate) struct SessionState {
    props: FormProps,
    config: ResolvedConfig,
    registry: FieldRegistry,
    phase: SubmitPhase,
    submitting: bool,
    submitted: bool,
    destroyed: bool,
    initialized: bool,
    abandonment: AbandonmentDetector,
}

/// Handle to a form session.
#[derive(Clone)]
pub struct FormSession {
    id: Rc<str>,
    state: Rc<RefCell<SessionState>>,
    store: Rc<dyn FormStore>,
}

/// Weak handle used by listeners that must not keep a session alive.
#[derive(Clone)]
pub(crate) struct WeakSession {
    id: Rc<str>,
    state: Weak<RefCell<SessionState>>,
    store: Weak<dyn FormStore>,
}

impl WeakSession {
    pub(crate) fn upgrade(&self) -> Option<FormSession> {
        Some(FormSession {
            id: self.id.clone(),
            state: self.state.upgrade()?,
            store: self.store.upgrade()?,
        })
    }
}

impl FormSession {
    /// Create a session and its store-backed state.
    pub(crate) fn create(
        props: FormProps,
        config: ResolvedConfig,
        store: Rc<dyn FormStore>,
        navigation: Option<&dyn NavigationHook>,
    ) -> Self {
        let id: Rc<str> = props.id.as_str().into();
        store.initialize_form(&id, &props.initial_values);

        let abandonment = match (&config.options.on_abandoned, navigation) {
            (Some(_), Some(_)) => AbandonmentDetector::armed(),
            _ => AbandonmentDetector::inert(),
        };

        let session = Self {
            id,
            state: Rc::new(RefCell::new(SessionState {
                props,
                config,
                registry: FieldRegistry::new(),
                phase: SubmitPhase::Idle,
                submitting: false,
                submitted: false,
                destroyed: false,
                initialized: false,
                abandonment,
            })),
            store,
        };

        if let Some(navigation) = navigation {
            if session.state.borrow().abandonment.is_active() {
                let weak = session.downgrade();
                let subscription = navigation.on_leave(Rc::new(move || {
                    if let Some(session) = weak.upgrade() {
                        session.report_if_abandoned();
                    }
                }));
                session.state.borrow_mut().abandonment.attach(subscription);
            }
        }

        tracing::debug!(form = %session.id, "form session created");
        session
    }

    pub(crate) fn downgrade(&self) -> WeakSession {
        WeakSession {
            id: self.id.clone(),
            state: Rc::downgrade(&self.state),
            store: Rc::downgrade(&self.store),
        }
    }

    /// React to new host props.
    ///
    /// Autofocuses the default field once the store reports every field
    /// initialized, if autofocus is enabled.
    pub(crate) fn props_changed(&self, next: FormProps) {
        let initialized = self.store.is_initialized(&self.id);
        let autofocus = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                tracing::warn!(form = %self.id, "props change after teardown ignored");
                return;
            }
            let became_initialized = !state.initialized && initialized;
            state.initialized = initialized;
            state.props = FormProps {
                id: state.props.id.clone(),
                ..next
            };
            became_initialized && state.config.autofocus()
        };

        if autofocus {
            self.focus(None);
        }
    }

    /// Tear the session down.
    ///
    /// Removes the store-backed state, stops the navigation listener and
    /// reports abandonment if applicable. Idempotent.
    pub(crate) fn destroy(&self) {
        if self.state.borrow().destroyed {
            return;
        }

        // The report reads the field value, so capture it before the store
        // state goes away.
        let report = self.take_abandonment_report();

        {
            let mut state = self.state.borrow_mut();
            state.destroyed = true;
            state.abandonment.stop();
        }
        self.store.destroy_form(&self.id);
        tracing::debug!(form = %self.id, "form session destroyed");

        if let Some(report) = report {
            report.fire();
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current host props.
    pub fn props(&self) -> FormProps {
        self.state.borrow().props.clone()
    }

    /// Effective submitting state: the local flag or the host's flag.
    pub fn is_submitting(&self) -> bool {
        let state = self.state.borrow();
        state.submitting || state.props.submitting
    }

    /// Whether a submission has completed successfully.
    pub fn is_submitted(&self) -> bool {
        self.state.borrow().submitted
    }

    /// Whether the session has been torn down.
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Whether the abandonment callback has fired.
    pub fn is_abandonment_reported(&self) -> bool {
        self.state.borrow().abandonment.is_reported()
    }

    /// Whether a navigation listener is registered.
    pub fn is_listening_for_navigation(&self) -> bool {
        self.state.borrow().abandonment.is_listening()
    }

    /// Current submission phase.
    pub fn phase(&self) -> SubmitPhase {
        self.state.borrow().phase
    }

    /// Registered field names in registration order.
    pub fn fields(&self) -> Vec<String> {
        self.state
            .borrow()
            .registry
            .names()
            .map(str::to_string)
            .collect()
    }

    /// Whether a field is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.state.borrow().registry.contains(name)
    }

    /// Resolved "validate visited fields" setting.
    pub fn should_validate_visited_fields(&self, call: Option<bool>) -> bool {
        self.state.borrow().config.validate_visited_fields(call)
    }

    /// Resolved trim setting.
    pub fn should_trim(&self, call: Option<bool>) -> bool {
        self.state.borrow().config.trim(call)
    }

    // ========================================================================
    // Field registration
    // ========================================================================

    /// Register a field. A second registration of the same name is ignored.
    pub fn register(&self, name: &str, initial_value: Option<Value>, validate: Validator) -> bool {
        let registered = self
            .state
            .borrow_mut()
            .registry
            .register(name, initial_value, validate);
        if registered {
            tracing::debug!(form = %self.id, field = name, "field registered");
        }
        registered
    }

    /// Unregister a field. Registrations are kept; see [`FieldRegistry::unregister`].
    pub fn unregister(&self, name: &str) {
        self.state.borrow_mut().registry.unregister(name);
    }

    fn validator(&self, name: &str) -> Option<Validator> {
        self.state
            .borrow()
            .registry
            .get(name)
            .map(|field| field.validator().clone())
    }

    fn check_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(Error::SessionDestroyed(self.id.to_string()));
        }
        Ok(())
    }

    fn is_alive_or_warn(&self, operation: &str) -> bool {
        if self.is_destroyed() {
            tracing::warn!(form = %self.id, operation, "operation after teardown ignored");
            return false;
        }
        true
    }

    // ========================================================================
    // Field values
    // ========================================================================

    /// Current value of a field.
    pub fn get_field_value(&self, name: &str) -> Option<Value> {
        self.store.value(&self.id, name)
    }

    /// Set a field's value, validating it against the current values.
    pub fn set_field(&self, name: &str, value: Option<Value>) -> Result<()> {
        self.check_alive()?;
        let validate = self
            .validator(name)
            .ok_or_else(|| Error::UnregisteredField(name.to_string()))?;
        let values = self.store.values(&self.id);
        let error = validate(value.as_ref(), &values);
        self.store.set_field(&self.id, name, value, error);
        Ok(())
    }

    /// Reset a field to undefined. Ignored for unregistered fields.
    pub fn clear_field(&self, name: &str) {
        if !self.is_alive_or_warn("clear_field") {
            return;
        }
        let Some(validate) = self.validator(name) else {
            tracing::debug!(form = %self.id, field = name, "clear of unregistered field ignored");
            return;
        };
        let values = self.store.values(&self.id);
        let error = validate(None, &values);
        self.store.clear_field(&self.id, name, error);
    }

    /// The most recently focused field.
    pub fn latest_focused_field(&self) -> Option<String> {
        self.store.latest_focused_field(&self.id)
    }

    // ========================================================================
    // Field events
    // ========================================================================

    /// A field received focus.
    pub fn field_focused(&self, name: &str) {
        if self.is_alive_or_warn("field_focused") {
            self.store.field_focused(&self.id, name);
        }
    }

    /// A field lost focus.
    ///
    /// With "validate visited fields" enabled, a field left in an invalid
    /// state is surfaced right away.
    pub fn field_blurred(&self, name: &str) {
        if !self.is_alive_or_warn("field_blurred") {
            return;
        }
        self.store.field_visited(&self.id, name);

        if self.should_validate_visited_fields(None)
            && self.is_registered(name)
            && self.store.error(&self.id, name).is_some()
        {
            self.store.indicate_invalid_field(&self.id, name);
        }
    }

    /// A field's value changed in the UI. Ignored for unregistered fields.
    pub fn field_changed(&self, name: &str, value: Option<Value>) {
        match self.set_field(name, value) {
            Ok(()) => {}
            Err(Error::UnregisteredField(_)) => {
                tracing::debug!(form = %self.id, field = name, "change of unregistered field ignored");
            }
            Err(err) => {
                tracing::warn!(form = %self.id, field = name, error = %err, "field change ignored");
            }
        }
    }

    // ========================================================================
    // Focus and scroll
    // ========================================================================

    /// Focus a field, or the first registered field when `name` is `None`.
    pub fn focus(&self, name: Option<&str>) {
        let target = match name {
            Some(name) => Some(name.to_string()),
            None => self
                .state
                .borrow()
                .registry
                .first_registered()
                .map(str::to_string),
        };
        if let Some(target) = target {
            self.focus_field(&target);
        }
    }

    /// Request UI focus on a field.
    pub fn focus_field(&self, name: &str) {
        if self.is_alive_or_warn("focus_field") {
            self.store.focus_field(&self.id, name);
        }
    }

    /// Request UI scroll to a field.
    pub fn scroll_to_field(&self, name: &str) {
        if self.is_alive_or_warn("scroll_to_field") {
            self.store.scroll_to_field(&self.id, name);
        }
    }

    /// Clear the surfaced invalid field and make the form untouched again.
    pub fn reset_invalid_indication(&self) {
        if self.is_alive_or_warn("reset_invalid_indication") {
            self.store.reset_form_invalid_indication(&self.id);
        }
    }

    /// Restore every registered field to its initial value.
    pub fn reset(&self) -> Result<()> {
        self.check_alive()?;

        let initial: Vec<(String, Option<Value>)> = {
            let state = self.state.borrow();
            state
                .registry
                .iter()
                .map(|field| {
                    let value = field
                        .initial_value()
                        .or_else(|| state.props.initial_values.get(field.name()))
                        .cloned();
                    (field.name().to_string(), value)
                })
                .collect()
        };

        for (name, value) in initial {
            self.set_field(&name, value)?;
        }

        self.reset_invalid_indication();

        if self.state.borrow().config.autofocus() {
            self.focus(None);
        }
        Ok(())
    }

    // ========================================================================
    // Validation and submission
    // ========================================================================

    /// Re-validate every registered field and surface the first invalid one.
    ///
    /// Errors are written to the store for every field. Prior
    /// submission-time errors stay suppressed unless validation passes.
    pub fn validate(&self) -> ValidationReport {
        let registry = self.state.borrow().registry.clone();
        let values = self.store.values(&self.id);

        if !self.is_alive_or_warn("validate") {
            return validate_form(&registry, &values);
        }

        self.store.set_form_validation_passed(&self.id, false);

        let report = validate_form(&registry, &values);
        for (name, error) in &report.errors_by_field {
            self.store
                .set_field(&self.id, name, values.get(name).cloned(), error.clone());
        }

        if let Some(first) = report.first_invalid() {
            tracing::debug!(
                form = %self.id,
                field = first,
                invalid = report.invalid_fields.len(),
                "form validation failed"
            );
            self.store.indicate_invalid_field(&self.id, first);
            self.scroll_to_field(first);
            self.focus_field(first);
            return report;
        }

        self.store.set_form_validation_passed(&self.id, true);
        report
    }

    /// Collect the submit payload: every registered field's current value.
    ///
    /// Undefined values become `null`. Text is trimmed when trimming
    /// resolves to true.
    pub fn collect_form_data(&self, trim: Option<bool>) -> FormData {
        let trim = self.should_trim(trim);
        let values = self.store.values(&self.id);

        self.state
            .borrow()
            .registry
            .names()
            .map(|name| {
                let value = match values.get(name) {
                    Some(Value::String(s)) if trim => Value::String(s.trim().to_string()),
                    Some(value) => value.clone(),
                    None => Value::Null,
                };
                (name.to_string(), value)
            })
            .collect()
    }

    /// Build a submit handler for `action`.
    pub fn submit(&self, action: Option<SubmitAction>) -> Result<SubmitHandler> {
        self.submit_with(SubmitOptions::default(), None, action)
    }

    /// Build a submit handler with per-call options and a hook that runs
    /// before validation.
    pub fn submit_with(
        &self,
        options: SubmitOptions,
        before_submit: Option<Box<dyn FnMut()>>,
        action: Option<SubmitAction>,
    ) -> Result<SubmitHandler> {
        let action = action.ok_or(Error::MissingAction)?;
        Ok(SubmitHandler::new(self.clone(), options, before_submit, action))
    }

    pub(crate) fn set_phase(&self, phase: SubmitPhase) {
        let mut state = self.state.borrow_mut();
        if !state.destroyed {
            state.phase = phase;
        }
    }

    pub(crate) fn begin_pending(&self) {
        let mut state = self.state.borrow_mut();
        state.submitting = true;
        state.phase = SubmitPhase::Submitting;
    }

    /// Clear the local submitting flag unless the session is gone.
    pub(crate) fn end_pending(&self) {
        let mut state = self.state.borrow_mut();
        if state.destroyed {
            tracing::debug!(form = %self.id, "submission settled after teardown");
            return;
        }
        state.submitting = false;
        state.phase = SubmitPhase::Idle;
    }

    pub(crate) fn handle_error(
        &self,
        error: &anyhow::Error,
        call: Option<&ErrorHandler>,
    ) -> ErrorDisposition {
        let (handler, props) = {
            let state = self.state.borrow();
            (state.config.error_handler(call), state.props.clone())
        };
        handler(error, &props)
    }

    /// Mark the form submitted and notify the host.
    pub(crate) fn form_submitted(&self) {
        let (callback, props) = {
            let mut state = self.state.borrow_mut();
            state.submitted = true;
            state.abandonment.stop();
            (state.config.options.on_submitted.clone(), state.props.clone())
        };
        tracing::debug!(form = %self.id, "form submitted");

        if let Some(callback) = callback {
            callback(&props);
        }
    }

    // ========================================================================
    // Abandonment
    // ========================================================================

    /// Report abandonment if the form qualifies. Fires at most once.
    pub fn report_if_abandoned(&self) {
        if let Some(report) = self.take_abandonment_report() {
            report.fire();
        }
    }

    fn take_abandonment_report(&self) -> Option<AbandonmentReport> {
        let latest = self.store.latest_focused_field(&self.id);
        let mut state = self.state.borrow_mut();
        let submitted = state.submitted;
        let field = state.abandonment.trigger(submitted, latest)?;
        let callback = state.config.options.on_abandoned.clone()?;
        drop(state);

        let value = self.store.value(&self.id, &field);
        tracing::debug!(form = %self.id, field = %field, "form abandoned");
        Some(AbandonmentReport {
            callback,
            props: self.props(),
            field,
            value,
        })
    }
}

struct AbandonmentReport {
    callback: crate::config::AbandonedCallback,
    props: FormProps,
    field: String,
    value: Option<Value>,
}

impl AbandonmentReport {
    fn fire(self) {
        (self.callback)(&self.props, &self.field, self.value.as_ref());
    }
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FormSession")
            .field("id", &self.id)
            .field("fields", &state.registry.len())
            .field("phase", &state.phase)
            .field("submitting", &state.submitting)
            .field("submitted", &state.submitted)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
