//! Form configuration.
//!
//! Settings come from three places, checked in order:
//!
//! 1. [`SubmitOptions`]: per-call overrides.
//! 2. [`FormOptions`]: per-session configuration.
//! 3. [`GlobalConfig`]: process-wide defaults, passed explicitly to the
//!    [`FormController`](crate::controller::FormController).
//!
//! The first defined value wins; `None` falls through to the next level.

use std::fmt;
use std::rc::Rc;

use crate::types::{FormProps, Value};

/// Whether an error handler dealt with an action error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// The error is swallowed.
    Handled,
    /// The error propagates to the caller.
    NotHandled,
}

/// Error handler for submit action failures.
pub type ErrorHandler = Rc<dyn Fn(&anyhow::Error, &FormProps) -> ErrorDisposition>;

/// Called once a submission has completed successfully.
pub type SubmittedCallback = Rc<dyn Fn(&FormProps)>;

/// Called when a form is abandoned, with the latest focused field and its value.
pub type AbandonedCallback = Rc<dyn Fn(&FormProps, &str, Option<&Value>)>;

/// Return the first defined value of `call`, `session`, `global`.
pub fn resolve<T>(call: Option<T>, session: Option<T>, global: Option<T>) -> Option<T> {
    call.or(session).or(global)
}

/// The error handler used when nothing else is configured.
///
/// Logs the error and reports it handled.
pub fn log_error_handler() -> ErrorHandler {
    Rc::new(|error, props| {
        tracing::error!(form = %props.id, error = %error, "form action failed");
        ErrorDisposition::Handled
    })
}

/// Process-wide defaults.
#[derive(Clone)]
pub struct GlobalConfig {
    /// Trim text values before submission.
    pub trim: Option<bool>,
    /// Surface a field's error as soon as the field is left.
    pub validate_visited_fields: Option<bool>,
    /// Focus the first field on initialization and after reset.
    pub autofocus: Option<bool>,
    /// Fallback error handler.
    pub default_error_handler: ErrorHandler,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            trim: None,
            validate_visited_fields: None,
            autofocus: None,
            default_error_handler: log_error_handler(),
        }
    }
}

impl GlobalConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default trim setting.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Set the default "validate visited fields" setting.
    pub fn validate_visited_fields(mut self, enabled: bool) -> Self {
        self.validate_visited_fields = Some(enabled);
        self
    }

    /// Set the default autofocus setting.
    pub fn autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = Some(autofocus);
        self
    }

    /// Replace the fallback error handler.
    pub fn default_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error, &FormProps) -> ErrorDisposition + 'static,
    {
        self.default_error_handler = Rc::new(handler);
        self
    }
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("trim", &self.trim)
            .field("validate_visited_fields", &self.validate_visited_fields)
            .field("autofocus", &self.autofocus)
            .finish_non_exhaustive()
    }
}

/// Per-session configuration and callbacks.
#[derive(Clone, Default)]
pub struct FormOptions {
    /// Trim text values before submission.
    pub trim: Option<bool>,
    /// Surface a field's error as soon as the field is left.
    pub validate_visited_fields: Option<bool>,
    /// Focus the first field on initialization and after reset.
    pub autofocus: Option<bool>,
    /// Error handler for this session's submit actions.
    pub on_error: Option<ErrorHandler>,
    /// Called after a successful submission.
    pub on_submitted: Option<SubmittedCallback>,
    /// Called when the form is abandoned.
    pub on_abandoned: Option<AbandonedCallback>,
}

impl FormOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trim setting.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Set the "validate visited fields" setting.
    pub fn validate_visited_fields(mut self, enabled: bool) -> Self {
        self.validate_visited_fields = Some(enabled);
        self
    }

    /// Set the autofocus setting.
    pub fn autofocus(mut self, autofocus: bool) -> Self {
        self.autofocus = Some(autofocus);
        self
    }

    /// Set the error handler.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error, &FormProps) -> ErrorDisposition + 'static,
    {
        self.on_error = Some(Rc::new(handler));
        self
    }

    /// Set the submitted callback.
    pub fn on_submitted<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FormProps) + 'static,
    {
        self.on_submitted = Some(Rc::new(callback));
        self
    }

    /// Set the abandoned callback.
    pub fn on_abandoned<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FormProps, &str, Option<&Value>) + 'static,
    {
        self.on_abandoned = Some(Rc::new(callback));
        self
    }
}

impl fmt::Debug for FormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormOptions")
            .field("trim", &self.trim)
            .field("validate_visited_fields", &self.validate_visited_fields)
            .field("autofocus", &self.autofocus)
            .field("on_error", &self.on_error.is_some())
            .field("on_submitted", &self.on_submitted.is_some())
            .field("on_abandoned", &self.on_abandoned.is_some())
            .finish()
    }
}

/// Per-call overrides for a submit handler.
#[derive(Clone, Default)]
pub struct SubmitOptions {
    /// Trim text values before submission.
    pub trim: Option<bool>,
    /// Error handler for this submit handler only.
    pub on_error: Option<ErrorHandler>,
}

impl SubmitOptions {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the trim setting.
    pub fn trim(mut self, trim: bool) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Override the error handler.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&anyhow::Error, &FormProps) -> ErrorDisposition + 'static,
    {
        self.on_error = Some(Rc::new(handler));
        self
    }
}

/// Settings for one session with the global defaults folded in.
#[derive(Clone)]
pub(crate) struct ResolvedConfig {
    pub options: FormOptions,
    pub global: GlobalConfig,
}

impl ResolvedConfig {
    pub fn new(options: FormOptions, global: GlobalConfig) -> Self {
        Self { options, global }
    }

    pub fn trim(&self, call: Option<bool>) -> bool {
        resolve(call, self.options.trim, self.global.trim).unwrap_or(false)
    }

    pub fn validate_visited_fields(&self, call: Option<bool>) -> bool {
        resolve(
            call,
            self.options.validate_visited_fields,
            self.global.validate_visited_fields,
        )
        .unwrap_or(false)
    }

    pub fn autofocus(&self) -> bool {
        resolve(None, self.options.autofocus, self.global.autofocus).unwrap_or(true)
    }

    pub fn error_handler(&self, call: Option<&ErrorHandler>) -> ErrorHandler {
        resolve(
            call.cloned(),
            self.options.on_error.clone(),
            Some(self.global.default_error_handler.clone()),
        )
        .unwrap_or_else(log_error_handler)
    }
}
