//! Submission pipeline.
//!
//! A [`SubmitHandler`] is built once per submit button (or form) and invoked
//! for each submit event:
//!
//! ```text
//! Idle -> Validating -> Invalid              -> Idle
//!                    -> action: Immediate    -> Idle (submitted)
//!                    -> action: Pending      -> Submitting -> Idle on settlement
//! ```
//!
//! Requests that arrive while the form is submitting are dropped, not
//! queued.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::config::{ErrorDisposition, SubmitOptions};
use crate::error::{Error, Result};
use crate::session::FormSession;
use crate::types::{FormData, SubmitEvent};

/// Where a session is in the submission state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPhase {
    /// Waiting for a submit request.
    #[default]
    Idle,
    /// Running form validation.
    Validating,
    /// The action is running.
    Submitting,
}

/// What a submit action returned.
pub enum SubmitResult {
    /// The action completed synchronously.
    Immediate,
    /// The action completes when the task resolves.
    Pending(LocalBoxFuture<'static, anyhow::Result<()>>),
}

impl SubmitResult {
    /// Wrap a future as a pending result.
    pub fn pending<F>(task: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        SubmitResult::Pending(task.boxed_local())
    }

    /// Whether the result still has to be awaited.
    pub fn is_pending(&self) -> bool {
        matches!(self, SubmitResult::Pending(_))
    }
}

impl fmt::Debug for SubmitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitResult::Immediate => f.write_str("Immediate"),
            SubmitResult::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// The caller-supplied submit action.
///
/// Returning `Err` is a synchronous failure.
pub type SubmitAction = Box<dyn FnMut(FormData) -> anyhow::Result<SubmitResult>>;

/// Box a closure as a [`SubmitAction`].
pub fn action<F>(f: F) -> Option<SubmitAction>
where
    F: FnMut(FormData) -> anyhow::Result<SubmitResult> + 'static,
{
    Some(Box::new(f))
}

/// Result of one submit request.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// A submission is already in flight; the request was dropped.
    Busy,
    /// The session has been torn down; the request was dropped.
    Destroyed,
    /// Validation failed; carries the surfaced field.
    Invalid(String),
    /// The action failed synchronously and the error was handled. The form
    /// still counts as submitted.
    Failed,
    /// The action completed synchronously.
    Submitted,
    /// The action is running; drive the settlement to finish the submission.
    Pending(Settlement),
}

/// Completion of an asynchronous submission.
///
/// Resolves once the action's task has settled and the session's bookkeeping
/// is done. Resolves to [`Error::Action`] when the error handler left the
/// failure unhandled. Dropping a settlement cancels the action's task and
/// returns the session to idle without reporting completion.
#[must_use = "a settlement does nothing unless polled"]
pub struct Settlement {
    future: LocalBoxFuture<'static, Result<()>>,
}

impl Future for Settlement {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

/// Clears the session's submitting flag when dropped, whether the task settled
/// or its settlement was dropped first.
struct SubmittingGuard {
    session: FormSession,
    settled: bool,
}

impl SubmittingGuard {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for SubmittingGuard {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(form = %self.session.id(), "pending submission cancelled");
        }
        self.session.end_pending();
    }
}

impl fmt::Debug for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Settlement(..)")
    }
}

/// Submit event handler bound to a session.
pub struct SubmitHandler {
    session: FormSession,
    options: SubmitOptions,
    before_submit: Option<Box<dyn FnMut()>>,
    action: SubmitAction,
}

impl SubmitHandler {
    pub(crate) fn new(
        session: FormSession,
        options: SubmitOptions,
        before_submit: Option<Box<dyn FnMut()>>,
        action: SubmitAction,
    ) -> Self {
        Self {
            session,
            options,
            before_submit,
            action,
        }
    }

    /// Handle a submit request.
    ///
    /// Returns [`Error::Action`] if the action failed synchronously and the
    /// error handler did not handle it.
    pub fn invoke(&mut self, event: Option<&mut dyn SubmitEvent>) -> Result<SubmitOutcome> {
        if let Some(event) = event {
            event.prevent_default();
        }

        let id = self.session.id().to_string();

        if self.session.is_destroyed() {
            tracing::warn!(form = %id, "submit after teardown ignored");
            return Ok(SubmitOutcome::Destroyed);
        }

        if self.session.is_submitting() {
            tracing::debug!(form = %id, "submit ignored: already submitting");
            return Ok(SubmitOutcome::Busy);
        }

        if let Some(before_submit) = self.before_submit.as_mut() {
            before_submit();
        }

        self.session.set_phase(SubmitPhase::Validating);
        let report = self.session.validate();
        if let Some(field) = report.first_invalid() {
            self.session.set_phase(SubmitPhase::Idle);
            return Ok(SubmitOutcome::Invalid(field.to_string()));
        }

        let data = self.session.collect_form_data(self.options.trim);
        tracing::debug!(form = %id, fields = data.len(), "submit accepted");

        self.session.set_phase(SubmitPhase::Submitting);
        match (self.action)(data) {
            Err(error) => {
                self.session.set_phase(SubmitPhase::Idle);
                match self.session.handle_error(&error, self.options.on_error.as_ref()) {
                    ErrorDisposition::Handled => {
                        self.session.form_submitted();
                        Ok(SubmitOutcome::Failed)
                    }
                    ErrorDisposition::NotHandled => Err(Error::Action(error)),
                }
            }
            Ok(SubmitResult::Immediate) => {
                self.session.set_phase(SubmitPhase::Idle);
                self.session.form_submitted();
                Ok(SubmitOutcome::Submitted)
            }
            Ok(SubmitResult::Pending(task)) => {
                self.session.begin_pending();
                let session = self.session.clone();
                let on_error = self.options.on_error.clone();
                let guard = SubmittingGuard {
                    session: session.clone(),
                    settled: false,
                };
                let future = async move {
                    let result = task.await;
                    let unhandled = match result {
                        Ok(()) => {
                            session.form_submitted();
                            None
                        }
                        Err(error) => match session.handle_error(&error, on_error.as_ref()) {
                            ErrorDisposition::Handled => None,
                            ErrorDisposition::NotHandled => Some(error),
                        },
                    };

                    guard.settle();

                    match unhandled {
                        Some(error) => Err(Error::Action(error)),
                        None => Ok(()),
                    }
                };
                Ok(SubmitOutcome::Pending(Settlement {
                    future: future.boxed_local(),
                }))
            }
        }
    }

    /// Handle a submit request carrying no event.
    pub fn call(&mut self) -> Result<SubmitOutcome> {
        self.invoke(None)
    }
}

impl fmt::Debug for SubmitHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitHandler")
            .field("form", &self.session.id())
            .field("before_submit", &self.before_submit.is_some())
            .finish_non_exhaustive()
    }
}
