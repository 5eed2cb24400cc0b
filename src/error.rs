//! Error types for form sessions.

use thiserror::Error;

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in form session operations.
///
/// Validation failures are not errors: they are reported through the store
/// and through [`SubmitOutcome::Invalid`](crate::submit::SubmitOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// `submit()` was called without an action.
    #[error("no action specified for form \"submit\"")]
    MissingAction,

    /// A field operation referenced a name that was never registered.
    #[error("field \"{0}\" is not registered")]
    UnregisteredField(String),

    /// A session with this id is already alive in the controller.
    #[error("form \"{0}\" is already initialized")]
    DuplicateSession(String),

    /// No live session has this id.
    #[error("form \"{0}\" does not exist")]
    UnknownSession(String),

    /// The session was torn down before the operation ran.
    #[error("form \"{0}\" has been destroyed")]
    SessionDestroyed(String),

    /// The submit action failed and the error handler did not handle it.
    #[error("form action failed: {0}")]
    Action(#[source] anyhow::Error),
}

impl Error {
    /// Returns a short stable label for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::MissingAction => "missing_action",
            Error::UnregisteredField(_) => "unregistered_field",
            Error::DuplicateSession(_) => "duplicate_session",
            Error::UnknownSession(_) => "unknown_session",
            Error::SessionDestroyed(_) => "session_destroyed",
            Error::Action(_) => "action_failed",
        }
    }

    /// Unwraps the action error, if this is one.
    pub fn into_action_error(self) -> Option<anyhow::Error> {
        match self {
            Error::Action(err) => Some(err),
            _ => None,
        }
    }
}
