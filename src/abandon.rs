//! Abandonment detection.
//!
//! A form is abandoned when it is left (navigation away, or teardown) after
//! the user focused at least one of its fields and before it was submitted.
//! Detection needs both an `on_abandoned` callback and a [`NavigationHook`];
//! without either the detector stays inert.

use std::fmt;
use std::rc::Rc;

/// Listener invoked when the user navigates away.
pub type LeaveListener = Rc<dyn Fn()>;

/// Source of "leave route" signals, provided by the routing layer.
pub trait NavigationHook {
    /// Register a listener for leaving the current route.
    fn on_leave(&self, listener: LeaveListener) -> LeaveSubscription;
}

/// Handle to a registered [`LeaveListener`].
///
/// Detaching is idempotent. Dropping the subscription detaches it.
pub struct LeaveSubscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl LeaveSubscription {
    /// Create a subscription that runs `detach` when detached.
    pub fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Remove the listener. Does nothing if already detached.
    pub fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Whether the listener is still registered.
    pub fn is_attached(&self) -> bool {
        self.detach.is_some()
    }
}

impl Drop for LeaveSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for LeaveSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeaveSubscription")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// One-shot abandonment state of a session.
#[derive(Debug, Default)]
pub struct AbandonmentDetector {
    subscription: Option<LeaveSubscription>,
    armed: bool,
    reported: bool,
}

impl AbandonmentDetector {
    /// A detector that never fires.
    pub fn inert() -> Self {
        Self::default()
    }

    /// Arm the detector.
    ///
    /// Sessions arm it only when a navigation hook exists, and attach the
    /// hook's subscription right after via [`Self::attach`].
    pub fn armed() -> Self {
        Self {
            subscription: None,
            armed: true,
            reported: false,
        }
    }

    /// Keep the navigation subscription so it can be detached later.
    pub fn attach(&mut self, subscription: LeaveSubscription) {
        self.subscription = Some(subscription);
    }

    /// Whether the detector can still fire.
    pub fn is_active(&self) -> bool {
        self.armed && !self.reported
    }

    /// Whether the abandonment callback has fired.
    pub fn is_reported(&self) -> bool {
        self.reported
    }

    /// Whether a navigation listener is currently registered.
    pub fn is_listening(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(LeaveSubscription::is_attached)
    }

    /// Detach the navigation listener.
    pub fn stop(&mut self) {
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.detach();
        }
    }

    /// Decide whether to fire, latching if so.
    ///
    /// Fires only when armed, not yet reported, not submitted, and some field
    /// was focused. Returns the field to report.
    pub fn trigger(&mut self, submitted: bool, latest_focused: Option<String>) -> Option<String> {
        if !self.is_active() || submitted {
            return None;
        }
        let field = latest_focused?;
        self.reported = true;
        self.stop();
        Some(field)
    }
}
