//! # form-session
//!
//! Controller for form sessions: the state machine between a UI host and a
//! keyed store that handles field registration, validation ordering,
//! asynchronous submission and abandonment detection.
//!
//! ## Features
//!
//! - **regex**: regular expression validator ([`validators::pattern`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use forms::*;
//!
//! fn main() -> Result<()> {
//!     let store = Rc::new(MemoryStore::new());
//!     let controller = FormController::new(store.clone(), GlobalConfig::new().trim(true));
//!
//!     let form = controller.on_create(FormProps::new("signup"), FormOptions::new())?;
//!     form.register("email", None, validators::required("Enter your email"));
//!     form.field_changed("email", Some(Value::from("  ada@example.com ")));
//!
//!     let mut submit = form.submit(action(|data| {
//!         println!("submitting {data:?}");
//!         Ok(SubmitResult::Immediate)
//!     }))?;
//!     submit.invoke(Some(&mut FormEvent::new()))?;
//!
//!     controller.on_destroy("signup")?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::needless_doctest_main)]
#![warn(missing_docs)]

pub mod abandon;
pub mod config;
pub mod controller;
pub mod error;
pub mod registry;
pub mod session;
pub mod store;
pub mod submit;
pub mod types;
pub mod validation;

// Re-export commonly used items at crate root
pub use abandon::{LeaveListener, LeaveSubscription, NavigationHook};
pub use config::{
    resolve, ErrorDisposition, ErrorHandler, FormOptions, GlobalConfig, SubmitOptions,
};
pub use controller::FormController;
pub use error::{Error, Result};
pub use registry::{Field, FieldRegistry};
pub use session::FormSession;
pub use store::{FieldFlags, FormStore, MemoryStore, StoreCommand};
pub use submit::{
    action, Settlement, SubmitAction, SubmitHandler, SubmitOutcome, SubmitPhase, SubmitResult,
};
pub use types::*;
pub use validation::{validate_field, validate_form, validators, ValidationReport};

/// The crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
