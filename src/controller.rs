//! Session lifecycle entry points.
//!
//! The host that renders forms drives a [`FormController`] through three
//! calls: [`on_create`](FormController::on_create) when a form mounts,
//! [`on_props_changed`](FormController::on_props_changed) when its props
//! update, and [`on_destroy`](FormController::on_destroy) when it unmounts.
//! Sessions are looked up by id.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::abandon::NavigationHook;
use crate::config::{FormOptions, GlobalConfig, ResolvedConfig};
use crate::error::{Error, Result};
use crate::session::FormSession;
use crate::store::FormStore;
use crate::types::FormProps;

/// Owner of all live form sessions.
pub struct FormController {
    store: Rc<dyn FormStore>,
    config: GlobalConfig,
    navigation: Option<Rc<dyn NavigationHook>>,
    sessions: RefCell<HashMap<String, FormSession>>,
}

impl FormController {
    /// Create a controller over `store` with process-wide defaults.
    pub fn new(store: Rc<dyn FormStore>, config: GlobalConfig) -> Self {
        Self {
            store,
            config,
            navigation: None,
            sessions: RefCell::new(HashMap::new()),
        }
    }

    /// Provide the routing layer's "leave route" hook.
    ///
    /// Only sessions created afterwards can detect navigation away.
    pub fn with_navigation(mut self, navigation: Rc<dyn NavigationHook>) -> Self {
        self.navigation = Some(navigation);
        self
    }

    /// The process-wide defaults.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// The shared store.
    pub fn store(&self) -> &Rc<dyn FormStore> {
        &self.store
    }

    /// Create a session for a mounted form.
    pub fn on_create(&self, props: FormProps, options: FormOptions) -> Result<FormSession> {
        if self.sessions.borrow().contains_key(&props.id) {
            return Err(Error::DuplicateSession(props.id));
        }

        let id = props.id.clone();
        let session = FormSession::create(
            props,
            ResolvedConfig::new(options, self.config.clone()),
            self.store.clone(),
            self.navigation.as_deref(),
        );
        self.sessions.borrow_mut().insert(id, session.clone());
        Ok(session)
    }

    /// Deliver new props to the session with `next.id`.
    pub fn on_props_changed(&self, next: FormProps) -> Result<()> {
        let session = self.session(&next.id)?;
        session.props_changed(next);
        Ok(())
    }

    /// Tear down a session.
    pub fn on_destroy(&self, id: &str) -> Result<()> {
        let session = self
            .sessions
            .borrow_mut()
            .remove(id)
            .ok_or_else(|| Error::UnknownSession(id.to_string()))?;
        session.destroy();
        Ok(())
    }

    /// Look up a live session.
    pub fn session(&self, id: &str) -> Result<FormSession> {
        self.sessions
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownSession(id.to_string()))
    }

    /// Ids of all live sessions.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.sessions.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("config", &self.config)
            .field("navigation", &self.navigation.is_some())
            .field("sessions", &self.session_ids())
            .finish()
    }
}
