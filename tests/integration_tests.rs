//! Integration tests for form-session
//!
//! These tests drive sessions through the controller the way a UI host
//! would, and observe the results through the memory store's state and
//! command journal.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use forms::*;
use futures::channel::oneshot;
use futures::executor::block_on;
use serde_json::json;

/// A router that fires every registered leave listener on `leave()`.
#[derive(Default)]
struct TestRouter {
    listeners: Rc<RefCell<Vec<(usize, LeaveListener)>>>,
    next_id: Cell<usize>,
}

impl TestRouter {
    fn leave(&self) {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl NavigationHook for TestRouter {
    fn on_leave(&self, listener: LeaveListener) -> LeaveSubscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, listener));

        let listeners = Rc::downgrade(&self.listeners);
        LeaveSubscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().retain(|(i, _)| *i != id);
            }
        })
    }
}

type Abandoned = Rc<RefCell<Vec<(String, String, Option<Value>)>>>;

struct Fixture {
    store: Rc<MemoryStore>,
    router: Rc<TestRouter>,
    controller: FormController,
}

fn fixture(config: GlobalConfig) -> Fixture {
    let store = Rc::new(MemoryStore::new());
    let router = Rc::new(TestRouter::default());
    let controller = FormController::new(store.clone(), config)
        .with_navigation(router.clone());
    Fixture {
        store,
        router,
        controller,
    }
}

fn abandon_recorder(options: FormOptions) -> (FormOptions, Abandoned) {
    let abandoned: Abandoned = Rc::new(RefCell::new(Vec::new()));
    let sink = abandoned.clone();
    let options = options.on_abandoned(move |props, field, value| {
        sink.borrow_mut()
            .push((props.id.clone(), field.to_string(), value.cloned()));
    });
    (options, abandoned)
}

fn recording_action(calls: Rc<RefCell<Vec<FormData>>>) -> Option<SubmitAction> {
    action(move |data| {
        calls.borrow_mut().push(data);
        Ok(SubmitResult::Immediate)
    })
}

/// Registering the same field twice keeps the first registration
#[test]
fn test_first_registration_wins() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();

    assert!(form.register("name", Some(json!("first")), no_validation()));
    assert!(!form.register(
        "name",
        Some(json!("second")),
        validators::required("never used")
    ));
    form.unregister("name");

    form.set_field("name", None).unwrap();
    assert_eq!(f.store.error("f", "name"), None);

    form.reset().unwrap();
    assert_eq!(form.get_field_value("name"), Some(json!("first")));
}

/// Submitting while the form is already submitting does nothing
#[test]
fn test_submit_while_submitting_is_dropped() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    form.register("a", None, validators::required("a"));

    let (_tx, rx) = oneshot::channel::<anyhow::Result<()>>();
    let mut rx = Some(rx);
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let mut submit = form
        .submit(action(move |_| {
            c.set(c.get() + 1);
            let rx = rx.take().expect("single submission");
            Ok(SubmitResult::pending(async move { rx.await? }))
        }))
        .unwrap();

    form.set_field("a", Some(json!("x"))).unwrap();
    let SubmitOutcome::Pending(_settlement) = submit.call().unwrap() else {
        panic!("expected pending outcome");
    };

    let before = f.store.journal_len();
    assert!(matches!(submit.call().unwrap(), SubmitOutcome::Busy));
    assert_eq!(f.store.journal_len(), before);
    assert_eq!(calls.get(), 1);

    // The host's own flag blocks submission too.
    let other = f
        .controller
        .on_create(FormProps::new("g").with_submitting(true), FormOptions::new())
        .unwrap();
    let other_calls = Rc::new(RefCell::new(Vec::new()));
    let mut other_submit = other.submit(recording_action(other_calls.clone())).unwrap();
    let before = f.store.journal_len();
    assert!(matches!(other_submit.call().unwrap(), SubmitOutcome::Busy));
    assert_eq!(f.store.journal_len(), before);
    assert!(other_calls.borrow().is_empty());
}

/// Only the first invalid field in registration order is surfaced
#[test]
fn test_validation_surfaces_first_invalid_field() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    form.register("a", None, no_validation());
    form.register("b", None, validators::required("b is required"));
    form.register("c", None, validators::required("c is required"));
    f.store.clear_journal();

    let report = form.validate();
    assert!(!report.is_valid());
    assert_eq!(report.first_invalid(), Some("b"));

    let journal = f.store.journal();
    assert!(journal.contains(&StoreCommand::SetFormValidationPassed("f".into(), false)));
    assert!(journal.contains(&StoreCommand::IndicateInvalidField("f".into(), "b".into())));
    assert!(!journal.contains(&StoreCommand::IndicateInvalidField("f".into(), "c".into())));
    assert!(!journal.contains(&StoreCommand::FocusField("f".into(), "c".into())));
    assert!(!journal.contains(&StoreCommand::ScrollToField("f".into(), "c".into())));

    // Later invalid fields keep their errors in the store.
    assert_eq!(f.store.error("f", "c"), Some("c is required".into()));
    assert!(f.store.flags("f", "b").contains(FieldFlags::INDICATED | FieldFlags::SCROLLED));
}

/// A valid form invokes the action once with registered fields only
#[test]
fn test_valid_submit_payload() {
    let mut initial = Values::new();
    initial.insert("stale".into(), json!("left over"));
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(
            FormProps::new("f").with_initial_values(initial),
            FormOptions::new(),
        )
        .unwrap();
    form.register("email", None, validators::required("required"));
    form.register("note", None, no_validation());
    form.field_changed("email", Some(json!("ada@example.com")));

    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut submit = form.submit(recording_action(calls.clone())).unwrap();
    f.store.clear_journal();
    let outcome = submit.invoke(Some(&mut FormEvent::new())).unwrap();

    assert!(matches!(outcome, SubmitOutcome::Submitted));
    assert!(f
        .store
        .journal()
        .contains(&StoreCommand::SetFormValidationPassed("f".into(), true)));

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    let data = &calls[0];
    assert_eq!(data.len(), 2);
    assert_eq!(data["email"], json!("ada@example.com"));
    assert_eq!(data["note"], Value::Null);
    assert!(!data.contains_key("stale"));
}

/// Trimming follows per-call, per-session and global settings
#[test]
fn test_trim_setting() {
    let submit_with = |config: GlobalConfig, options: FormOptions, call: SubmitOptions| {
        let f = fixture(config);
        let form = f.controller.on_create(FormProps::new("f"), options).unwrap();
        form.register("greeting", None, no_validation());
        form.field_changed("greeting", Some(json!("  hi  ")));
        form.register("count", None, no_validation());
        form.field_changed("count", Some(json!(3)));

        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut submit = form
            .submit_with(call, None, recording_action(calls.clone()))
            .unwrap();
        submit.call().unwrap();
        let data = calls.borrow()[0].clone();
        assert_eq!(data["count"], json!(3));
        data["greeting"].clone()
    };

    assert_eq!(
        submit_with(GlobalConfig::new(), FormOptions::new(), SubmitOptions::new()),
        json!("  hi  ")
    );
    assert_eq!(
        submit_with(GlobalConfig::new().trim(true), FormOptions::new(), SubmitOptions::new()),
        json!("hi")
    );
    assert_eq!(
        submit_with(
            GlobalConfig::new().trim(true),
            FormOptions::new().trim(false),
            SubmitOptions::new()
        ),
        json!("  hi  ")
    );
    assert_eq!(
        submit_with(
            GlobalConfig::new(),
            FormOptions::new().trim(false),
            SubmitOptions::new().trim(true)
        ),
        json!("hi")
    );
}

/// A resolving task completes the submission exactly once
#[test]
fn test_async_submission_resolves() {
    let f = fixture(GlobalConfig::new());
    let submitted = Rc::new(Cell::new(0));
    let s = submitted.clone();
    let form = f
        .controller
        .on_create(
            FormProps::new("f"),
            FormOptions::new().on_submitted(move |_| s.set(s.get() + 1)),
        )
        .unwrap();

    let mut submit = form
        .submit(action(|_| {
            Ok(SubmitResult::pending(async { Ok::<(), anyhow::Error>(()) }))
        }))
        .unwrap();
    let SubmitOutcome::Pending(settlement) = submit.call().unwrap() else {
        panic!("expected pending outcome");
    };
    assert!(form.is_submitting());

    block_on(settlement).unwrap();
    assert_eq!(submitted.get(), 1);
    assert!(form.is_submitted());
    assert!(!form.is_submitting());
    assert_eq!(form.phase(), SubmitPhase::Idle);
}

/// A rejecting task goes through the error handler
#[test]
fn test_async_submission_rejects() {
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = errors.clone();
    let f = fixture(GlobalConfig::new().default_error_handler(move |error, props| {
        sink.borrow_mut().push((props.id.clone(), error.to_string()));
        ErrorDisposition::Handled
    }));
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();

    let mut submit = form
        .submit(action(|_| {
            Ok(SubmitResult::pending(async {
                Err::<(), _>(anyhow::anyhow!("server said no"))
            }))
        }))
        .unwrap();
    let SubmitOutcome::Pending(settlement) = submit.call().unwrap() else {
        panic!("expected pending outcome");
    };
    block_on(settlement).unwrap();

    assert_eq!(
        *errors.borrow(),
        vec![("f".to_string(), "server said no".to_string())]
    );
    assert!(!form.is_submitting());
    assert!(!form.is_submitted());

    // The form can be submitted again after settlement.
    assert!(matches!(submit.call().unwrap(), SubmitOutcome::Pending(_)));
}

/// Settling after teardown leaves the store untouched
#[test]
fn test_async_rejection_after_teardown() {
    let f = fixture(GlobalConfig::new().default_error_handler(|_, _| ErrorDisposition::NotHandled));
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    form.register("a", Some(json!(1)), no_validation());

    let (tx, rx) = oneshot::channel::<anyhow::Result<()>>();
    let mut rx = Some(rx);
    let mut submit = form
        .submit(action(move |_| {
            let rx = rx.take().expect("single submission");
            Ok(SubmitResult::pending(async move { rx.await? }))
        }))
        .unwrap();
    let SubmitOutcome::Pending(settlement) = submit.call().unwrap() else {
        panic!("expected pending outcome");
    };

    f.controller.on_destroy("f").unwrap();
    let journal_len = f.store.journal_len();

    tx.send(Err(anyhow::anyhow!("too late"))).unwrap();
    let err = block_on(settlement).unwrap_err();

    assert!(matches!(err, Error::Action(_)));
    assert_eq!(f.store.journal_len(), journal_len);
    assert!(!f.store.contains("f"));
    assert!(form.is_submitting());
}

/// Abandonment fires once, on navigation, after a field was focused
#[test]
fn test_abandonment_on_navigation() {
    let f = fixture(GlobalConfig::new());
    let (options, abandoned) = abandon_recorder(FormOptions::new());
    let form = f.controller.on_create(FormProps::new("f"), options).unwrap();
    assert_eq!(f.router.listener_count(), 1);

    form.register("email", None, no_validation());
    form.field_focused("email");
    form.field_changed("email", Some(json!("ada@")));
    assert_eq!(form.latest_focused_field(), Some("email".into()));

    f.router.leave();
    f.router.leave();
    f.controller.on_destroy("f").unwrap();

    assert_eq!(
        *abandoned.borrow(),
        vec![("f".to_string(), "email".to_string(), Some(json!("ada@")))]
    );
    assert!(form.is_abandonment_reported());
    assert_eq!(f.router.listener_count(), 0);
}

/// Teardown reports abandonment when navigation did not
#[test]
fn test_abandonment_on_teardown() {
    let f = fixture(GlobalConfig::new());
    let (options, abandoned) = abandon_recorder(FormOptions::new());
    let form = f.controller.on_create(FormProps::new("f"), options).unwrap();
    form.register("name", None, no_validation());
    form.field_focused("name");
    form.field_changed("name", Some(json!("Ada")));

    f.controller.on_destroy("f").unwrap();
    assert_eq!(
        *abandoned.borrow(),
        vec![("f".to_string(), "name".to_string(), Some(json!("Ada")))]
    );
    assert_eq!(f.router.listener_count(), 0);
}

/// An untouched form is never abandoned
#[test]
fn test_untouched_form_is_not_abandoned() {
    let f = fixture(GlobalConfig::new());
    let (options, abandoned) = abandon_recorder(FormOptions::new());
    let form = f.controller.on_create(FormProps::new("f"), options).unwrap();
    form.register("name", None, no_validation());

    f.router.leave();
    f.controller.on_destroy("f").unwrap();
    assert!(abandoned.borrow().is_empty());
    assert!(!form.is_abandonment_reported());
}

/// A submitted form is never abandoned
#[test]
fn test_submitted_form_is_not_abandoned() {
    let f = fixture(GlobalConfig::new());
    let (options, abandoned) = abandon_recorder(FormOptions::new());
    let form = f.controller.on_create(FormProps::new("f"), options).unwrap();
    form.register("name", None, no_validation());
    form.field_focused("name");

    let mut submit = form.submit(action(|_| Ok(SubmitResult::Immediate))).unwrap();
    assert!(matches!(submit.call().unwrap(), SubmitOutcome::Submitted));
    assert_eq!(f.router.listener_count(), 0);

    f.router.leave();
    f.controller.on_destroy("f").unwrap();
    assert!(abandoned.borrow().is_empty());
}

/// A handled synchronous failure still completes the submission
#[test]
fn test_handled_sync_failure_counts_as_submitted() {
    let f = fixture(GlobalConfig::new().default_error_handler(|_, _| ErrorDisposition::Handled));
    let submitted = Rc::new(Cell::new(0));
    let s = submitted.clone();
    let (options, abandoned) =
        abandon_recorder(FormOptions::new().on_submitted(move |_| s.set(s.get() + 1)));
    let form = f.controller.on_create(FormProps::new("f"), options).unwrap();
    form.register("name", None, no_validation());
    form.field_focused("name");

    let mut submit = form
        .submit(action(|_| Err(anyhow::anyhow!("boom"))))
        .unwrap();
    assert!(matches!(submit.call().unwrap(), SubmitOutcome::Failed));
    assert!(form.is_submitted());
    assert_eq!(submitted.get(), 1);
    assert_eq!(f.router.listener_count(), 0);

    f.controller.on_destroy("f").unwrap();
    assert!(abandoned.borrow().is_empty());
}

/// Dropping a pending settlement lets the form be submitted again
#[test]
fn test_dropped_settlement_allows_resubmit() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let mut submit = form
        .submit(action(move |_| {
            c.set(c.get() + 1);
            Ok(SubmitResult::pending(futures::future::pending()))
        }))
        .unwrap();

    let SubmitOutcome::Pending(settlement) = submit.call().unwrap() else {
        panic!("expected pending outcome");
    };
    assert!(form.is_submitting());
    drop(settlement);
    assert!(!form.is_submitting());
    assert_eq!(form.phase(), SubmitPhase::Idle);
    assert!(!form.is_submitted());

    assert!(matches!(submit.call().unwrap(), SubmitOutcome::Pending(_)));
    assert_eq!(calls.get(), 2);
}

/// Without a callback the detector never subscribes
#[test]
fn test_abandonment_inert_without_callback() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    assert_eq!(f.router.listener_count(), 0);
    assert!(!form.is_listening_for_navigation());
}

/// Reset restores initial values and clears invalid indication
#[test]
fn test_reset() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    form.register("a", Some(json!("A")), validators::required("a"));
    form.register("b", Some(json!(2)), no_validation());
    form.field_changed("a", None);
    form.field_changed("b", Some(json!(40)));
    assert!(!form.validate().is_valid());
    assert_eq!(f.store.state("f").unwrap().invalid_indication, Some("a".into()));

    f.store.clear_journal();
    form.reset().unwrap();
    assert_eq!(form.get_field_value("a"), Some(json!("A")));
    assert_eq!(form.get_field_value("b"), Some(json!(2)));
    assert_eq!(f.store.error("f", "a"), None);
    assert_eq!(f.store.state("f").unwrap().invalid_indication, None);
    assert!(f
        .store
        .journal()
        .contains(&StoreCommand::FocusField("f".into(), "a".into())));
}

/// Autofocus fires once the store reports the form initialized
#[test]
fn test_autofocus_after_initialization() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    form.register("first", None, no_validation());
    form.register("second", None, no_validation());

    f.store.mark_initialized("f");
    f.controller.on_props_changed(FormProps::new("f")).unwrap();
    assert!(f
        .store
        .journal()
        .contains(&StoreCommand::FocusField("f".into(), "first".into())));
}

/// The global default can turn autofocus off
#[test]
fn test_autofocus_disabled_globally() {
    let f = fixture(GlobalConfig::new().autofocus(false));
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();
    form.register("first", None, no_validation());
    f.store.mark_initialized("f");
    f.controller.on_props_changed(FormProps::new("f")).unwrap();
    assert!(f
        .store
        .journal()
        .iter()
        .all(|c| !matches!(c, StoreCommand::FocusField(..))));
}

/// Callbacks may call back into the session
#[test]
fn test_reentrant_submitted_callback() {
    let f = fixture(GlobalConfig::new());
    let slot: Rc<RefCell<Option<FormSession>>> = Rc::new(RefCell::new(None));
    let s = slot.clone();
    let form = f
        .controller
        .on_create(
            FormProps::new("f"),
            FormOptions::new().on_submitted(move |_| {
                if let Some(form) = s.borrow().as_ref() {
                    form.reset().unwrap();
                }
            }),
        )
        .unwrap();
    *slot.borrow_mut() = Some(form.clone());
    form.register("a", Some(json!("start")), no_validation());
    form.field_changed("a", Some(json!("typed")));

    let mut submit = form.submit(action(|_| Ok(SubmitResult::Immediate))).unwrap();
    submit.call().unwrap();
    assert_eq!(form.get_field_value("a"), Some(json!("start")));
    slot.borrow_mut().take();
}

/// Field helpers on unknown fields are tolerated or reported
#[test]
fn test_unknown_field_operations() {
    let f = fixture(GlobalConfig::new());
    let form = f
        .controller
        .on_create(FormProps::new("f"), FormOptions::new())
        .unwrap();

    form.clear_field("ghost");
    form.field_changed("ghost", Some(json!(1)));
    assert_eq!(form.get_field_value("ghost"), None);
    assert!(matches!(
        form.set_field("ghost", Some(json!(1))),
        Err(Error::UnregisteredField(_))
    ));
    assert!(matches!(
        validate_field(&FieldRegistry::new(), "ghost", None, &Values::new()),
        Err(Error::UnregisteredField(_))
    ));
}
