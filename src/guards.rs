//! Before-exit guards.
//!
//! A handler that wants to keep the user on its route (unsaved changes, a
//! running upload) registers a callback with
//! [`NavigationContext::before_exit`](crate::NavigationContext::before_exit).
//! On every later navigation attempt, before anything is dispatched, the
//! [`ExitGuard`] runs all callbacks of the active route against a fresh
//! [`BeforeExitEvent`] and decides:
//!
//! | Callbacks | `confirm(message)` | Result |
//! |-----------|--------------------|--------|
//! | none vetoed | not called | exit allowed, callbacks cleared |
//! | at least one vetoed | `true` | exit allowed, callbacks cleared |
//! | at least one vetoed | `false` | exit denied, callbacks kept |
//!
//! A callback vetoes by calling [`prevent_default`](BeforeExitEvent::prevent_default),
//! by setting a non-empty [`return_value`](BeforeExitEvent::set_return_value),
//! or by returning a non-empty message. Every callback runs even after an
//! earlier veto; only the first veto's message reaches `confirm`.

use crate::context::SignalTrigger;
use crate::{debug_log, trace_log, warn_log};
use futures::future::{FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::rc::Rc;

/// Callback registered through `before_exit`, normalized to return the
/// optional confirmation message.
pub type BeforeExitFn = Rc<dyn Fn(&mut BeforeExitEvent) -> Option<String>>;

/// Asks the user whether to leave despite a veto. `true` means leave.
pub type ConfirmFn = Rc<dyn Fn(String) -> LocalBoxFuture<'static, bool>>;

// ============================================================================
// BeforeExitEvent
// ============================================================================

/// The synthetic event handed to before-exit callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeforeExitEvent {
    default_prevented: bool,
    return_value: String,
}

impl BeforeExitEvent {
    /// Event type name, always `"beforeexit"`.
    pub const TYPE: &'static str = "beforeexit";

    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Veto the exit (confirmation message defaults to empty).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Return `true` if a callback called [`prevent_default`](Self::prevent_default).
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Veto the exit with a confirmation message.
    pub fn set_return_value(&mut self, message: impl Into<String>) {
        self.return_value = message.into();
    }

    /// The message set through [`set_return_value`](Self::set_return_value).
    pub fn return_value(&self) -> &str {
        &self.return_value
    }

    /// The veto this event carries after a callback returned `returned`.
    fn veto_message(&self, returned: Option<String>) -> Option<String> {
        match returned {
            Some(message) if !message.is_empty() => Some(message),
            _ if !self.return_value.is_empty() => Some(self.return_value.clone()),
            _ if self.default_prevented => Some(String::new()),
            _ => None,
        }
    }
}

/// Return types accepted from before-exit callbacks.
///
/// `()` never vetoes by itself; a non-empty string vetoes with that message.
pub trait IntoExitMessage {
    /// Convert into an optional confirmation message.
    fn into_exit_message(self) -> Option<String>;
}

impl IntoExitMessage for () {
    fn into_exit_message(self) -> Option<String> {
        None
    }
}

impl IntoExitMessage for String {
    fn into_exit_message(self) -> Option<String> {
        Some(self)
    }
}

impl IntoExitMessage for &str {
    fn into_exit_message(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl IntoExitMessage for Option<String> {
    fn into_exit_message(self) -> Option<String> {
        self
    }
}

// ============================================================================
// Activation
// ============================================================================

/// Exit state of one dispatched pass: the `exiting` triggers of every handler
/// it invoked and the before-exit callbacks they registered.
pub(crate) struct Activation {
    token: u64,
    callbacks: RefCell<Vec<BeforeExitFn>>,
    exits: RefCell<Vec<SignalTrigger>>,
}

impl Activation {
    pub(crate) fn new(token: u64) -> Self {
        Self {
            token,
            callbacks: RefCell::new(Vec::new()),
            exits: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    pub(crate) fn register(&self, callback: BeforeExitFn) {
        self.callbacks.borrow_mut().push(callback);
        trace_log!(
            "Before-exit callback registered for activation {} ({} total)",
            self.token,
            self.callback_count()
        );
    }

    pub(crate) fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    fn callbacks(&self) -> Vec<BeforeExitFn> {
        self.callbacks.borrow().clone()
    }

    fn clear_callbacks(&self) {
        self.callbacks.borrow_mut().clear();
    }

    pub(crate) fn add_exit(&self, trigger: SignalTrigger) {
        self.exits.borrow_mut().push(trigger);
    }

    /// Settle every handler's `exiting` future and drop the callbacks.
    pub(crate) fn exit(&self) {
        let exits: Vec<SignalTrigger> = self.exits.borrow_mut().drain(..).collect();
        self.clear_callbacks();
        debug_log!(
            "Exiting activation {} ({} handlers)",
            self.token,
            exits.len()
        );
        for trigger in exits {
            trigger.fire();
        }
    }
}

// ============================================================================
// ExitGuard
// ============================================================================

/// Holds the active route activation and decides whether it may be left.
#[derive(Default)]
pub(crate) struct ExitGuard {
    active: RefCell<Option<Rc<Activation>>>,
}

impl ExitGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Token of the active activation, if any.
    pub(crate) fn active_token(&self) -> Option<u64> {
        self.active.borrow().as_ref().map(|a| a.token())
    }

    /// Make `activation` the active one. The previous one must already have
    /// been exited.
    pub(crate) fn activate(&self, activation: Rc<Activation>) {
        *self.active.borrow_mut() = Some(activation);
    }

    /// Exit the active activation, if any.
    pub(crate) fn exit_active(&self) {
        let previous = self.active.borrow_mut().take();
        if let Some(activation) = previous {
            activation.exit();
        }
    }

    /// Run the active activation's callbacks and decide whether to allow exit.
    pub(crate) async fn check(&self, confirm: &ConfirmFn) -> bool {
        let Some(activation) = self.active.borrow().clone() else {
            return true;
        };
        let callbacks = activation.callbacks();
        if callbacks.is_empty() {
            return true;
        }

        debug_log!(
            "Running {} before-exit callbacks for activation {}",
            callbacks.len(),
            activation.token()
        );

        let mut veto: Option<String> = None;
        for callback in &callbacks {
            let mut event = BeforeExitEvent::new();
            let returned = callback(&mut event);
            if veto.is_none() {
                veto = event.veto_message(returned);
            }
        }

        let Some(message) = veto else {
            activation.clear_callbacks();
            return true;
        };

        debug_log!("Exit vetoed, asking for confirmation: {:?}", message);
        let allowed = confirm(message).await;
        if allowed {
            activation.clear_callbacks();
        } else {
            warn_log!(
                "Exit from activation {} denied by confirmation",
                activation.token()
            );
        }
        allowed
    }
}

/// Wrap a synchronous confirmation function.
pub(crate) fn confirm_fn<F>(confirm: F) -> ConfirmFn
where
    F: Fn(&str) -> bool + 'static,
{
    Rc::new(move |message: String| {
        let answer = confirm(&message);
        futures::future::ready(answer).boxed_local()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::signal;
    use std::cell::Cell;

    fn recording_confirm(answer: bool) -> (ConfirmFn, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let confirm = confirm_fn(move |message| {
            log.borrow_mut().push(message.to_string());
            answer
        });
        (confirm, seen)
    }

    fn callback<F>(f: F) -> BeforeExitFn
    where
        F: Fn(&mut BeforeExitEvent) -> Option<String> + 'static,
    {
        Rc::new(f)
    }

    fn guard_with(callbacks: Vec<BeforeExitFn>) -> (ExitGuard, Rc<Activation>) {
        let activation = Rc::new(Activation::new(7));
        for callback in callbacks {
            activation.register(callback);
        }
        let guard = ExitGuard::new();
        guard.activate(activation.clone());
        (guard, activation)
    }

    #[test]
    fn test_no_active_route_allows_exit() {
        let (confirm, seen) = recording_confirm(false);
        let guard = ExitGuard::new();
        assert!(pollster::block_on(guard.check(&confirm)));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_no_veto_skips_confirm_and_clears() {
        let (confirm, seen) = recording_confirm(false);
        let (guard, activation) = guard_with(vec![callback(|_event| None)]);

        assert!(pollster::block_on(guard.check(&confirm)));
        assert!(seen.borrow().is_empty());
        assert_eq!(activation.callback_count(), 0);
    }

    #[test]
    fn test_prevent_default_confirms_with_empty_message() {
        let (confirm, seen) = recording_confirm(false);
        let (guard, activation) = guard_with(vec![callback(|event| {
            event.prevent_default();
            None
        })]);

        assert!(!pollster::block_on(guard.check(&confirm)));
        assert_eq!(*seen.borrow(), vec![String::new()]);
        assert_eq!(activation.callback_count(), 1);
    }

    #[test]
    fn test_return_value_is_the_message() {
        let (confirm, seen) = recording_confirm(true);
        let (guard, activation) = guard_with(vec![callback(|event| {
            event.set_return_value("Discard draft?");
            None
        })]);

        assert!(pollster::block_on(guard.check(&confirm)));
        assert_eq!(*seen.borrow(), vec!["Discard draft?".to_string()]);
        assert_eq!(activation.callback_count(), 0);
    }

    #[test]
    fn test_first_veto_wins_and_all_callbacks_run() {
        let ran = Rc::new(Cell::new(0));
        let (r1, r2, r3) = (ran.clone(), ran.clone(), ran.clone());
        let (confirm, seen) = recording_confirm(false);
        let (guard, _activation) = guard_with(vec![
            callback(move |_event| {
                r1.set(r1.get() + 1);
                None
            }),
            callback(move |_event| {
                r2.set(r2.get() + 1);
                Some("first".to_string())
            }),
            callback(move |event| {
                r3.set(r3.get() + 1);
                event.set_return_value("second");
                None
            }),
        ]);

        assert!(!pollster::block_on(guard.check(&confirm)));
        assert_eq!(ran.get(), 3);
        assert_eq!(*seen.borrow(), vec!["first".to_string()]);
    }

    #[test]
    fn test_denied_callbacks_run_again_next_attempt() {
        let ran = Rc::new(Cell::new(0));
        let counter = ran.clone();
        let (confirm, _seen) = recording_confirm(false);
        let (guard, _activation) = guard_with(vec![callback(move |event| {
            counter.set(counter.get() + 1);
            event.prevent_default();
            None
        })]);

        assert!(!pollster::block_on(guard.check(&confirm)));
        assert!(!pollster::block_on(guard.check(&confirm)));
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn test_empty_returned_message_is_not_a_veto() {
        let (confirm, seen) = recording_confirm(false);
        let (guard, _activation) = guard_with(vec![callback(|_event| Some(String::new()))]);

        assert!(pollster::block_on(guard.check(&confirm)));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_exit_active_fires_exits() {
        let (guard, activation) = guard_with(Vec::new());
        let (trigger, exiting) = signal();
        activation.add_exit(trigger);
        assert_eq!(guard.active_token(), Some(7));

        guard.exit_active();
        assert!(exiting.is_settled());
        assert_eq!(guard.active_token(), None);
    }

    #[test]
    fn test_into_exit_message() {
        assert_eq!(().into_exit_message(), None);
        assert_eq!("leave?".into_exit_message(), Some("leave?".to_string()));
        assert_eq!(None::<String>.into_exit_message(), None);
    }
}
