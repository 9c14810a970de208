//! Handler-facing context and completion futures.
//!
//! - [`NavigationContext`]: the record every handler invocation receives.
//!   It carries the (possibly mount-relative) location and bound params, and
//!   the two single-use signals a handler answers with: `resolve()` ends the
//!   pass, `next()` hands over to the next matching entry.
//! - [`Exiting`]: settles when a later navigation begins exiting the route
//!   the handler took part in. `next()` returns the handler's own `Exiting`,
//!   so `ctx.next().await` reads as "continue, then wait until we leave".
//! - [`Routing`]: settles when a dispatching pass resolves or exhausts the
//!   chain. See [`Router::routing`](crate::Router::routing).
//!
//! Both futures are cheap to clone and never settle if the pass or route they
//! belong to is abandoned.

use crate::error::HandlerError;
use crate::guards::{Activation, BeforeExitEvent, IntoExitMessage};
use crate::location::Location;
use crate::params::RouteParams;
use crate::{trace_log, warn_log};
use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

// ============================================================================
// Signals
// ============================================================================

/// Fire side of a [`Signal`]. Dropping it without firing leaves every waiter
/// pending forever.
pub(crate) struct SignalTrigger {
    tx: oneshot::Sender<()>,
}

impl SignalTrigger {
    pub(crate) fn fire(self) {
        if self.tx.send(()).is_err() {
            trace_log!("Signal fired with no remaining waiters");
        }
    }
}

/// A single-fulfilment, multi-waiter completion signal.
#[derive(Clone)]
pub(crate) struct Signal {
    inner: Shared<oneshot::Receiver<()>>,
    abandoned: bool,
}

pub(crate) fn signal() -> (SignalTrigger, Signal) {
    let (tx, rx) = oneshot::channel();
    (
        SignalTrigger { tx },
        Signal {
            inner: rx.shared(),
            abandoned: false,
        },
    )
}

impl Signal {
    /// Check without blocking whether the signal has fired.
    pub(crate) fn is_settled(&self) -> bool {
        let mut probe = self.inner.clone();
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        matches!(probe.poll_unpin(&mut cx), Poll::Ready(Ok(())))
    }
}

impl Future for Signal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.abandoned {
            return Poll::Pending;
        }
        match self.inner.poll_unpin(cx) {
            Poll::Ready(Ok(())) => Poll::Ready(()),
            Poll::Ready(Err(oneshot::Canceled)) => {
                self.abandoned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Settles once a later navigation begins exiting a route.
///
/// Never settles for the route that is still current.
#[derive(Clone)]
pub struct Exiting(pub(crate) Signal);

impl Exiting {
    /// Check without blocking whether the route has been exited.
    pub fn is_settled(&self) -> bool {
        self.0.is_settled()
    }
}

impl Future for Exiting {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl fmt::Debug for Exiting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exiting")
            .field("settled", &self.is_settled())
            .finish()
    }
}

/// Settles once a dispatching pass resolves a route or exhausts the chain.
///
/// Superseded, vetoed and failed passes never settle their `Routing`.
#[derive(Clone)]
pub struct Routing(pub(crate) Signal);

impl Routing {
    /// Check without blocking whether the pass has settled.
    pub fn is_settled(&self) -> bool {
        self.0.is_settled()
    }
}

impl Future for Routing {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl fmt::Debug for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routing")
            .field("settled", &self.is_settled())
            .finish()
    }
}

// ============================================================================
// Handler decisions
// ============================================================================

/// What a handler told the engine.
#[derive(Debug)]
pub(crate) enum Decision {
    Resolve,
    Next,
    Failed(HandlerError),
}

/// Shared between a context and the task driving its handler; whoever takes
/// the sender first decides.
pub(crate) type DecisionSlot = Rc<RefCell<Option<oneshot::Sender<Decision>>>>;

// ============================================================================
// NavigationContext
// ============================================================================

/// Per-invocation record passed to a route handler.
///
/// # Example
///
/// ```no_run
/// use chain_navigator::{HandlerError, NavigationContext};
///
/// async fn editor(ctx: NavigationContext) -> Result<(), HandlerError> {
///     let id = ctx.params().get("id").unwrap_or_default().to_string();
///     ctx.before_exit(|event| event.prevent_default());
///     ctx.resolve();
///     ctx.exiting().await;
///     println!("left editor {id}");
///     Ok(())
/// }
/// ```
pub struct NavigationContext {
    location: Location,
    params: RouteParams,
    pattern: Option<String>,
    decision: DecisionSlot,
    exiting: Exiting,
    activation: Rc<Activation>,
}

impl NavigationContext {
    pub(crate) fn new(
        location: Location,
        params: RouteParams,
        pattern: Option<String>,
        decision: DecisionSlot,
        exiting: Exiting,
        activation: Rc<Activation>,
    ) -> Self {
        Self {
            location,
            params,
            pattern,
            decision,
            exiting,
            activation,
        }
    }

    /// The path as seen by this handler (relative to its mount point).
    pub fn path(&self) -> &str {
        self.location.path()
    }

    /// The location as seen by this handler (relative to its mount point).
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Parameters bound by the entry's pattern and any enclosing mounts.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// The pattern this handler was registered with, `None` for catch-alls.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Accept the navigation. No further entries run for this pass.
    ///
    /// Only the first of `resolve`/`next` counts.
    pub fn resolve(&self) {
        self.decide(Decision::Resolve);
    }

    /// Hand over to the next matching entry.
    ///
    /// Returns this handler's [`Exiting`] future, so post-exit cleanup can
    /// follow `ctx.next().await`.
    pub fn next(&self) -> Exiting {
        self.decide(Decision::Next);
        self.exiting.clone()
    }

    /// Settles when a later navigation begins exiting this route.
    pub fn exiting(&self) -> Exiting {
        self.exiting.clone()
    }

    /// Register a before-exit callback for this route activation.
    ///
    /// The callback runs on every later navigation attempt until the route is
    /// exited. It vetoes by calling [`BeforeExitEvent::prevent_default`],
    /// setting a non-empty return value, or returning a non-empty message.
    pub fn before_exit<F, R>(&self, callback: F)
    where
        F: Fn(&mut BeforeExitEvent) -> R + 'static,
        R: IntoExitMessage,
    {
        self.activation
            .register(Rc::new(move |event| callback(event).into_exit_message()));
    }

    fn decide(&self, decision: Decision) {
        let pending = self.decision.borrow_mut().take();
        match pending {
            Some(tx) => {
                trace_log!("Handler for '{}' decided {:?}", self.location, decision);
                if tx.send(decision).is_err() {
                    trace_log!("Pass for '{}' is no longer listening", self.location);
                }
            }
            None => {
                warn_log!(
                    "Handler for '{}' already called resolve() or next(); ignoring {:?}",
                    self.location,
                    decision
                );
            }
        }
    }
}

impl fmt::Debug for NavigationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContext")
            .field("location", &self.location)
            .field("params", &self.params)
            .field("pattern", &self.pattern)
            .field("exiting", &self.exiting)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> (NavigationContext, oneshot::Receiver<Decision>, SignalTrigger) {
        let (tx, rx) = oneshot::channel();
        let (trigger, exiting) = signal();
        let ctx = NavigationContext::new(
            Location::parse("/page"),
            RouteParams::new(),
            Some("/page".to_string()),
            Rc::new(RefCell::new(Some(tx))),
            Exiting(exiting),
            Rc::new(Activation::new(1)),
        );
        (ctx, rx, trigger)
    }

    #[test]
    fn test_signal_fires_all_clones() {
        let (trigger, signal) = signal();
        let other = signal.clone();
        assert!(!signal.is_settled());

        trigger.fire();
        assert!(signal.is_settled());
        pollster::block_on(other);
    }

    #[test]
    fn test_dropped_trigger_never_settles() {
        let (trigger, signal) = signal();
        drop(trigger);
        assert!(!signal.is_settled());

        let mut signal = signal;
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        assert!(Pin::new(&mut signal).poll(&mut cx).is_pending());
        // Polling again after cancellation must not panic.
        assert!(Pin::new(&mut signal).poll(&mut cx).is_pending());
    }

    #[test]
    fn test_resolve_is_single_use() {
        let (ctx, mut rx, _trigger) = context();
        ctx.resolve();
        ctx.next();

        assert!(matches!(rx.try_recv(), Ok(Some(Decision::Resolve))));
    }

    #[test]
    fn test_next_returns_own_exiting() {
        let (ctx, mut rx, trigger) = context();
        let exiting = ctx.next();
        assert!(matches!(rx.try_recv(), Ok(Some(Decision::Next))));
        assert!(!exiting.is_settled());

        trigger.fire();
        assert!(exiting.is_settled());
        assert!(ctx.exiting().is_settled());
    }

    #[test]
    fn test_before_exit_registers_with_activation() {
        let (ctx, _rx, _trigger) = context();
        ctx.before_exit(|event| event.prevent_default());
        ctx.before_exit(|_event| "unsaved");
        assert_eq!(ctx.activation.callback_count(), 2);
    }
}
