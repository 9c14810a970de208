//! Navigation state machine.
//!
//! Every navigation request becomes one *pass* through the engine:
//!
//! ```text
//! Idle ──request──▶ ExitCheck ──allowed──▶ Dispatching ──resolve/exhausted──▶ Settled ──▶ Idle
//!                       │                       │
//!                       └──vetoed──▶ Idle       └──handler error──▶ Idle
//! ```
//!
//! During `Dispatching` the matching handlers run one at a time on the
//! router's spawner. The engine waits for each handler's decision:
//! `resolve()` settles the pass, `next()` moves on, an error before either
//! aborts it. A handler that returns without deciding stalls the pass until a
//! newer one takes over.
//!
//! Requests overlap freely and the latest one wins. When a newer pass starts
//! dispatching, the older one is superseded: its remaining handlers never
//! run, it never settles and its [`Routing`] never completes. The older
//! handler's future is not cancelled; its late `resolve()`/`next()` are
//! simply ignored.

use crate::chain::MiddlewareChain;
use crate::context::{signal, Decision, DecisionSlot, Exiting, NavigationContext, Routing, Signal, SignalTrigger};
use crate::error::{NavigationError, NavigationOutcome};
use crate::guards::{Activation, ConfirmFn, ExitGuard};
use crate::location::Location;
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use futures::channel::oneshot;
use futures::future::{self, Either};
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Observable state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No pass is running.
    Idle,
    /// Before-exit callbacks of the active route are being consulted.
    ExitCheck,
    /// Handlers are running.
    Dispatching,
    /// A pass settled and is updating the current route.
    Settled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::ExitCheck => "exit-check",
            Phase::Dispatching => "dispatching",
            Phase::Settled => "settled",
        };
        f.write_str(name)
    }
}

/// The dispatching pass, if any.
struct InFlight {
    id: u64,
    activation: Rc<Activation>,
    supersede: SignalTrigger,
    routing: SignalTrigger,
}

struct EngineState {
    phase: Phase,
    current: Option<Location>,
    /// Id of the most recent request.
    last_request: u64,
    in_flight: Option<InFlight>,
    routing: Routing,
}

enum Dispatched {
    Resolved,
    Exhausted,
    Superseded,
}

pub(crate) struct NavigationEngine {
    state: RefCell<EngineState>,
    guard: ExitGuard,
    chain: RefCell<MiddlewareChain>,
    spawner: Rc<dyn LocalSpawn>,
}

impl NavigationEngine {
    pub(crate) fn new(spawner: Rc<dyn LocalSpawn>) -> Self {
        // Nothing fires the initial routing signal; the first dispatching
        // pass replaces it.
        let (_, routing) = signal();
        Self {
            state: RefCell::new(EngineState {
                phase: Phase::Idle,
                current: None,
                last_request: 0,
                in_flight: None,
                routing: Routing(routing),
            }),
            guard: ExitGuard::new(),
            chain: RefCell::new(MiddlewareChain::new()),
            spawner,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub(crate) fn current(&self) -> Option<Location> {
        self.state.borrow().current.clone()
    }

    pub(crate) fn routing(&self) -> Routing {
        self.state.borrow().routing.clone()
    }

    pub(crate) fn spawner(&self) -> &Rc<dyn LocalSpawn> {
        &self.spawner
    }

    /// Mutate the chain. Passes already dispatching keep the chain they
    /// started with.
    pub(crate) fn update_chain<R>(&self, f: impl FnOnce(&mut MiddlewareChain) -> R) -> R {
        f(&mut self.chain.borrow_mut())
    }

    fn is_latest(&self, id: u64) -> bool {
        self.state.borrow().last_request == id
    }

    fn set_phase_if_latest(&self, id: u64, phase: Phase) {
        let mut state = self.state.borrow_mut();
        if state.last_request == id {
            state.phase = phase;
        }
    }

    /// Run one pass for `location`.
    ///
    /// `commit` runs once the pass settles, before the new route becomes
    /// active, with the settled location and the one it replaced; the
    /// adapter writes history there.
    pub(crate) async fn run<F>(
        &self,
        location: Location,
        confirm: &ConfirmFn,
        commit: F,
    ) -> Result<NavigationOutcome, NavigationError>
    where
        F: FnOnce(&Location, Option<&Location>),
    {
        let id = {
            let mut state = self.state.borrow_mut();
            state.last_request += 1;
            state.phase = Phase::ExitCheck;
            state.last_request
        };
        debug_log!("Pass {} for '{}': checking exit", id, location);

        loop {
            let checked = self.guard.active_token();
            if !self.guard.check(confirm).await {
                warn_log!("Pass {} for '{}' vetoed", id, location);
                self.set_phase_if_latest(id, Phase::Idle);
                return Ok(NavigationOutcome::Vetoed);
            }
            if !self.is_latest(id) {
                debug_log!("Pass {} superseded during exit check", id);
                return Ok(NavigationOutcome::Superseded);
            }
            // An older pass may have settled while the confirmation was
            // pending; its route has not been asked yet.
            if self.guard.active_token() == checked {
                break;
            }
            debug_log!("Active route changed during exit check of pass {}", id);
        }

        let activation = Rc::new(Activation::new(id));
        let (supersede, superseded) = signal();
        let (routing_trigger, routing) = signal();
        let previous = {
            let mut state = self.state.borrow_mut();
            state.phase = Phase::Dispatching;
            state.routing = Routing(routing);
            state.in_flight.replace(InFlight {
                id,
                activation: activation.clone(),
                supersede,
                routing: routing_trigger,
            })
        };

        self.guard.exit_active();
        if let Some(previous) = previous {
            debug_log!("Pass {} supersedes pass {}", id, previous.id);
            previous.supersede.fire();
            previous.activation.exit();
        }

        debug_log!("Pass {} for '{}': dispatching", id, location);
        let dispatched = match self.dispatch(&location, &activation, superseded.clone()).await {
            Ok(dispatched) => dispatched,
            Err(error) => {
                self.abandon(id, &activation);
                warn_log!("Pass {} for '{}' failed: {}", id, location, error);
                return Err(error);
            }
        };

        let outcome = match dispatched {
            Dispatched::Superseded => return Ok(NavigationOutcome::Superseded),
            _ if superseded.is_settled() => return Ok(NavigationOutcome::Superseded),
            Dispatched::Resolved => NavigationOutcome::Resolved(location.clone()),
            Dispatched::Exhausted => NavigationOutcome::Exhausted(location.clone()),
        };

        let (previous, finished) = {
            let mut state = self.state.borrow_mut();
            if state.last_request == id {
                state.phase = Phase::Settled;
            }
            let previous = state.current.replace(location.clone());
            let finished = match state.in_flight.take() {
                Some(flight) if flight.id == id => Some(flight),
                other => {
                    state.in_flight = other;
                    None
                }
            };
            (previous, finished)
        };

        commit(&location, previous.as_ref());
        self.guard.activate(activation);
        if let Some(flight) = finished {
            flight.routing.fire();
        }
        self.set_phase_if_latest(id, Phase::Idle);

        if outcome.is_resolved() {
            info_log!("Navigated to '{}'", location);
        } else {
            info_log!("Navigated to '{}' (no handler resolved)", location);
        }
        Ok(outcome)
    }

    async fn dispatch(
        &self,
        location: &Location,
        activation: &Rc<Activation>,
        mut superseded: Signal,
    ) -> Result<Dispatched, NavigationError> {
        let chain = self.chain.borrow().clone();

        for matched in chain.matches(location) {
            if superseded.is_settled() {
                return Ok(Dispatched::Superseded);
            }

            let (handler, pattern, params, relative) = matched.into_parts();
            trace_log!(
                "Invoking handler '{}' for '{}'",
                pattern.as_deref().unwrap_or("*"),
                relative
            );

            let (tx, rx) = oneshot::channel();
            let slot: DecisionSlot = Rc::new(RefCell::new(Some(tx)));
            let (exit_trigger, exiting) = signal();
            activation.add_exit(exit_trigger);

            let ctx = NavigationContext::new(
                relative,
                params,
                pattern,
                slot.clone(),
                Exiting(exiting),
                activation.clone(),
            );
            let task = handler(ctx);
            let path = location.path().to_string();
            self.spawner.spawn_local(async move {
                if let Err(error) = task.await {
                    let pending = slot.borrow_mut().take();
                    match pending {
                        Some(tx) => {
                            if tx.send(Decision::Failed(error)).is_err() {
                                trace_log!("Failed handler for '{}' has no listener", path);
                            }
                        }
                        None => {
                            error_log!("Handler for '{}' failed after deciding: {}", path, error);
                        }
                    }
                }
            })?;

            match future::select(rx, &mut superseded).await {
                Either::Left((Ok(Decision::Resolve), _)) => return Ok(Dispatched::Resolved),
                Either::Left((Ok(Decision::Next), _)) => {}
                Either::Left((Ok(Decision::Failed(error)), _)) => {
                    return Err(NavigationError::Handler {
                        path: location.path().to_string(),
                        error,
                    });
                }
                Either::Left((Err(oneshot::Canceled), _)) => {
                    warn_log!(
                        "Handler for '{}' returned without calling resolve() or next(); pass stalls",
                        location
                    );
                    (&mut superseded).await;
                    return Ok(Dispatched::Superseded);
                }
                Either::Right(((), _)) => return Ok(Dispatched::Superseded),
            }
        }

        Ok(Dispatched::Exhausted)
    }

    /// Drop a failed pass without touching the current route.
    fn abandon(&self, id: u64, activation: &Activation) {
        {
            let mut state = self.state.borrow_mut();
            if state.in_flight.as_ref().is_some_and(|flight| flight.id == id) {
                state.in_flight = None;
            }
            if state.last_request == id {
                state.phase = Phase::Idle;
            }
        }
        activation.exit();
    }
}
