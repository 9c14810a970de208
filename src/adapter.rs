//! Keeps the history stack and the engine in step.
//!
//! Outgoing requests (`navigate`, `replace`) are dispatched first and written
//! to history only once their pass settles. Traversals (`back`, `forward`)
//! move the history cursor first and are dispatched when the backend reports
//! the change, like any external change.
//!
//! Each entry the adapter writes carries its position as [`HistoryState`].
//! When a change arrives, the difference between that position and the
//! adapter's cursor is the distance travelled. If the pass for the new entry
//! is vetoed or fails, the adapter moves the same distance back and swallows
//! the notification that move produces, so the visible location returns to
//! the route that is still current.

use crate::engine::NavigationEngine;
use crate::error::{NavigationError, NavigationOutcome};
use crate::guards::ConfirmFn;
use crate::history::{HistoryBackend, HistoryState};
use crate::location::Location;
use crate::options::HashMode;
use crate::{debug_log, error_log, info_log, trace_log};
use futures::channel::oneshot;
use std::cell::RefCell;
use std::rc::Rc;

type TraversalResult = Result<NavigationOutcome, NavigationError>;

struct AdapterState {
    started: bool,
    /// Whether `begin` ran before; a restart keeps counting from `cursor`.
    resumed: bool,
    /// Position of the entry the adapter believes is current.
    cursor: i64,
    /// Change notifications still expected from our own reverts.
    suppressed: usize,
    next_traversal: u64,
    /// Callers of `back`/`forward` waiting for the pass their move produces,
    /// oldest first.
    traversals: Vec<PendingTraversal>,
}

/// A `back`/`forward` call waiting for the change that lands on `index`.
struct PendingTraversal {
    id: u64,
    index: i64,
    tx: oneshot::Sender<TraversalResult>,
}

impl AdapterState {
    /// Where history will be once every pending traversal has landed.
    fn projected_index(&self) -> i64 {
        self.traversals
            .last()
            .map_or(self.cursor, |traversal| traversal.index)
    }

    /// Claim the traversal that expects a change to `index`.
    ///
    /// Traversals queued before it are dropped, which resolves them as
    /// superseded.
    fn claim_traversal(&mut self, index: i64) -> Option<oneshot::Sender<TraversalResult>> {
        let position = self
            .traversals
            .iter()
            .position(|traversal| traversal.index == index)?;
        self.traversals
            .drain(..=position)
            .last()
            .map(|traversal| traversal.tx)
    }
}

pub(crate) struct LocationAdapter {
    backend: Rc<dyn HistoryBackend>,
    hash: HashMode,
    state: RefCell<AdapterState>,
}

impl LocationAdapter {
    pub(crate) fn new(backend: Rc<dyn HistoryBackend>, hash: HashMode) -> Self {
        Self {
            backend,
            hash,
            state: RefCell::new(AdapterState {
                started: false,
                resumed: false,
                cursor: 0,
                suppressed: 0,
                next_traversal: 0,
                traversals: Vec::new(),
            }),
        }
    }

    pub(crate) fn backend(&self) -> &Rc<dyn HistoryBackend> {
        &self.backend
    }

    pub(crate) fn is_started(&self) -> bool {
        self.state.borrow().started
    }

    fn ensure_started(&self) -> Result<(), NavigationError> {
        if self.is_started() {
            Ok(())
        } else {
            Err(NavigationError::NotStarted)
        }
    }

    /// The application location encoded in a raw history location.
    pub(crate) fn to_location(&self, raw: &str) -> Location {
        match &self.hash {
            HashMode::Disabled => Location::parse(raw),
            HashMode::Enabled { prefix } => {
                let fragment = raw.split_once('#').map_or("", |(_, fragment)| fragment);
                let target = fragment.strip_prefix(prefix.as_str()).unwrap_or(fragment);
                Location::parse(target)
            }
        }
    }

    /// The raw history location for an application location.
    pub(crate) fn to_raw(&self, location: &Location) -> String {
        match &self.hash {
            HashMode::Disabled => location.href(),
            HashMode::Enabled { prefix } => {
                let current = self.backend.current();
                let base = current.split_once('#').map_or(current.as_str(), |(base, _)| base);
                format!("{}#{}{}", base, prefix, location.href())
            }
        }
    }

    /// Mark the adapter started and stamp the current entry.
    ///
    /// Returns the location to dispatch.
    pub(crate) fn begin(&self) -> Result<Location, NavigationError> {
        if self.is_started() {
            return Err(NavigationError::AlreadyStarted);
        }
        let raw = self.backend.current();
        let index = match self.backend.current_state() {
            Some(state) => state.index,
            None => {
                let index = {
                    let state = self.state.borrow();
                    if state.resumed {
                        state.cursor + 1
                    } else {
                        0
                    }
                };
                self.backend.replace(&raw, HistoryState::new(index));
                index
            }
        };
        {
            let mut state = self.state.borrow_mut();
            state.started = true;
            state.resumed = true;
            state.cursor = index;
            state.suppressed = 0;
        }
        info_log!("Router started at '{}' (history index {})", raw, index);
        Ok(self.to_location(&raw))
    }

    pub(crate) fn stop(&self) {
        let pending = {
            let mut state = self.state.borrow_mut();
            state.started = false;
            std::mem::take(&mut state.traversals)
        };
        self.backend.unsubscribe();
        // Waiting traversals resolve as superseded.
        drop(pending);
        info_log!("Router stopped");
    }

    pub(crate) async fn navigate(
        &self,
        engine: &NavigationEngine,
        confirm: &ConfirmFn,
        target: &str,
    ) -> TraversalResult {
        self.ensure_started()?;
        let location = Location::parse(target);
        debug_log!("navigate('{}')", location);
        engine
            .run(location, confirm, |settled, previous| {
                self.write(settled, previous != Some(settled));
            })
            .await
    }

    pub(crate) async fn replace(
        &self,
        engine: &NavigationEngine,
        confirm: &ConfirmFn,
        target: &str,
    ) -> TraversalResult {
        self.ensure_started()?;
        let location = Location::parse(target);
        debug_log!("replace('{}')", location);
        engine
            .run(location, confirm, |settled, _| self.write(settled, false))
            .await
    }

    /// Move the history cursor and wait for the resulting pass.
    pub(crate) async fn traverse(&self, delta: i64) -> TraversalResult {
        self.ensure_started()?;
        let (tx, rx) = oneshot::channel();
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_traversal;
            state.next_traversal += 1;
            let index = state.projected_index() + delta;
            state.traversals.push(PendingTraversal { id, index, tx });
            id
        };

        if !self.backend.go(delta) {
            self.state
                .borrow_mut()
                .traversals
                .retain(|traversal| traversal.id != id);
            debug_log!("Traversal by {} has nowhere to go", delta);
            return Ok(NavigationOutcome::Unchanged);
        }
        // A later traversal landing first, or stop(), drops our sender.
        rx.await.unwrap_or(Ok(NavigationOutcome::Superseded))
    }

    /// Dispatch the location current at start.
    pub(crate) async fn dispatch_initial(
        &self,
        engine: &NavigationEngine,
        confirm: &ConfirmFn,
        location: Location,
    ) -> TraversalResult {
        engine.run(location, confirm, |_, _| {}).await
    }

    /// React to a change notification from the backend.
    pub(crate) async fn handle_change(
        &self,
        engine: &NavigationEngine,
        confirm: &ConfirmFn,
        raw: String,
        state: Option<HistoryState>,
    ) {
        let cursor = {
            let mut adapter = self.state.borrow_mut();
            if !adapter.started {
                trace_log!("Ignoring change to '{}': router stopped", raw);
                return;
            }
            if adapter.suppressed > 0 {
                adapter.suppressed -= 1;
                trace_log!("Ignoring change to '{}' caused by a revert", raw);
                return;
            }
            adapter.cursor
        };

        let location = self.to_location(&raw);
        let (index, delta) = match state {
            Some(state) => (state.index, state.index - cursor),
            None => {
                // Foreign entry: treat as a fresh step forward.
                let index = cursor + 1;
                self.backend.replace(&raw, HistoryState::new(index));
                (index, 1)
            }
        };
        let pending = self.state.borrow_mut().claim_traversal(index);

        if delta == 0 && engine.current().as_ref() == Some(&location) {
            trace_log!("Change to '{}' is already current", raw);
            deliver(pending, Ok(NavigationOutcome::Unchanged));
            return;
        }

        debug_log!("History moved by {} to '{}'", delta, raw);
        self.state.borrow_mut().cursor = index;
        let result = engine.run(location, confirm, |_, _| {}).await;

        if matches!(result, Ok(NavigationOutcome::Vetoed) | Err(_)) {
            self.revert(delta);
        }
        deliver(pending, result);
    }

    fn write(&self, location: &Location, push: bool) {
        let raw = self.to_raw(location);
        let index = {
            let mut state = self.state.borrow_mut();
            if push {
                state.cursor += 1;
            }
            state.cursor
        };
        if push {
            self.backend.push(&raw, HistoryState::new(index));
        } else {
            self.backend.replace(&raw, HistoryState::new(index));
        }
    }

    fn revert(&self, delta: i64) {
        if delta == 0 {
            return;
        }
        {
            let mut state = self.state.borrow_mut();
            state.suppressed += 1;
            state.cursor -= delta;
        }
        debug_log!("Reverting history by {}", -delta);
        if !self.backend.go(-delta) {
            let mut state = self.state.borrow_mut();
            state.suppressed -= 1;
            error_log!("History refused to revert by {}", -delta);
        }
    }
}

fn deliver(pending: Option<oneshot::Sender<TraversalResult>>, result: TraversalResult) {
    match pending {
        Some(tx) => {
            if tx.send(result).is_err() {
                trace_log!("Traversal caller went away");
            }
        }
        None => {
            if let Err(error) = result {
                error_log!("Navigation from history change failed: {}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;

    fn adapter(initial: &str, hash: HashMode) -> (LocationAdapter, Rc<MemoryHistory>) {
        let history = Rc::new(MemoryHistory::new(initial));
        (LocationAdapter::new(history.clone(), hash), history)
    }

    #[test]
    fn test_path_mode_round_trip() {
        let (adapter, _history) = adapter("/a", HashMode::Disabled);
        let location = adapter.to_location("/users/1?tab=2#top");
        assert_eq!(location.path(), "/users/1");
        assert_eq!(adapter.to_raw(&location), "/users/1?tab=2#top");
    }

    #[test]
    fn test_hash_mode_with_prefix() {
        let hash = HashMode::Enabled {
            prefix: "!".to_string(),
        };
        let (adapter, _history) = adapter("/index.html#!/users?x=1", hash);

        let location = adapter.to_location("/index.html#!/users?x=1");
        assert_eq!(location.path(), "/users");
        assert_eq!(location.query().get("x"), Some("1"));
        assert_eq!(adapter.to_location("/index.html").path(), "/");
        assert_eq!(
            adapter.to_raw(&Location::parse("/posts")),
            "/index.html#!/posts"
        );
    }

    #[test]
    fn test_begin_stamps_state_once() {
        let (adapter, history) = adapter("/", HashMode::Disabled);
        assert!(matches!(
            pollster::block_on(adapter.traverse(-1)),
            Err(NavigationError::NotStarted)
        ));

        assert_eq!(adapter.begin().unwrap().path(), "/");
        assert_eq!(history.current_state(), Some(HistoryState::new(0)));
        assert_eq!(adapter.begin(), Err(NavigationError::AlreadyStarted));
    }

    #[test]
    fn test_traverse_with_nowhere_to_go() {
        let (adapter, _history) = adapter("/", HashMode::Disabled);
        adapter.begin().unwrap();
        assert_eq!(
            pollster::block_on(adapter.traverse(1)),
            Ok(NavigationOutcome::Unchanged)
        );
    }

    #[test]
    fn test_traversals_are_claimed_by_landing_index() {
        let (adapter, _history) = adapter("/", HashMode::Disabled);
        let mut state = adapter.state.borrow_mut();
        state.cursor = 2;

        let mut receivers = Vec::new();
        for id in 0..3 {
            let (tx, rx) = oneshot::channel();
            let index = state.projected_index() - 1;
            state.traversals.push(PendingTraversal { id, index, tx });
            receivers.push(rx);
        }
        assert_eq!(state.projected_index(), -1);

        assert!(state.claim_traversal(5).is_none());
        assert_eq!(state.traversals.len(), 3);

        // Landing on 0 skips past the traversal that expected 1.
        let claimed = state.claim_traversal(0).unwrap();
        claimed.send(Ok(NavigationOutcome::Unchanged)).unwrap();
        assert_eq!(state.traversals.len(), 1);
        assert_eq!(state.projected_index(), -1);

        let mut receivers = receivers.into_iter();
        assert!(matches!(
            receivers.next().unwrap().try_recv(),
            Err(oneshot::Canceled)
        ));
        assert_eq!(
            receivers.next().unwrap().try_recv(),
            Ok(Some(Ok(NavigationOutcome::Unchanged)))
        );
    }

    #[test]
    fn test_stop_rejects_navigation() {
        let (adapter, _history) = adapter("/", HashMode::Disabled);
        adapter.begin().unwrap();
        adapter.stop();
        assert!(!adapter.is_started());
        assert!(adapter.ensure_started().is_err());
    }
}
