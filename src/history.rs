//! History environment interface.
//!
//! The router does not own the history stack. It drives whatever the host
//! provides through [`HistoryBackend`]: a browser's `history` object, a
//! webview bridge, or the in-memory [`MemoryHistory`] shipped here for tests
//! and non-browser hosts.
//!
//! # Notifications
//!
//! Backends report two kinds of [`HistoryEvent`] to the subscribed listener:
//!
//! - `Changed`: the current entry changed without the router pushing it
//!   (cursor moved by [`go`](HistoryBackend::go), native back/forward, a
//!   manually edited hash). `push` and `replace` never notify.
//! - `LinkActivated`: the user activated a link. The listener returns `true`
//!   when the router took over and the default action must be suppressed.
//!
//! Each entry the router writes carries a [`HistoryState`] with its position,
//! which is how the direction of an external traversal is recovered.

use std::cell::RefCell;
use std::rc::Rc;

/// Metadata the router stores with every history entry it writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryState {
    /// Position of the entry relative to the entry the router started on.
    pub index: i64,
}

impl HistoryState {
    /// Create state for the entry at `index`.
    pub fn new(index: i64) -> Self {
        Self { index }
    }
}

/// A link activation reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkActivation {
    /// The link target as written in the document.
    pub href: String,
    /// Mouse button, `0` for the primary button.
    pub button: u16,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    pub alt_key: bool,
    /// The link's `target` attribute.
    pub target: Option<String>,
    /// Whether the link carries a `download` attribute.
    pub download: bool,
    /// The link's `rel` attribute.
    pub rel: Option<String>,
    /// Whether another listener already prevented the default action.
    pub default_prevented: bool,
}

impl LinkActivation {
    /// A plain primary-button activation of `href`.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            button: 0,
            ctrl_key: false,
            meta_key: false,
            shift_key: false,
            alt_key: false,
            target: None,
            download: false,
            rel: None,
            default_prevented: false,
        }
    }

    /// Return `true` if nothing about the activation asks the browser to
    /// handle it itself (new tab, download, external link, ...).
    ///
    /// This only looks at the event; whether the href is routable is decided
    /// by the router.
    pub fn is_plain(&self) -> bool {
        let modified = self.ctrl_key || self.meta_key || self.shift_key || self.alt_key;
        let other_target = self
            .target
            .as_deref()
            .is_some_and(|t| !t.is_empty() && t != "_self");
        let external = self
            .rel
            .as_deref()
            .is_some_and(|rel| rel.split_whitespace().any(|r| r == "external"));

        self.button == 0
            && !modified
            && !other_target
            && !self.download
            && !external
            && !self.default_prevented
    }
}

/// Notification delivered by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// The current entry changed from outside the router's `push`/`replace`.
    Changed {
        raw: String,
        state: Option<HistoryState>,
    },
    /// A link was activated.
    LinkActivated(LinkActivation),
}

/// Listener installed by the router. Returns `true` to suppress the default
/// action of a link activation.
pub type HistoryListener = Rc<dyn Fn(HistoryEvent) -> bool>;

/// The history operations the router consumes.
pub trait HistoryBackend {
    /// The current raw location.
    fn current(&self) -> String;

    /// State stored with the current entry, if the router wrote it.
    fn current_state(&self) -> Option<HistoryState>;

    /// Add an entry after the current one, dropping any forward entries.
    fn push(&self, raw: &str, state: HistoryState);

    /// Overwrite the current entry.
    fn replace(&self, raw: &str, state: HistoryState);

    /// Move the cursor by `delta`. Returns `false` when there is no such
    /// entry. A successful move is reported later as [`HistoryEvent::Changed`].
    fn go(&self, delta: i64) -> bool;

    /// Install the listener, replacing any previous one.
    fn subscribe(&self, listener: HistoryListener);

    /// Remove the listener.
    fn unsubscribe(&self);

    /// The environment's exit confirmation prompt.
    fn confirm(&self, _message: &str) -> bool {
        true
    }
}

// ============================================================================
// MemoryHistory
// ============================================================================

/// One entry of a [`MemoryHistory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub raw: String,
    pub state: Option<HistoryState>,
}

struct MemoryState {
    entries: Vec<HistoryEntry>,
    current: usize,
    listener: Option<HistoryListener>,
    confirm_answer: bool,
    confirm_messages: Vec<String>,
}

/// An in-memory history stack.
///
/// Behaves like a browser session history: `push` truncates forward
/// entries, `go` moves the cursor and notifies the listener. The answer to
/// `confirm` is scripted with [`set_confirm`](Self::set_confirm) and every
/// prompt is recorded.
///
/// ```
/// use chain_navigator::{HistoryBackend, HistoryState, MemoryHistory};
///
/// let history = MemoryHistory::new("/");
/// history.push("/users", HistoryState::new(1));
/// history.push("/users/1", HistoryState::new(2));
/// assert!(history.go(-1));
/// assert_eq!(history.current(), "/users");
///
/// history.push("/posts", HistoryState::new(2));
/// assert_eq!(history.entries(), vec!["/", "/users", "/posts"]);
/// assert!(!history.go(1));
/// ```
pub struct MemoryHistory {
    inner: RefCell<MemoryState>,
}

impl MemoryHistory {
    /// Create a history holding a single entry.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: RefCell::new(MemoryState {
                entries: vec![HistoryEntry {
                    raw: initial.into(),
                    state: None,
                }],
                current: 0,
                listener: None,
                confirm_answer: true,
                confirm_messages: Vec::new(),
            }),
        }
    }

    /// Raw locations of all entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|e| e.raw.clone())
            .collect()
    }

    /// The current entry.
    pub fn current_entry(&self) -> HistoryEntry {
        let inner = self.inner.borrow();
        inner.entries[inner.current].clone()
    }

    /// Index of the current entry.
    pub fn cursor(&self) -> usize {
        self.inner.borrow().current
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Always `false`; a history holds at least one entry.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Check if there is an entry behind the cursor.
    pub fn can_go_back(&self) -> bool {
        self.inner.borrow().current > 0
    }

    /// Check if there is an entry ahead of the cursor.
    pub fn can_go_forward(&self) -> bool {
        let inner = self.inner.borrow();
        inner.current + 1 < inner.entries.len()
    }

    /// Script the answer of the next `confirm` prompts.
    pub fn set_confirm(&self, answer: bool) {
        self.inner.borrow_mut().confirm_answer = answer;
    }

    /// Messages of every `confirm` prompt so far.
    pub fn confirm_messages(&self) -> Vec<String> {
        self.inner.borrow().confirm_messages.clone()
    }

    /// Check if a listener is installed.
    pub fn is_subscribed(&self) -> bool {
        self.inner.borrow().listener.is_some()
    }

    /// Simulate the user entering a new location (e.g. editing the hash):
    /// a new entry without router state is pushed and reported.
    pub fn user_navigate(&self, raw: impl Into<String>) {
        let raw = raw.into();
        {
            let mut inner = self.inner.borrow_mut();
            let keep = inner.current + 1;
            inner.entries.truncate(keep);
            inner.entries.push(HistoryEntry {
                raw: raw.clone(),
                state: None,
            });
            inner.current += 1;
        }
        self.notify(HistoryEvent::Changed { raw, state: None });
    }

    /// Simulate a link activation. Returns `true` if the listener took over.
    pub fn click(&self, link: LinkActivation) -> bool {
        self.notify(HistoryEvent::LinkActivated(link))
    }

    // The borrow is released before the listener runs so it may call back in.
    fn notify(&self, event: HistoryEvent) -> bool {
        let listener = self.inner.borrow().listener.clone();
        listener.is_some_and(|listener| listener(event))
    }
}

impl HistoryBackend for MemoryHistory {
    fn current(&self) -> String {
        self.current_entry().raw
    }

    fn current_state(&self) -> Option<HistoryState> {
        self.current_entry().state
    }

    fn push(&self, raw: &str, state: HistoryState) {
        let mut inner = self.inner.borrow_mut();
        let keep = inner.current + 1;
        inner.entries.truncate(keep);
        inner.entries.push(HistoryEntry {
            raw: raw.to_string(),
            state: Some(state),
        });
        inner.current += 1;
    }

    fn replace(&self, raw: &str, state: HistoryState) {
        let mut inner = self.inner.borrow_mut();
        let current = inner.current;
        inner.entries[current] = HistoryEntry {
            raw: raw.to_string(),
            state: Some(state),
        };
    }

    fn go(&self, delta: i64) -> bool {
        let entry = {
            let mut inner = self.inner.borrow_mut();
            let target = i64::try_from(inner.current)
                .ok()
                .and_then(|current| current.checked_add(delta))
                .and_then(|target| usize::try_from(target).ok())
                .filter(|&target| target < inner.entries.len() && delta != 0);
            let Some(target) = target else {
                return false;
            };
            inner.current = target;
            inner.entries[target].clone()
        };
        self.notify(HistoryEvent::Changed {
            raw: entry.raw,
            state: entry.state,
        });
        true
    }

    fn subscribe(&self, listener: HistoryListener) {
        self.inner.borrow_mut().listener = Some(listener);
    }

    fn unsubscribe(&self) {
        self.inner.borrow_mut().listener = None;
    }

    fn confirm(&self, message: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        inner.confirm_messages.push(message.to_string());
        inner.confirm_answer
    }
}
