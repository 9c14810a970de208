//! Middleware chains.
//!
//! A [`MiddlewareChain`] is an ordered list of entries. Each entry has an
//! optional [`RoutePattern`] (`None` matches everything) and is either a leaf
//! handler or a mounted sub-chain:
//!
//! | Method | Pattern | Entry |
//! |--------|---------|-------|
//! | [`route`](MiddlewareChain::route) | exact match | handler |
//! | [`any`](MiddlewareChain::any) | always | handler |
//! | [`mount`](MiddlewareChain::mount) | prefix match | sub-chain |
//! | [`mount_any`](MiddlewareChain::mount_any) | always | sub-chain |
//!
//! A mounted chain sees the location relative to its mount point: the path is
//! replaced by the pattern's remainder, and the mount's params are merged into
//! the params of every entry inside (inner names win).
//!
//! # Example
//!
//! ```
//! use chain_navigator::{Location, MiddlewareChain};
//!
//! let admin = MiddlewareChain::new()
//!     .route("/users/:id", |ctx| async move {
//!         ctx.resolve();
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let chain = MiddlewareChain::new()
//!     .any(|ctx| async move {
//!         ctx.next();
//!         Ok(())
//!     })
//!     .mount("/admin", admin)
//!     .unwrap();
//!
//! let matched: Vec<_> = chain.matches(&Location::parse("/admin/users/7")).collect();
//! assert_eq!(matched.len(), 2);
//! assert_eq!(matched[1].location().path(), "/users/7");
//! assert_eq!(matched[1].params().get("id"), Some("7"));
//! ```

use crate::context::NavigationContext;
use crate::error::{HandlerError, NavigationError};
use crate::location::Location;
use crate::matching::RoutePattern;
use crate::params::RouteParams;
use crate::trace_log;
use futures::future::{FutureExt, LocalBoxFuture};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Type-erased route handler.
pub type HandlerFn = Rc<dyn Fn(NavigationContext) -> LocalBoxFuture<'static, Result<(), HandlerError>>>;

pub(crate) fn boxed_handler<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(NavigationContext) -> Fut + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + 'static,
{
    Rc::new(move |ctx| handler(ctx).boxed_local())
}

enum EntryKind {
    Leaf(HandlerFn),
    Mounted(MiddlewareChain),
}

struct MiddlewareEntry {
    pattern: Option<RoutePattern>,
    kind: EntryKind,
}

/// An ordered list of handlers and mounted sub-chains.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    entries: Vec<Rc<MiddlewareEntry>>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for paths matching `pattern` exactly.
    pub fn route<F, Fut>(mut self, pattern: &str, handler: F) -> Result<Self, NavigationError>
    where
        F: Fn(NavigationContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + 'static,
    {
        self.push_route(pattern, boxed_handler(handler))?;
        Ok(self)
    }

    /// Append a handler that runs for every location.
    pub fn any<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(NavigationContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + 'static,
    {
        self.push_entry(None, EntryKind::Leaf(boxed_handler(handler)));
        self
    }

    /// Mount a sub-chain under `pattern` (prefix match).
    pub fn mount(mut self, pattern: &str, chain: MiddlewareChain) -> Result<Self, NavigationError> {
        self.push_mount(pattern, chain)?;
        Ok(self)
    }

    /// Mount a sub-chain that sees every location unchanged.
    pub fn mount_any(mut self, chain: MiddlewareChain) -> Self {
        self.push_entry(None, EntryKind::Mounted(chain));
        self
    }

    pub(crate) fn push_route(&mut self, pattern: &str, handler: HandlerFn) -> Result<(), NavigationError> {
        let pattern = RoutePattern::parse(pattern)?;
        self.push_entry(Some(pattern), EntryKind::Leaf(handler));
        Ok(())
    }

    pub(crate) fn push_any(&mut self, handler: HandlerFn) {
        self.push_entry(None, EntryKind::Leaf(handler));
    }

    pub(crate) fn push_mount(&mut self, pattern: &str, chain: MiddlewareChain) -> Result<(), NavigationError> {
        let pattern = RoutePattern::parse(pattern)?;
        self.push_entry(Some(pattern), EntryKind::Mounted(chain));
        Ok(())
    }

    pub(crate) fn push_mount_any(&mut self, chain: MiddlewareChain) {
        self.push_entry(None, EntryKind::Mounted(chain));
    }

    fn push_entry(&mut self, pattern: Option<RoutePattern>, kind: EntryKind) {
        self.entries.push(Rc::new(MiddlewareEntry { pattern, kind }));
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lazily yield the handlers matching `location`, in registration order,
    /// descending into mounted chains.
    pub fn matches(&self, location: &Location) -> ChainMatches {
        ChainMatches {
            stack: vec![Frame {
                entries: self.entries.clone(),
                next: 0,
                location: location.clone(),
                params: RouteParams::new(),
            }],
        }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in &self.entries {
            let pattern = entry.pattern.as_ref().map_or("*", RoutePattern::as_str);
            match &entry.kind {
                EntryKind::Leaf(_) => list.entry(&format_args!("route {pattern}")),
                EntryKind::Mounted(chain) => {
                    list.entry(&format_args!("mount {pattern} ({} entries)", chain.len()))
                }
            };
        }
        list.finish()
    }
}

// ============================================================================
// Matching
// ============================================================================

/// A leaf handler selected for a location.
#[derive(Clone)]
pub struct MatchedHandler {
    handler: HandlerFn,
    pattern: Option<String>,
    params: RouteParams,
    location: Location,
}

impl MatchedHandler {
    /// The entry's pattern, `None` for catch-alls.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Params bound by the entry and its enclosing mounts.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// The location relative to the innermost mount point.
    pub fn location(&self) -> &Location {
        &self.location
    }

    pub(crate) fn into_parts(self) -> (HandlerFn, Option<String>, RouteParams, Location) {
        (self.handler, self.pattern, self.params, self.location)
    }
}

impl fmt::Debug for MatchedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchedHandler")
            .field("pattern", &self.pattern)
            .field("params", &self.params)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

struct Frame {
    entries: Vec<Rc<MiddlewareEntry>>,
    next: usize,
    location: Location,
    params: RouteParams,
}

enum Step {
    Yield(MatchedHandler),
    Descend(Frame),
    Skip,
    Pop,
}

/// Iterator returned by [`MiddlewareChain::matches`].
pub struct ChainMatches {
    stack: Vec<Frame>,
}

impl ChainMatches {
    fn step(frame: &mut Frame) -> Step {
        let Some(entry) = frame.entries.get(frame.next).cloned() else {
            return Step::Pop;
        };
        frame.next += 1;

        match &entry.kind {
            EntryKind::Leaf(handler) => {
                let params = match &entry.pattern {
                    None => frame.params.clone(),
                    Some(pattern) => match pattern.match_path(frame.location.path()) {
                        Some(m) => RouteParams::merge(&frame.params, &m.params),
                        None => return Step::Skip,
                    },
                };
                trace_log!(
                    "Entry '{}' matches '{}'",
                    entry.pattern.as_ref().map_or("*", RoutePattern::as_str),
                    frame.location
                );
                Step::Yield(MatchedHandler {
                    handler: handler.clone(),
                    pattern: entry.pattern.as_ref().map(|p| p.as_str().to_string()),
                    params,
                    location: frame.location.clone(),
                })
            }
            EntryKind::Mounted(chain) => {
                let (params, location) = match &entry.pattern {
                    None => (frame.params.clone(), frame.location.clone()),
                    Some(pattern) => match pattern.match_prefix(frame.location.path()) {
                        Some(m) => (
                            RouteParams::merge(&frame.params, &m.params),
                            frame.location.with_path(&m.remainder),
                        ),
                        None => return Step::Skip,
                    },
                };
                trace_log!("Descending into mount for '{}'", location);
                Step::Descend(Frame {
                    entries: chain.entries.clone(),
                    next: 0,
                    location,
                    params,
                })
            }
        }
    }
}

impl Iterator for ChainMatches {
    type Item = MatchedHandler;

    fn next(&mut self) -> Option<MatchedHandler> {
        loop {
            let frame = self.stack.last_mut()?;
            match Self::step(frame) {
                Step::Yield(matched) => return Some(matched),
                Step::Descend(frame) => self.stack.push(frame),
                Step::Skip => {}
                Step::Pop => {
                    self.stack.pop();
                }
            }
        }
    }
}
