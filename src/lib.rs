//! # chain-navigator
//!
//! A client-side navigation engine. Location changes (explicit navigation,
//! history traversal, link activations) are dispatched through an ordered
//! chain of asynchronous handlers that can accept the route, pass it on, or
//! keep the user where they are.
//!
//! ## Pieces
//!
//! - [`RoutePattern`]: `/users/:id`, `/files/*path` matching with params.
//! - [`MiddlewareChain`]: ordered handlers and mounted sub-chains.
//! - [`Router`]: owns the chain, runs the navigation state machine and
//!   keeps the [`HistoryBackend`] in step with it.
//! - [`NavigationContext`]: what a handler receives: location, params,
//!   `resolve()`, `next()`, `exiting()` and `before_exit()`.
//!
//! ## Handlers
//!
//! A handler answers exactly once: `resolve()` accepts the location and
//! stops the chain, `next()` hands over to the next matching entry. Both can
//! be followed by more work; `ctx.next().await` continues once a later
//! navigation leaves the route.
//!
//! ```
//! use chain_navigator::{HistoryBackend, MemoryHistory, Router, RouterOptions};
//! use futures::executor::LocalPool;
//! use std::rc::Rc;
//!
//! let mut pool = LocalPool::new();
//! let history = Rc::new(MemoryHistory::new("/"));
//! let router = Router::new(history.clone(), pool.spawner(), RouterOptions::new());
//!
//! router.any(|ctx| async move {
//!     println!("entering {}", ctx.path());
//!     ctx.next().await;
//!     println!("left {}", ctx.path());
//!     Ok(())
//! });
//! router.route("/editor", |ctx| async move {
//!     ctx.before_exit(|_event| "Discard unsaved changes?");
//!     ctx.resolve();
//!     Ok(())
//! })?;
//!
//! pool.run_until(router.start())?;
//! pool.run_until(router.navigate("/editor"))?;
//!
//! history.set_confirm(false);
//! let outcome = pool.run_until(router.navigate("/"))?;
//! assert!(outcome.is_vetoed());
//! assert_eq!(history.current(), "/editor");
//! assert_eq!(history.confirm_messages(), vec!["Discard unsaved changes?"]);
//! # Ok::<(), chain_navigator::NavigationError>(())
//! ```
//!
//! ## Concurrency
//!
//! Everything runs on one thread. Handlers are spawned on the
//! [`LocalSpawn`](futures::task::LocalSpawn) given to [`Router::new`]; a
//! `futures::executor::LocalPool` or a tokio `LocalSet` both work. Requests
//! may overlap and the latest one wins.
//!
//! ## Features
//!
//! - `log` (default): diagnostics through the `log` crate.
//! - `tracing`: diagnostics through `tracing` instead.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod adapter;
mod chain;
mod context;
mod engine;
mod error;
mod guards;
mod history;
mod location;
mod options;
mod params;
mod router;

pub mod logging;
pub mod matching;

pub use chain::{ChainMatches, HandlerFn, MatchedHandler, MiddlewareChain};
pub use context::{Exiting, NavigationContext, Routing};
pub use engine::Phase;
pub use error::{HandlerError, NavigationError, NavigationOutcome};
pub use guards::{BeforeExitEvent, BeforeExitFn, ConfirmFn, IntoExitMessage};
pub use history::{
    HistoryBackend, HistoryEntry, HistoryEvent, HistoryListener, HistoryState, LinkActivation,
    MemoryHistory,
};
pub use location::{normalize_path, Location};
pub use matching::{PathMatch, RoutePattern};
pub use options::{HashMode, RouterOptions};
pub use params::{QueryParams, RouteParams};
pub use router::Router;
