//! The public router.
//!
//! [`Router`] ties together the middleware chain, the navigation engine and
//! the history adapter. It is a cheap handle (`Clone` shares state) and is
//! meant to live on one thread next to a local executor.
//!
//! # Example
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
//! router
//!     .route("/users/:id", |ctx| async move {
//!         println!("user {}", ctx.params().get("id").unwrap_or_default());
//!         ctx.resolve();
//!         Ok(())
//!     })?
//!     .any(|ctx| async move {
//!         ctx.next();
//!         Ok(())
//!     });
//!
//! pool.run_until(router.start())?;
//! let outcome = pool.run_until(router.navigate("/users/7"))?;
//! assert!(outcome.is_resolved());
//! assert_eq!(history.current(), "/users/7");
//! # Ok::<(), chain_navigator::NavigationError>(())
//! ```

use crate::adapter::LocationAdapter;
use crate::chain::{boxed_handler, MiddlewareChain};
use crate::context::{NavigationContext, Routing};
use crate::engine::{NavigationEngine, Phase};
use crate::error::{HandlerError, NavigationError, NavigationOutcome};
use crate::guards::{confirm_fn, ConfirmFn};
use crate::history::{HistoryBackend, HistoryEvent, HistoryState, LinkActivation};
use crate::location::Location;
use crate::options::{HashMode, RouterOptions};
use crate::{debug_log, error_log, info_log, trace_log};
use futures::task::{LocalSpawn, LocalSpawnExt};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

struct RouterInner {
    engine: NavigationEngine,
    adapter: LocationAdapter,
    options: RouterOptions,
    confirm: ConfirmFn,
}

/// A client-side router.
///
/// Registration methods can be called at any time; a pass that is already
/// dispatching keeps the chain it started with.
#[derive(Clone)]
pub struct Router {
    inner: Rc<RouterInner>,
}

impl Router {
    /// Create a router over `backend`, running handlers on `spawner`.
    ///
    /// Nothing is dispatched until [`start`](Self::start).
    pub fn new<S>(backend: Rc<dyn HistoryBackend>, spawner: S, options: RouterOptions) -> Self
    where
        S: LocalSpawn + 'static,
    {
        let confirm = match options.confirm_override() {
            Some(confirm) => confirm,
            None => {
                let backend = backend.clone();
                confirm_fn(move |message| backend.confirm(message))
            }
        };

        Self {
            inner: Rc::new(RouterInner {
                engine: NavigationEngine::new(Rc::new(spawner)),
                adapter: LocationAdapter::new(backend, options.hash_mode().clone()),
                options,
                confirm,
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register a handler for paths matching `pattern` exactly.
    pub fn route<F, Fut>(&self, pattern: &str, handler: F) -> Result<&Self, NavigationError>
    where
        F: Fn(NavigationContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + 'static,
    {
        self.inner
            .engine
            .update_chain(|chain| chain.push_route(pattern, boxed_handler(handler)))?;
        info_log!("Registered route '{}'", pattern);
        Ok(self)
    }

    /// Register a handler for every location.
    pub fn any<F, Fut>(&self, handler: F) -> &Self
    where
        F: Fn(NavigationContext) -> Fut + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + 'static,
    {
        self.inner
            .engine
            .update_chain(|chain| chain.push_any(boxed_handler(handler)));
        info_log!("Registered catch-all handler");
        self
    }

    /// Mount a sub-chain under `pattern`.
    pub fn mount(&self, pattern: &str, chain: MiddlewareChain) -> Result<&Self, NavigationError> {
        self.inner
            .engine
            .update_chain(|root| root.push_mount(pattern, chain))?;
        info_log!("Mounted chain at '{}'", pattern);
        Ok(self)
    }

    /// Mount a sub-chain that sees every location unchanged.
    pub fn mount_any(&self, chain: MiddlewareChain) -> &Self {
        self.inner
            .engine
            .update_chain(|root| root.push_mount_any(chain));
        info_log!("Mounted catch-all chain");
        self
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Start listening to the backend and dispatch the current location.
    ///
    /// Fails with [`NavigationError::AlreadyStarted`] when running.
    pub async fn start(&self) -> Result<NavigationOutcome, NavigationError> {
        let location = self.inner.adapter.begin()?;
        self.subscribe();
        let inner = &self.inner;
        inner
            .adapter
            .dispatch_initial(&inner.engine, &inner.confirm, location)
            .await
    }

    /// Stop listening. Navigation calls fail with
    /// [`NavigationError::NotStarted`] until the next [`start`](Self::start).
    pub fn stop(&self) {
        self.inner.adapter.stop();
    }

    pub fn is_started(&self) -> bool {
        self.inner.adapter.is_started()
    }

    fn subscribe(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.adapter.backend().subscribe(Rc::new(move |event: HistoryEvent| {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            let router = Router { inner };
            match event {
                HistoryEvent::Changed { raw, state } => {
                    router.spawn_change(raw, state);
                    false
                }
                HistoryEvent::LinkActivated(link) => router.handle_link(link),
            }
        }));
    }

    fn spawn_change(&self, raw: String, state: Option<HistoryState>) {
        trace_log!("History changed to '{}'", raw);
        let router = self.clone();
        let task = async move {
            let inner = &router.inner;
            inner
                .adapter
                .handle_change(&inner.engine, &inner.confirm, raw, state)
                .await;
        };
        if let Err(error) = self.inner.engine.spawner().spawn_local(task) {
            error_log!("Failed to spawn history change task: {}", error);
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// Navigate to `target`, pushing a history entry once the pass settles.
    ///
    /// Navigating to the current location replaces the entry instead.
    pub async fn navigate(&self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        let inner = &self.inner;
        inner
            .adapter
            .navigate(&inner.engine, &inner.confirm, target)
            .await
    }

    /// Navigate to `target`, replacing the current history entry once the
    /// pass settles.
    pub async fn replace(&self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        let inner = &self.inner;
        inner
            .adapter
            .replace(&inner.engine, &inner.confirm, target)
            .await
    }

    /// Go one entry back. A vetoed pass moves history forward again.
    pub async fn back(&self) -> Result<NavigationOutcome, NavigationError> {
        self.inner.adapter.traverse(-1).await
    }

    /// Go one entry forward. A vetoed pass moves history back again.
    pub async fn forward(&self) -> Result<NavigationOutcome, NavigationError> {
        self.inner.adapter.traverse(1).await
    }

    /// Handle a link activation. Returns `true` when the router took over and
    /// the default action must be suppressed.
    pub fn handle_link(&self, link: LinkActivation) -> bool {
        if !self.inner.options.routes_links() || !self.is_started() || !link.is_plain() {
            return false;
        }
        let Some(target) = self.link_target(&link.href) else {
            trace_log!("Link '{}' left to the environment", link.href);
            return false;
        };

        debug_log!("Intercepted link to '{}'", target);
        let router = self.clone();
        let task = async move {
            if let Err(error) = router.navigate(&target).await {
                error_log!("Navigation from link to '{}' failed: {}", target, error);
            }
        };
        match self.inner.engine.spawner().spawn_local(task) {
            Ok(()) => true,
            Err(error) => {
                error_log!("Failed to spawn link navigation: {}", error);
                false
            }
        }
    }

    /// The application target of an href, if the router should handle it.
    fn link_target(&self, href: &str) -> Option<String> {
        if href.starts_with("//") || has_scheme(href) {
            return None;
        }
        match self.inner.options.hash_mode() {
            HashMode::Disabled => {
                if href.is_empty() || href.starts_with('#') {
                    None
                } else {
                    Some(href.to_string())
                }
            }
            HashMode::Enabled { prefix } => href
                .strip_prefix('#')
                .and_then(|fragment| fragment.strip_prefix(prefix.as_str()))
                .map(str::to_string),
        }
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Completion of the latest dispatching pass.
    pub fn routing(&self) -> Routing {
        self.inner.engine.routing()
    }

    /// The location of the last settled pass.
    pub fn current_location(&self) -> Option<Location> {
        self.inner.engine.current()
    }

    pub fn phase(&self) -> Phase {
        self.inner.engine.phase()
    }

    pub fn options(&self) -> &RouterOptions {
        &self.inner.options
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("started", &self.is_started())
            .field("phase", &self.phase())
            .field("current", &self.current_location())
            .field("options", &self.inner.options)
            .finish()
    }
}

fn has_scheme(href: &str) -> bool {
    let end = href
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(href.len());
    href[..end].contains(':')
}
