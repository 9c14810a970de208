//! Test utilities for router integration tests
//!
//! Provides a router wired to an in-memory history and a local executor,
//! plus small recording helpers.

#![allow(dead_code)]

use chain_navigator::*;
use futures::executor::LocalPool;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A router over `MemoryHistory`, driven by a `LocalPool`.
pub struct Harness {
    pub pool: LocalPool,
    pub history: Rc<MemoryHistory>,
    pub router: Router,
}

impl Harness {
    pub fn new(initial: &str) -> Self {
        Self::with_options(initial, RouterOptions::new())
    }

    pub fn with_options(initial: &str, options: RouterOptions) -> Self {
        init_logging();
        let pool = LocalPool::new();
        let history = Rc::new(MemoryHistory::new(initial));
        let router = Router::new(history.clone(), pool.spawner(), options);
        Self {
            pool,
            history,
            router,
        }
    }

    pub fn start(&mut self) -> NavigationOutcome {
        self.pool
            .run_until(self.router.start())
            .expect("start failed")
    }

    pub fn navigate(&mut self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        self.pool.run_until(self.router.navigate(target))
    }

    pub fn replace(&mut self, target: &str) -> Result<NavigationOutcome, NavigationError> {
        self.pool.run_until(self.router.replace(target))
    }

    pub fn back(&mut self) -> Result<NavigationOutcome, NavigationError> {
        self.pool.run_until(self.router.back())
    }

    pub fn forward(&mut self) -> Result<NavigationOutcome, NavigationError> {
        self.pool.run_until(self.router.forward())
    }

    /// Run every task that can make progress.
    pub fn settle(&mut self) {
        self.pool.run_until_stalled();
    }

    pub fn current_path(&self) -> Option<String> {
        self.router
            .current_location()
            .map(|location| location.path().to_string())
    }
}

/// Route log output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Shared list of visited paths.
#[derive(Clone, Default)]
pub struct Visits(Rc<RefCell<Vec<String>>>);

impl Visits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, path: &str) {
        self.0.borrow_mut().push(path.to_string());
    }

    pub fn paths(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

/// Shared call counter.
#[derive(Clone, Default)]
pub struct Counter(Rc<Cell<usize>>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

/// Register a handler on `pattern` that records the full path and resolves.
pub fn resolving_route(router: &Router, pattern: &str, visits: &Visits) {
    let visits = visits.clone();
    router
        .route(pattern, move |ctx| {
            let visits = visits.clone();
            async move {
                visits.record(ctx.path());
                ctx.resolve();
                Ok(())
            }
        })
        .expect("valid pattern");
}

/// Register a counting handler on `pattern` that resolves and vetoes every
/// exit without a message.
pub fn guarded_route(router: &Router, pattern: &str, calls: &Counter) {
    let calls = calls.clone();
    router
        .route(pattern, move |ctx| {
            let calls = calls.clone();
            async move {
                calls.bump();
                ctx.before_exit(|event| event.prevent_default());
                ctx.resolve();
                Ok(())
            }
        })
        .expect("valid pattern");
}
