//! Router configuration.
//!
//! ```
//! use chain_navigator::{HashMode, RouterOptions};
//!
//! let options = RouterOptions::new()
//!     .hash_prefix("!")
//!     .route_links(false)
//!     .confirm(|message| message.is_empty());
//!
//! assert_eq!(options.hash_mode(), &HashMode::Enabled { prefix: "!".to_string() });
//! assert!(!options.routes_links());
//! ```

use crate::guards::{confirm_fn, ConfirmFn};
use futures::future::FutureExt;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Where the router reads and writes the application location.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HashMode {
    /// The location is the path/query/hash of the history entry itself.
    #[default]
    Disabled,
    /// The location lives in the fragment, after `#` and `prefix`
    /// (`#!/users` with prefix `"!"`).
    Enabled { prefix: String },
}

impl HashMode {
    /// Return `true` for hash routing.
    pub fn is_enabled(&self) -> bool {
        matches!(self, HashMode::Enabled { .. })
    }

    /// The fragment prefix, empty when hash routing is disabled.
    pub fn prefix(&self) -> &str {
        match self {
            HashMode::Enabled { prefix } => prefix,
            HashMode::Disabled => "",
        }
    }
}

/// Options consumed by [`Router::new`](crate::Router::new).
#[derive(Clone)]
pub struct RouterOptions {
    hash: HashMode,
    route_links: bool,
    confirm: Option<ConfirmFn>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            hash: HashMode::Disabled,
            route_links: true,
            confirm: None,
        }
    }
}

impl RouterOptions {
    /// Path routing, link interception on, the backend's confirmation prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable hash routing (no prefix).
    pub fn hash(mut self, enabled: bool) -> Self {
        self.hash = if enabled {
            HashMode::Enabled {
                prefix: String::new(),
            }
        } else {
            HashMode::Disabled
        };
        self
    }

    /// Enable hash routing with a fragment prefix such as `"!"`.
    pub fn hash_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hash = HashMode::Enabled {
            prefix: prefix.into(),
        };
        self
    }

    /// Whether link activations reported by the backend are routed.
    pub fn route_links(mut self, enabled: bool) -> Self {
        self.route_links = enabled;
        self
    }

    /// Replace the backend's confirmation prompt.
    pub fn confirm<F>(mut self, confirm: F) -> Self
    where
        F: Fn(&str) -> bool + 'static,
    {
        self.confirm = Some(confirm_fn(confirm));
        self
    }

    /// Replace the backend's confirmation prompt with an asynchronous one.
    pub fn confirm_async<F, Fut>(mut self, confirm: F) -> Self
    where
        F: Fn(String) -> Fut + 'static,
        Fut: Future<Output = bool> + 'static,
    {
        self.confirm = Some(Rc::new(move |message: String| confirm(message).boxed_local()));
        self
    }

    pub fn hash_mode(&self) -> &HashMode {
        &self.hash
    }

    pub fn routes_links(&self) -> bool {
        self.route_links
    }

    pub(crate) fn confirm_override(&self) -> Option<ConfirmFn> {
        self.confirm.clone()
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("hash", &self.hash)
            .field("route_links", &self.route_links)
            .field("confirm", &self.confirm.as_ref().map(|_| "custom"))
            .finish()
    }
}
