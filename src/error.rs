//! Error and outcome types for navigation.
//!
//! - [`NavigationOutcome`]: how a navigation attempt ended when it did not
//!   fail (`Resolved`, `Exhausted`, `Vetoed`, `Superseded`, `Unchanged`).
//!   A vetoed exit is an outcome, not an error.
//! - [`NavigationError`]: misuse of the router, a failing handler, or an
//!   executor that refused a task.
//! - [`HandlerError`]: the error type route handlers return.
//!
//! # Examples
//!
//! ```
//! use chain_navigator::{Location, NavigationError, NavigationOutcome};
//!
//! let outcome = NavigationOutcome::Resolved(Location::parse("/home"));
//! assert!(outcome.is_resolved());
//! assert_eq!(outcome.location().map(|l| l.path()), Some("/home"));
//!
//! let err = NavigationError::NotStarted;
//! assert_eq!(err.to_string(), "Router has not been started");
//! ```

use crate::location::Location;
use std::fmt;

// ============================================================================
// Navigation outcome
// ============================================================================

/// Outcome of a navigation attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationOutcome {
    /// A handler called `resolve()`; the location is now current.
    Resolved(Location),
    /// Every matching handler called `next()`; the location is now current.
    Exhausted(Location),
    /// A before-exit guard vetoed and the confirmation was declined.
    /// The previous location stays current and history was reverted.
    Vetoed,
    /// A newer navigation took over before this one settled.
    Superseded,
    /// A history traversal had nowhere to go.
    Unchanged,
}

impl NavigationOutcome {
    /// Check if a handler resolved the navigation.
    pub fn is_resolved(&self) -> bool {
        matches!(self, NavigationOutcome::Resolved(_))
    }

    /// Check if the chain ran out of handlers without a resolve.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, NavigationOutcome::Exhausted(_))
    }

    /// Check if the navigation settled (resolved or exhausted).
    pub fn is_settled(&self) -> bool {
        self.is_resolved() || self.is_exhausted()
    }

    /// Check if the exit was vetoed.
    pub fn is_vetoed(&self) -> bool {
        matches!(self, NavigationOutcome::Vetoed)
    }

    /// Check if a newer navigation superseded this one.
    pub fn is_superseded(&self) -> bool {
        matches!(self, NavigationOutcome::Superseded)
    }

    /// The location that became current, if the navigation settled.
    pub fn location(&self) -> Option<&Location> {
        match self {
            NavigationOutcome::Resolved(location) | NavigationOutcome::Exhausted(location) => {
                Some(location)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Handler error
// ============================================================================

/// Error returned by a route handler.
///
/// Returning it before calling `resolve()` or `next()` aborts the pass and
/// surfaces as [`NavigationError::Handler`] at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create a handler error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its display text.
    pub fn from_error(error: &dyn std::error::Error) -> Self {
        Self::new(error.to_string())
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

// ============================================================================
// Navigation error
// ============================================================================

/// Errors surfaced by router operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// A navigation method was called before `start()`.
    NotStarted,

    /// `start()` was called on a running router.
    AlreadyStarted,

    /// A pattern names the same parameter twice.
    DuplicateParam { pattern: String, name: String },

    /// A pattern is malformed.
    InvalidPattern { pattern: String, reason: String },

    /// A route handler failed before resolving or continuing.
    Handler { path: String, error: HandlerError },

    /// The executor refused to spawn a navigation task.
    Spawn { message: String },
}

impl NavigationError {
    /// Check if this is a usage error (misconfigured router or wrong call order).
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            NavigationError::NotStarted
                | NavigationError::AlreadyStarted
                | NavigationError::DuplicateParam { .. }
                | NavigationError::InvalidPattern { .. }
        )
    }

    /// Check if a route handler failed.
    pub fn is_handler_error(&self) -> bool {
        matches!(self, NavigationError::Handler { .. })
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::NotStarted => write!(f, "Router has not been started"),
            NavigationError::AlreadyStarted => write!(f, "Router is already started"),
            NavigationError::DuplicateParam { pattern, name } => {
                write!(f, "Duplicate parameter ':{}' in pattern '{}'", name, pattern)
            }
            NavigationError::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            NavigationError::Handler { path, error } => {
                write!(f, "Handler for '{}' failed: {}", path, error)
            }
            NavigationError::Spawn { message } => {
                write!(f, "Failed to spawn navigation task: {}", message)
            }
        }
    }
}

impl std::error::Error for NavigationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavigationError::Handler { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<futures::task::SpawnError> for NavigationError {
    fn from(error: futures::task::SpawnError) -> Self {
        NavigationError::Spawn {
            message: error.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
