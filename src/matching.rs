//! Segment-based route pattern matching.
//!
//! A [`RoutePattern`] is compiled once when a route is registered and then
//! tested against many paths.
//!
//! # Pattern syntax
//!
//! - `literal`: must equal the path segment exactly (case-sensitive)
//! - `:name`: matches any non-empty segment and binds it verbatim
//! - `*` or `*name`: last segment only; matches the rest of the path,
//!   including further `/`, and binds it when named
//!
//! Both the pattern and the path are split on `/`; empty segments are
//! ignored, so `/users/` and `users` are the same pattern.
//!
//! # Exact and prefix matching
//!
//! [`match_path`](RoutePattern::match_path) requires the pattern to consume
//! the whole path (unless it ends in a wildcard).
//! [`match_prefix`](RoutePattern::match_prefix) lets the path run longer and
//! reports the unconsumed suffix as [`PathMatch::remainder`]; mounted chains
//! are matched this way and see only the remainder.

use crate::error::NavigationError;
use crate::params::RouteParams;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard(Option<String>),
}

/// Result of matching a path against a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Bound parameters.
    pub params: RouteParams,
    /// Unconsumed path suffix, `/` when the pattern consumed everything.
    pub remainder: String,
}

/// A compiled route pattern.
///
/// # Examples
///
/// ```
/// use chain_navigator::RoutePattern;
///
/// let pattern = RoutePattern::parse("/foo/:bar").unwrap();
/// let matched = pattern.match_path("/foo/bar").unwrap();
/// assert_eq!(matched.params.get("bar"), Some("bar"));
/// assert!(pattern.match_path("/foo/bar/baz").is_none());
///
/// let mount = RoutePattern::parse("/admin").unwrap();
/// assert_eq!(mount.match_prefix("/admin/users/7").unwrap().remainder, "/users/7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a pattern.
    ///
    /// Fails with [`NavigationError::DuplicateParam`] when a parameter name
    /// repeats and with [`NavigationError::InvalidPattern`] for an unnamed
    /// `:` segment or a wildcard that is not last.
    pub fn parse(pattern: &str) -> Result<Self, NavigationError> {
        let raw: Vec<&str> = split_path(pattern);
        let mut segments = Vec::with_capacity(raw.len());
        let mut names = HashSet::new();

        for (i, seg) in raw.iter().enumerate() {
            let segment = if let Some(name) = seg.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid(pattern, "parameter segment without a name"));
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = seg.strip_prefix('*') {
                if i + 1 != raw.len() {
                    return Err(invalid(pattern, "wildcard must be the last segment"));
                }
                Segment::Wildcard((!name.is_empty()).then(|| name.to_string()))
            } else {
                Segment::Literal((*seg).to_string())
            };

            let bound = match &segment {
                Segment::Param(name) | Segment::Wildcard(Some(name)) => Some(name),
                _ => None,
            };
            if let Some(name) = bound {
                if !names.insert(name.clone()) {
                    return Err(NavigationError::DuplicateParam {
                        pattern: pattern.to_string(),
                        name: name.clone(),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern text as registered.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names bound by this pattern, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) | Segment::Wildcard(Some(name)) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Return `true` if the pattern ends in a wildcard.
    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Wildcard(_)))
    }

    /// Match the whole path.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        self.match_segments(path, false)
    }

    /// Match a leading part of the path and report the rest as remainder.
    pub fn match_prefix(&self, path: &str) -> Option<PathMatch> {
        self.match_segments(path, true)
    }

    fn match_segments(&self, path: &str, prefix: bool) -> Option<PathMatch> {
        let path_segments = split_path(path);

        // Early exit: a pattern longer than the path can only match through
        // a wildcard that swallows zero segments.
        let required = self.segments.len() - usize::from(self.has_wildcard());
        if required > path_segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => {
                    if path_segments[i] != literal.as_str() {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.as_str(), path_segments[i]);
                }
                Segment::Wildcard(name) => {
                    let rest = &path_segments[i..];
                    if let Some(name) = name {
                        params.insert(name.as_str(), rest.join("/"));
                    }
                    return Some(PathMatch {
                        params,
                        remainder: join_remainder(rest),
                    });
                }
            }
        }

        let rest = &path_segments[self.segments.len()..];
        if !rest.is_empty() && !prefix {
            return None;
        }

        Some(PathMatch {
            params,
            remainder: join_remainder(rest),
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split a path into segments, skipping empty ones.
///
/// ```
/// use chain_navigator::matching::split_path;
///
/// assert_eq!(split_path("/users/123"), vec!["users", "123"]);
/// assert_eq!(split_path("/users/"), vec!["users"]);
/// assert!(split_path("/").is_empty());
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn join_remainder(rest: &[&str]) -> String {
    if rest.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", rest.join("/"))
    }
}

fn invalid(pattern: &str, reason: &str) -> NavigationError {
    NavigationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}
