//! Navigable locations.
//!
//! A [`Location`] is a raw location string split into path, query and hash.
//! It is immutable once built. Two locations are equal when their path,
//! query string and hash are equal; the raw text they were parsed from is
//! not part of the comparison.
//!
//! # Path normalization
//!
//! The path part is normalized so that equivalent spellings compare equal:
//!
//! 1. An empty path becomes `"/"`.
//! 2. A leading slash is ensured (`"users"` → `"/users"`).
//! 3. Trailing slashes are removed, except for the root.
//!
//! ```
//! use chain_navigator::Location;
//!
//! let location = Location::parse("/users/42/?tab=posts#latest");
//! assert_eq!(location.path(), "/users/42");
//! assert_eq!(location.search(), "tab=posts");
//! assert_eq!(location.query().get("tab"), Some("posts"));
//! assert_eq!(location.hash(), "latest");
//! assert_eq!(location, Location::parse("users/42?tab=posts#latest"));
//! ```

use crate::params::QueryParams;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A decomposed navigation target.
#[derive(Debug, Clone)]
pub struct Location {
    path: String,
    search: String,
    query: QueryParams,
    hash: String,
    raw: String,
}

impl Location {
    /// Decompose a raw location string.
    ///
    /// The hash is everything after the first `#`, the query everything
    /// between the first `?` and the hash.
    pub fn parse(raw: &str) -> Self {
        let (before_hash, hash) = raw.split_once('#').unwrap_or((raw, ""));
        let (path, search) = before_hash.split_once('?').unwrap_or((before_hash, ""));

        Self {
            path: normalize_path(path).into_owned(),
            search: search.to_string(),
            query: QueryParams::from_query_string(search),
            hash: hash.to_string(),
            raw: raw.to_string(),
        }
    }

    /// The normalized path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// The decoded query parameters.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// The hash, without the leading `#`.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The string this location was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Rebuild `path?query#hash` from the decomposed parts.
    pub fn href(&self) -> String {
        let mut href = self.path.clone();
        if !self.search.is_empty() {
            href.push('?');
            href.push_str(&self.search);
        }
        if !self.hash.is_empty() {
            href.push('#');
            href.push_str(&self.hash);
        }
        href
    }

    /// The same location seen from a mount point: the path is replaced by
    /// `path`, query and hash are kept.
    pub(crate) fn with_path(&self, path: &str) -> Self {
        let mut relative = Self {
            path: normalize_path(path).into_owned(),
            search: self.search.clone(),
            query: self.query.clone(),
            hash: self.hash.clone(),
            raw: String::new(),
        };
        relative.raw = relative.href();
        relative
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.search == other.search && self.hash == other.hash
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.search.hash(state);
        self.hash.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

/// Normalize a path: leading slash, no trailing slash, empty → `/`.
///
/// Returns `Cow<str>` to avoid allocating when the path is already normalized.
///
/// ```
/// use chain_navigator::normalize_path;
///
/// assert_eq!(normalize_path("/dashboard"), "/dashboard");
/// assert_eq!(normalize_path("dashboard/"), "/dashboard");
/// assert_eq!(normalize_path("//"), "/");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.is_empty() {
        return Cow::Borrowed("/");
    }
    if path == "/" || (path.starts_with('/') && !path.ends_with('/')) {
        return Cow::Borrowed(path);
    }

    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{trimmed}"))
    }
}
