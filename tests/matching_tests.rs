//! Tests for pattern matching, path normalization and parameter access
//! through the public API.

use chain_navigator::matching::split_path;
use chain_navigator::*;

// ---- RoutePattern ----

#[test]
fn test_multiple_params() {
    let pattern = RoutePattern::parse("/workspace/:workspaceId/project/:projectId").unwrap();
    let matched = pattern.match_path("/workspace/7/project/42").unwrap();

    assert_eq!(matched.params.get("workspaceId"), Some("7"));
    assert_eq!(matched.params.get("projectId"), Some("42"));
    assert_eq!(matched.params.get_as::<u32>("projectId"), Some(42));
    assert_eq!(matched.remainder, "/");
}

#[test]
fn test_literal_mismatch_never_matches() {
    let pattern = RoutePattern::parse("/users/:id/edit").unwrap();
    assert!(pattern.match_path("/users/1/view").is_none());
    assert!(pattern.match_prefix("/users/1/view/more").is_none());
    assert!(pattern.match_path("/Users/1/edit").is_none());
}

#[test]
fn test_trailing_slashes_are_ignored() {
    let pattern = RoutePattern::parse("users/:id/").unwrap();
    assert!(pattern.match_path("/users/1/").is_some());
    assert!(pattern.match_path("//users//1").is_some());
}

#[test]
fn test_unnamed_wildcard_hands_rest_to_mount() {
    let pattern = RoutePattern::parse("/files/*").unwrap();
    let matched = pattern.match_prefix("/files/docs/readme.md").unwrap();
    assert!(matched.params.is_empty());
    assert_eq!(matched.remainder, "/docs/readme.md");
}

#[test]
fn test_pattern_display_is_source() {
    let pattern = RoutePattern::parse("/a/:b").unwrap();
    assert_eq!(pattern.to_string(), "/a/:b");
    assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["b"]);
}

#[test]
fn test_split_path() {
    assert_eq!(split_path("/a//b/"), vec!["a", "b"]);
    assert!(split_path("").is_empty());
}

// ---- normalize_path ----

#[test]
fn test_normalize_missing_leading_slash() {
    assert_eq!(normalize_path("dashboard"), "/dashboard");
    assert_eq!(normalize_path("users/profile"), "/users/profile");
}

#[test]
fn test_normalize_trailing_slash() {
    assert_eq!(normalize_path("/dashboard/"), "/dashboard");
    assert_eq!(normalize_path("users/profile/"), "/users/profile");
}

#[test]
fn test_normalize_root_variations() {
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("///"), "/");
}

// ---- Locations and query parameters ----

#[test]
fn test_location_equality_ignores_raw() {
    let a = Location::parse("/users/?tab=1#top");
    let b = Location::parse("users?tab=1#top");
    assert_eq!(a, b);
    assert_ne!(a.raw(), b.raw());
    assert_ne!(a, Location::parse("/users?tab=2#top"));
}

#[test]
fn test_query_is_decoded_path_is_not() {
    let location = Location::parse("/a%20b?name=J%C3%BCrgen&tag=x&tag=y&flag");
    assert_eq!(location.path(), "/a%20b");
    assert_eq!(location.query().get("name"), Some("Jürgen"));
    assert_eq!(location.query().get_all("tag"), ["x".to_string(), "y".to_string()]);
    assert_eq!(location.query().get("flag"), Some(""));
}

#[test]
fn test_route_params_merge_child_wins() {
    let mut parent = RouteParams::new();
    parent.insert("org", "acme");
    parent.insert("id", "parent");
    let mut child = RouteParams::new();
    child.insert("id", "child");

    let merged = RouteParams::merge(&parent, &child);
    assert_eq!(merged.get("org"), Some("acme"));
    assert_eq!(merged.get("id"), Some("child"));
    assert_eq!(merged.len(), 2);
}
