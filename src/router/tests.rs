use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::{Lookup, PathPattern, RouteEntry, RouteHandler, Router};
use crate::error::ConfigError;
use crate::method::HttpMethod;

fn entry(path: &str, method: HttpMethod, reply: &'static str) -> RouteEntry {
    RouteEntry {
        method,
        pattern: PathPattern::parse(path).unwrap(),
        handler: RouteHandler::Function(Arc::new(move |_ctx| Ok(json!(reply)))),
        middlewares: Vec::new(),
        dependencies: Vec::new(),
        module: Arc::from("AppModule"),
    }
}

fn router(routes: &[(&str, HttpMethod, &'static str)]) -> Router {
    let mut router = Router::new();
    for (path, method, reply) in routes {
        router.insert(entry(path, *method, reply)).unwrap();
    }
    router
}

#[test]
fn test_static_and_param_routes() {
    let router = router(&[
        ("pets", HttpMethod::Get, "list"),
        ("pets/:id", HttpMethod::Get, "get"),
    ]);

    match router.find(HttpMethod::Get, "/pets") {
        Lookup::Matched(m) => {
            assert_eq!(m.entry.pattern.to_string(), "/pets");
            assert!(m.path_params.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }

    match router.find(HttpMethod::Get, "/pets/12") {
        Lookup::Matched(m) => {
            assert_eq!(m.get_path_param("id"), Some("12"));
            assert_eq!(m.path_params_map().get("id").map(String::as_str), Some("12"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_duplicate_route_rejected() {
    let mut router = router(&[("pets/:id", HttpMethod::Get, "get")]);
    let err = router
        .insert(entry("/pets/:id/", HttpMethod::Get, "again"))
        .unwrap_err();
    match err {
        ConfigError::DuplicateRoute { path, method } => {
            assert_eq!(path, "pets/:id");
            assert_eq!(method, HttpMethod::Get);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(router.len(), 1);
}

#[test]
fn test_method_not_allowed_lists_methods() {
    let router = router(&[
        ("items", HttpMethod::Post, "create"),
        ("items", HttpMethod::Get, "list"),
    ]);
    match router.find(HttpMethod::Delete, "/items") {
        Lookup::MethodNotAllowed { allowed } => {
            assert_eq!(allowed, vec![HttpMethod::Get, HttpMethod::Post]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(router.find(HttpMethod::Get, "/nope"), Lookup::NotFound));
}

#[test]
fn test_lookup_counter() {
    let router = router(&[("a", HttpMethod::Get, "a")]);
    assert_eq!(router.lookup_count(), 0);
    let _ = router.find(HttpMethod::Get, "/a");
    let _ = router.find(HttpMethod::Get, "/b");
    assert_eq!(router.lookup_count(), 2);
}

#[test]
fn test_routes_listing() {
    let router = router(&[
        ("users/:id", HttpMethod::Delete, "d"),
        ("", HttpMethod::Get, "home"),
        ("users", HttpMethod::Get, "u"),
    ]);
    assert_eq!(
        router.routes(),
        vec![
            (HttpMethod::Get, "/".to_string()),
            (HttpMethod::Get, "/users".to_string()),
            (HttpMethod::Delete, "/users/:id".to_string()),
        ]
    );
    assert!(!router.is_empty());
}

#[test]
fn test_slow_threshold_does_not_change_result() {
    let router = router(&[("x/:y", HttpMethod::Get, "x")])
        .with_slow_match_threshold(Duration::ZERO);
    assert!(matches!(
        router.find(HttpMethod::Get, "/x/1"),
        Lookup::Matched(_)
    ));
}

#[test]
fn test_duplicate_param_names_last_wins() {
    let router = router(&[("org/:id/user/:id", HttpMethod::Get, "u")]);
    match router.find(HttpMethod::Get, "/org/1/user/2") {
        Lookup::Matched(m) => assert_eq!(m.get_path_param("id"), Some("2")),
        other => panic!("unexpected {other:?}"),
    }
}
