use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Handler,
    Definition,
    Type,
}

fn router() -> ResourceRouter<Route> {
    ResourceRouter::new()
        .add(r"^/[^/]+/[^/]+/[^/]+/[^/]+$", Route::Handler)
        .and_then(|r| r.add(r"^/[^/]+/[^/]+/[^/]+$", Route::Definition))
        .and_then(|r| r.add(r"^/[^/]+/[^/]+$", Route::Type))
        .unwrap()
}

#[test]
fn test_route_picks_first_matching_pattern() {
    let router = router();

    assert_eq!(router.route("/text/plain/view/abc"), Some(Route::Handler));
    assert_eq!(router.route("/text/plain/view"), Some(Route::Definition));
    assert_eq!(router.route("/text/plain"), Some(Route::Type));
    assert_eq!(router.route("/text"), None);
    assert!(!router.matches(""));
}

#[test]
fn test_route_order_decides_overlapping_patterns() {
    let broad_first = ResourceRouter::new()
        .add("^/.*$", Route::Type)
        .and_then(|r| r.add("^/a/b$", Route::Handler))
        .unwrap();

    assert_eq!(broad_first.route("/a/b"), Some(Route::Type));
}

#[test]
fn test_invalid_pattern_is_rejected() {
    let result = ResourceRouter::<Route>::new().add("^/(unclosed", Route::Type);
    assert!(matches!(result, Err(crate::Error::Pattern(_))));
}
