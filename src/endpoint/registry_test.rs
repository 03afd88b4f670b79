use serde_json::json;

use super::*;

#[test]
fn test_from_root_parses_links_and_embedded() {
    let root = json!({
        "_links": {
            "self": { "href": "/api" },
            "ozp:user-data": { "href": "/api/self/data" },
            "ozp:application": [
                { "href": "/api/application" },
                { "href": "/api/application/other" }
            ],
            "ozp:data-item": { "href": "/api/self/data/{+resource}", "templated": true }
        },
        "_embedded": {
            "ozp:intent": { "_links": { "self": { "href": "/api/intent" } } }
        }
    });

    let registry = EndpointRegistry::from_root(&root);

    assert_eq!(registry.base_url("self"), None);
    assert_eq!(registry.base_url("ozp:user-data"), Some("/api/self/data"));
    assert_eq!(registry.base_url("ozp:application"), Some("/api/application"));
    assert_eq!(registry.base_url("ozp:intent"), Some("/api/intent"));
    assert_eq!(registry.base_url("ozp:data-item"), None);
    assert_eq!(
        registry.expand("ozp:data-item", "color"),
        Some("/api/self/data/color".to_string())
    );
}

#[test]
fn test_from_root_tolerates_missing_sections() {
    let registry = EndpointRegistry::from_root(&json!({ "unrelated": true }));
    assert!(registry.is_empty());

    let registry = EndpointRegistry::from_root(&json!({ "_links": { "empty": [] } }));
    assert!(registry.is_empty());
}
