//! Descriptor Fetcher Tests
//!
//! Runs the HTTP registry client against an in-process axum server:
//! - envelope and bare-array payloads
//! - collection-scoped queries
//! - bearer token forwarding
//! - fail-soft behaviour on HTTP errors, bad payloads and dead hosts

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use mira_extensions::config::ExtensionConfig;
use mira_extensions::fetcher::{group_by_collection, DescriptorFetcher, DescriptorSource, HttpDescriptorSource};
use mira_extensions::ExtensionError;
use serde_json::json;

async fn spawn_registry(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

fn config(api_base_url: String) -> ExtensionConfig {
    ExtensionConfig {
        api_base_url,
        request_timeout_secs: 5,
        ..ExtensionConfig::default()
    }
}

fn registry_app() -> Router {
    Router::new()
        .route(
            "/api/extension-routes",
            get(|| async {
                Json(json!({
                    "code": 200,
                    "data": [
                        {
                            "name": "Gallery",
                            "group": "media",
                            "path": "/ext/lib42/gallery",
                            "originalPath": "/gallery",
                            "pluginName": "photoPlugin",
                            "libraryId": "lib42",
                            "libraryName": "Photos",
                            "component": "view.js",
                            "meta": {"title": "Gallery", "order": 5}
                        },
                        {
                            "name": "Notes",
                            "group": "text",
                            "path": "/ext/lib7/notes",
                            "libraryId": "lib7",
                            "meta": {"title": "Notes"}
                        }
                    ],
                    "total": 2,
                    "timestamp": "2024-05-01T12:00:00Z"
                }))
            }),
        )
        .route(
            "/api/extension-routes/:collection_id",
            get(|Path(collection_id): Path<String>| async move {
                Json(json!([
                    {
                        "name": format!("{}-route", collection_id),
                        "path": format!("/ext/{}/route", collection_id),
                        "collectionId": collection_id,
                        "meta": {"title": "Scoped"}
                    }
                ]))
            }),
        )
}

#[tokio::test]
async fn test_fetch_all_envelope() {
    let base = spawn_registry(registry_app()).await;
    let fetcher = DescriptorFetcher::from_config(&config(base)).unwrap();

    let descriptors = fetcher.fetch_all().await;
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].name, "Gallery");
    assert_eq!(descriptors[0].owner_name.as_deref(), Some("photoPlugin"));
    assert_eq!(descriptors[0].component(), Some("view.js"));
    assert_eq!(descriptors[1].presentation.order, None);
}

#[tokio::test]
async fn test_fetch_by_collection() {
    let base = spawn_registry(registry_app()).await;
    let fetcher = DescriptorFetcher::from_config(&config(base)).unwrap();

    let descriptors = fetcher.fetch_by_collection("lib42").await;
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].name, "lib42-route");
    assert_eq!(descriptors[0].collection_id.as_deref(), Some("lib42"));
}

#[tokio::test]
async fn test_fetch_collections() {
    let base = spawn_registry(registry_app()).await;
    let fetcher = DescriptorFetcher::from_config(&config(base)).unwrap();

    let (all, collections) = fetcher.fetch_collections().await;
    assert_eq!(all.len(), 2);
    assert_eq!(collections.len(), 2);
    assert_eq!(collections[0].id, "lib42");
    assert_eq!(collections[0].name, "Photos");
    assert_eq!(collections[1].name, "lib7");

    let (_, regrouped) = group_by_collection(all);
    assert_eq!(regrouped, collections);
}

#[tokio::test]
async fn test_http_500_yields_empty() {
    let app = Router::new().route(
        "/api/extension-routes",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable") }),
    );
    let base = spawn_registry(app).await;
    let source = HttpDescriptorSource::new(&config(base.clone())).unwrap();

    match source.list_routes().await {
        Err(ExtensionError::HttpStatus { status, .. }) => assert_eq!(status, 500),
        other => panic!("Expected HttpStatus error, got {:?}", other.map(|d| d.len())),
    }

    let fetcher = DescriptorFetcher::from_config(&config(base)).unwrap();
    assert!(fetcher.fetch_all().await.is_empty());
    assert!(fetcher.fetch_by_collection("lib42").await.is_empty());
}

#[tokio::test]
async fn test_malformed_payload_yields_empty() {
    let app = Router::new()
        .route("/api/extension-routes", get(|| async { "not json at all" }))
        .route(
            "/api/extension-routes/:id",
            get(|| async { Json(json!({"data": "nope"})) }),
        );
    let base = spawn_registry(app).await;
    let fetcher = DescriptorFetcher::from_config(&config(base)).unwrap();

    assert!(fetcher.fetch_all().await.is_empty());
    assert!(fetcher.fetch_by_collection("any").await.is_empty());
}

#[tokio::test]
async fn test_unreachable_registry_yields_empty() {
    let fetcher = DescriptorFetcher::from_config(&config("http://127.0.0.1:1/api".to_string())).unwrap();
    assert!(fetcher.fetch_all().await.is_empty());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let app = Router::new().route(
        "/api/extension-routes",
        get(|headers: HeaderMap| async move {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer secret-token");
            if authorized {
                (StatusCode::OK, Json(json!([{"name": "Private", "path": "/ext/private"}])))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})))
            }
        }),
    );
    let base = spawn_registry(app).await;

    let anonymous = DescriptorFetcher::from_config(&config(base.clone())).unwrap();
    assert!(anonymous.fetch_all().await.is_empty());

    let authorized = DescriptorFetcher::from_config(&ExtensionConfig {
        api_token: Some("secret-token".to_string()),
        ..config(base)
    })
    .unwrap();
    let descriptors = authorized.fetch_all().await;
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].name, "Private");
}
