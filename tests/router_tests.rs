// tests/router_tests.rs

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use portal::{config::Config, routes, state::AppState};
use serde_json::Value;
use tower::ServiceExt;

fn app() -> axum::Router {
    let state = AppState::new(Config::default()).expect("Failed to build app state");
    routes::create_router(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn openapi_document_lists_every_route() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc = json_body(response).await;
    for path in [
        "/api/content/sanitize",
        "/api/content/plain-text",
        "/api/content/article",
        "/api/favicon",
    ] {
        assert!(doc["paths"].get(path).is_some(), "missing {path}");
    }
}

#[tokio::test]
async fn sanitize_removes_javascript_href() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/content/sanitize")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"html":"<a href=\"javascript:alert(1)\">x</a>"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["html"], "<a>x</a>");
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/content/sanitize")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}
