use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use insta::assert_yaml_snapshot;
use tower::ServiceExt;

mod common;

use common::HttpResponseSnapshot;

#[tokio::test]
async fn can_check_health_endpoint() {
    let app = common::setup_app().await.expect("Failed to setup app");

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_text = std::str::from_utf8(&body).unwrap();

    let snapshot = HttpResponseSnapshot::new(body_text, status, &headers, "health_check");
    assert_yaml_snapshot!(snapshot, @r"
    test_context: health_check
    status: 200
    headers:
      content-type: application/json
    body:
      status: healthy
    ");
}

#[tokio::test]
async fn can_render_welcome_payload() {
    let app = common::setup_app().await.expect("Failed to setup app");

    let (status, body) = common::send(&app, Method::GET, "/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "message": "Welcome to Task Management API",
            "docs": "/openapi.json",
            "health": "/health"
        })
    );
}

#[tokio::test]
async fn can_serve_openapi_document_for_task_routes() {
    let app = common::setup_app().await.expect("Failed to setup app");

    let (status, body) = common::send(&app, Method::GET, "/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Task Management API");
    assert!(body["paths"]["/tasks/"]["post"].is_object());
    assert!(body["paths"]["/tasks/{task_id}"]["patch"].is_object());
    assert!(body["paths"]["/tasks/{task_id}"]["delete"].is_object());
}

#[tokio::test]
async fn can_return_not_found_for_unknown_route() {
    let app = common::setup_app().await.expect("Failed to setup app");

    let (status, _) = common::send(&app, Method::GET, "/does-not-exist", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
