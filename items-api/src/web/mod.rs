use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderValue;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::item::InMemoryItemStore;
use crate::item::api::{SharedItemStore, create_item_router};

pub mod error;

#[tracing::instrument(skip(settings))]
pub async fn start_web_server(settings: Settings) -> anyhow::Result<()> {
    tracing::info!("Starting {}...", settings.app_name);

    let server_address = settings.server_address();
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let app = create_app(&settings, Arc::new(InMemoryItemStore::new()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}

/// Builds the application router around the given item store.
pub fn create_app(settings: &Settings, store: SharedItemStore) -> Router {
    let app_name: Arc<str> = Arc::from(settings.app_name.as_str());

    let public_routes = Router::new()
        .route("/", axum::routing::get(welcome_handler))
        .with_state(app_name)
        .route("/health", axum::routing::get(health_check_handler))
        .route("/health/ready", axum::routing::get(readiness_handler));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", create_item_router(store))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&settings.allowed_origins)),
        )
}

/// Allows credentialed requests from the configured origins only.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid allowed origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[tracing::instrument]
pub async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[tracing::instrument]
pub async fn readiness_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ready" }))
}

#[tracing::instrument(skip(app_name))]
pub async fn welcome_handler(State(app_name): State<Arc<str>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": format!("Welcome to {}", app_name) }))
}
