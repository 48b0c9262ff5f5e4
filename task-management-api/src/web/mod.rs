use axum::Json;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config;
use crate::session;
use crate::task::api::{TaskApiDoc, TaskState, create_task_router};

pub mod error;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<sea_orm::DatabaseConnection>,
}

/// Liveness payload for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// Landing payload for GET /.
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    message: &'static str,
    docs: &'static str,
    health: &'static str,
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let db = session::connect(&config.database_url).await?;
    session::init_schema(&db).await?;
    tracing::info!("Database schema is up to date");

    let server_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let app = create_app(AppState { db: Arc::new(db) });
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the full application router. The schema must already exist.
pub fn create_app(state: AppState) -> Router {
    let task_router = create_task_router(TaskState { db: state.db });

    Router::new()
        .route("/", axum::routing::get(welcome_handler))
        .route("/health", axum::routing::get(health_check_handler))
        .route("/openapi.json", axum::routing::get(openapi_handler))
        .merge(task_router)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[tracing::instrument]
pub async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

#[tracing::instrument]
pub async fn welcome_handler() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to Task Management API",
        docs: "/openapi.json",
        health: "/health",
    })
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(TaskApiDoc::openapi())
}
