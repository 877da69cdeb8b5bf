use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{Result, StarHistoryError};
use crate::github::{authorization_value, GitHubClient};
use crate::history::StarHistory;
use crate::models::{RepoHistory, RepoName};

/// Application state shared by every request
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub api_base_url: String,
    /// Used when a request carries no usable Authorization header
    pub default_token: Option<String>,
    pub max_request_amount: u32,
    pub start_time: Instant,
}

/// Query parameters of the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub repo: Option<String>,
}

/// Liveness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub max_request_amount: u32,
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::AUTHORIZATION]);

    Router::new()
        .route("/history", get(get_history))
        .route("/healthz", get(health_check))
        .route("/livez", get(liveness_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(state: AppState, addr: &str, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Star history server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Star timeline of one repository
async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
    headers: HeaderMap,
) -> Result<Json<RepoHistory>> {
    let repo = match params.repo.as_deref().map(str::trim) {
        Some(repo) if !repo.is_empty() => RepoName::parse(repo)?,
        _ => {
            return Err(StarHistoryError::Validation(
                "repository name required".to_string(),
            ))
        }
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(authorization_value)
        .or_else(|| state.default_token.clone());

    if token.is_none() {
        warn!(repo = %repo, "No credential available, calling GitHub anonymously");
    }

    let client = GitHubClient::with_client(state.http.clone(), &state.api_base_url, token)?;
    let history = StarHistory::new(Arc::new(client), state.max_request_amount)
        .build(&repo, Utc::now())
        .await?;

    Ok(Json(history))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            max_request_amount: state.max_request_amount,
        }),
    )
}

async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(LivenessResponse {
            status: "alive".to_string(),
        }),
    )
}
