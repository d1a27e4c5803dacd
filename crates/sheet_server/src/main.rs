use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use shared::protocol::{HealthStatus, SubmitResponse};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::{append_entry, entry_from_request, exec_route, health_status, ApiContext};
use app_state::AppState;
use config::{load_settings, normalize_database_url};

const MAX_ENTRY_BODY_BYTES: usize = 16 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let app = build_router(AppState {
        api: ApiContext { storage },
    });

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, route = exec_route(), "sheet endpoint listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(exec_route(), get(probe).post(submit_entry).options(preflight))
        .layer(RequestBodyLimitLayer::new(MAX_ENTRY_BODY_BYTES))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(%error, "sheet storage is unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
        }
    }
}

async fn probe() -> Json<HealthStatus> {
    Json(health_status(Utc::now()))
}

async fn submit_entry(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Json<SubmitResponse> {
    let entry = entry_from_request(&body, query.as_deref(), Utc::now());
    Json(append_entry(&state.api, &entry).await)
}

async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], "")
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
