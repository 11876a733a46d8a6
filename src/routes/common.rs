//! Common routes: health, readiness, version.

use crate::connection::ConnectionState;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct DatabaseStatus {
    key: String,
    state: &'static str,
    attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    databases: Vec<DatabaseStatus>,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// One entry per database in startup order.
fn database_statuses(state: &AppState) -> Vec<DatabaseStatus> {
    let databases = &state.databases;
    databases
        .startup_order()
        .filter_map(|key| {
            if let Some(conn) = databases.get(key) {
                let outcome = state.report.outcome(key);
                Some(DatabaseStatus {
                    key: key.to_string(),
                    state: conn.state().as_str(),
                    attempts: outcome.map(|o| o.attempts).unwrap_or(0),
                    error: outcome.and_then(|o| o.error.as_ref()).map(|e| e.to_string()),
                })
            } else {
                databases.unavailable_entry(key).map(|u| DatabaseStatus {
                    key: u.key.clone(),
                    state: ConnectionState::Failed.as_str(),
                    attempts: 0,
                    error: Some(u.error.to_string()),
                })
            }
        })
        .collect()
}

/// 200 when every database is synced, 503 otherwise.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyBody>) {
    let databases = database_statuses(&state);
    let all_synced = state.databases.unavailable().is_empty()
        && databases.iter().all(|d| d.state == ConnectionState::Synced.as_str());
    if all_synced {
        (StatusCode::OK, Json(ReadyBody { status: "ok", databases }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                databases,
            }),
        )
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Common routes (no state): GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Common routes plus GET /ready reporting each database's initialization state.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
