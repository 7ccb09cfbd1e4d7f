//! Liveness endpoint.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(rename = "storeConnected")]
    pub store_connected: bool,
    pub version: &'static str,
}

/// `GET /healthz` — report process liveness and store reachability.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = state.users.count().await.is_ok();
    Json(HealthResponse {
        status: "ok",
        store_connected,
        version: coursedeck_core::version(),
    })
}
