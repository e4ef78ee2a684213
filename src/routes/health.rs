// src/routes/health.rs
//! Liveness endpoint for the dashboard service.
//!
//! `/health` answers as long as the HTTP server is up. It also reports
//! whether a monitoring session is currently connected, read from the
//! shared view so the controller task is never involved.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;
use crate::presenter::LinkState;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    monitoring: bool,
    state: LinkState,
}

/// Handle `GET /health`.
async fn health(State((_, view)): State<AppState>) -> Json<HealthResponse> {
    // ---
    let status = view.status();
    Json(HealthResponse {
        status: "ok",
        monitoring: status.state == LinkState::Connected,
        state: status.state,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
