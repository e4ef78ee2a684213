//! HTTP gateway.
//!
//! Each sibling module exports a subrouter over the shared
//! `(DashboardHandle, SharedView)` state; this file merges them and maps
//! [`DashboardError`] onto responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::dashboard::DashboardHandle;
use crate::error::DashboardError;
use crate::view::SharedView;

mod commands;
mod health;
mod views;

pub type AppState = (DashboardHandle, SharedView);

// ---

pub fn router(handle: DashboardHandle, view: SharedView) -> Router {
    // ---
    Router::new()
        .merge(health::router())
        .merge(commands::router())
        .merge(views::router())
        .with_state((handle, view))
}

impl DashboardError {
    fn status_code(&self) -> StatusCode {
        // ---
        match self {
            DashboardError::NotConnected | DashboardError::AlreadyConnected => {
                StatusCode::CONFLICT
            }
            DashboardError::NoData => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::ConnectionFailed(_)
            | DashboardError::HealthCheckFailed(_)
            | DashboardError::QueryFailed(_) => StatusCode::BAD_GATEWAY,
            DashboardError::CommandUnavailable(_) => StatusCode::BAD_REQUEST,
            DashboardError::RenderFailed(_)
            | DashboardError::WriteFailed(_)
            | DashboardError::ControllerGone => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        // ---
        let body = json!({ "error": self.kind(), "detail": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
