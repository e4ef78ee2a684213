//! Read-only endpoints over the shared view: status, charts, table, notices.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::AppState;
use crate::models::{Field, Metadata};
use crate::presenter::{ChartFrame, HoverText, Notice, StatusLine, TableGrid};

// ---

/// Lookup failures that are not controller errors.
#[derive(Debug)]
enum ViewError {
    NotDrawn(String),
    BadRequest(&'static str),
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        // ---
        let (status, kind, detail) = match self {
            ViewError::NotDrawn(detail) => (StatusCode::NOT_FOUND, "not_drawn", detail),
            ViewError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "bad_request", detail.to_string())
            }
        };
        (status, Json(json!({ "error": kind, "detail": detail }))).into_response()
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: StatusLine,
    last_updated: Option<String>,
    metadata: Option<Metadata>,
}

/// Either a plotted index or a pointer instant.
#[derive(Debug, Deserialize)]
struct HoverQuery {
    index: Option<usize>,
    at: Option<DateTime<Utc>>,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/status", get(status))
        .route("/charts/{field}", get(chart))
        .route("/charts/{field}/hover", get(hover))
        .route("/table", get(table))
        .route("/notices", get(notices))
}

async fn status(State((_, view)): State<AppState>) -> Json<StatusResponse> {
    // ---
    let snapshot = view.snapshot();
    Json(StatusResponse {
        status: snapshot.status,
        last_updated: snapshot.last_updated,
        metadata: snapshot.metadata,
    })
}

async fn chart(
    State((_, view)): State<AppState>,
    Path(field): Path<Field>,
) -> Result<Json<ChartFrame>, ViewError> {
    // ---
    view.chart(field)
        .map(Json)
        .ok_or_else(|| ViewError::NotDrawn(format!("{} chart has no data yet", field.as_str())))
}

async fn hover(
    State((_, view)): State<AppState>,
    Path(field): Path<Field>,
    Query(query): Query<HoverQuery>,
) -> Result<Json<HoverText>, ViewError> {
    // ---
    let frame = view
        .chart(field)
        .ok_or_else(|| ViewError::NotDrawn(format!("{} chart has no data yet", field.as_str())))?;
    let binding = frame.hover;

    let index = match (query.index, query.at) {
        (Some(index), _) => index,
        (None, Some(at)) => binding
            .resolve(at)
            .ok_or_else(|| ViewError::NotDrawn("chart has no points".to_string()))?,
        (None, None) => return Err(ViewError::BadRequest("expected `index` or `at`")),
    };
    debug!(
        "Hover on {} chart generation {} at index {}",
        field.as_str(),
        binding.generation(),
        index
    );

    binding
        .inspect(index)
        .map(Json)
        .ok_or_else(|| ViewError::NotDrawn(format!("no point at index {index}")))
}

async fn table(State((_, view)): State<AppState>) -> Result<Json<TableGrid>, ViewError> {
    // ---
    view.table()
        .map(Json)
        .ok_or_else(|| ViewError::NotDrawn("table has not been rendered".to_string()))
}

async fn notices(State((_, view)): State<AppState>) -> Json<Vec<Notice>> {
    Json(view.notices())
}
