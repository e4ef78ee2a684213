//! `POST /commands/*`: forwards user commands to the controller task.

use std::path::PathBuf;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use tracing::info;

use super::AppState;
use crate::dashboard::{Command, CommandOutcome};
use crate::error::DashboardResult;
use crate::presenter::{Column, SortOrder};

// ---

#[derive(Debug, Deserialize)]
struct ExportRequest {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SortRequest {
    column: Column,
    order: SortOrder,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/commands/start", post(start))
        .route("/commands/stop", post(stop))
        .route("/commands/refresh", post(refresh))
        .route("/commands/export", post(export))
        .route("/commands/sort", post(sort))
}

async fn run(
    State((handle, _)): State<AppState>,
    command: Command,
) -> DashboardResult<Json<CommandOutcome>> {
    // ---
    info!("POST /commands/{}", command.name());
    handle.dispatch(command).await.map(Json)
}

async fn start(state: State<AppState>) -> DashboardResult<Json<CommandOutcome>> {
    run(state, Command::Start).await
}

async fn stop(state: State<AppState>) -> DashboardResult<Json<CommandOutcome>> {
    run(state, Command::Stop).await
}

async fn refresh(state: State<AppState>) -> DashboardResult<Json<CommandOutcome>> {
    run(state, Command::Refresh).await
}

async fn export(
    state: State<AppState>,
    Json(body): Json<ExportRequest>,
) -> DashboardResult<Json<CommandOutcome>> {
    run(state, Command::Export { path: body.path }).await
}

async fn sort(
    state: State<AppState>,
    Json(body): Json<SortRequest>,
) -> DashboardResult<Json<CommandOutcome>> {
    // ---
    let command = Command::Sort {
        column: body.column,
        order: body.order,
    };
    run(state, command).await
}
