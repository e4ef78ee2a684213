//! Presentation layer contracts and the two presenters.
//!
//! Presenters turn reconciled data into ready-to-draw frames. The frames,
//! together with status and notifications, are pushed to whatever UI is
//! attached through [`DashboardView`]; the controller never talks to a
//! widget toolkit directly.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DashboardError;
use crate::locale::Locale;
use crate::models::Metadata;

pub mod chart;
pub mod table;

pub use chart::{ChartFrame, ChartPoint, ChartPresenter, HoverBinding, HoverText};
pub use table::{format_value, Column, SortOrder, SortState, TableGrid, TablePresenter, TableRow};

// ---

/// Receiver of everything the dashboard wants to show.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// controller task.
pub trait DashboardView: Send + Sync + 'static {
    fn on_status_changed(&self, status: &StatusLine);

    fn on_chart_updated(&self, frame: &ChartFrame);

    fn on_table_updated(&self, grid: &TableGrid);

    /// Set-if-unset: a view keeps the first metadata it receives.
    fn on_metadata_discovered(&self, metadata: &Metadata);

    fn on_last_updated(&self, label: &str);

    fn on_notice(&self, notice: &Notice);

    /// A new session began: drop every frame drawn from the previous dataset.
    fn on_session_reset(&self);
}

/// Connection state shown in the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Idle,
    Connected,
    HealthCheckFailed,
    ConnectionFailed,
    Disconnected,
    QueryError,
    UpdateError,
    NoQueryApi,
}

/// Status line state plus its localized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub state: LinkState,
    pub text: String,
}

impl StatusLine {
    pub fn new(state: LinkState, locale: Locale) -> Self {
        // ---
        let labels = locale.labels();
        let text = match state {
            LinkState::Idle => labels.status_idle,
            LinkState::Connected => labels.status_connected,
            LinkState::HealthCheckFailed => labels.status_health_check_failed,
            LinkState::ConnectionFailed => labels.status_connection_failed,
            LinkState::Disconnected => labels.status_disconnected,
            LinkState::QueryError => labels.status_query_error,
            LinkState::UpdateError => labels.status_update_error,
            LinkState::NoQueryApi => labels.status_no_query_api,
        };
        StatusLine {
            state,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub kind: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, kind: &str, message: impl Into<String>) -> Self {
        // ---
        Notice {
            level,
            kind: kind.to_string(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn info(kind: &str, message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Info, kind, message)
    }

    /// Connection failures are errors; everything else is a warning.
    pub fn from_error(err: &DashboardError) -> Self {
        // ---
        let level = match err {
            DashboardError::ConnectionFailed(_) | DashboardError::ControllerGone => {
                NoticeLevel::Error
            }
            _ => NoticeLevel::Warning,
        };
        Notice::new(level, err.kind(), err.to_string())
    }
}
