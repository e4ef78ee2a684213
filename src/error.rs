//! Error taxonomy for the dashboard.
//!
//! Every variant is recovered at the boundary of the operation that raised
//! it and turned into a user-visible notice; none of them ends the process.

/// Errors raised by commands, poll ticks, presenters and the exporter.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    // ---
    #[error("Failed to connect to InfluxDB: {0}")]
    ConnectionFailed(String),

    #[error("InfluxDB health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query API not initialized")]
    NotConnected,

    #[error("Failed to execute query: {0}")]
    QueryFailed(String),

    #[error("Error updating chart: {0}")]
    RenderFailed(String),

    #[error("No data to export")]
    NoData,

    #[error("Failed to export data: {0}")]
    WriteFailed(String),

    #[error("Monitoring is already running")]
    AlreadyConnected,

    #[error("Command '{0}' is not available in this dashboard mode")]
    CommandUnavailable(&'static str),

    #[error("Dashboard controller is no longer running")]
    ControllerGone,
}

impl DashboardError {
    /// Stable machine-readable name, used in HTTP error bodies and notices.
    pub fn kind(&self) -> &'static str {
        // ---
        match self {
            DashboardError::ConnectionFailed(_) => "connection_failed",
            DashboardError::HealthCheckFailed(_) => "health_check_failed",
            DashboardError::NotConnected => "not_connected",
            DashboardError::QueryFailed(_) => "query_failed",
            DashboardError::RenderFailed(_) => "render_failed",
            DashboardError::NoData => "no_data",
            DashboardError::WriteFailed(_) => "write_failed",
            DashboardError::AlreadyConnected => "already_connected",
            DashboardError::CommandUnavailable(_) => "command_unavailable",
            DashboardError::ControllerGone => "controller_gone",
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
