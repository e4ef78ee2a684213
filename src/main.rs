//! Application entry point for the `sensorflow-dashboard` service.
//!
//! This binary orchestrates the startup sequence for the sensor dashboard:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Spawning the dashboard controller task over the InfluxDB connector
//! - Optionally starting monitoring right away (`DASHBOARD_AUTOSTART`)
//! - Mounting the HTTP routes via the `routes` gateway and serving them
//!
//! # Environment Variables
//! See `config::load_from_env` for the full list. Logging is controlled by
//! - `DASHBOARD_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `DASHBOARD_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! Ctrl-C stops the HTTP server, then the controller, which releases any
//! open store connection.
use std::env;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use sensorflow_dashboard::{config, routes, Command, Dashboard, InfluxConnector, SharedView};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let bind_addr = cfg.bind_addr;
    let autostart = cfg.autostart;
    let shutdown = CancellationToken::new();

    let view = SharedView::new(cfg.locale);
    let (handle, dashboard) =
        Dashboard::new(cfg, InfluxConnector, Arc::new(view.clone()), shutdown.clone());
    let controller = tokio::spawn(dashboard.run());

    if autostart {
        // A failed autostart is already shown as a notice; keep serving.
        if let Err(e) = handle.dispatch(Command::Start).await {
            tracing::warn!("Autostart failed: {}", e);
        }
    }

    // Build app from routes gateway
    let app: Router = routes::router(handle, view);

    tracing::info!("Listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    controller.await?;

    Ok(())
}

// ---

async fn shutdown_signal() {
    // ---
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}

/// Install the compact fmt subscriber with file and line locations.
///
/// `RUST_LOG` wins when set. Otherwise `DASHBOARD_LOG_LEVEL` picks the
/// crate-wide level (default `debug`) while hyper and reqwest stay at
/// `info`, so a debug session does not log every pooled connection the
/// InfluxDB client opens. `DASHBOARD_SPAN_EVENTS=full|enter_exit` widens
/// span events beyond close. `FORCE_COLOR` overrides TTY detection for ANSI
/// output. Call once, before the first log line.
fn init_tracing() {
    // ---
    let span_events = match env::var("DASHBOARD_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // ANSI only for a terminal unless forced
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // RUST_LOG overrides the dashboard level and the client caps
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("DASHBOARD_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,hyper_util=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
