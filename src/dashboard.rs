//! Dashboard controller.
//!
//! A single task owns every piece of mutable state: the session, the
//! reconciled dataset, the presenters and the poll timer. Commands reach it
//! over a channel and are answered through a oneshot, so start, stop, ticks
//! and fetch completions are strictly serialized without any locking.
//!
//! Fetches run on their own task. At most one is in flight; a tick that
//! fires while one is still running is skipped, and stop aborts it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{DashboardError, DashboardResult};
use crate::export::Exporter;
use crate::fetcher::{self, Batch};
use crate::models::Field;
use crate::presenter::{
    ChartPresenter, Column, DashboardView, LinkState, Notice, NoticeLevel, SortOrder, StatusLine,
    TablePresenter,
};
use crate::query::{build_query, FluxQuery};
use crate::reconciler::Reconciler;
use crate::session::Session;
use crate::store::Connector;

// ---

const LAST_UPDATED_FORMAT: &str = "%d %B %Y - %H:%M:%S";
const COMMAND_BUFFER: usize = 32;

/// User commands accepted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Refresh,
    Export { path: PathBuf },
    Sort { column: Column, order: SortOrder },
}

impl Command {
    pub fn name(&self) -> &'static str {
        // ---
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Refresh => "refresh",
            Command::Export { .. } => "export",
            Command::Sort { .. } => "sort",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Started { session_id: Uuid },
    Stopped { rows: usize },
    Refreshed { rows: usize },
    Exported { path: PathBuf, rows: usize },
    Sorted { column: Column, order: SortOrder },
}

struct Envelope {
    command: Command,
    reply: oneshot::Sender<DashboardResult<CommandOutcome>>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Cloneable sender side of the controller.
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    tx: mpsc::Sender<Envelope>,
}

impl DashboardHandle {
    /// Send a command and wait for its outcome.
    pub async fn dispatch(&self, command: Command) -> DashboardResult<CommandOutcome> {
        // ---
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(Envelope { command, reply })
            .await
            .map_err(|_| DashboardError::ControllerGone)?;
        outcome.await.map_err(|_| DashboardError::ControllerGone)?
    }
}

type FetchTask = JoinHandle<DashboardResult<Batch>>;

/// The controller task. Build with [`Dashboard::new`], then `run` it.
pub struct Dashboard<C: Connector, V: DashboardView> {
    // ---
    config: Config,
    connector: C,
    view: Arc<V>,
    query: FluxQuery,

    reconciler: Reconciler,
    charts: [ChartPresenter; 2],
    table: Option<TablePresenter>,
    exporter: Option<Exporter>,

    session: Option<Session<C::Store>>,
    link_state: LinkState,
    ticker: Option<Interval>,
    in_flight: Option<FetchTask>,

    commands: mpsc::Receiver<Envelope>,
    shutdown: CancellationToken,
}

impl<C: Connector, V: DashboardView> Dashboard<C, V> {
    pub fn new(
        config: Config,
        connector: C,
        view: Arc<V>,
        shutdown: CancellationToken,
    ) -> (DashboardHandle, Self) {
        // ---
        let (tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let tz = config.display_tz;
        let locale = config.locale;
        let extended = config.mode.has_table();

        let dashboard = Dashboard {
            query: build_query(&config.query),
            reconciler: Reconciler::new(config.retention),
            charts: [
                ChartPresenter::new(Field::Temperature, tz, locale),
                ChartPresenter::new(Field::Humidity, tz, locale),
            ],
            table: extended.then(|| TablePresenter::new(tz, locale)),
            exporter: extended.then(|| Exporter::new(tz, locale)),
            session: None,
            link_state: LinkState::Idle,
            ticker: None,
            in_flight: None,
            config,
            connector,
            view,
            commands,
            shutdown,
        };
        (DashboardHandle { tx }, dashboard)
    }

    /// Serve commands, ticks and fetch completions until shutdown or until
    /// every handle is dropped.
    pub async fn run(mut self) {
        // ---
        info!("Dashboard controller running ({:?} mode)", self.config.mode);
        self.view
            .on_status_changed(&StatusLine::new(self.link_state, self.config.locale));

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Shutdown requested");
                    break;
                }
                envelope = self.commands.recv() => {
                    let Some(Envelope { command, reply }) = envelope else {
                        debug!("All dashboard handles dropped");
                        break;
                    };
                    let outcome = self.dispatch(command).await;
                    if reply.send(outcome).is_err() {
                        debug!("Command caller went away before the reply");
                    }
                }
                _ = next_tick(&mut self.ticker) => self.on_tick(),
                joined = join_fetch(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.on_fetch_complete(joined);
                }
            }
        }

        self.release();
        info!("Dashboard controller stopped");
    }

    /// Execute one command. Failures are also posted to the view as notices.
    pub async fn dispatch(&mut self, command: Command) -> DashboardResult<CommandOutcome> {
        // ---
        let name = command.name();
        debug!("Dispatching '{}'", name);

        let result = match command {
            Command::Start => self.start().await,
            Command::Stop => self.stop(),
            Command::Refresh => self.refresh(),
            Command::Export { path } => self.export(&path),
            Command::Sort { column, order } => self.sort(column, order),
        };

        if let Err(e) = &result {
            warn!("Command '{}' failed: {}", name, e);
            self.view.on_notice(&Notice::from_error(e));
        }
        result
    }

    async fn start(&mut self) -> DashboardResult<CommandOutcome> {
        // ---
        if self.session.is_some() {
            return Err(DashboardError::AlreadyConnected);
        }

        let period = self.config.poll_interval;
        let session = match Session::open(&self.connector, &self.config.store, period).await {
            Ok(session) => session,
            Err(e) => {
                let state = match e {
                    DashboardError::HealthCheckFailed(_) => LinkState::HealthCheckFailed,
                    _ => LinkState::ConnectionFailed,
                };
                self.set_status(state);
                return Err(e);
            }
        };

        // A new session starts from an empty dataset and a blank screen.
        self.reconciler.clear();
        for chart in self.charts.iter_mut() {
            chart.release();
        }
        self.view.on_session_reset();
        let session_id = session.id;
        self.session = Some(session);

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);

        self.set_status(LinkState::Connected);
        self.poll();

        Ok(CommandOutcome::Started { session_id })
    }

    fn stop(&mut self) -> DashboardResult<CommandOutcome> {
        // ---
        let session = self.session.take().ok_or(DashboardError::NotConnected)?;

        self.ticker = None;
        if let Some(task) = self.in_flight.take() {
            task.abort();
            debug!("Aborted in-flight fetch");
        }
        session.close();

        self.set_status(LinkState::Disconnected);
        let labels = self.config.locale.labels();
        self.view
            .on_notice(&Notice::info("monitoring_stopped", labels.monitoring_stopped));

        Ok(CommandOutcome::Stopped {
            rows: self.reconciler.distinct_timestamps(),
        })
    }

    fn refresh(&mut self) -> DashboardResult<CommandOutcome> {
        // ---
        let table = self
            .table
            .as_mut()
            .ok_or(DashboardError::CommandUnavailable("refresh"))?;

        let rows = self.reconciler.rows();
        self.view.on_table_updated(table.render(&rows));
        Ok(CommandOutcome::Refreshed { rows: rows.len() })
    }

    fn export(&mut self, destination: &Path) -> DashboardResult<CommandOutcome> {
        // ---
        let exporter = self
            .exporter
            .as_ref()
            .ok_or(DashboardError::CommandUnavailable("export"))?;

        let rows = self.reconciler.rows();
        let path = exporter.export(&rows, destination)?;

        let labels = self.config.locale.labels();
        self.view.on_notice(&Notice::info(
            "exported",
            format!("{}: {}", labels.export_succeeded, path.display()),
        ));
        Ok(CommandOutcome::Exported {
            path,
            rows: rows.len(),
        })
    }

    fn sort(&mut self, column: Column, order: SortOrder) -> DashboardResult<CommandOutcome> {
        // ---
        let table = self
            .table
            .as_mut()
            .ok_or(DashboardError::CommandUnavailable("sort"))?;

        self.view.on_table_updated(table.sort_by(column, order));
        Ok(CommandOutcome::Sorted { column, order })
    }

    fn on_tick(&mut self) {
        // ---
        if self.in_flight.is_some() {
            debug!("Previous fetch still running; skipping this tick");
            return;
        }
        self.poll();
    }

    /// Spawn one fetch for the current session.
    fn poll(&mut self) {
        // ---
        let store = self.session.as_ref().map(Session::store);
        let task = tokio::spawn(fetcher::fetch(
            store,
            self.query.clone(),
            self.config.query.clone(),
        ));
        self.in_flight = Some(task);
    }

    fn on_fetch_complete(&mut self, joined: Result<DashboardResult<Batch>, JoinError>) {
        // ---
        match joined {
            Err(e) if e.is_cancelled() => debug!("Fetch was cancelled"),
            Err(e) => {
                error!("Fetch task failed: {}", e);
                self.set_status(LinkState::UpdateError);
                self.view.on_notice(&Notice::new(
                    NoticeLevel::Error,
                    "update_failed",
                    e.to_string(),
                ));
            }
            Ok(Err(e)) => {
                warn!("Poll failed: {}", e);
                let state = match e {
                    DashboardError::NotConnected => LinkState::NoQueryApi,
                    _ => LinkState::QueryError,
                };
                self.set_status(state);
                self.view.on_notice(&Notice::from_error(&e));
            }
            Ok(Ok(batch)) => self.apply(batch),
        }
    }

    /// Merge a fetched batch and redraw everything that depends on it.
    fn apply(&mut self, batch: Batch) {
        // ---
        if let (Some(metadata), Some(session)) = (batch.metadata, self.session.as_mut()) {
            if let Some(found) = session.discover(metadata) {
                info!(
                    "Sensor metadata: location={}, process_stage={}, sensor_id={}",
                    found.location, found.process_stage, found.sensor_id
                );
                self.view.on_metadata_discovered(found);
            }
        }

        let rows = self.reconciler.merge(batch.readings);
        self.render_charts();

        if let Some(table) = self.table.as_mut() {
            self.view.on_table_updated(table.render(&rows));
        }

        let now = Utc::now().with_timezone(&self.config.display_tz);
        let labels = self.config.locale.labels();
        self.view.on_last_updated(&format!(
            "{}: {}",
            labels.last_updated,
            now.format(LAST_UPDATED_FORMAT)
        ));

        if self.session.is_some() {
            self.set_status(LinkState::Connected);
        }
    }

    /// Charts draw from the whole dataset. Each chart fails on its own.
    fn render_charts(&mut self) {
        // ---
        for chart in self.charts.iter_mut() {
            let series = self.reconciler.series(chart.field());
            if series.is_empty() {
                debug!("No {} readings yet", chart.field().as_str());
                continue;
            }
            match chart.render(&series) {
                Ok(frame) => self.view.on_chart_updated(&frame),
                Err(e) => {
                    warn!("{} chart not redrawn: {}", chart.field().as_str(), e);
                    self.view.on_notice(&Notice::from_error(&e));
                }
            }
        }
    }

    fn set_status(&mut self, state: LinkState) {
        // ---
        if self.link_state == state {
            return;
        }
        debug!("Status {:?} -> {:?}", self.link_state, state);
        self.link_state = state;
        self.view
            .on_status_changed(&StatusLine::new(state, self.config.locale));
    }

    /// Abort any fetch and close the session without touching the view.
    fn release(&mut self) {
        // ---
        self.ticker = None;
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
        if let Some(session) = self.session.take() {
            session.close();
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    // ---
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn join_fetch(task: &mut Option<FetchTask>) -> Result<DashboardResult<Batch>, JoinError> {
    // ---
    match task {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
