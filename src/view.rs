//! In-memory view that the HTTP routes read from.
//!
//! The controller pushes frames into [`SharedView`]; route handlers take
//! cheap snapshots under a read lock. Nothing here blocks on I/O.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::debug;

use crate::locale::Locale;
use crate::models::{Field, Metadata};
use crate::presenter::{ChartFrame, DashboardView, LinkState, Notice, StatusLine, TableGrid};

// ---

const MAX_NOTICES: usize = 50;

/// Everything currently on screen.
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    // ---
    pub status: StatusLine,
    pub last_updated: Option<String>,
    pub metadata: Option<Metadata>,
    pub charts: BTreeMap<Field, ChartFrame>,
    pub table: Option<TableGrid>,

    /// Most recent first.
    pub notices: VecDeque<Notice>,
}

/// Clonable handle to the shared snapshot.
#[derive(Debug, Clone)]
pub struct SharedView {
    inner: Arc<RwLock<ViewSnapshot>>,
}

impl SharedView {
    pub fn new(locale: Locale) -> Self {
        // ---
        SharedView {
            inner: Arc::new(RwLock::new(ViewSnapshot {
                status: StatusLine::new(LinkState::Idle, locale),
                last_updated: None,
                metadata: None,
                charts: BTreeMap::new(),
                table: None,
                notices: VecDeque::new(),
            })),
        }
    }

    // A panicking writer cannot leave a half-built frame behind (every
    // update is a single assignment), so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, ViewSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ViewSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.read().clone()
    }

    pub fn status(&self) -> StatusLine {
        self.read().status.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.read().status.state == LinkState::Connected
    }

    pub fn chart(&self, field: Field) -> Option<ChartFrame> {
        self.read().charts.get(&field).cloned()
    }

    pub fn table(&self) -> Option<TableGrid> {
        self.read().table.clone()
    }

    pub fn metadata(&self) -> Option<Metadata> {
        self.read().metadata.clone()
    }

    pub fn last_updated(&self) -> Option<String> {
        self.read().last_updated.clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.read().notices.iter().cloned().collect()
    }
}

impl DashboardView for SharedView {
    fn on_status_changed(&self, status: &StatusLine) {
        self.write().status = status.clone();
    }

    fn on_chart_updated(&self, frame: &ChartFrame) {
        self.write().charts.insert(frame.chart, frame.clone());
    }

    fn on_table_updated(&self, grid: &TableGrid) {
        self.write().table = Some(grid.clone());
    }

    fn on_metadata_discovered(&self, metadata: &Metadata) {
        // ---
        let mut snapshot = self.write();
        if snapshot.metadata.is_none() {
            debug!(
                "Showing metadata: {} / {} / {}",
                metadata.location, metadata.process_stage, metadata.sensor_id
            );
            snapshot.metadata = Some(metadata.clone());
        }
    }

    fn on_last_updated(&self, label: &str) {
        self.write().last_updated = Some(label.to_string());
    }

    fn on_notice(&self, notice: &Notice) {
        // ---
        let mut snapshot = self.write();
        snapshot.notices.push_front(notice.clone());
        snapshot.notices.truncate(MAX_NOTICES);
    }

    fn on_session_reset(&self) {
        // ---
        let mut snapshot = self.write();
        snapshot.charts.clear();
        snapshot.table = None;
        snapshot.metadata = None;
        snapshot.last_updated = None;
    }
}
