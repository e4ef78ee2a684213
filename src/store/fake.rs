//! In-memory store used by controller and fetcher tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::config::StoreSettings;
use crate::error::{DashboardError, DashboardResult};
use crate::query::FluxQuery;

use super::{Connector, FluxRecord, FluxTable, Health, SensorStore};

#[derive(Default)]
struct FakeState {
    connect_error: Mutex<Option<DashboardError>>,
    health: Mutex<Option<DashboardResult<Health>>>,
    responses: Mutex<VecDeque<DashboardResult<Vec<FluxTable>>>>,
    gate: Mutex<Option<Arc<Notify>>>,
    connects: AtomicUsize,
    queries: AtomicUsize,
    closes: AtomicUsize,
}

/// Scriptable store; clones share state so tests keep a handle after connecting.
#[derive(Clone, Default)]
pub(crate) struct FakeStore {
    state: Arc<FakeState>,
}

impl FakeStore {
    pub(crate) fn fail_connect(&self, err: DashboardError) {
        *self.state.connect_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn set_health(&self, health: DashboardResult<Health>) {
        *self.state.health.lock().unwrap() = Some(health);
    }

    pub(crate) fn push_response(&self, response: DashboardResult<Vec<FluxTable>>) {
        self.state.responses.lock().unwrap().push_back(response);
    }

    /// Hold every query until the returned `Notify` is signalled.
    pub(crate) fn gate_queries(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub(crate) fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> usize {
        self.state.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

impl SensorStore for FakeStore {
    async fn health(&self) -> DashboardResult<Health> {
        self.state.health.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(Health {
                status: "pass".into(),
                message: "ready for queries and writes".into(),
            })
        })
    }

    async fn query(&self, _query: &FluxQuery) -> DashboardResult<Vec<FluxTable>> {
        self.state.queries.fetch_add(1, Ordering::SeqCst);
        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.state
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out clones of one [`FakeStore`].
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    pub(crate) store: FakeStore,
}

impl Connector for FakeConnector {
    type Store = FakeStore;

    fn connect(&self, _settings: &StoreSettings) -> DashboardResult<FakeStore> {
        self.store.state.connects.fetch_add(1, Ordering::SeqCst);
        match self.store.state.connect_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.store.clone()),
        }
    }
}

/// A single-table result with one record per `(time, field, value)` triple.
pub(crate) fn table(rows: &[(&str, &str, f64)]) -> FluxTable {
    FluxTable {
        records: rows
            .iter()
            .map(|(time, field, value)| {
                FluxRecord::from_pairs([
                    ("_time", time.to_string()),
                    ("_field", field.to_string()),
                    ("_value", value.to_string()),
                    ("location", "Gudang Fermentasi 1".to_string()),
                    ("process_stage", "Fermentasi".to_string()),
                    ("sensor_id", "SHT20-PascaPanen-001".to_string()),
                ])
            })
            .collect(),
    }
}
