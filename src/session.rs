//! Monitoring session: one open, health-checked store client.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::StoreSettings;
use crate::error::{DashboardError, DashboardResult};
use crate::models::Metadata;
use crate::store::{Connector, SensorStore};

// ---

/// State of one connection, from a successful health check until stop.
pub struct Session<S: SensorStore> {
    // ---
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub poll_interval: Duration,
    store: Arc<S>,
    metadata: Option<Metadata>,
}

impl<S: SensorStore> Session<S> {
    /// Connect and health-check. The client is closed on every failure path.
    pub async fn open<C>(
        connector: &C,
        settings: &StoreSettings,
        poll_interval: Duration,
    ) -> DashboardResult<Self>
    where
        C: Connector<Store = S>,
    {
        // ---
        let store = connector.connect(settings)?;

        let health = match store.health().await {
            Ok(health) => health,
            Err(e) => {
                store.close();
                return Err(e);
            }
        };
        if !health.is_pass() {
            store.close();
            warn!("InfluxDB reported {}: {}", health.status, health.message);
            return Err(DashboardError::HealthCheckFailed(health.message));
        }

        let session = Session {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            poll_interval,
            store: Arc::new(store),
            metadata: None,
        };
        info!("Session {} connected to {}", session.id, settings.url);
        Ok(session)
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Record metadata if none is set yet. Returns it only the first time.
    pub fn discover(&mut self, metadata: Metadata) -> Option<&Metadata> {
        // ---
        if self.metadata.is_some() {
            return None;
        }
        self.metadata = Some(metadata);
        self.metadata.as_ref()
    }

    /// Release the store client.
    pub fn close(self) {
        // ---
        self.store.close();
        info!(
            "Session {} closed after {}s",
            self.id,
            (Utc::now() - self.started_at).num_seconds()
        );
    }
}
