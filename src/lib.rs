//! Polling dashboard for environmental sensor readings stored in InfluxDB.
//!
//! The crate is laid out as a set of sibling modules with a single gateway
//! (this file). Leaf modules know only about their siblings' public types:
//! - `config`: environment configuration
//! - `query` / `store`: Flux query text and the store client seam
//! - `fetcher` / `reconciler`: polling and the deduplicated dataset
//! - `presenter` / `view` / `export`: frames for charts, table and xlsx
//! - `session` / `dashboard`: the connection lifecycle and controller task
//! - `routes`: the HTTP surface over the controller and view

pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod locale;
pub mod models;
pub mod presenter;
pub mod query;
pub mod reconciler;
pub mod routes;
pub mod session;
pub mod store;
pub mod view;

pub use config::{Config, Mode};
pub use dashboard::{Command, CommandOutcome, Dashboard, DashboardHandle};
pub use error::{DashboardError, DashboardResult};
pub use locale::Locale;
pub use models::{Field, Metadata, Reading, Row};
pub use store::{InfluxConnector, InfluxStore};
pub use view::SharedView;
