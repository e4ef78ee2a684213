//! Configuration loader for the `sensorflow-dashboard` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Store credentials, query filters and display
//! settings all come from here and are passed explicitly into the session,
//! query builder and presenters; nothing downstream reads the environment.
//!
use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;

use crate::locale::Locale;
use crate::query::FluxDuration;

/// Parse an optional environment variable into `$ty`, leaving `None` when unset.
macro_rules! parse_env_opt {
    ($lookup:expr, $var_name:expr, $ty:ty) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
    };
}

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        parse_env_opt!($lookup, $var_name, $ty).unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

// ---

/// Connection settings for the time-series store.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    // ---
    /// Base URL, e.g. `http://localhost:8086`.
    pub url: String,

    /// Organization the token belongs to.
    pub org: String,

    /// API token. Never logged in clear.
    pub token: String,

    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

/// Everything the query builder needs to shape the windowed query.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    // ---
    pub bucket: String,
    pub measurement: String,

    /// Store field name mapped to the temperature series.
    pub temperature_field: String,

    /// Store field name mapped to the humidity series.
    pub humidity_field: String,

    pub location: String,
    pub process_stage: String,
    pub sensor_id: String,

    /// How far back each poll looks (`range(start: -lookback)`).
    pub lookback: FluxDuration,

    /// Aggregation granularity (`aggregateWindow(every: ...)`).
    pub aggregate_every: FluxDuration,
}

/// Which presenters are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Charts only.
    Basic,
    /// Charts, table, refresh and spreadsheet export.
    Extended,
}

impl Mode {
    pub fn has_table(self) -> bool {
        self == Mode::Extended
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Mode::Basic),
            "extended" => Ok(Mode::Extended),
            other => Err(format!("unsupported mode '{other}' (expected basic or extended)")),
        }
    }
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    pub store: StoreSettings,
    pub query: QuerySettings,

    /// Timer period between polls.
    pub poll_interval: Duration,

    /// Zone used for charts, the table and exported timestamps.
    pub display_tz: Tz,

    pub locale: Locale,
    pub mode: Mode,

    /// Optional rolling retention window for the accumulated dataset.
    pub retention: Option<chrono::Duration>,

    /// Dispatch `start` as soon as the service is up.
    pub autostart: bool,

    /// HTTP listen address.
    pub bind_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `INFLUX_URL`, `INFLUX_ORG`, `INFLUX_TOKEN`, `INFLUX_BUCKET`
/// - `SENSOR_LOCATION`, `SENSOR_PROCESS_STAGE`, `SENSOR_ID` – query filters
///
/// Optional:
/// - `INFLUX_MEASUREMENT` (default: `environment_monitoring`)
/// - `TEMPERATURE_FIELD` / `HUMIDITY_FIELD` (default: `temperature_celsius` / `humidity_percent`)
/// - `QUERY_LOOKBACK` (default: `1h`), `QUERY_AGGREGATE_EVERY` (default: `1m`)
/// - `POLL_INTERVAL_SECS` (default: 10), `REQUEST_TIMEOUT_SECS` (default: 30)
/// - `DISPLAY_TZ` (default: `Asia/Jakarta`), `DASHBOARD_LOCALE` (default: `en`)
/// - `DASHBOARD_MODE` (default: `extended`), `RETENTION_HOURS` (default: unbounded)
/// - `DASHBOARD_AUTOSTART` (default: false), `BIND_ADDR` (default: `0.0.0.0:8080`)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    load_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary lookup function.
///
/// Empty values are treated as unset.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let store = StoreSettings {
        url: require_env!(lookup, "INFLUX_URL").trim_end_matches('/').to_string(),
        org: require_env!(lookup, "INFLUX_ORG"),
        token: require_env!(lookup, "INFLUX_TOKEN"),
        timeout: Duration::from_secs(parse_env!(lookup, "REQUEST_TIMEOUT_SECS", u64, 30)),
    };

    let query = QuerySettings {
        bucket: require_env!(lookup, "INFLUX_BUCKET"),
        measurement: lookup("INFLUX_MEASUREMENT")
            .unwrap_or_else(|| "environment_monitoring".to_string()),
        temperature_field: lookup("TEMPERATURE_FIELD")
            .unwrap_or_else(|| "temperature_celsius".to_string()),
        humidity_field: lookup("HUMIDITY_FIELD").unwrap_or_else(|| "humidity_percent".to_string()),
        location: require_env!(lookup, "SENSOR_LOCATION"),
        process_stage: require_env!(lookup, "SENSOR_PROCESS_STAGE"),
        sensor_id: require_env!(lookup, "SENSOR_ID"),
        lookback: parse_env!(lookup, "QUERY_LOOKBACK", FluxDuration, FluxDuration::hours(1)),
        aggregate_every: parse_env!(
            lookup,
            "QUERY_AGGREGATE_EVERY",
            FluxDuration,
            FluxDuration::minutes(1)
        ),
    };

    let poll_secs = parse_env!(lookup, "POLL_INTERVAL_SECS", u64, 10);
    if poll_secs == 0 {
        bail!("Invalid POLL_INTERVAL_SECS: must be greater than zero");
    }
    if store.timeout.is_zero() {
        bail!("Invalid REQUEST_TIMEOUT_SECS: must be greater than zero");
    }
    if query.temperature_field == query.humidity_field {
        bail!("TEMPERATURE_FIELD and HUMIDITY_FIELD must name different fields");
    }

    let retention = match parse_env_opt!(lookup, "RETENTION_HOURS", u32) {
        Some(0) => bail!("Invalid RETENTION_HOURS: must be greater than zero"),
        Some(hours) => Some(chrono::Duration::hours(i64::from(hours))),
        None => None,
    };

    let autostart = match lookup("DASHBOARD_AUTOSTART") {
        Some(v) => parse_flag(&v).ok_or_else(|| anyhow!("Invalid DASHBOARD_AUTOSTART: {}", v))?,
        None => false,
    };

    Ok(Config {
        store,
        query,
        poll_interval: Duration::from_secs(poll_secs),
        display_tz: parse_env!(lookup, "DISPLAY_TZ", Tz, chrono_tz::Asia::Jakarta),
        locale: parse_env!(lookup, "DASHBOARD_LOCALE", Locale, Locale::En),
        mode: parse_env!(lookup, "DASHBOARD_MODE", Mode, Mode::Extended),
        retention,
        autostart,
        bind_addr: parse_env!(
            lookup,
            "BIND_ADDR",
            SocketAddr,
            SocketAddr::from(([0, 0, 0, 0], 8080))
        ),
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    // ---
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl StoreSettings {
    /// Token with everything but the first four characters hidden.
    pub fn masked_token(&self) -> String {
        // ---
        let visible: String = self.token.chars().take(4).collect();
        if self.token.chars().count() <= 4 {
            "****".to_string()
        } else {
            format!("{visible}****")
        }
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the store token while showing all other configuration values
    /// that were loaded.
    pub fn log_config(&self) {
        // ---
        let retention = self
            .retention
            .map(|r| format!("{}h", r.num_hours()))
            .unwrap_or_else(|| "unbounded".to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  INFLUX_URL            : {}", self.store.url);
        tracing::info!("  INFLUX_ORG            : {}", self.store.org);
        tracing::info!("  INFLUX_TOKEN          : {}", self.store.masked_token());
        tracing::info!("  INFLUX_BUCKET         : {}", self.query.bucket);
        tracing::info!("  INFLUX_MEASUREMENT    : {}", self.query.measurement);
        tracing::info!(
            "  FIELDS                : {} / {}",
            self.query.temperature_field,
            self.query.humidity_field
        );
        tracing::info!(
            "  FILTERS               : {} / {} / {}",
            self.query.location,
            self.query.process_stage,
            self.query.sensor_id
        );
        tracing::info!("  QUERY_LOOKBACK        : {}", self.query.lookback);
        tracing::info!("  QUERY_AGGREGATE_EVERY : {}", self.query.aggregate_every);
        tracing::info!("  POLL_INTERVAL_SECS    : {}", self.poll_interval.as_secs());
        tracing::info!("  REQUEST_TIMEOUT_SECS  : {}", self.store.timeout.as_secs());
        tracing::info!("  DISPLAY_TZ            : {}", self.display_tz.name());
        tracing::info!("  DASHBOARD_LOCALE      : {:?}", self.locale);
        tracing::info!("  DASHBOARD_MODE        : {:?}", self.mode);
        tracing::info!("  RETENTION             : {}", retention);
        tracing::info!("  DASHBOARD_AUTOSTART   : {}", self.autostart);
        tracing::info!("  BIND_ADDR             : {}", self.bind_addr);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    // ---
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn base_vars() -> HashMap<&'static str, &'static str> {
        // ---
        HashMap::from([
            ("INFLUX_URL", "http://localhost:8086/"),
            ("INFLUX_ORG", "ITS"),
            ("INFLUX_TOKEN", "secret-token-value"),
            ("INFLUX_BUCKET", "SHT20"),
            ("SENSOR_LOCATION", "Gudang Fermentasi 1"),
            ("SENSOR_PROCESS_STAGE", "Fermentasi"),
            ("SENSOR_ID", "SHT20-PascaPanen-001"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        // ---
        load_from(|name| vars.get(name).map(|v| v.to_string()))
    }

    /// Config built from the required variables only, for use by other modules' tests.
    pub(crate) fn test_config() -> Config {
        // ---
        load(&base_vars()).expect("base vars are valid")
    }

    #[test]
    fn test_defaults_applied() {
        // ---
        let cfg = load(&base_vars()).unwrap();

        assert_eq!(cfg.store.url, "http://localhost:8086");
        assert_eq!(cfg.store.timeout, Duration::from_secs(30));
        assert_eq!(cfg.poll_interval, Duration::from_secs(10));
        assert_eq!(cfg.query.measurement, "environment_monitoring");
        assert_eq!(cfg.query.temperature_field, "temperature_celsius");
        assert_eq!(cfg.query.humidity_field, "humidity_percent");
        assert_eq!(cfg.query.lookback.as_str(), "1h");
        assert_eq!(cfg.query.aggregate_every.as_str(), "1m");
        assert_eq!(cfg.display_tz, chrono_tz::Asia::Jakarta);
        assert_eq!(cfg.locale, Locale::En);
        assert_eq!(cfg.mode, Mode::Extended);
        assert!(cfg.retention.is_none());
        assert!(!cfg.autostart);
        assert_eq!(cfg.bind_addr.port(), 8080);
    }

    #[test]
    fn test_missing_required_variable() {
        // ---
        let mut vars = base_vars();
        vars.remove("INFLUX_TOKEN");

        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("INFLUX_TOKEN must be set"));
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        // ---
        let mut vars = base_vars();
        vars.insert("SENSOR_ID", "   ");

        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("SENSOR_ID"));
    }

    #[test]
    fn test_overrides() {
        // ---
        let mut vars = base_vars();
        vars.insert("POLL_INTERVAL_SECS", "5");
        vars.insert("QUERY_LOOKBACK", "24h");
        vars.insert("DISPLAY_TZ", "Europe/Berlin");
        vars.insert("DASHBOARD_LOCALE", "id");
        vars.insert("DASHBOARD_MODE", "basic");
        vars.insert("RETENTION_HOURS", "48");
        vars.insert("DASHBOARD_AUTOSTART", "yes");

        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.query.lookback.as_str(), "24h");
        assert_eq!(cfg.display_tz, chrono_tz::Europe::Berlin);
        assert_eq!(cfg.locale, Locale::Id);
        assert_eq!(cfg.mode, Mode::Basic);
        assert_eq!(cfg.retention, Some(chrono::Duration::hours(48)));
        assert!(cfg.autostart);
    }

    #[test]
    fn test_invalid_values_rejected() {
        // ---
        for (var, value) in [
            ("POLL_INTERVAL_SECS", "ten"),
            ("POLL_INTERVAL_SECS", "0"),
            ("DISPLAY_TZ", "Mars/Olympus"),
            ("QUERY_LOOKBACK", "-1h"),
            ("DASHBOARD_MODE", "fancy"),
            ("RETENTION_HOURS", "0"),
            ("DASHBOARD_AUTOSTART", "maybe"),
        ] {
            let mut vars = base_vars();
            vars.insert(var, value);
            assert!(load(&vars).is_err(), "{var}={value} should be rejected");
        }
    }

    #[test]
    fn test_same_field_names_rejected() {
        // ---
        let mut vars = base_vars();
        vars.insert("HUMIDITY_FIELD", "temperature_celsius");

        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_token_masking() {
        // ---
        let cfg = load(&base_vars()).unwrap();
        assert_eq!(cfg.store.masked_token(), "secr****");

        let mut short = cfg.store.clone();
        short.token = "abc".to_string();
        assert_eq!(short.masked_token(), "****");
    }
}
