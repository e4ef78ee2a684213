//! InfluxDB v2 HTTP client.
//!
//! Health checks hit `GET /health`; queries are posted to `/api/v2/query`
//! and answered as annotated CSV, which [`super::annotated_csv`] turns into
//! tables of records.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::StoreSettings;
use crate::error::{DashboardError, DashboardResult};
use crate::query::FluxQuery;

use super::{annotated_csv, Connector, FluxTable, Health, SensorStore};

// ---

/// Opens [`InfluxStore`] clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfluxConnector;

impl Connector for InfluxConnector {
    type Store = InfluxStore;

    fn connect(&self, settings: &StoreSettings) -> DashboardResult<InfluxStore> {
        InfluxStore::connect(settings)
    }
}

/// A configured HTTP client bound to one InfluxDB instance and organization.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    http: reqwest::Client,
    base_url: String,
    org: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

impl InfluxStore {
    /// Build a client carrying the token and request timeout.
    ///
    /// No request is made here; reachability is the health check's job.
    pub fn connect(settings: &StoreSettings) -> DashboardResult<Self> {
        // ---
        let parsed = Url::parse(&settings.url).map_err(|e| {
            DashboardError::ConnectionFailed(format!("invalid URL '{}': {}", settings.url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DashboardError::ConnectionFailed(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Token {}", settings.token))
            .map_err(|_| DashboardError::ConnectionFailed("token is not a valid header".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DashboardError::ConnectionFailed(e.to_string()))?;

        info!("InfluxDB client created for {}", settings.url);

        Ok(InfluxStore {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            org: settings.org.clone(),
            timeout: settings.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        // ---
        if err.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else {
            err.to_string()
        }
    }
}

impl SensorStore for InfluxStore {
    async fn health(&self) -> DashboardResult<Health> {
        // ---
        let url = self.endpoint("health");
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            DashboardError::HealthCheckFailed(format!("could not check health: {}", self.describe(&e)))
        })?;

        let status = response.status();
        let body: HealthResponse = response.json().await.map_err(|e| {
            DashboardError::HealthCheckFailed(format!(
                "unexpected health response ({}): {}",
                status, e
            ))
        })?;

        debug!("Health check returned {} ({})", body.status, status);
        Ok(Health {
            status: body.status,
            message: body.message.unwrap_or_default(),
        })
    }

    async fn query(&self, query: &FluxQuery) -> DashboardResult<Vec<FluxTable>> {
        // ---
        let url = Url::parse_with_params(&self.endpoint("api/v2/query"), &[("org", &self.org)])
            .map_err(|e| DashboardError::QueryFailed(format!("invalid query URL: {e}")))?;

        let payload = json!({
            "query": query.as_str(),
            "type": "flux",
            "dialect": {
                "header": true,
                "delimiter": ",",
                "annotations": ["datatype", "group", "default"],
            },
        });

        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/csv")
            .json(&payload)
            .send()
            .await
            .map_err(|e| DashboardError::QueryFailed(self.describe(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DashboardError::QueryFailed(self.describe(&e)))?;

        if !status.is_success() {
            return Err(DashboardError::QueryFailed(error_detail(status, &body)));
        }

        let tables = annotated_csv::decode(&body)?;
        debug!(
            "Query returned {} tables, {} records",
            tables.len(),
            tables.iter().map(|t| t.records.len()).sum::<usize>()
        );
        Ok(tables)
    }

    fn close(&self) {
        info!("Released InfluxDB client for {}", self.base_url);
    }
}

/// Human-readable detail for a non-2xx query response.
fn error_detail(status: StatusCode, body: &str) -> String {
    // ---
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            code: Some(code),
            message,
        }) => format!("{status} {code}: {message}"),
        Ok(ErrorResponse { message, .. }) => format!("{status}: {message}"),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn settings(url: &str) -> StoreSettings {
        // ---
        StoreSettings {
            url: url.to_string(),
            org: "ITS".to_string(),
            token: "secret".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        // ---
        let err = InfluxStore::connect(&settings("not a url")).unwrap_err();
        assert_eq!(err.kind(), "connection_failed");

        let err = InfluxStore::connect(&settings("ftp://localhost:8086")).unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn test_connect_rejects_bad_token() {
        // ---
        let mut s = settings("http://localhost:8086");
        s.token = "line\nbreak".to_string();

        let err = InfluxStore::connect(&s).unwrap_err();
        assert_eq!(err.kind(), "connection_failed");
    }

    #[test]
    fn test_endpoint_trims_slash() {
        // ---
        let store = InfluxStore::connect(&settings("http://localhost:8086/")).unwrap();
        assert_eq!(store.endpoint("health"), "http://localhost:8086/health");
    }

    #[test]
    fn test_error_detail() {
        // ---
        let detail = error_detail(
            StatusCode::BAD_REQUEST,
            r#"{"code":"invalid","message":"compilation failed"}"#,
        );
        assert_eq!(detail, "400 Bad Request invalid: compilation failed");

        let detail = error_detail(StatusCode::UNAUTHORIZED, "");
        assert_eq!(detail, "401 Unauthorized");

        let detail = error_detail(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(detail, "502 Bad Gateway: upstream down");
    }
}
