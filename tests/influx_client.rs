use std::collections::HashMap;
use std::net::TcpListener;

use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sensorflow_dashboard::config::{self, Config, StoreSettings};
use sensorflow_dashboard::query::{build_query, FluxQuery};
use sensorflow_dashboard::store::{Connector, InfluxConnector, SensorStore};
use sensorflow_dashboard::DashboardError;

const CSV_BODY: &str = "\
#datatype,string,long,dateTime:RFC3339,dateTime:RFC3339,dateTime:RFC3339,double,string,string,string,string,string\r
#group,false,false,true,true,false,false,true,true,true,true,true\r
#default,mean,,,,,,,,,,\r
,result,table,_start,_stop,_time,_value,_field,_measurement,location,process_stage,sensor_id\r
,,0,2025-03-26T09:00:00Z,2025-03-26T10:01:00Z,2025-03-26T10:00:00Z,25.3,temperature_celsius,environment_monitoring,Gudang Fermentasi 1,Fermentasi,SHT20-PascaPanen-001\r
,,0,2025-03-26T09:00:00Z,2025-03-26T10:01:00Z,2025-03-26T10:01:00Z,25.5,temperature_celsius,environment_monitoring,Gudang Fermentasi 1,Fermentasi,SHT20-PascaPanen-001\r
\r
";

fn test_config(url: &str) -> Config {
    // ---
    let vars = HashMap::from([
        ("INFLUX_URL", url.to_string()),
        ("INFLUX_ORG", "ITS".to_string()),
        ("INFLUX_TOKEN", "secret-token-value".to_string()),
        ("INFLUX_BUCKET", "SHT20".to_string()),
        ("SENSOR_LOCATION", "Gudang Fermentasi 1".to_string()),
        ("SENSOR_PROCESS_STAGE", "Fermentasi".to_string()),
        ("SENSOR_ID", "SHT20-PascaPanen-001".to_string()),
        ("REQUEST_TIMEOUT_SECS", "2".to_string()),
    ]);
    config::load_from(|name| vars.get(name).cloned()).expect("valid test config")
}

fn settings(server: &MockServer) -> StoreSettings {
    test_config(&server.uri()).store
}

fn query() -> FluxQuery {
    build_query(&test_config("http://localhost:8086").query)
}

#[tokio::test]
async fn health_pass_is_reported() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("Authorization", "Token secret-token-value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "influxdb",
            "status": "pass",
            "message": "ready for queries and writes",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = InfluxConnector.connect(&settings(&server))?;
    let health = store.health().await?;

    assert!(health.is_pass());
    assert_eq!(health.message, "ready for queries and writes");
    Ok(())
}

#[tokio::test]
async fn health_fail_is_not_pass() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "status": "fail",
            "message": "bolt database is not ready",
        })))
        .mount(&server)
        .await;

    let store = InfluxConnector.connect(&settings(&server))?;
    let health = store.health().await?;

    assert!(!health.is_pass());
    assert_eq!(health.message, "bolt database is not ready");
    Ok(())
}

#[tokio::test]
async fn unreachable_store_fails_health_check() -> Result<()> {
    // ---
    let port = TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let settings = test_config(&format!("http://127.0.0.1:{port}")).store;

    let store = InfluxConnector.connect(&settings)?;
    let err = store.health().await.unwrap_err();

    assert_eq!(err.kind(), "health_check_failed");
    assert!(err.to_string().contains("could not check health"));
    Ok(())
}

#[tokio::test]
async fn query_posts_flux_and_decodes_csv() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/query"))
        .and(query_param("org", "ITS"))
        .and(header("Accept", "application/csv"))
        .and(header("Authorization", "Token secret-token-value"))
        .and(body_partial_json(json!({ "type": "flux" })))
        .respond_with(ResponseTemplate::new(200).set_body_string(CSV_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let store = InfluxConnector.connect(&settings(&server))?;
    let tables = store.query(&query()).await?;

    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].records.len(), 2);
    assert_eq!(tables[0].records[1].value(), Some(25.5));
    assert_eq!(tables[0].records[0].get("result"), Some("mean"));
    Ok(())
}

#[tokio::test]
async fn query_error_status_is_query_failed() -> Result<()> {
    // ---
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/query"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "not found",
            "message": "failed to initialize execute state: could not find bucket \"SHT20\"",
        })))
        .mount(&server)
        .await;

    let store = InfluxConnector.connect(&settings(&server))?;
    let err = store.query(&query()).await.unwrap_err();

    match err {
        DashboardError::QueryFailed(detail) => {
            assert!(detail.contains("not found"), "detail was: {detail}");
            assert!(detail.contains("could not find bucket"));
        }
        other => panic!("expected QueryFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn invalid_url_is_connection_failure() {
    // ---
    let mut settings = test_config("http://localhost:8086").store;
    settings.url = "not a url".to_string();

    let err = InfluxConnector.connect(&settings).unwrap_err();
    assert_eq!(err.kind(), "connection_failed");
}
