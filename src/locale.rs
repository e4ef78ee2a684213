//! Human-readable labels for charts, table headers, exports and status text.

use std::str::FromStr;

use serde::Serialize;

/// Display language for every user-facing string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    En,
    Id,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "id" | "indonesian" | "bahasa" => Ok(Locale::Id),
            other => Err(format!("unsupported locale '{other}' (expected en or id)")),
        }
    }
}

/// Label set for one locale.
#[derive(Debug)]
pub struct Labels {
    pub temperature: &'static str,
    pub humidity: &'static str,
    pub vs_time: &'static str,
    pub time: &'static str,
    pub location: &'static str,
    pub process_stage: &'static str,
    pub last_updated: &'static str,

    pub status_connected: &'static str,
    pub status_health_check_failed: &'static str,
    pub status_connection_failed: &'static str,
    pub status_disconnected: &'static str,
    pub status_query_error: &'static str,
    pub status_update_error: &'static str,
    pub status_no_query_api: &'static str,
    pub status_idle: &'static str,

    pub monitoring_stopped: &'static str,
    pub export_succeeded: &'static str,
}

const EN: Labels = Labels {
    temperature: "Temperature (°C)",
    humidity: "Humidity (%)",
    vs_time: "vs Time",
    time: "Time",
    location: "Location",
    process_stage: "Process Stage",
    last_updated: "Last Updated",

    status_connected: "STATUS: Connected to InfluxDB ✔",
    status_health_check_failed: "STATUS: Connection Health Check Failed ❌",
    status_connection_failed: "STATUS: Connection Failed ❌",
    status_disconnected: "STATUS: Disconnected ⛔",
    status_query_error: "STATUS: Query Error ⚠",
    status_update_error: "STATUS: Update Error ⚠",
    status_no_query_api: "STATUS: No Query API ❌",
    status_idle: "STATUS: Not Connected",

    monitoring_stopped: "Monitoring stopped",
    export_succeeded: "Data exported to Excel",
};

const ID: Labels = Labels {
    temperature: "Suhu (°C)",
    humidity: "Kelembaban (%)",
    vs_time: "vs Waktu",
    time: "Waktu",
    location: "Lokasi",
    process_stage: "Tahap Proses",
    last_updated: "Terakhir Diperbarui",

    status_connected: "STATUS: Terhubung ke InfluxDB ✔",
    status_health_check_failed: "STATUS: Gagal Cek Kesehatan ❌",
    status_connection_failed: "STATUS: Gagal Koneksi ❌",
    status_disconnected: "STATUS: Terputus ⛔",
    status_query_error: "STATUS: Error Query ⚠",
    status_update_error: "STATUS: Error Pembaruan ⚠",
    status_no_query_api: "STATUS: Query API tidak tersedia ❌",
    status_idle: "STATUS: Belum Terhubung",

    monitoring_stopped: "Monitoring dihentikan",
    export_succeeded: "Data berhasil diekspor ke Excel",
};

impl Locale {
    pub fn labels(self) -> &'static Labels {
        // ---
        match self {
            Locale::En => &EN,
            Locale::Id => &ID,
        }
    }
}
