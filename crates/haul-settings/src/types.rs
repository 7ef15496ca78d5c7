use serde::{Deserialize, Serialize};

/// Root settings document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HaulSettings {
    pub api: ApiSettings,
    pub refresh: RefreshSettings,
    pub telemetry: TelemetrySettings,
}

/// Backend endpoint and credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub driver_id: String,
    /// Bearer token. Usually injected via `HAUL_API_TOKEN` rather than
    /// written to the settings file.
    pub token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            driver_id: String::new(),
            token: None,
        }
    }
}

/// Polling cadences, in seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub location_secs: u64,
    pub live_secs: u64,
    pub schedule_secs: u64,
    pub dashboard_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            location_secs: 10,
            live_secs: 15,
            schedule_secs: 30,
            dashboard_secs: 60,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Default level directive, overridden by `RUST_LOG`.
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json_logs: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
