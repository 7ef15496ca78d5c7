//! Logging initialization.
//!
//! Builds an `EnvFilter` from configuration (`RUST_LOG` wins when set)
//! and installs either a human-readable or a JSON `fmt` layer.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level directive. Overridden by `RUST_LOG`.
    pub log_level: String,
    /// Per-module level overrides (e.g. `haul_engine` => `debug`).
    pub module_levels: Vec<(String, String)>,
    /// Emit JSON lines instead of human-readable output.
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            module_levels: Vec::new(),
            json_output: false,
        }
    }
}

/// Build the filter directive string from config.
pub fn filter_directives(config: &TelemetryConfig) -> String {
    let mut directives = config.log_level.clone();
    for (module, level) in &config.module_levels {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

/// Initialize the tracing subscriber. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    if config.json_output {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter);
        tracing_subscriber::registry().with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(env_filter);
        tracing_subscriber::registry().with(fmt_layer).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_with_no_overrides() {
        let config = TelemetryConfig::default();
        assert_eq!(filter_directives(&config), "info");
    }

    #[test]
    fn directives_with_module_overrides() {
        let config = TelemetryConfig {
            log_level: "warn".into(),
            module_levels: vec![
                ("haul_engine".into(), "debug".into()),
                ("haul_api".into(), "trace".into()),
            ],
            json_output: false,
        };
        assert_eq!(
            filter_directives(&config),
            "warn,haul_engine=debug,haul_api=trace"
        );
    }
}
