//! Configuration for the coordination daemon.
//!
//! Precedence, lowest to highest: compiled defaults, the JSON settings
//! file (deep-merged), then `HAUL_*` environment variables.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{ApiSettings, HaulSettings, RefreshSettings, TelemetrySettings};
