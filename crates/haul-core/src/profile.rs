//! Driver identity as reported by the backend.

use serde::{Deserialize, Serialize};

/// The authenticated driver's profile, refreshed on the dashboard cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: String,
    pub name: String,
    pub vehicle: String,
    /// Service area label, e.g. a ward or district name.
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}
