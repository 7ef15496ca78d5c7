//! Live collection sessions: an observed in-progress run by one driver.
//!
//! Records are ephemeral — the registry replaces them wholesale on every
//! refresh and local identifiers are regenerated each cycle. The server
//! identifier, when present, is carried only for correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::Coordinates;
use crate::ids::LiveSessionId;

/// Driver-reported state of a live session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    #[default]
    Active,
    Inactive,
    Resolved,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Resolved => "resolved",
        };
        f.write_str(s)
    }
}

impl FromStr for SessionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "resolved" => Ok(Self::Resolved),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// An active collection run by one driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiveSession {
    /// Refresh-cycle-scoped local identifier; not stable across cycles.
    pub local_id: LiveSessionId,
    /// Backend identifier, kept as a correlation back-reference only.
    pub server_id: Option<String>,
    pub driver: String,
    pub vehicle: String,
    pub location: String,
    pub position: Coordinates,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub bins_collected: u32,
    pub updated_at: DateTime<Utc>,
    pub has_live_video: bool,
}

impl LiveSession {
    /// Collection progress as a percentage: ten points per bin, capped
    /// at 100. The scaling rule is fixed, not configurable.
    pub fn percent_complete(&self) -> u32 {
        percent_complete(self.bins_collected)
    }

    /// Elapsed time since the session started, formatted `"{h}h {m}m"`
    /// when at least an hour has passed, else `"{m}m"`.
    pub fn duration_label(&self, now: DateTime<Utc>) -> String {
        duration_label(self.started_at, now)
    }
}

/// `min(bins * 10, 100)`.
pub fn percent_complete(bins_collected: u32) -> u32 {
    (bins_collected.saturating_mul(10)).min(100)
}

/// Format the elapsed span between `started_at` and `now` for display.
pub fn duration_label(started_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - started_at).num_minutes().max(0);
    let h = minutes / 60;
    let m = minutes % 60;
    if h >= 1 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}
