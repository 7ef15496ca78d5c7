//! Collection tasks and their status state machine.
//!
//! Transitions are monotonic: `Pending → InProgress → Completed`, with
//! `Cancelled` reachable from either non-terminal state. Terminal states
//! (`Completed`, `Cancelled`) admit no further transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::Coordinates;
use crate::schedule::Appointment;

/// Server-assigned task identifier.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a collection task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `target` is a forward-reachable state from `self`.
    ///
    /// Re-applying the current status is allowed (idempotent retry from
    /// the transport layer), and is treated as a no-op by callers.
    pub fn can_transition_to(self, target: TaskStatus) -> bool {
        if self == target {
            return true;
        }
        match self {
            Self::Pending => matches!(target, Self::InProgress | Self::Cancelled),
            Self::InProgress => matches!(target, Self::Completed | Self::Cancelled),
            Self::Completed | Self::Cancelled => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts both snake and kebab spellings; the upstream feed is not
    /// consistent about `in_progress` vs `in-progress`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// Urgency of a collection task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for TaskPriority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown task priority: {other}")),
        }
    }
}

/// A single bin-collection work item assigned to a driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub bin_ref: String,
    pub position: Coordinates,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Admin-scheduled collection time, if any.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Driver-proposed one-off appointment; latest proposal wins.
    pub appointment: Option<Appointment>,
    pub notes: Option<String>,
    /// Set exactly once, when the task first reaches `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
}
