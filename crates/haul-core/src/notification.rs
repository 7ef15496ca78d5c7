//! Immutable notification records derived from state transitions.
//!
//! Content never changes after creation; only the `read` flag mutates.
//! Unread counts are always recomputed from the list — there is no
//! independently maintained counter anywhere in the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ids::NotificationId;

/// What kind of state change produced a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskAssigned,
    TaskStarted,
    TaskCompleted,
    TaskScheduled,
    Collection,
    BinUpdate,
    System,
    Error,
}

impl NotificationKind {
    pub fn kind_str(self) -> &'static str {
        match self {
            Self::TaskAssigned => "task_assigned",
            Self::TaskStarted => "task_started",
            Self::TaskCompleted => "task_completed",
            Self::TaskScheduled => "task_scheduled",
            Self::Collection => "collection",
            Self::BinUpdate => "bin_update",
            Self::System => "system",
            Self::Error => "error",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task_assigned" => Ok(Self::TaskAssigned),
            "task_started" => Ok(Self::TaskStarted),
            "task_completed" => Ok(Self::TaskCompleted),
            "task_scheduled" => Ok(Self::TaskScheduled),
            "collection" => Ok(Self::Collection),
            "bin_update" => Ok(Self::BinUpdate),
            "system" => Ok(Self::System),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// Display priority of a notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// An immutable record of one state change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    /// Backend identifier for server-fetched records; used to dedupe on
    /// hydrate and to acknowledge reads upstream.
    pub server_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    pub priority: NotificationPriority,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            server_id: None,
            kind,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
            priority,
        }
    }
}
