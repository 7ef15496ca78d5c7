//! Wire DTOs for the consumed backend endpoints.
//!
//! Decoding is lossy on purpose: unknown status/priority strings fall
//! back to defaults instead of failing the whole refresh cycle. One bad
//! record from the feed must never blank the dashboard.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::ids::LiveSessionId;
use crate::live::{LiveSession, SessionStatus};
use crate::notification::{Notification, NotificationKind, NotificationPriority};
use crate::schedule::{
    Appointment, RecurringSchedule, ScheduleDay, ScheduleFrequency, ScheduleStatus,
};
use crate::task::{Task, TaskId, TaskPriority, TaskStatus};

/// A task record as served by `fetch_tasks`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawTask {
    pub id: u64,
    pub bin_ref: String,
    pub lat: f64,
    pub lon: f64,
    pub status: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub schedule_date: Option<NaiveDate>,
    #[serde(default)]
    pub time_slot: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RawTask {
    /// Lossy conversion into the domain entity.
    pub fn into_task(self) -> Task {
        let appointment = match (self.schedule_date, self.time_slot) {
            (Some(date), Some(time_slot)) if !time_slot.is_empty() => {
                Some(Appointment { date, time_slot })
            }
            _ => None,
        };
        Task {
            id: TaskId::new(self.id),
            bin_ref: self.bin_ref,
            position: Coordinates::new(self.lat, self.lon),
            status: self.status.parse().unwrap_or(TaskStatus::Pending),
            priority: self
                .priority
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or(TaskPriority::Medium),
            scheduled_at: self.scheduled_at,
            appointment,
            notes: self.notes,
            completed_at: self.completed_at,
        }
    }
}

/// A live-session record as served by `fetch_active_live_sessions`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawSession {
    #[serde(default)]
    pub id: Option<String>,
    pub driver: String,
    #[serde(default)]
    pub vehicle: String,
    #[serde(default)]
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub status: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub bins_collected: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub has_live_video: bool,
}

impl RawSession {
    /// Lossy conversion; allocates a fresh refresh-cycle-scoped local id.
    pub fn into_session(self) -> LiveSession {
        LiveSession {
            local_id: LiveSessionId::new(),
            server_id: self.id,
            driver: self.driver,
            vehicle: self.vehicle,
            location: self.location,
            position: Coordinates::new(self.lat, self.lon),
            status: self
                .status
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            started_at: self.started_at,
            bins_collected: self.bins_collected,
            updated_at: self.updated_at.unwrap_or(self.started_at),
            has_live_video: self.has_live_video,
        }
    }
}

/// A recurring-route record as served by `fetch_recurring_schedules`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawSchedule {
    pub id: u64,
    pub area: String,
    pub day: String,
    pub time: String,
    #[serde(default)]
    pub frequency: Option<String>,
    pub driver: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl RawSchedule {
    /// Lossy conversion; an unparseable day drops the record entirely
    /// (a route with no weekday cannot be displayed).
    pub fn into_schedule(self) -> Option<RecurringSchedule> {
        let day: ScheduleDay = self.day.parse().ok()?;
        Some(RecurringSchedule {
            id: self.id,
            area: self.area,
            day,
            time: self.time,
            frequency: self
                .frequency
                .as_deref()
                .and_then(|f| f.parse().ok())
                .unwrap_or_default(),
            driver: self.driver,
            status: match self.status.as_deref() {
                Some("inactive") => ScheduleStatus::Inactive,
                _ => ScheduleStatus::Active,
            },
        })
    }
}

/// A notification record as served by `fetch_notifications`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub priority: Option<String>,
}

impl RawNotification {
    /// Lossy conversion; unknown kinds land in `System`.
    pub fn into_notification(self) -> Notification {
        Notification {
            id: crate::ids::NotificationId::new(),
            server_id: Some(self.id),
            kind: self.kind.parse().unwrap_or(NotificationKind::System),
            title: self.title,
            message: self.message,
            created_at: self.created_at,
            read: self.read,
            priority: match self.priority.as_deref() {
                Some("low") => NotificationPriority::Low,
                Some("high") => NotificationPriority::High,
                _ => NotificationPriority::Normal,
            },
        }
    }
}
