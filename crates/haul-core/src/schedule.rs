//! Recurring admin routes and driver-proposed one-off appointments.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Day of week for a recurring route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl FromStr for ScheduleDay {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Self::Monday),
            "tuesday" | "tue" => Ok(Self::Tuesday),
            "wednesday" | "wed" => Ok(Self::Wednesday),
            "thursday" | "thu" => Ok(Self::Thursday),
            "friday" | "fri" => Ok(Self::Friday),
            "saturday" | "sat" => Ok(Self::Saturday),
            "sunday" | "sun" => Ok(Self::Sunday),
            other => Err(format!("unknown schedule day: {other}")),
        }
    }
}

/// Repeat interval of a recurring route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFrequency {
    #[default]
    Weekly,
    Biweekly,
    Monthly,
}

impl FromStr for ScheduleFrequency {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown schedule frequency: {other}")),
        }
    }
}

/// Whether a recurring route is currently served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

/// An admin-defined repeating collection route. Owned by the admin role;
/// drivers and citizens consume it read-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecurringSchedule {
    pub id: u64,
    pub area: String,
    pub day: ScheduleDay,
    /// Wall-clock start, e.g. `"08:00"`.
    pub time: String,
    pub frequency: ScheduleFrequency,
    pub driver: String,
    pub status: ScheduleStatus,
}

/// A driver-proposed date/time-slot for completing one specific task.
/// At most one per task; the latest proposal overwrites any prior one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub date: NaiveDate,
    /// Display slot, e.g. `"08:00-10:00"`.
    pub time_slot: String,
}
