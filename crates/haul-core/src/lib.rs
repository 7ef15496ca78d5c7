//! Shared domain model for the fleet coordination engine.
//!
//! Leaf crate: no I/O, no async. Holds the entities every other crate
//! speaks in (tasks, live sessions, schedules, notifications), the wire
//! DTOs they are decoded from, branded local identifiers, geodesy math,
//! and the error taxonomy.

pub mod errors;
pub mod geo;
pub mod ids;
pub mod live;
pub mod notification;
pub mod profile;
pub mod raw;
pub mod schedule;
pub mod task;

pub use errors::{ApiError, EngineError};
pub use geo::Coordinates;
pub use ids::{LiveSessionId, NotificationId};
