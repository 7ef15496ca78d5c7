//! The coordination engine proper.
//!
//! Each component exclusively owns its own state behind a narrow
//! interface; nothing is globally reachable. The only cross-component
//! write path is notification creation, which is append-only.
//!
//! - [`TaskStore`] — the collection-task state machine
//! - [`LiveSessionRegistry`] — active collection runs, replaced wholesale
//!   each refresh
//! - [`ScheduleCoordinator`] — recurring routes and driver-proposed
//!   appointments
//! - [`NotificationDispatcher`] — derived notification records
//! - [`RefreshScheduler`] — the per-source polling loops driving it all

pub mod live;
pub mod notify;
pub mod refresh;
pub mod sample;
pub mod schedule;
pub mod tasks;

pub use live::LiveSessionRegistry;
pub use notify::NotificationDispatcher;
pub use refresh::{ProfileCache, RefreshCadences, RefreshScheduler, SchedulerDeps};
pub use schedule::{DisplaySlot, ScheduleCoordinator};
pub use tasks::TaskStore;
