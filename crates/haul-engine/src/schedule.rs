//! Merges admin-defined recurring routes with driver-proposed one-off
//! appointments and resolves display precedence.
//!
//! Recurring routes are consumed read-only; appointments are owned by the
//! task they attach to, so proposal delegates to the task store. There is
//! no double-booking detection: a driver may propose overlapping
//! appointments across different tasks.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, warn};

use haul_core::errors::{ApiError, EngineError};
use haul_core::raw::RawSchedule;
use haul_core::schedule::{Appointment, RecurringSchedule, ScheduleStatus};
use haul_core::task::{Task, TaskId};

use crate::tasks::TaskStore;

/// What a task's schedule cell should display, in precedence order:
/// a driver-proposed appointment wins over the recurring route.
#[derive(Clone, Debug)]
pub enum DisplaySlot {
    Appointment(Appointment),
    Recurring(RecurringSchedule),
}

struct CoordinatorState {
    recurring: Vec<RecurringSchedule>,
    degraded: bool,
}

/// Read-only projection of recurring routes plus the appointment
/// proposal path.
pub struct ScheduleCoordinator {
    tasks: Arc<TaskStore>,
    inner: Mutex<CoordinatorState>,
}

impl ScheduleCoordinator {
    pub fn new(tasks: Arc<TaskStore>) -> Self {
        Self {
            tasks,
            inner: Mutex::new(CoordinatorState {
                recurring: Vec::new(),
                degraded: false,
            }),
        }
    }

    /// Apply one recurring-schedule refresh cycle. Records whose weekday
    /// cannot be parsed are dropped; recoverable fetch failures keep the
    /// previous projection and raise `degraded`.
    pub fn refresh_recurring(
        &self,
        fetched: Result<Vec<RawSchedule>, ApiError>,
    ) -> Result<(), ApiError> {
        match fetched {
            Ok(raw) => {
                let recurring: Vec<RecurringSchedule> =
                    raw.into_iter().filter_map(RawSchedule::into_schedule).collect();
                debug!(count = recurring.len(), "recurring schedules replaced");
                let mut state = self.inner.lock();
                state.recurring = recurring;
                state.degraded = false;
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(kind = e.error_kind(), "schedule refresh failed, keeping previous routes");
                self.inner.lock().degraded = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Propose a one-off collection appointment for a task. Delegates to
    /// the task store, which owns the mutation and emits the
    /// `task_scheduled` notification for the reporting citizen.
    pub async fn propose_appointment(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Appointment, EngineError> {
        let task = self.tasks.attach_appointment(task_id, date, time_slot).await?;
        task.appointment
            .ok_or_else(|| EngineError::Validation("appointment not recorded".into()))
    }

    /// All recurring routes, as last fetched.
    pub fn recurring(&self) -> Vec<RecurringSchedule> {
        self.inner.lock().recurring.clone()
    }

    /// Active recurring routes only.
    pub fn active_recurring(&self) -> Vec<RecurringSchedule> {
        self.inner
            .lock()
            .recurring
            .iter()
            .filter(|s| s.status == ScheduleStatus::Active)
            .cloned()
            .collect()
    }

    /// Resolve what to display for a task: its own appointment when
    /// present, otherwise the driver's first active recurring route.
    pub fn display_slot(&self, task: &Task, driver: &str) -> Option<DisplaySlot> {
        if let Some(appointment) = &task.appointment {
            return Some(DisplaySlot::Appointment(appointment.clone()));
        }
        self.inner
            .lock()
            .recurring
            .iter()
            .find(|s| s.status == ScheduleStatus::Active && s.driver == driver)
            .map(|s| DisplaySlot::Recurring(s.clone()))
    }

    /// Whether the last refresh cycle failed and the projection is stale.
    pub fn degraded(&self) -> bool {
        self.inner.lock().degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationDispatcher;
    use haul_api::MockDispatchApi;
    use haul_core::notification::NotificationKind;
    use haul_core::raw::RawTask;

    fn setup() -> (Arc<MockDispatchApi>, Arc<NotificationDispatcher>, ScheduleCoordinator) {
        let api = Arc::new(MockDispatchApi::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(api.clone()));
        let tasks = Arc::new(TaskStore::new(api.clone(), dispatcher.clone()));
        tasks.replace_all(vec![RawTask {
            id: 7,
            bin_ref: "B-104".into(),
            lat: 6.93,
            lon: 79.86,
            status: "pending".into(),
            priority: None,
            scheduled_at: None,
            schedule_date: None,
            time_slot: None,
            notes: None,
            completed_at: None,
        }]);
        let coordinator = ScheduleCoordinator::new(tasks);
        (api, dispatcher, coordinator)
    }

    fn raw_schedule(id: u64, driver: &str, status: Option<&str>) -> RawSchedule {
        RawSchedule {
            id,
            area: format!("Ward {id}"),
            day: "monday".into(),
            time: "08:00".into(),
            frequency: Some("weekly".into()),
            driver: driver.into(),
            status: status.map(String::from),
        }
    }

    #[test]
    fn refresh_is_a_read_only_projection() {
        let (_api, _d, coordinator) = setup();
        coordinator
            .refresh_recurring(Ok(vec![
                raw_schedule(1, "K. Perera", None),
                raw_schedule(2, "S. Fernando", Some("inactive")),
            ]))
            .unwrap();

        assert_eq!(coordinator.recurring().len(), 2);
        let active = coordinator.active_recurring();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].driver, "K. Perera");
    }

    #[test]
    fn failed_refresh_keeps_previous_routes() {
        let (_api, _d, coordinator) = setup();
        coordinator
            .refresh_recurring(Ok(vec![raw_schedule(1, "K. Perera", None)]))
            .unwrap();

        coordinator
            .refresh_recurring(Err(ApiError::Transport("down".into())))
            .unwrap();
        assert_eq!(coordinator.recurring().len(), 1);
        assert!(coordinator.degraded());

        coordinator.refresh_recurring(Ok(Vec::new())).unwrap();
        assert!(coordinator.recurring().is_empty());
        assert!(!coordinator.degraded());
    }

    #[tokio::test]
    async fn propose_appointment_delegates_and_notifies() {
        let (api, d, coordinator) = setup();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        let appointment = coordinator
            .propose_appointment(TaskId::new(7), date, "08:00-10:00")
            .await
            .unwrap();
        assert_eq!(appointment.date, date);
        assert_eq!(api.schedule_calls().len(), 1);
        assert_eq!(d.snapshot()[0].kind, NotificationKind::TaskScheduled);
    }

    #[tokio::test]
    async fn propose_appointment_unknown_task_fails() {
        let (_api, _d, coordinator) = setup();
        let err = coordinator
            .propose_appointment(
                TaskId::new(999),
                NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                "08:00-10:00",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn overlapping_appointments_across_tasks_are_accepted() {
        let (_api, _d, coordinator) = setup();
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        // Second task with the same slot; no conflict detection exists.
        coordinator.tasks.replace_all(vec![
            RawTask {
                id: 7,
                bin_ref: "B-104".into(),
                lat: 6.93,
                lon: 79.86,
                status: "pending".into(),
                priority: None,
                scheduled_at: None,
                schedule_date: None,
                time_slot: None,
                notes: None,
                completed_at: None,
            },
            RawTask {
                id: 8,
                bin_ref: "B-105".into(),
                lat: 6.94,
                lon: 79.87,
                status: "pending".into(),
                priority: None,
                scheduled_at: None,
                schedule_date: None,
                time_slot: None,
                notes: None,
                completed_at: None,
            },
        ]);

        coordinator.propose_appointment(TaskId::new(7), date, "08:00-10:00").await.unwrap();
        coordinator.propose_appointment(TaskId::new(8), date, "08:00-10:00").await.unwrap();
    }

    #[tokio::test]
    async fn display_slot_prefers_appointment() {
        let (_api, _d, coordinator) = setup();
        coordinator
            .refresh_recurring(Ok(vec![raw_schedule(1, "K. Perera", None)]))
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        coordinator.propose_appointment(TaskId::new(7), date, "08:00-10:00").await.unwrap();

        let task = coordinator.tasks.get(TaskId::new(7)).unwrap();
        match coordinator.display_slot(&task, "K. Perera") {
            Some(DisplaySlot::Appointment(a)) => assert_eq!(a.date, date),
            other => panic!("expected appointment precedence, got {other:?}"),
        }
    }

    #[test]
    fn display_slot_falls_back_to_recurring_route() {
        let (_api, _d, coordinator) = setup();
        coordinator
            .refresh_recurring(Ok(vec![
                raw_schedule(1, "S. Fernando", None),
                raw_schedule(2, "K. Perera", None),
            ]))
            .unwrap();

        let task = coordinator.tasks.get(TaskId::new(7)).unwrap();
        match coordinator.display_slot(&task, "K. Perera") {
            Some(DisplaySlot::Recurring(s)) => assert_eq!(s.driver, "K. Perera"),
            other => panic!("expected recurring fallback, got {other:?}"),
        }
    }

    #[test]
    fn display_slot_none_without_either() {
        let (_api, _d, coordinator) = setup();
        let task = coordinator.tasks.get(TaskId::new(7)).unwrap();
        assert!(coordinator.display_slot(&task, "K. Perera").is_none());
    }
}
