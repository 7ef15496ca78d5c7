//! Scripted in-memory [`DispatchApi`] for deterministic engine tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::client::DispatchApi;
use haul_core::errors::ApiError;
use haul_core::profile::DriverProfile;
use haul_core::raw::{RawNotification, RawSchedule, RawSession, RawTask};
use haul_core::schedule::Appointment;
use haul_core::task::{TaskId, TaskStatus};

/// Pre-programmed responses, consumed in order; when a queue is empty the
/// endpoint answers with a benign default (empty list / success), so tests
/// only script the calls they care about.
#[derive(Default)]
pub struct MockDispatchApi {
    tasks: Mutex<VecDeque<Result<Vec<RawTask>, ApiError>>>,
    profile: Mutex<VecDeque<Result<DriverProfile, ApiError>>>,
    schedules: Mutex<VecDeque<Result<Vec<RawSchedule>, ApiError>>>,
    sessions: Mutex<VecDeque<Result<Vec<RawSession>, ApiError>>>,
    notifications: Mutex<VecDeque<Result<Vec<RawNotification>, ApiError>>>,
    write_failures: Mutex<VecDeque<ApiError>>,
    fetch_delay: Mutex<Option<Duration>>,

    status_calls: Mutex<Vec<(TaskId, TaskStatus)>>,
    schedule_calls: Mutex<Vec<(TaskId, NaiveDate, String)>>,
    mark_read_calls: Mutex<Vec<String>>,
}

impl MockDispatchApi {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting ────────────────────────────────────────────────────

    pub fn push_tasks(&self, result: Result<Vec<RawTask>, ApiError>) {
        self.tasks.lock().push_back(result);
    }

    pub fn push_profile(&self, result: Result<DriverProfile, ApiError>) {
        self.profile.lock().push_back(result);
    }

    pub fn push_schedules(&self, result: Result<Vec<RawSchedule>, ApiError>) {
        self.schedules.lock().push_back(result);
    }

    pub fn push_sessions(&self, result: Result<Vec<RawSession>, ApiError>) {
        self.sessions.lock().push_back(result);
    }

    pub fn push_notifications(&self, result: Result<Vec<RawNotification>, ApiError>) {
        self.notifications.lock().push_back(result);
    }

    /// Queue a failure for the next write call (status update, schedule,
    /// mark-read); writes succeed once the queue drains.
    pub fn push_write_failure(&self, err: ApiError) {
        self.write_failures.lock().push_back(err);
    }

    /// Delay every fetch by `delay`, for tests that race a refresh
    /// against cancellation.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    async fn maybe_delay(&self) {
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    // ── Recorded calls ───────────────────────────────────────────────

    pub fn status_calls(&self) -> Vec<(TaskId, TaskStatus)> {
        self.status_calls.lock().clone()
    }

    pub fn schedule_calls(&self) -> Vec<(TaskId, NaiveDate, String)> {
        self.schedule_calls.lock().clone()
    }

    pub fn mark_read_calls(&self) -> Vec<String> {
        self.mark_read_calls.lock().clone()
    }

    fn next_write_result(&self) -> Result<(), ApiError> {
        match self.write_failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DispatchApi for MockDispatchApi {
    async fn fetch_tasks(&self, _driver_id: &str) -> Result<Vec<RawTask>, ApiError> {
        self.maybe_delay().await;
        self.tasks.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_driver_profile(&self) -> Result<DriverProfile, ApiError> {
        self.maybe_delay().await;
        self.profile.lock().pop_front().unwrap_or_else(|| {
            Ok(DriverProfile {
                id: "drv-mock".into(),
                name: "Mock Driver".into(),
                vehicle: "Mock Truck".into(),
                zone: None,
                phone: None,
            })
        })
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), ApiError> {
        self.status_calls.lock().push((task_id, status));
        self.next_write_result()
    }

    async fn schedule_task_collection(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Appointment, ApiError> {
        self.schedule_calls
            .lock()
            .push((task_id, date, time_slot.to_string()));
        self.next_write_result()?;
        Ok(Appointment {
            date,
            time_slot: time_slot.to_string(),
        })
    }

    async fn fetch_recurring_schedules(&self) -> Result<Vec<RawSchedule>, ApiError> {
        self.maybe_delay().await;
        self.schedules.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_active_live_sessions(&self) -> Result<Vec<RawSession>, ApiError> {
        self.maybe_delay().await;
        self.sessions.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_notifications(&self) -> Result<Vec<RawNotification>, ApiError> {
        self.maybe_delay().await;
        self.notifications.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.mark_read_calls.lock().push(id.to_string());
        self.next_write_result()
    }
}
