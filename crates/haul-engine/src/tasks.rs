//! The authoritative in-memory view of a driver's assigned tasks, and the
//! state-machine transition operation.
//!
//! Mutations apply locally first and are pushed to the backend after;
//! transport failures on the push are logged and swallowed so the
//! dashboard stays usable while the backend is unreachable. Local and
//! server state may diverge until the next successful fetch overwrites
//! local state wholesale.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use haul_api::DispatchApi;
use haul_core::errors::{ApiError, EngineError};
use haul_core::notification::{NotificationKind, NotificationPriority};
use haul_core::raw::RawTask;
use haul_core::schedule::Appointment;
use haul_core::task::{Task, TaskId, TaskPriority, TaskStatus};

use crate::notify::NotificationDispatcher;

struct TaskStoreState {
    tasks: BTreeMap<TaskId, Task>,
    /// Ids ever observed, to tell newly assigned tasks from refreshed ones.
    seen: HashSet<TaskId>,
    degraded: bool,
}

/// Exclusive owner of task mutation.
pub struct TaskStore {
    api: Arc<dyn DispatchApi>,
    dispatcher: Arc<NotificationDispatcher>,
    inner: Mutex<TaskStoreState>,
}

impl TaskStore {
    pub fn new(api: Arc<dyn DispatchApi>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            api,
            dispatcher,
            inner: Mutex::new(TaskStoreState {
                tasks: BTreeMap::new(),
                seen: HashSet::new(),
                degraded: false,
            }),
        }
    }

    /// Replace the whole store with a fresh server snapshot. Emits a
    /// `task_assigned` notification for each id not seen before.
    pub fn replace_all(&self, raw: Vec<RawTask>) {
        let incoming: Vec<Task> = raw.into_iter().map(RawTask::into_task).collect();

        let fresh: Vec<Task> = {
            let mut state = self.inner.lock();
            let fresh: Vec<Task> = incoming
                .iter()
                .filter(|t| !state.seen.contains(&t.id))
                .cloned()
                .collect();
            state.tasks = incoming.iter().map(|t| (t.id, t.clone())).collect();
            state.seen.extend(incoming.iter().map(|t| t.id));
            state.degraded = false;
            fresh
        };

        for task in fresh {
            let priority = if task.priority == TaskPriority::High {
                NotificationPriority::High
            } else {
                NotificationPriority::Normal
            };
            let _ = self.dispatcher.notify(
                NotificationKind::TaskAssigned,
                "New collection task",
                format!("Bin {} assigned to you", task.bin_ref),
                priority,
            );
        }
    }

    /// Refresh-boundary wrapper: a recoverable fetch failure keeps the
    /// previous snapshot and flags the store degraded; session-fatal
    /// errors propagate to the scheduler.
    pub fn apply_refresh(&self, fetched: Result<Vec<RawTask>, ApiError>) -> Result<(), ApiError> {
        match fetched {
            Ok(raw) => {
                self.replace_all(raw);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(kind = e.error_kind(), "task refresh failed, serving previous snapshot");
                self.inner.lock().degraded = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Move a task along the state machine.
    ///
    /// Re-applying the current status is a no-op success so the transport
    /// layer may retry safely. Reaching `Completed` records the completion
    /// time and emits `task_completed`; reaching `InProgress` emits
    /// `task_started`. The backend push is best-effort: transport
    /// failures leave local state advanced and only warn.
    pub async fn transition(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> Result<Task, EngineError> {
        let updated = {
            let mut state = self.inner.lock();
            let task = state
                .tasks
                .get_mut(&task_id)
                .ok_or(EngineError::TaskNotFound(task_id))?;

            let from = task.status;
            if from == target {
                // Retried mutation; already applied and already pushed.
                return Ok(task.clone());
            }
            if !from.can_transition_to(target) {
                return Err(EngineError::InvalidTransition { from, to: target });
            }

            task.status = target;
            if target == TaskStatus::Completed && task.completed_at.is_none() {
                task.completed_at = Some(Utc::now());
            }
            task.clone()
        };

        debug!(task = %task_id, status = %target, "task transitioned");
        match target {
            TaskStatus::InProgress => {
                let _ = self.dispatcher.notify(
                    NotificationKind::TaskStarted,
                    "Collection started",
                    format!("Bin {} collection under way", updated.bin_ref),
                    NotificationPriority::Normal,
                );
            }
            TaskStatus::Completed => {
                let _ = self.dispatcher.notify(
                    NotificationKind::TaskCompleted,
                    "Collection completed",
                    format!("Bin {} collected", updated.bin_ref),
                    NotificationPriority::Normal,
                );
            }
            TaskStatus::Pending | TaskStatus::Cancelled => {}
        }

        self.push_status(task_id, target).await?;
        Ok(updated)
    }

    /// Attach (or overwrite) the driver-proposed appointment for a task
    /// and emit `task_scheduled`.
    pub async fn attach_appointment(
        &self,
        task_id: TaskId,
        date: NaiveDate,
        time_slot: &str,
    ) -> Result<Task, EngineError> {
        if time_slot.trim().is_empty() {
            return Err(EngineError::Validation("time slot is required".into()));
        }

        let updated = {
            let mut state = self.inner.lock();
            let task = state
                .tasks
                .get_mut(&task_id)
                .ok_or(EngineError::TaskNotFound(task_id))?;
            task.appointment = Some(Appointment {
                date,
                time_slot: time_slot.to_string(),
            });
            task.clone()
        };

        let _ = self.dispatcher.notify(
            NotificationKind::TaskScheduled,
            "Collection scheduled",
            format!("Bin {} scheduled for {date} ({time_slot})", updated.bin_ref),
            NotificationPriority::Normal,
        );

        match self
            .api
            .schedule_task_collection(task_id, date, time_slot)
            .await
        {
            Ok(_) => {}
            Err(e) if !e.is_auth() => {
                warn!(
                    kind = e.error_kind(),
                    task = %task_id,
                    "appointment push failed, keeping local appointment"
                );
            }
            Err(e) => return Err(EngineError::Api(e)),
        }
        Ok(updated)
    }

    pub fn get(&self, task_id: TaskId) -> Option<Task> {
        self.inner.lock().tasks.get(&task_id).cloned()
    }

    /// All tasks, ordered by id.
    pub fn all(&self) -> Vec<Task> {
        self.inner.lock().tasks.values().cloned().collect()
    }

    /// Whether the last refresh cycle failed and the snapshot is stale.
    pub fn degraded(&self) -> bool {
        self.inner.lock().degraded
    }

    async fn push_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), EngineError> {
        match self.api.update_task_status(task_id, status).await {
            Ok(()) => Ok(()),
            Err(e) if !e.is_auth() => {
                warn!(
                    kind = e.error_kind(),
                    task = %task_id,
                    "status push failed, continuing with local state"
                );
                Ok(())
            }
            Err(e) => Err(EngineError::Api(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haul_api::MockDispatchApi;
    use haul_core::notification::NotificationKind;

    fn store() -> (Arc<MockDispatchApi>, Arc<NotificationDispatcher>, TaskStore) {
        let api = Arc::new(MockDispatchApi::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(api.clone()));
        let store = TaskStore::new(api.clone(), dispatcher.clone());
        (api, dispatcher, store)
    }

    fn raw(id: u64, status: &str) -> RawTask {
        RawTask {
            id,
            bin_ref: format!("B-{id}"),
            lat: 6.93,
            lon: 79.86,
            status: status.into(),
            priority: None,
            scheduled_at: None,
            schedule_date: None,
            time_slot: None,
            notes: None,
            completed_at: None,
        }
    }

    // ── State machine ────────────────────────────────────────────────

    #[tokio::test]
    async fn valid_transitions_update_status() {
        let (_api, _d, store) = store();
        store.replace_all(vec![raw(1, "pending")]);

        let t = store.transition(TaskId::new(1), TaskStatus::InProgress).await.unwrap();
        assert_eq!(t.status, TaskStatus::InProgress);

        let t = store.transition(TaskId::new(1), TaskStatus::Completed).await.unwrap();
        assert_eq!(t.status, TaskStatus::Completed);
        assert!(t.completed_at.is_some());
    }

    #[tokio::test]
    async fn cancel_from_pending_and_in_progress() {
        let (_api, _d, store) = store();
        store.replace_all(vec![raw(1, "pending"), raw(2, "in_progress")]);

        assert_eq!(
            store.transition(TaskId::new(1), TaskStatus::Cancelled).await.unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            store.transition(TaskId::new(2), TaskStatus::Cancelled).await.unwrap().status,
            TaskStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn terminal_tasks_reject_transitions() {
        let (_api, _d, store) = store();
        store.replace_all(vec![raw(1, "completed"), raw(2, "cancelled")]);

        for (id, target) in [
            (1, TaskStatus::Pending),
            (1, TaskStatus::InProgress),
            (2, TaskStatus::Completed),
        ] {
            let err = store.transition(TaskId::new(id), target).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidTransition { .. }), "{id} -> {target}");
        }
        // Status unchanged.
        assert_eq!(store.get(TaskId::new(1)).unwrap().status, TaskStatus::Completed);
        assert_eq!(store.get(TaskId::new(2)).unwrap().status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn reapplying_status_is_noop_success() {
        let (api, d, store) = store();
        store.replace_all(vec![raw(1, "pending")]);
        store.transition(TaskId::new(1), TaskStatus::Completed).await.unwrap_err();
        store.transition(TaskId::new(1), TaskStatus::InProgress).await.unwrap();
        let before = d.snapshot().len();

        // Retry of the same mutation: success, no new push, no new event.
        let t = store.transition(TaskId::new(1), TaskStatus::InProgress).await.unwrap();
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(d.snapshot().len(), before);
        assert_eq!(api.status_calls().len(), 1);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let (_api, _d, store) = store();
        let err = store.transition(TaskId::new(999), TaskStatus::InProgress).await.unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound(id) if id == TaskId::new(999)));
    }

    // ── Events ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn completion_emits_task_completed() {
        let (_api, d, store) = store();
        store.replace_all(vec![raw(7, "in_progress")]);
        store.transition(TaskId::new(7), TaskStatus::Completed).await.unwrap();

        let latest = &d.snapshot()[0];
        assert_eq!(latest.kind, NotificationKind::TaskCompleted);
        assert!(latest.message.contains("B-7"));
    }

    #[tokio::test]
    async fn start_emits_task_started() {
        let (_api, d, store) = store();
        store.replace_all(vec![raw(7, "pending")]);
        store.transition(TaskId::new(7), TaskStatus::InProgress).await.unwrap();
        assert_eq!(d.snapshot()[0].kind, NotificationKind::TaskStarted);
    }

    #[tokio::test]
    async fn pending_to_completed_end_to_end() {
        let (_api, d, store) = store();
        store.replace_all(vec![raw(3, "pending")]);
        store.transition(TaskId::new(3), TaskStatus::InProgress).await.unwrap();
        store.transition(TaskId::new(3), TaskStatus::Completed).await.unwrap();

        assert!(d.snapshot().iter().any(|n| n.kind == NotificationKind::TaskCompleted));
        // No further forward transition exists.
        for target in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Cancelled] {
            assert!(store.transition(TaskId::new(3), target).await.is_err());
        }
    }

    #[tokio::test]
    async fn replace_all_notifies_only_new_ids() {
        let (_api, d, store) = store();
        store.replace_all(vec![raw(1, "pending"), raw(2, "pending")]);
        assert_eq!(
            d.snapshot().iter().filter(|n| n.kind == NotificationKind::TaskAssigned).count(),
            2
        );

        store.replace_all(vec![raw(1, "pending"), raw(2, "pending"), raw(3, "pending")]);
        assert_eq!(
            d.snapshot().iter().filter(|n| n.kind == NotificationKind::TaskAssigned).count(),
            3
        );
    }

    // ── Appointments ─────────────────────────────────────────────────

    #[tokio::test]
    async fn attach_appointment_overwrites_prior() {
        let (api, _d, store) = store();
        store.replace_all(vec![raw(7, "pending")]);
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();

        store.attach_appointment(TaskId::new(7), date, "08:00-10:00").await.unwrap();
        let t = store
            .attach_appointment(TaskId::new(7), date, "14:00-16:00")
            .await
            .unwrap();

        assert_eq!(t.appointment.unwrap().time_slot, "14:00-16:00");
        assert_eq!(api.schedule_calls().len(), 2);
    }

    #[tokio::test]
    async fn attach_appointment_unknown_task_produces_no_notification() {
        let (api, d, store) = store();
        store.replace_all(vec![raw(7, "pending")]);
        let before = d.snapshot().len();

        let err = store
            .attach_appointment(
                TaskId::new(999),
                NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                "08:00-10:00",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::TaskNotFound(_)));
        assert_eq!(d.snapshot().len(), before);
        assert!(api.schedule_calls().is_empty());
    }

    #[tokio::test]
    async fn attach_appointment_requires_time_slot() {
        let (_api, _d, store) = store();
        store.replace_all(vec![raw(7, "pending")]);
        let err = store
            .attach_appointment(TaskId::new(7), NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn appointment_emits_task_scheduled_with_details() {
        let (_api, d, store) = store();
        store.replace_all(vec![raw(7, "pending")]);
        store
            .attach_appointment(
                TaskId::new(7),
                NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
                "08:00-10:00",
            )
            .await
            .unwrap();

        let latest = &d.snapshot()[0];
        assert_eq!(latest.kind, NotificationKind::TaskScheduled);
        assert!(latest.message.contains("B-7"));
        assert!(latest.message.contains("2025-05-01"));
        assert!(latest.message.contains("08:00-10:00"));
    }

    // ── Failure semantics ────────────────────────────────────────────

    #[tokio::test]
    async fn transport_failure_on_push_keeps_local_state() {
        let (api, _d, store) = store();
        store.replace_all(vec![raw(1, "pending")]);
        api.push_write_failure(ApiError::Transport("backend down".into()));

        let t = store.transition(TaskId::new(1), TaskStatus::InProgress).await.unwrap();
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(store.get(TaskId::new(1)).unwrap().status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn auth_failure_on_push_propagates() {
        let (api, _d, store) = store();
        store.replace_all(vec![raw(1, "pending")]);
        api.push_write_failure(ApiError::Auth("token expired".into()));

        let err = store.transition(TaskId::new(1), TaskStatus::InProgress).await.unwrap_err();
        assert!(matches!(err, EngineError::Api(e) if e.is_auth()));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_snapshot_and_degrades() {
        let (_api, _d, store) = store();
        store.replace_all(vec![raw(1, "pending")]);

        store
            .apply_refresh(Err(ApiError::Transport("down".into())))
            .unwrap();
        assert!(store.degraded());
        assert_eq!(store.all().len(), 1);

        store.apply_refresh(Ok(vec![raw(1, "pending"), raw(2, "pending")])).unwrap();
        assert!(!store.degraded());
        assert_eq!(store.all().len(), 2);
    }

    #[tokio::test]
    async fn auth_failure_on_refresh_propagates() {
        let (_api, _d, store) = store();
        let err = store
            .apply_refresh(Err(ApiError::Auth("expired".into())))
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn server_snapshot_overwrites_local_state() {
        let (_api, _d, store) = store();
        store.replace_all(vec![raw(1, "pending")]);
        store.transition(TaskId::new(1), TaskStatus::InProgress).await.unwrap();

        // Next successful fetch wins, even if it disagrees.
        store.replace_all(vec![raw(1, "pending")]);
        assert_eq!(store.get(TaskId::new(1)).unwrap().status, TaskStatus::Pending);
    }
}
