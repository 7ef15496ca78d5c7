//! Periodic refresh orchestration.
//!
//! One polling loop per data source, each on its own cadence; cadences
//! overlap freely because every cycle fully replaces its component's
//! state. A single cancellation token tears all loops down as a unit.
//! In-flight fetches are not aborted; a result that arrives after
//! cancellation is discarded before it can overwrite fresher state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use haul_api::DispatchApi;
use haul_core::errors::ApiError;
use haul_core::profile::DriverProfile;

use crate::live::LiveSessionRegistry;
use crate::notify::NotificationDispatcher;
use crate::schedule::ScheduleCoordinator;
use crate::tasks::TaskStore;

/// Polling interval per data source. Independent by design; see the
/// concurrency notes on [`RefreshScheduler`].
#[derive(Clone, Copy, Debug)]
pub struct RefreshCadences {
    /// Task list with driver/bin positions.
    pub location: Duration,
    /// Active live sessions.
    pub live: Duration,
    /// Recurring schedules.
    pub schedule: Duration,
    /// Full dashboard reload: profile and notifications.
    pub dashboard: Duration,
}

impl Default for RefreshCadences {
    fn default() -> Self {
        Self {
            location: Duration::from_secs(10),
            live: Duration::from_secs(15),
            schedule: Duration::from_secs(30),
            dashboard: Duration::from_secs(60),
        }
    }
}

/// Last known driver profile, refreshed on the dashboard cycle.
#[derive(Default)]
pub struct ProfileCache {
    inner: Mutex<Option<DriverProfile>>,
}

impl ProfileCache {
    pub fn set(&self, profile: DriverProfile) {
        *self.inner.lock() = Some(profile);
    }

    pub fn get(&self) -> Option<DriverProfile> {
        self.inner.lock().clone()
    }
}

/// Everything the scheduler drives.
pub struct SchedulerDeps {
    pub api: Arc<dyn DispatchApi>,
    pub tasks: Arc<TaskStore>,
    pub live: Arc<LiveSessionRegistry>,
    pub schedules: Arc<ScheduleCoordinator>,
    pub notifications: Arc<NotificationDispatcher>,
    pub driver_id: String,
}

/// Runs the per-source polling loops until shut down or until a
/// session-fatal auth failure stops everything.
pub struct RefreshScheduler {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    profile: Arc<ProfileCache>,
    auth_failed: Arc<AtomicBool>,
}

impl RefreshScheduler {
    /// Spawn all polling loops. Each loop ticks immediately on start for
    /// the initial load, then at its configured cadence.
    pub fn start(deps: SchedulerDeps, cadences: RefreshCadences) -> Self {
        let cancel = CancellationToken::new();
        let auth_failed = Arc::new(AtomicBool::new(false));
        let profile = Arc::new(ProfileCache::default());
        let mut handles = Vec::new();

        info!(
            location_secs = cadences.location.as_secs(),
            live_secs = cadences.live.as_secs(),
            schedule_secs = cadences.schedule.as_secs(),
            dashboard_secs = cadences.dashboard.as_secs(),
            "refresh scheduler starting"
        );

        // Task / driver-location loop.
        {
            let api = Arc::clone(&deps.api);
            let tasks = Arc::clone(&deps.tasks);
            let driver_id = deps.driver_id.clone();
            let cancel = cancel.clone();
            let auth_failed = Arc::clone(&auth_failed);
            handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(cadences.location);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        _ = tick.tick() => {}
                    }
                    let fetched = api.fetch_tasks(&driver_id).await;
                    if cancel.is_cancelled() {
                        break; // torn down mid-fetch; discard the late result
                    }
                    if let Err(e) = tasks.apply_refresh(fetched) {
                        fatal("tasks", &e, &auth_failed, &cancel);
                        break;
                    }
                }
            }));
        }

        // Live-session loop.
        {
            let api = Arc::clone(&deps.api);
            let live = Arc::clone(&deps.live);
            let cancel = cancel.clone();
            let auth_failed = Arc::clone(&auth_failed);
            handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(cadences.live);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        _ = tick.tick() => {}
                    }
                    let fetched = api.fetch_active_live_sessions().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Err(e) = live.refresh(fetched) {
                        fatal("live_sessions", &e, &auth_failed, &cancel);
                        break;
                    }
                }
            }));
        }

        // Recurring-schedule loop.
        {
            let api = Arc::clone(&deps.api);
            let schedules = Arc::clone(&deps.schedules);
            let cancel = cancel.clone();
            let auth_failed = Arc::clone(&auth_failed);
            handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(cadences.schedule);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        _ = tick.tick() => {}
                    }
                    let fetched = api.fetch_recurring_schedules().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Err(e) = schedules.refresh_recurring(fetched) {
                        fatal("schedules", &e, &auth_failed, &cancel);
                        break;
                    }
                }
            }));
        }

        // Dashboard loop: profile and notifications.
        {
            let api = Arc::clone(&deps.api);
            let notifications = Arc::clone(&deps.notifications);
            let profile = Arc::clone(&profile);
            let cancel = cancel.clone();
            let auth_failed = Arc::clone(&auth_failed);
            handles.push(tokio::spawn(async move {
                let mut tick = tokio::time::interval(cadences.dashboard);
                loop {
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        _ = tick.tick() => {}
                    }

                    let fetched = api.fetch_driver_profile().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    match fetched {
                        Ok(p) => profile.set(p),
                        Err(e) if e.is_recoverable() => {
                            warn!(kind = e.error_kind(), "profile refresh failed, keeping last known");
                        }
                        Err(e) => {
                            fatal("profile", &e, &auth_failed, &cancel);
                            break;
                        }
                    }

                    let fetched = api.fetch_notifications().await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Err(e) = notifications.apply_refresh(fetched) {
                        fatal("notifications", &e, &auth_failed, &cancel);
                        break;
                    }
                }
            }));
        }

        Self {
            cancel,
            handles,
            profile,
            auth_failed,
        }
    }

    /// Last profile the dashboard cycle fetched.
    pub fn profile(&self) -> Option<DriverProfile> {
        self.profile.get()
    }

    /// Whether the scheduler stopped itself on an auth failure. The
    /// caller owns the re-authentication flow.
    pub fn auth_failed(&self) -> bool {
        self.auth_failed.load(Ordering::Relaxed)
    }

    /// Token observing (and controlling) scheduler teardown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel all loops as a unit and wait for them to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
        info!("refresh scheduler stopped");
    }
}

fn fatal(source: &str, e: &ApiError, auth_failed: &AtomicBool, cancel: &CancellationToken) {
    error!(
        kind = e.error_kind(),
        source, "session-fatal refresh failure, stopping all polling"
    );
    if e.is_auth() {
        auth_failed.store(true, Ordering::Relaxed);
    }
    cancel.cancel();
}
