//! Registry of currently active collection sessions.
//!
//! Wholesale replacement on every refresh: no incremental patching, and
//! fresh local identifiers each cycle. A failed refresh never clears the
//! registry; if nothing was ever fetched it serves the demonstration
//! dataset so downstream views stay populated, with `degraded` raised so
//! callers can tell fallback data from a real empty response.

use parking_lot::Mutex;
use tracing::{debug, warn};

use haul_core::errors::ApiError;
use haul_core::geo::{haversine_distance_km, Coordinates};
use haul_core::live::LiveSession;
use haul_core::raw::RawSession;

use crate::sample;

struct RegistryState {
    sessions: Vec<LiveSession>,
    degraded: bool,
    ever_populated: bool,
}

/// Exclusive owner of live-session replacement.
pub struct LiveSessionRegistry {
    inner: Mutex<RegistryState>,
}

impl LiveSessionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryState {
                sessions: Vec::new(),
                degraded: false,
                ever_populated: false,
            }),
        }
    }

    /// Apply one refresh cycle.
    ///
    /// A successful response replaces the registry contents entirely (an
    /// empty success yields an empty registry). A recoverable failure
    /// keeps the previous contents, or falls back to the demonstration
    /// dataset when nothing was ever fetched, and raises `degraded`.
    /// Session-fatal errors propagate untouched.
    pub fn refresh(&self, fetched: Result<Vec<RawSession>, ApiError>) -> Result<(), ApiError> {
        match fetched {
            Ok(raw) => {
                let sessions: Vec<LiveSession> =
                    raw.into_iter().map(RawSession::into_session).collect();
                debug!(count = sessions.len(), "live sessions replaced");
                let mut state = self.inner.lock();
                state.sessions = sessions;
                state.degraded = false;
                state.ever_populated = true;
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                let mut state = self.inner.lock();
                if !state.ever_populated {
                    warn!(
                        kind = e.error_kind(),
                        "live session source unreachable, serving demonstration data"
                    );
                    state.sessions = sample::demo_sessions();
                } else {
                    warn!(
                        kind = e.error_kind(),
                        "live session refresh failed, keeping previous snapshot"
                    );
                }
                state.degraded = true;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sessions within `radius_km` of `center`. Linear scan; the registry
    /// is bounded by concurrently active drivers (tens, not thousands).
    pub fn find_by_position(&self, center: Coordinates, radius_km: f64) -> Vec<LiveSession> {
        self.inner
            .lock()
            .sessions
            .iter()
            .filter(|s| haversine_distance_km(s.position, center) <= radius_km)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Vec<LiveSession> {
        self.inner.lock().sessions.clone()
    }

    /// Whether the registry currently serves fallback or stale data.
    pub fn degraded(&self) -> bool {
        self.inner.lock().degraded
    }

    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }
}

impl Default for LiveSessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
