//! Notification creation and read-state tracking.
//!
//! Records are append-only and immutable apart from the `read` flag.
//! The unread count is always recomputed by scanning the list; it is
//! never maintained as a separate counter that could drift.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use haul_api::DispatchApi;
use haul_core::errors::ApiError;
use haul_core::ids::NotificationId;
use haul_core::notification::{Notification, NotificationKind, NotificationPriority};
use haul_core::raw::RawNotification;

/// Converts state transitions into notification records and owns their
/// read-state lifecycle. Creation is a pure in-memory append and never
/// fails; server read-acknowledgements are best-effort.
pub struct NotificationDispatcher {
    api: Arc<dyn DispatchApi>,
    // Newest-first; canonical read order.
    inner: Mutex<Vec<Notification>>,
}

impl NotificationDispatcher {
    pub fn new(api: Arc<dyn DispatchApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Append a locally produced notification. Always succeeds.
    pub fn notify(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: NotificationPriority,
    ) -> Notification {
        let notification = Notification::new(kind, title, message, priority);
        debug!(kind = kind.kind_str(), id = %notification.id, "notification created");
        self.inner.lock().insert(0, notification.clone());
        notification
    }

    /// Unread count, recomputed from the list every call.
    pub fn unread_count(&self) -> usize {
        self.inner.lock().iter().filter(|n| !n.read).count()
    }

    /// All notifications, newest first.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.lock().clone()
    }

    /// Mark one notification read. Returns `true` if the flag flipped;
    /// marking an already-read or unknown id is a no-op.
    pub async fn mark_read(&self, id: &NotificationId) -> bool {
        let server_id = {
            let mut inner = self.inner.lock();
            match inner.iter_mut().find(|n| &n.id == id) {
                Some(n) if !n.read => {
                    n.read = true;
                    n.server_id.clone()
                }
                _ => return false,
            }
        };

        if let Some(sid) = server_id {
            self.ack_read(&sid).await;
        }
        true
    }

    /// Mark everything read. Returns how many flags flipped.
    pub async fn mark_all_read(&self) -> usize {
        let (flipped, acks) = {
            let mut inner = self.inner.lock();
            let mut flipped = 0;
            let mut acks = Vec::new();
            for n in inner.iter_mut().filter(|n| !n.read) {
                n.read = true;
                flipped += 1;
                if let Some(sid) = n.server_id.clone() {
                    acks.push(sid);
                }
            }
            (flipped, acks)
        };

        for sid in &acks {
            self.ack_read(sid).await;
        }
        flipped
    }

    /// Merge server-fetched notifications, deduplicating by server id.
    /// Local read flags on already-known records are preserved.
    pub fn hydrate(&self, raw: Vec<RawNotification>) -> usize {
        let mut inner = self.inner.lock();
        let known: std::collections::HashSet<String> = inner
            .iter()
            .filter_map(|n| n.server_id.clone())
            .collect();

        let mut added = 0;
        for record in raw {
            if known.contains(&record.id) {
                continue;
            }
            inner.push(record.into_notification());
            added += 1;
        }
        if added > 0 {
            inner.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        added
    }

    /// Refresh-boundary wrapper: recoverable fetch failures keep the
    /// local list and log; only session-fatal errors propagate.
    pub fn apply_refresh(
        &self,
        fetched: Result<Vec<RawNotification>, ApiError>,
    ) -> Result<(), ApiError> {
        match fetched {
            Ok(raw) => {
                let added = self.hydrate(raw);
                if added > 0 {
                    debug!(added, "hydrated notifications from server");
                }
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                warn!(kind = e.error_kind(), "notification refresh failed, keeping local list");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn ack_read(&self, server_id: &str) {
        if let Err(e) = self.api.mark_notification_read(server_id).await {
            warn!(
                kind = e.error_kind(),
                server_id, "read acknowledgement failed, local flag kept"
            );
        }
    }
}
