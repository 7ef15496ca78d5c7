//! Built-in demonstration dataset.
//!
//! Served by the live-session registry when its upstream source has never
//! been reachable, so map and list views stay populated for operators
//! instead of going blank. Callers can tell the difference through the
//! registry's `degraded` flag.

use chrono::{Duration, Utc};

use haul_core::geo::Coordinates;
use haul_core::ids::LiveSessionId;
use haul_core::live::{LiveSession, SessionStatus};

/// Three plausible in-progress collection runs around the city center.
pub fn demo_sessions() -> Vec<LiveSession> {
    let now = Utc::now();
    vec![
        LiveSession {
            local_id: LiveSessionId::new(),
            server_id: None,
            driver: "K. Perera".into(),
            vehicle: "Compactor LC-07".into(),
            location: "Pettah Market, Ward 3".into(),
            position: Coordinates::new(6.9355, 79.8487),
            status: SessionStatus::Active,
            started_at: now - Duration::minutes(42),
            bins_collected: 4,
            updated_at: now - Duration::minutes(2),
            has_live_video: true,
        },
        LiveSession {
            local_id: LiveSessionId::new(),
            server_id: None,
            driver: "S. Fernando".into(),
            vehicle: "Tipper LT-12".into(),
            location: "Galle Road, Ward 1".into(),
            position: Coordinates::new(6.9147, 79.8523),
            status: SessionStatus::InProgress,
            started_at: now - Duration::minutes(75),
            bins_collected: 8,
            updated_at: now - Duration::minutes(5),
            has_live_video: false,
        },
        LiveSession {
            local_id: LiveSessionId::new(),
            server_id: None,
            driver: "M. Silva".into(),
            vehicle: "Compactor LC-02".into(),
            location: "Borella Junction, Ward 5".into(),
            position: Coordinates::new(6.9146, 79.8779),
            status: SessionStatus::Active,
            started_at: now - Duration::minutes(15),
            bins_collected: 1,
            updated_at: now - Duration::minutes(1),
            has_live_video: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_sessions_are_well_formed() {
        let sessions = demo_sessions();
        assert_eq!(sessions.len(), 3);
        for s in &sessions {
            assert!(s.local_id.as_str().starts_with("live_"));
            assert!(s.server_id.is_none());
            assert!(s.started_at <= Utc::now());
            assert!(s.percent_complete() <= 100);
        }
    }

    #[test]
    fn demo_sessions_get_fresh_ids_each_call() {
        let a = demo_sessions();
        let b = demo_sessions();
        assert_ne!(a[0].local_id, b[0].local_id);
    }
}
