//! Derived per-session counts

use super::model::SessionState;
use crate::config::CapacityConfig;
use crate::types::{AttendanceMode, SessionId};
use serde::Serialize;

/// Derived counts for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub session_id: SessionId,
    /// Enrolled participants
    pub total: usize,
    pub quota_count: usize,
    pub non_quota_count: usize,
    /// Quota spots left under the normal rule
    pub remaining_quota: usize,
    pub remaining_non_quota: usize,
    /// Seats left regardless of category
    pub remaining_capacity: usize,
    pub queue_length: usize,
    pub local_count: usize,
    pub remote_count: usize,
}

impl SessionStats {
    /// Compute stats for a session state
    pub fn compute(session_id: &SessionId, state: &SessionState, limits: &CapacityConfig) -> Self {
        let quota_count = state.quota_count();
        let non_quota_count = state.non_quota_count();
        let remote_count = state
            .enrolled
            .iter()
            .filter(|p| p.attendance_mode == AttendanceMode::Remote)
            .count();

        Self {
            session_id: session_id.clone(),
            total: state.enrolled_count(),
            quota_count,
            non_quota_count,
            remaining_quota: limits.quota_spots.saturating_sub(quota_count),
            remaining_non_quota: limits.non_quota_spots.saturating_sub(non_quota_count),
            remaining_capacity: limits.max_capacity.saturating_sub(state.enrolled_count()),
            queue_length: state.queue_len(),
            local_count: state.enrolled_count() - remote_count,
            remote_count,
        }
    }

    /// Whether no seat is left
    pub fn is_full(&self) -> bool {
        self.remaining_capacity == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::model::{Candidate, Participant, Placement};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stats_empty_session() {
        let id = SessionId::from("s1");
        let stats = SessionStats::compute(&id, &SessionState::new(), &CapacityConfig::default());

        assert_eq!(stats.total, 0);
        assert_eq!(stats.remaining_quota, 3);
        assert_eq!(stats.remaining_non_quota, 17);
        assert_eq!(stats.remaining_capacity, 20);
        assert!(!stats.is_full());
    }

    #[test]
    fn test_stats_counts_and_saturation() {
        let id = SessionId::from("s1");
        let mut state = SessionState::new();
        let now = Utc::now();
        for i in 0..4 {
            let c = Candidate::new(format!("q{}", i), true, AttendanceMode::Remote, id.clone());
            state.push(Placement::Enrolled, Participant::admit(&c, now));
        }
        let c = Candidate::new("n", false, AttendanceMode::Local, id.clone());
        state.push(Placement::Enrolled, Participant::admit(&c, now));
        state.push(Placement::WaitingQueue, Participant::admit(&c, now));

        let stats = SessionStats::compute(&id, &state, &CapacityConfig::default());
        assert_eq!(stats.total, 5);
        assert_eq!(stats.quota_count, 4);
        assert_eq!(stats.remaining_quota, 0);
        assert_eq!(stats.remaining_non_quota, 16);
        assert_eq!(stats.remaining_capacity, 15);
        assert_eq!(stats.queue_length, 1);
        assert_eq!(stats.remote_count, 4);
        assert_eq!(stats.local_count, 1);
    }
}
