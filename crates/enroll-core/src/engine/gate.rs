//! Early-registration gate for a later session
//!
//! Until the cutoff, only people already waiting for the source session may
//! register for the gated session, and only if their queue position is within
//! the configured threshold. Names are matched after lowercase and trim.

use crate::config::{CapacityConfig, GateConfig};
use crate::session::{Candidate, MultiSessionState};
use crate::types::SessionId;
use chrono::{DateTime, Utc};

/// Gate verdict for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Gate does not apply (other session, or cutoff passed)
    Open,
    /// Within the threshold; normal rules decide
    Eligible { rank: usize },
    /// Not on the source session's waiting queue
    NotListed,
    /// On the source queue, but beyond the threshold
    BeyondThreshold { rank: usize },
}

/// Time-boxed restriction on one session
#[derive(Debug, Clone)]
pub struct EligibilityGate {
    session_id: SessionId,
    source_session_id: SessionId,
    cutoff: DateTime<Utc>,
    max_rank: usize,
}

impl EligibilityGate {
    pub fn new(
        session_id: SessionId,
        source_session_id: SessionId,
        cutoff: DateTime<Utc>,
        max_rank: usize,
    ) -> Self {
        Self {
            session_id,
            source_session_id,
            cutoff,
            max_rank,
        }
    }

    pub fn from_config(gate: &GateConfig, limits: &CapacityConfig) -> Self {
        Self::new(
            gate.session_id.clone(),
            gate.source_session_id.clone(),
            gate.cutoff,
            limits.max_waiting_queue_position,
        )
    }

    /// Whether the restriction is in force at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.cutoff
    }

    /// Evaluate the gate for a candidate
    pub fn check(
        &self,
        candidate: &Candidate,
        state: &MultiSessionState,
        now: DateTime<Utc>,
    ) -> GateDecision {
        if candidate.session_id != self.session_id || !self.is_active(now) {
            return GateDecision::Open;
        }

        let rank = state
            .get(&self.source_session_id)
            .map(|source| source.queue_rank_of(&candidate.name))
            .unwrap_or(0);

        match rank {
            0 => GateDecision::NotListed,
            r if r <= self.max_rank => GateDecision::Eligible { rank: r },
            r => GateDecision::BeyondThreshold { rank: r },
        }
    }

    /// Message for a candidate placed on the gated session's own queue
    pub fn not_listed_message(&self) -> String {
        format!(
            "Until {} this session only accepts the first {} people on the {} waiting list. \
             You have been added to the waiting list for {}.",
            self.cutoff.format("%Y-%m-%d"),
            self.max_rank,
            self.source_session_id,
            self.session_id
        )
    }

    /// Message for a candidate whose queue position is beyond the threshold
    pub fn beyond_threshold_message(&self, rank: usize) -> String {
        format!(
            "You are already in the queue system (position {} on the {} waiting list). \
             Registration for {} opens to everyone on {}.",
            rank,
            self.source_session_id,
            self.session_id,
            self.cutoff.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Participant, Placement};
    use crate::types::AttendanceMode;
    use chrono::Duration;

    fn gate(cutoff: DateTime<Utc>) -> EligibilityGate {
        EligibilityGate::new(SessionId::from("s2"), SessionId::from("s1"), cutoff, 17)
    }

    fn state_with_queue(names: &[&str]) -> MultiSessionState {
        let s1 = SessionId::from("s1");
        let s2 = SessionId::from("s2");
        let mut state = MultiSessionState::with_sessions([&s1, &s2]);
        for name in names {
            let c = Candidate::new(*name, false, AttendanceMode::Local, s1.clone());
            state
                .entry(&s1)
                .push(Placement::WaitingQueue, Participant::admit(&c, Utc::now()));
        }
        state
    }

    fn for_s2(name: &str) -> Candidate {
        Candidate::new(name, false, AttendanceMode::Local, SessionId::from("s2"))
    }

    #[test]
    fn test_open_after_cutoff() {
        let now = Utc::now();
        let gate = gate(now - Duration::hours(1));
        let state = state_with_queue(&[]);
        assert!(!gate.is_active(now));
        assert_eq!(gate.check(&for_s2("anyone"), &state, now), GateDecision::Open);
    }

    #[test]
    fn test_open_for_other_sessions() {
        let now = Utc::now();
        let gate = gate(now + Duration::days(1));
        let state = state_with_queue(&[]);
        let c = Candidate::new("x", false, AttendanceMode::Local, SessionId::from("s1"));
        assert_eq!(gate.check(&c, &state, now), GateDecision::Open);
    }

    #[test]
    fn test_rank_lookup() {
        let now = Utc::now();
        let gate = gate(now + Duration::days(1));
        let state = state_with_queue(&["a", "b", "c", "d", "Eve"]);

        assert_eq!(
            gate.check(&for_s2("  eve "), &state, now),
            GateDecision::Eligible { rank: 5 }
        );
        assert_eq!(gate.check(&for_s2("zed"), &state, now), GateDecision::NotListed);
    }

    #[test]
    fn test_beyond_threshold() {
        let now = Utc::now();
        let gate = gate(now + Duration::days(1));
        let names: Vec<String> = (0..20).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let state = state_with_queue(&refs);

        assert_eq!(
            gate.check(&for_s2("n16"), &state, now),
            GateDecision::Eligible { rank: 17 }
        );
        assert_eq!(
            gate.check(&for_s2("n17"), &state, now),
            GateDecision::BeyondThreshold { rank: 18 }
        );
    }

    #[test]
    fn test_messages_cite_cutoff_and_threshold() {
        let cutoff = DateTime::parse_from_rfc3339("2025-11-22T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let gate = gate(cutoff);
        let msg = gate.not_listed_message();
        assert!(msg.contains("2025-11-22"));
        assert!(msg.contains("17"));
        assert!(gate.beyond_threshold_message(20).contains("queue system"));
    }
}
