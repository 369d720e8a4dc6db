//! Admission rules for a single session

use crate::config::CapacityConfig;
use crate::session::{Candidate, Participant, Placement, SessionState};
use crate::types::Category;
use chrono::{DateTime, Utc};
use std::fmt;

/// Result of checking a category against a session's counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Deny(DenyReason),
}

impl Admission {
    /// Whether the candidate may take a seat
    pub fn is_admit(&self) -> bool {
        matches!(self, Admission::Admit)
    }
}

/// Why a candidate was not given a seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Every seat is taken
    CapacityFull,
    /// Quota spots are taken while non-quota spots remain open
    QuotaFilled,
    /// Non-quota spots are taken; the candidate belongs on the waiting queue
    NonQuotaFull,
}

impl DenyReason {
    /// Whether the candidate should be queued instead of turned away
    pub fn routes_to_queue(&self) -> bool {
        matches!(self, DenyReason::NonQuotaFull)
    }

    /// Human-facing explanation
    pub fn message(&self, limits: &CapacityConfig) -> String {
        match self {
            DenyReason::CapacityFull => format!(
                "This session is full: all {} spots are taken.",
                limits.max_capacity
            ),
            DenyReason::QuotaFilled => format!(
                "All {} quota spots for this session are filled.",
                limits.quota_spots
            ),
            DenyReason::NonQuotaFull => format!(
                "All {} regular spots are filled; you have been added to the waiting list.",
                limits.non_quota_spots
            ),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::CapacityFull => write!(f, "capacity full"),
            DenyReason::QuotaFilled => write!(f, "quota spots filled"),
            DenyReason::NonQuotaFull => write!(f, "non-quota spots filled"),
        }
    }
}

/// Why a participant ended up on a waiting queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueReason {
    /// Non-quota spots of the target session were exhausted
    SpotsFilled,
    /// Early registration for a gated session was not open to the candidate
    NotYetEligible,
}

/// Typed result of an enrollment attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollOutcome {
    /// Candidate took a seat
    Enrolled { participant: Participant },
    /// Candidate was appended to a waiting queue
    Queued {
        participant: Participant,
        reason: QueueReason,
        message: String,
    },
    /// Candidate already holds a place in the queue system; nothing changed
    AlreadyQueued { rank: usize, message: String },
    /// Candidate was turned away; nothing changed
    Rejected { reason: DenyReason, message: String },
}

impl EnrollOutcome {
    /// Whether the caller should report success
    pub fn is_success(&self) -> bool {
        !matches!(self, EnrollOutcome::Rejected { .. })
    }

    /// Whether the candidate landed on a waiting queue
    pub fn added_to_queue(&self) -> bool {
        matches!(self, EnrollOutcome::Queued { .. })
    }

    /// Participant record created by this attempt, if any
    pub fn participant(&self) -> Option<&Participant> {
        match self {
            EnrollOutcome::Enrolled { participant } | EnrollOutcome::Queued { participant, .. } => {
                Some(participant)
            }
            _ => None,
        }
    }

    /// Human-facing message
    pub fn message(&self) -> String {
        match self {
            EnrollOutcome::Enrolled { participant } => {
                format!("{} is enrolled in {}.", participant.name, participant.session_id)
            }
            EnrollOutcome::Queued { message, .. }
            | EnrollOutcome::AlreadyQueued { message, .. }
            | EnrollOutcome::Rejected { message, .. } => message.clone(),
        }
    }
}

/// Decide whether a candidate of `category` may take a seat in `state`
pub fn can_enroll(category: Category, state: &SessionState, limits: &CapacityConfig) -> Admission {
    let total = state.enrolled_count();
    if total >= limits.max_capacity {
        return Admission::Deny(DenyReason::CapacityFull);
    }

    let non_quota_full = state.non_quota_count() >= limits.non_quota_spots;
    match category {
        Category::Quota => {
            if state.quota_count() < limits.quota_spots {
                Admission::Admit
            } else if non_quota_full {
                // Overflow: seats left over once regular spots are gone.
                Admission::Admit
            } else {
                Admission::Deny(DenyReason::QuotaFilled)
            }
        }
        Category::NonQuota => {
            if non_quota_full {
                Admission::Deny(DenyReason::NonQuotaFull)
            } else {
                Admission::Admit
            }
        }
    }
}

/// Apply the admission rules to `state`
///
/// Mutates `state` only when the outcome carries a participant.
pub fn enroll(
    candidate: &Candidate,
    state: &mut SessionState,
    limits: &CapacityConfig,
    now: DateTime<Utc>,
) -> EnrollOutcome {
    match can_enroll(candidate.category(), state, limits) {
        Admission::Admit => {
            let participant = Participant::admit(candidate, now);
            state.push(Placement::Enrolled, participant.clone());
            EnrollOutcome::Enrolled { participant }
        }
        Admission::Deny(reason) if reason.routes_to_queue() => {
            let participant = Participant::admit(candidate, now);
            state.push(Placement::WaitingQueue, participant.clone());
            EnrollOutcome::Queued {
                participant,
                reason: QueueReason::SpotsFilled,
                message: reason.message(limits),
            }
        }
        Admission::Deny(reason) => EnrollOutcome::Rejected {
            reason,
            message: reason.message(limits),
        },
    }
}
