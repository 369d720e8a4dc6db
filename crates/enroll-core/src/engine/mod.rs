//! Enrollment decision engine
//!
//! Pure decision logic: given the in-memory state and a candidate, decide
//! whether the candidate is enrolled, queued or turned away, and apply the
//! result to the state. Nothing here performs I/O; persisting the result is
//! the caller's job (see [`crate::service::EnrollmentService`]).
//!
//! # Example
//!
//! ```ignore
//! use enroll_core::engine::EnrollmentEngine;
//!
//! let engine = EnrollmentEngine::from_config(&config);
//! let outcome = engine.enroll(&candidate, &mut state, Utc::now())?;
//! ```

mod gate;
mod rules;

pub use gate::{EligibilityGate, GateDecision};
pub use rules::{can_enroll, enroll, Admission, DenyReason, EnrollOutcome, QueueReason};

use crate::config::{CapacityConfig, EnrollConfig};
use crate::error::{EnrollError, Result};
use crate::session::{Candidate, MultiSessionState, Participant, Placement};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Admission rules plus the optional eligibility gate
#[derive(Debug, Clone)]
pub struct EnrollmentEngine {
    limits: CapacityConfig,
    gate: Option<EligibilityGate>,
}

impl EnrollmentEngine {
    pub fn new(limits: CapacityConfig, gate: Option<EligibilityGate>) -> Self {
        Self { limits, gate }
    }

    pub fn from_config(config: &EnrollConfig) -> Self {
        let gate = config
            .gate
            .as_ref()
            .map(|g| EligibilityGate::from_config(g, &config.capacity));
        Self::new(config.capacity.clone(), gate)
    }

    pub fn limits(&self) -> &CapacityConfig {
        &self.limits
    }

    pub fn gate(&self) -> Option<&EligibilityGate> {
        self.gate.as_ref()
    }

    /// Evaluate and apply one enrollment against the multi-session state
    ///
    /// Fails only for requests that never reach the rules: blank names and
    /// sessions missing from `state`.
    pub fn enroll(
        &self,
        candidate: &Candidate,
        state: &mut MultiSessionState,
        now: DateTime<Utc>,
    ) -> Result<EnrollOutcome> {
        if candidate.name.trim().is_empty() {
            return Err(EnrollError::Validation("Name must not be empty".to_string()));
        }
        if state.get(&candidate.session_id).is_none() {
            return Err(EnrollError::UnknownSession(candidate.session_id.to_string()));
        }

        if let Some(gate) = &self.gate {
            let decision = gate.check(candidate, state, now);
            debug!("Gate decision for {:?}: {:?}", candidate.name, decision);
            match decision {
                GateDecision::Open | GateDecision::Eligible { .. } => {}
                GateDecision::NotListed => {
                    let participant = Participant::admit(candidate, now);
                    state
                        .entry(&candidate.session_id)
                        .push(Placement::WaitingQueue, participant.clone());
                    return Ok(EnrollOutcome::Queued {
                        participant,
                        reason: QueueReason::NotYetEligible,
                        message: gate.not_listed_message(),
                    });
                }
                GateDecision::BeyondThreshold { rank } => {
                    return Ok(EnrollOutcome::AlreadyQueued {
                        rank,
                        message: gate.beyond_threshold_message(rank),
                    });
                }
            }
        }

        let session = state.entry(&candidate.session_id);
        Ok(rules::enroll(candidate, session, &self.limits, now))
    }
}
