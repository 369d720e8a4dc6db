//! Session data models

use crate::types::{AttendanceMode, Category, ParticipantId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registration request, before any rule has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Display name
    pub name: String,
    /// True for the limited-quota category
    pub needs_quota_category: bool,
    /// Local or remote attendance
    pub attendance_mode: AttendanceMode,
    /// Session the candidate asks to join
    pub session_id: SessionId,
}

impl Candidate {
    /// Create a new candidate
    pub fn new(
        name: impl Into<String>,
        needs_quota_category: bool,
        attendance_mode: AttendanceMode,
        session_id: SessionId,
    ) -> Self {
        Self {
            name: name.into(),
            needs_quota_category,
            attendance_mode,
            session_id,
        }
    }

    /// Category used by the admission rules
    pub fn category(&self) -> Category {
        Category::from_flag(self.needs_quota_category)
    }
}

/// An admitted or queued participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique record id, generated at admission time
    pub id: ParticipantId,
    /// Display name
    pub name: String,
    /// True for the limited-quota category
    pub needs_quota_category: bool,
    /// Local or remote attendance
    pub attendance_mode: AttendanceMode,
    /// Session this record belongs to
    pub session_id: SessionId,
    /// Admission (or queueing) time
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Build a participant from a candidate with a fresh id
    pub fn admit(candidate: &Candidate, now: DateTime<Utc>) -> Self {
        Self {
            id: ParticipantId::generate(),
            name: candidate.name.trim().to_string(),
            needs_quota_category: candidate.needs_quota_category,
            attendance_mode: candidate.attendance_mode,
            session_id: candidate.session_id.clone(),
            created_at: now,
        }
    }

    /// Category used by the admission rules
    pub fn category(&self) -> Category {
        Category::from_flag(self.needs_quota_category)
    }

    /// Name normalized for eligibility lookups
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Lowercase and trim a name for comparison
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Which list of a session a participant sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Enrolled,
    WaitingQueue,
}

/// Enrolled and waiting participants of one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Admitted participants, in admission order
    #[serde(default)]
    pub enrolled: Vec<Participant>,
    /// Waiting participants, FIFO
    #[serde(default)]
    pub waiting_queue: Vec<Participant>,
}

impl SessionState {
    /// Create an empty session state
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of enrolled participants
    pub fn enrolled_count(&self) -> usize {
        self.enrolled.len()
    }

    /// Number of enrolled participants in the quota category
    pub fn quota_count(&self) -> usize {
        self.count_enrolled(Category::Quota)
    }

    /// Number of enrolled participants in the non-quota category
    pub fn non_quota_count(&self) -> usize {
        self.count_enrolled(Category::NonQuota)
    }

    fn count_enrolled(&self, category: Category) -> usize {
        self.enrolled
            .iter()
            .filter(|p| p.category() == category)
            .count()
    }

    /// Waiting queue length
    pub fn queue_len(&self) -> usize {
        self.waiting_queue.len()
    }

    /// Append a participant to the given list
    pub fn push(&mut self, placement: Placement, participant: Participant) {
        match placement {
            Placement::Enrolled => self.enrolled.push(participant),
            Placement::WaitingQueue => self.waiting_queue.push(participant),
        }
    }

    /// Remove a participant from either list, returning it
    pub fn remove(&mut self, id: &ParticipantId) -> Option<Participant> {
        if let Some(pos) = self.enrolled.iter().position(|p| &p.id == id) {
            return Some(self.enrolled.remove(pos));
        }
        if let Some(pos) = self.waiting_queue.iter().position(|p| &p.id == id) {
            return Some(self.waiting_queue.remove(pos));
        }
        None
    }

    /// 1-based position of the first queued participant with this name, 0 if absent
    pub fn queue_rank_of(&self, name: &str) -> usize {
        let wanted = normalize_name(name);
        self.waiting_queue
            .iter()
            .position(|p| p.normalized_name() == wanted)
            .map(|pos| pos + 1)
            .unwrap_or(0)
    }

    /// Total number of records in both lists
    pub fn record_count(&self) -> usize {
        self.enrolled.len() + self.waiting_queue.len()
    }

    /// Whether both lists are empty
    pub fn is_empty(&self) -> bool {
        self.enrolled.is_empty() && self.waiting_queue.is_empty()
    }
}

/// Per-session state for every known session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiSessionState {
    sessions: BTreeMap<SessionId, SessionState>,
}

impl MultiSessionState {
    /// Create a state with an empty entry for each given session
    pub fn with_sessions<'a>(ids: impl IntoIterator<Item = &'a SessionId>) -> Self {
        let mut state = Self::default();
        state.ensure_sessions(ids);
        state
    }

    /// Add empty entries for sessions that have none
    pub fn ensure_sessions<'a>(&mut self, ids: impl IntoIterator<Item = &'a SessionId>) {
        for id in ids {
            self.sessions.entry(id.clone()).or_default();
        }
    }

    /// State of one session
    pub fn get(&self, id: &SessionId) -> Option<&SessionState> {
        self.sessions.get(id)
    }

    /// Mutable state of one session
    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut SessionState> {
        self.sessions.get_mut(id)
    }

    /// State of one session, created empty if missing
    pub fn entry(&mut self, id: &SessionId) -> &mut SessionState {
        self.sessions.entry(id.clone()).or_default()
    }

    /// Known session ids
    pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
        self.sessions.keys()
    }

    /// Iterate over all sessions
    pub fn iter(&self) -> impl Iterator<Item = (&SessionId, &SessionState)> {
        self.sessions.iter()
    }

    /// Every participant with its placement, across all sessions
    pub fn participants(&self) -> impl Iterator<Item = (Placement, &Participant)> {
        self.sessions.values().flat_map(|s| {
            s.enrolled
                .iter()
                .map(|p| (Placement::Enrolled, p))
                .chain(s.waiting_queue.iter().map(|p| (Placement::WaitingQueue, p)))
        })
    }

    /// Reset one session to empty
    pub fn clear_session(&mut self, id: &SessionId) {
        if let Some(state) = self.sessions.get_mut(id) {
            *state = SessionState::default();
        }
    }

    /// Reset every session to empty, keeping the entries
    pub fn clear_all(&mut self) {
        for state in self.sessions.values_mut() {
            *state = SessionState::default();
        }
    }

    /// Total records across all sessions
    pub fn record_count(&self) -> usize {
        self.sessions.values().map(SessionState::record_count).sum()
    }
}
