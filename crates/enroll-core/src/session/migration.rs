//! Persisted record shapes and schema migration
//!
//! Two shapes exist on disk and in the durable store:
//!
//! - v1 (legacy): a single session, `enrolled` and `waiting_queue` at the top
//!   level, records without a `session_id`.
//! - v2 (current): a `sessions` map keyed by session id plus a
//!   `schema_version` field.
//!
//! The decoder detects the shape by the presence of the `sessions` field and
//! always produces a fresh [`MultiSessionState`]; the input is never rewritten.

use super::model::{MultiSessionState, Participant, Placement};
use crate::error::{EnrollError, Result};
use crate::types::{AttendanceMode, ParticipantId, ProtocolVersion, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Current snapshot schema version
pub const CURRENT_SCHEMA_VERSION: &str = "2.0";

/// Field whose presence marks a v2 snapshot
const SESSIONS_FIELD: &str = "sessions";

/// A participant as stored by any persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub id: ParticipantId,
    pub name: String,
    #[serde(alias = "needsQuotaCategory")]
    pub needs_quota_category: bool,
    #[serde(default, alias = "attendanceMode")]
    pub attendance_mode: AttendanceMode,
    #[serde(alias = "createdAt", alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Absent on records written before sessions existed
    #[serde(default, alias = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ParticipantRecord {
    /// Convert to a participant, filling in the session for legacy records
    pub fn into_participant(self, fallback_session: &SessionId) -> Participant {
        Participant {
            id: self.id,
            name: self.name,
            needs_quota_category: self.needs_quota_category,
            attendance_mode: self.attendance_mode,
            session_id: self.session_id.unwrap_or_else(|| fallback_session.clone()),
            created_at: self.created_at,
        }
    }
}

impl From<&Participant> for ParticipantRecord {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            needs_quota_category: p.needs_quota_category,
            attendance_mode: p.attendance_mode,
            created_at: p.created_at,
            session_id: Some(p.session_id.clone()),
        }
    }
}

/// The two record collections of the durable store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(default)]
    pub enrolled: Vec<ParticipantRecord>,
    #[serde(default, alias = "waitingQueue")]
    pub waiting_queue: Vec<ParticipantRecord>,
}

impl RecordSet {
    /// Flatten a state into records, every record tagged with its session
    pub fn from_state(state: &MultiSessionState) -> Self {
        let mut set = RecordSet::default();
        for (placement, participant) in state.participants() {
            let record = ParticipantRecord::from(participant);
            match placement {
                Placement::Enrolled => set.enrolled.push(record),
                Placement::WaitingQueue => set.waiting_queue.push(record),
            }
        }
        set
    }

    /// Group records by session into a state
    ///
    /// Records without a session id belong to `sessions[0]`. Every session in
    /// `sessions` gets an entry. Lists are ordered by `created_at`, ties kept in
    /// input order.
    pub fn into_state(self, sessions: &[SessionId]) -> Result<MultiSessionState> {
        let primary = sessions.first().ok_or_else(|| {
            EnrollError::Config("Cannot decode records without a configured session".to_string())
        })?;

        let mut state = MultiSessionState::with_sessions(sessions);
        let mut legacy = 0usize;

        for (placement, records) in [
            (Placement::Enrolled, self.enrolled),
            (Placement::WaitingQueue, self.waiting_queue),
        ] {
            for record in records {
                if record.session_id.is_none() {
                    legacy += 1;
                }
                let participant = record.into_participant(primary);
                if !sessions.contains(&participant.session_id) {
                    warn!(
                        "Record {} references unconfigured session {}",
                        participant.id, participant.session_id
                    );
                }
                state.entry(&participant.session_id.clone()).push(placement, participant);
            }
        }

        if legacy > 0 {
            info!("Assigned {} legacy records to session {}", legacy, primary);
        }

        sort_by_admission(&mut state);
        Ok(state)
    }

    /// Number of records in both collections
    pub fn len(&self) -> usize {
        self.enrolled.len() + self.waiting_queue.len()
    }

    /// Whether both collections are empty
    pub fn is_empty(&self) -> bool {
        self.enrolled.is_empty() && self.waiting_queue.is_empty()
    }
}

fn sort_by_admission(state: &mut MultiSessionState) {
    let ids: Vec<SessionId> = state.session_ids().cloned().collect();
    for id in ids {
        if let Some(session) = state.get_mut(&id) {
            session.enrolled.sort_by_key(|p| p.created_at);
            session.waiting_queue.sort_by_key(|p| p.created_at);
        }
    }
}

/// Current (v2) local snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    /// Schema version for migration
    pub schema_version: String,
    /// Per-session records
    pub sessions: BTreeMap<SessionId, RecordSet>,
    /// When the snapshot was written
    pub last_updated: DateTime<Utc>,
    /// Extra fields for forward compatibility
    #[serde(flatten, default)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl SnapshotFile {
    /// Create a snapshot of the given state with the current schema version
    pub fn new(state: &MultiSessionState, last_updated: DateTime<Utc>) -> Self {
        let sessions = state
            .iter()
            .map(|(id, session)| {
                let set = RecordSet {
                    enrolled: session.enrolled.iter().map(ParticipantRecord::from).collect(),
                    waiting_queue: session
                        .waiting_queue
                        .iter()
                        .map(ParticipantRecord::from)
                        .collect(),
                };
                (id.clone(), set)
            })
            .collect();

        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            sessions,
            last_updated,
            extra: HashMap::new(),
        }
    }

    /// Parse schema version
    pub fn parse_version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::parse(&self.schema_version)
    }
}

/// Legacy (v1) single-session snapshot
#[derive(Debug, Clone, Deserialize)]
pub struct LegacySnapshotFile {
    #[serde(flatten)]
    pub records: RecordSet,
    #[serde(default, alias = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Detected snapshot shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotShape {
    /// v1 single-session blob
    Legacy,
    /// v2 multi-session blob
    Current,
}

/// Snapshot decoded into the canonical shape
#[derive(Debug, Clone)]
pub struct DecodedSnapshot {
    pub state: MultiSessionState,
    pub last_updated: Option<DateTime<Utc>>,
    /// Shape the blob was stored in
    pub shape: SnapshotShape,
}

/// Snapshot schema decoder
pub struct SnapshotMigrator;

impl SnapshotMigrator {
    /// Detect the shape of a raw snapshot
    pub fn detect(value: &serde_json::Value) -> SnapshotShape {
        match value.get(SESSIONS_FIELD) {
            Some(_) => SnapshotShape::Current,
            None => SnapshotShape::Legacy,
        }
    }

    /// Decode a raw snapshot into the canonical shape
    pub fn decode(value: serde_json::Value, sessions: &[SessionId]) -> Result<DecodedSnapshot> {
        match Self::detect(&value) {
            SnapshotShape::Current => {
                let file: SnapshotFile = serde_json::from_value(value)?;
                Self::decode_current(file, sessions)
            }
            SnapshotShape::Legacy => {
                let file: LegacySnapshotFile = serde_json::from_value(value)?;
                info!(
                    "Migrating legacy snapshot ({} records) to schema {}",
                    file.records.len(),
                    CURRENT_SCHEMA_VERSION
                );
                Ok(DecodedSnapshot {
                    state: file.records.into_state(sessions)?,
                    last_updated: file.last_updated,
                    shape: SnapshotShape::Legacy,
                })
            }
        }
    }

    fn decode_current(file: SnapshotFile, sessions: &[SessionId]) -> Result<DecodedSnapshot> {
        let version = file.parse_version().ok_or_else(|| {
            EnrollError::Validation(format!(
                "Invalid schema version format: {}",
                file.schema_version
            ))
        })?;
        if !version.is_compatible(&ProtocolVersion::V2_0) {
            return Err(EnrollError::UnsupportedSchemaVersion(file.schema_version));
        }

        // Records inside a session bucket inherit the bucket's id.
        let mut merged = RecordSet::default();
        for (session_id, set) in file.sessions {
            let tag = |mut r: ParticipantRecord| {
                r.session_id.get_or_insert_with(|| session_id.clone());
                r
            };
            merged.enrolled.extend(set.enrolled.into_iter().map(&tag));
            merged.waiting_queue.extend(set.waiting_queue.into_iter().map(&tag));
        }

        Ok(DecodedSnapshot {
            state: merged.into_state(sessions)?,
            last_updated: Some(file.last_updated),
            shape: SnapshotShape::Current,
        })
    }

    /// Get the current schema version
    pub fn current_version() -> &'static str {
        CURRENT_SCHEMA_VERSION
    }
}
