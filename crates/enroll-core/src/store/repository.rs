//! Repository layers built on record and blob stores

use super::{BlobStore, Collection, Layer, RecordStore, StateRepository};
use crate::error::Result;
use crate::session::{MultiSessionState, RecordSet, SnapshotFile, SnapshotMigrator, SnapshotShape};
use crate::types::{ParticipantId, SessionId};
use chrono::Utc;
use tracing::{debug, info};

/// Fixed key of the local snapshot blob
pub const SNAPSHOT_KEY: &str = "workshop-enrollment-state";

/// Durable layer: the full state as two record collections
pub struct RecordRepository<S> {
    store: S,
    sessions: Vec<SessionId>,
}

impl<S: RecordStore> RecordRepository<S> {
    /// `sessions` lists configured sessions; the first receives legacy records
    pub fn new(store: S, sessions: Vec<SessionId>) -> Self {
        Self { store, sessions }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RecordStore> StateRepository for RecordRepository<S> {
    fn layer(&self) -> Layer {
        Layer::Remote
    }

    fn load(&self) -> Result<MultiSessionState> {
        let records = RecordSet {
            enrolled: self.store.fetch(Collection::Enrolled)?,
            waiting_queue: self.store.fetch(Collection::WaitingQueue)?,
        };
        debug!("Fetched {} records from durable store", records.len());
        records.into_state(&self.sessions)
    }

    fn save(&self, state: &MultiSessionState) -> Result<()> {
        let records = RecordSet::from_state(state);
        self.store.upsert(Collection::Enrolled, &records.enrolled)?;
        self.store.upsert(Collection::WaitingQueue, &records.waiting_queue)?;
        debug!("Upserted {} records to durable store", records.len());
        Ok(())
    }

    fn clear(&self, session: Option<&SessionId>) -> Result<()> {
        for collection in Collection::ALL {
            self.store.delete(collection, session)?;
        }
        Ok(())
    }

    fn remove(&self, id: &ParticipantId) -> Result<()> {
        for collection in Collection::ALL {
            self.store.delete_record(collection, id)?;
        }
        debug!("Deleted record {} from durable store", id);
        Ok(())
    }
}

/// Local layer: the full state as one versioned snapshot blob
pub struct SnapshotRepository<B> {
    blobs: B,
    sessions: Vec<SessionId>,
}

impl<B: BlobStore> SnapshotRepository<B> {
    pub fn new(blobs: B, sessions: Vec<SessionId>) -> Self {
        Self { blobs, sessions }
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }
}

impl<B: BlobStore> StateRepository for SnapshotRepository<B> {
    fn layer(&self) -> Layer {
        Layer::Local
    }

    fn load(&self) -> Result<MultiSessionState> {
        let Some(raw) = self.blobs.read(SNAPSHOT_KEY)? else {
            debug!("No local snapshot, starting empty");
            return Ok(MultiSessionState::with_sessions(&self.sessions));
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        let decoded = SnapshotMigrator::decode(value, &self.sessions)?;
        if decoded.shape == SnapshotShape::Legacy {
            info!("Loaded legacy snapshot, rewriting in the current schema on next save");
        }
        Ok(decoded.state)
    }

    fn save(&self, state: &MultiSessionState) -> Result<()> {
        let file = SnapshotFile::new(state, Utc::now());
        let json = serde_json::to_string_pretty(&file)?;
        self.blobs.write(SNAPSHOT_KEY, &json)
    }

    fn clear(&self, session: Option<&SessionId>) -> Result<()> {
        let mut state = self.load()?;
        match session {
            Some(id) => state.clear_session(id),
            None => state.clear_all(),
        }
        self.save(&state)
    }

    fn remove(&self, id: &ParticipantId) -> Result<()> {
        let mut state = self.load()?;
        let ids: Vec<SessionId> = state.session_ids().cloned().collect();
        let removed = ids
            .iter()
            .filter_map(|sid| state.get_mut(sid).and_then(|s| s.remove(id)))
            .count();
        if removed == 0 {
            return Ok(());
        }
        self.save(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Candidate, Participant, Placement};
    use crate::store::memory::{MemoryBlobStore, MemoryRecordStore};
    use crate::types::AttendanceMode;
    use pretty_assertions::assert_eq;

    fn sessions() -> Vec<SessionId> {
        vec![SessionId::from("s1"), SessionId::from("s2")]
    }

    fn sample_state() -> MultiSessionState {
        let ids = sessions();
        let mut state = MultiSessionState::with_sessions(&ids);
        let now = Utc::now();
        for (i, id) in ids.iter().enumerate() {
            let c = Candidate::new(format!("p{}", i), i == 0, AttendanceMode::Local, id.clone());
            state.entry(id).push(Placement::Enrolled, Participant::admit(&c, now));
            state.entry(id).push(Placement::WaitingQueue, Participant::admit(&c, now));
        }
        state
    }

    #[test]
    fn test_record_repository_round_trip() {
        let repo = RecordRepository::new(MemoryRecordStore::new(), sessions());
        let state = sample_state();
        repo.save(&state).unwrap();
        assert_eq!(repo.load().unwrap(), state);
    }

    #[test]
    fn test_record_repository_save_is_idempotent() {
        let repo = RecordRepository::new(MemoryRecordStore::new(), sessions());
        let state = sample_state();
        repo.save(&state).unwrap();
        repo.save(&state).unwrap();

        assert_eq!(repo.store().len(Collection::Enrolled), 2);
        assert_eq!(repo.store().len(Collection::WaitingQueue), 2);
        assert_eq!(repo.load().unwrap(), state);
    }

    #[test]
    fn test_record_repository_clear_one_session() {
        let repo = RecordRepository::new(MemoryRecordStore::new(), sessions());
        repo.save(&sample_state()).unwrap();
        repo.clear(Some(&SessionId::from("s1"))).unwrap();

        let loaded = repo.load().unwrap();
        assert!(loaded.get(&SessionId::from("s1")).unwrap().is_empty());
        assert_eq!(loaded.get(&SessionId::from("s2")).unwrap().record_count(), 2);

        repo.clear(None).unwrap();
        assert_eq!(repo.load().unwrap().record_count(), 0);
    }

    #[test]
    fn test_snapshot_repository_empty_blob() {
        let repo = SnapshotRepository::new(MemoryBlobStore::new(), sessions());
        let state = repo.load().unwrap();
        assert_eq!(state.session_ids().count(), 2);
        assert_eq!(state.record_count(), 0);
    }

    #[test]
    fn test_snapshot_repository_round_trip() {
        let repo = SnapshotRepository::new(MemoryBlobStore::new(), sessions());
        let state = sample_state();
        repo.save(&state).unwrap();

        let raw = repo.blobs().read(SNAPSHOT_KEY).unwrap().unwrap();
        assert!(raw.contains("last_updated"));
        assert_eq!(repo.load().unwrap(), state);
    }

    #[test]
    fn test_snapshot_repository_reads_legacy_blob() {
        let blobs = MemoryBlobStore::new();
        blobs
            .write(
                SNAPSHOT_KEY,
                r#"{"enrolled":[{"id":"a","name":"Ada","needs_quota_category":false,
                    "created_at":"2024-01-01T00:00:00Z"}],"waiting_queue":[]}"#,
            )
            .unwrap();
        let repo = SnapshotRepository::new(blobs, sessions());

        let state = repo.load().unwrap();
        let s1 = state.get(&SessionId::from("s1")).unwrap();
        assert_eq!(s1.enrolled[0].name, "Ada");
        assert_eq!(s1.enrolled[0].session_id.as_str(), "s1");
    }

    #[test]
    fn test_snapshot_repository_corrupt_blob() {
        let blobs = MemoryBlobStore::new();
        blobs.write(SNAPSHOT_KEY, "not json").unwrap();
        let repo = SnapshotRepository::new(blobs, sessions());
        assert!(repo.load().is_err());
    }

    #[test]
    fn test_snapshot_repository_clear() {
        let repo = SnapshotRepository::new(MemoryBlobStore::new(), sessions());
        repo.save(&sample_state()).unwrap();
        repo.clear(Some(&SessionId::from("s2"))).unwrap();

        let state = repo.load().unwrap();
        assert!(state.get(&SessionId::from("s2")).unwrap().is_empty());
        assert_eq!(state.get(&SessionId::from("s1")).unwrap().record_count(), 2);
    }

    #[test]
    fn test_record_repository_remove_from_every_collection() {
        let repo = RecordRepository::new(MemoryRecordStore::new(), sessions());
        let state = sample_state();
        repo.save(&state).unwrap();

        let s1 = state.get(&SessionId::from("s1")).unwrap();
        repo.remove(&s1.enrolled[0].id).unwrap();
        repo.remove(&s1.waiting_queue[0].id).unwrap();
        repo.remove(&ParticipantId::from_string("missing")).unwrap();

        assert_eq!(repo.store().len(Collection::Enrolled), 1);
        assert_eq!(repo.store().len(Collection::WaitingQueue), 1);
        assert!(repo.load().unwrap().get(&SessionId::from("s1")).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_repository_remove() {
        let repo = SnapshotRepository::new(MemoryBlobStore::new(), sessions());
        let state = sample_state();
        repo.save(&state).unwrap();

        let target = state.get(&SessionId::from("s2")).unwrap().enrolled[0].id.clone();
        repo.remove(&target).unwrap();

        let loaded = repo.load().unwrap();
        assert_eq!(loaded.get(&SessionId::from("s2")).unwrap().enrolled_count(), 0);
        assert_eq!(loaded.record_count(), 3);
    }
}
