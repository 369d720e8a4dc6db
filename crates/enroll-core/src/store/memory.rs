//! In-memory stores for testing

use super::{BlobStore, Collection, Layer, RecordStore, StateRepository};
use crate::error::{EnrollError, Result};
use crate::session::{MultiSessionState, ParticipantRecord};
use crate::types::{ParticipantId, SessionId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// Failure class to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Network,
    Backend,
}

impl Failure {
    fn into_error(self, what: &str) -> EnrollError {
        match self {
            Failure::Network => EnrollError::Network(format!("{}: simulated timeout", what)),
            Failure::Backend => {
                EnrollError::Backend(format!("{}: simulated constraint violation", what))
            }
        }
    }
}

/// Queue of one-shot failures plus an optional permanent one
#[derive(Default)]
struct FailurePlan {
    queued: Mutex<VecDeque<Failure>>,
    always: Mutex<Option<Failure>>,
}

impl FailurePlan {
    fn next(&self, what: &str) -> Result<()> {
        if let Some(f) = self.queued.lock().unwrap().pop_front() {
            return Err(f.into_error(what));
        }
        match *self.always.lock().unwrap() {
            Some(f) => Err(f.into_error(what)),
            None => Ok(()),
        }
    }
}

/// In-memory repository layer
pub struct MemoryRepository {
    layer: Layer,
    state: RwLock<Option<MultiSessionState>>,
    fail_loads: AtomicBool,
    save_failures: FailurePlan,
    saves: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            state: RwLock::new(None),
            fail_loads: AtomicBool::new(false),
            save_failures: FailurePlan::default(),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn set_state(&self, state: MultiSessionState) {
        *self.state.write().unwrap() = Some(state);
    }

    pub fn state(&self) -> Option<MultiSessionState> {
        self.state.read().unwrap().clone()
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `n` save attempts
    pub fn fail_next_saves(&self, failure: Failure, n: usize) {
        let mut queued = self.save_failures.queued.lock().unwrap();
        queued.extend(std::iter::repeat(failure).take(n));
    }

    /// Fail every save attempt until reset with `None`
    pub fn fail_all_saves(&self, failure: Option<Failure>) {
        *self.save_failures.always.lock().unwrap() = failure;
    }

    /// Number of save attempts, failed ones included
    pub fn save_attempts(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl StateRepository for MemoryRepository {
    fn layer(&self) -> Layer {
        self.layer
    }

    fn load(&self) -> Result<MultiSessionState> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(Failure::Network.into_error("load"));
        }
        Ok(self.state().unwrap_or_default())
    }

    fn save(&self, state: &MultiSessionState) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.save_failures.next("save")?;
        self.set_state(state.clone());
        Ok(())
    }

    fn clear(&self, session: Option<&SessionId>) -> Result<()> {
        self.save_failures.next("clear")?;
        let mut guard = self.state.write().unwrap();
        if let Some(state) = guard.as_mut() {
            match session {
                Some(id) => state.clear_session(id),
                None => state.clear_all(),
            }
        }
        Ok(())
    }

    fn remove(&self, id: &ParticipantId) -> Result<()> {
        let mut guard = self.state.write().unwrap();
        if let Some(state) = guard.as_mut() {
            let ids: Vec<SessionId> = state.session_ids().cloned().collect();
            for sid in &ids {
                if let Some(session) = state.get_mut(sid) {
                    session.remove(id);
                }
            }
        }
        Ok(())
    }
}

/// In-memory durable record store with upsert-by-id semantics
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: Mutex<HashMap<Collection, Vec<ParticipantRecord>>>,
    upsert_failure: Mutex<Option<(Collection, Failure)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Fail every upsert into `collection`; other collections still accept writes
    pub fn fail_upserts_to(&self, collection: Collection, failure: Failure) {
        *self.upsert_failure.lock().unwrap() = Some((collection, failure));
    }
}

impl RecordStore for MemoryRecordStore {
    fn fetch(&self, collection: Collection) -> Result<Vec<ParticipantRecord>> {
        let mut records = self
            .collections
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    fn upsert(&self, collection: Collection, records: &[ParticipantRecord]) -> Result<()> {
        if let Some((target, failure)) = *self.upsert_failure.lock().unwrap() {
            if target == collection {
                return Err(failure.into_error(collection.name()));
            }
        }
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection).or_default();
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    fn delete(&self, collection: Collection, session: Option<&SessionId>) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let stored = collections.entry(collection).or_default();
        match session {
            Some(id) => stored.retain(|r| r.session_id.as_ref() != Some(id)),
            None => stored.clear(),
        }
        Ok(())
    }

    fn delete_record(&self, collection: Collection, id: &ParticipantId) -> Result<()> {
        if let Some(stored) = self.collections.lock().unwrap().get_mut(&collection) {
            stored.retain(|r| &r.id != id);
        }
        Ok(())
    }
}

/// In-memory blob store
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EnrollError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "simulated read-only cache",
            )));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str) -> ParticipantRecord {
        ParticipantRecord {
            id: ParticipantId::from_string(id),
            name: id.to_string(),
            needs_quota_category: false,
            attendance_mode: Default::default(),
            created_at: Utc::now(),
            session_id: Some(SessionId::from("s1")),
        }
    }

    #[test]
    fn test_memory_record_store_upsert_replaces() {
        let store = MemoryRecordStore::new();
        store.upsert(Collection::Enrolled, &[record("a"), record("b")]).unwrap();
        let mut renamed = record("a");
        renamed.name = "renamed".to_string();
        store.upsert(Collection::Enrolled, &[renamed]).unwrap();

        let fetched = store.fetch(Collection::Enrolled).unwrap();
        assert_eq!(fetched.len(), 2);
        assert!(fetched.iter().any(|r| r.name == "renamed"));
        assert_eq!(store.len(Collection::WaitingQueue), 0);
    }

    #[test]
    fn test_memory_record_store_collection_failure() {
        let store = MemoryRecordStore::new();
        store.fail_upserts_to(Collection::WaitingQueue, Failure::Backend);

        store.upsert(Collection::Enrolled, &[record("a")]).unwrap();
        assert!(store.upsert(Collection::WaitingQueue, &[record("b")]).is_err());
        assert_eq!(store.len(Collection::Enrolled), 1);

        store.delete_record(Collection::Enrolled, &ParticipantId::from_string("a")).unwrap();
        store.delete_record(Collection::WaitingQueue, &ParticipantId::from_string("a")).unwrap();
        assert_eq!(store.len(Collection::Enrolled), 0);
    }

    #[test]
    fn test_memory_repository_failure_plan() {
        let repo = MemoryRepository::new(Layer::Remote);
        repo.fail_next_saves(Failure::Network, 1);
        let state = MultiSessionState::default();

        assert!(repo.save(&state).unwrap_err().is_network());
        assert!(repo.save(&state).is_ok());
        assert_eq!(repo.save_attempts(), 2);

        repo.fail_all_saves(Some(Failure::Backend));
        assert!(matches!(repo.save(&state), Err(EnrollError::Backend(_))));
    }
}
