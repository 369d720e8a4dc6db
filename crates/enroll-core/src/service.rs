//! Enrollment service: the caller-facing handle
//!
//! Owns the in-memory state, runs the decision engine, and persists every
//! mutation. A mutation whose save fails is rolled back in memory, in the
//! local cache and in the durable store before the error is returned, so a
//! caller is never told "enrolled" for an unsaved record.

use crate::config::EnrollConfig;
use crate::engine::{EnrollOutcome, EnrollmentEngine};
use crate::error::{EnrollError, Result};
use crate::session::{Candidate, MultiSessionState, SessionState, SessionStats};
use crate::store::{Layer, SessionStore};
use crate::types::SessionId;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{info, warn};

/// Enrollment service handle
///
/// Construct once and share; every method takes `&self`. Mutations are
/// serialized through an internal writer lock.
pub struct EnrollmentService {
    config: EnrollConfig,
    engine: EnrollmentEngine,
    store: SessionStore,
    state: RwLock<MultiSessionState>,
    writer: Mutex<()>,
    loading: AtomicBool,
}

impl EnrollmentService {
    /// Create a service with empty state; call [`Self::refresh`] to load
    pub fn new(config: EnrollConfig, store: SessionStore) -> Result<Self> {
        config.validate()?;
        let state = MultiSessionState::with_sessions(&config.session_ids());
        Ok(Self {
            engine: EnrollmentEngine::from_config(&config),
            config,
            store,
            state: RwLock::new(state),
            writer: Mutex::new(()),
            loading: AtomicBool::new(false),
        })
    }

    /// Create a service and load persisted state
    pub fn open(config: EnrollConfig, store: SessionStore) -> Result<Self> {
        let service = Self::new(config, store)?;
        service.refresh();
        Ok(service)
    }

    pub fn config(&self) -> &EnrollConfig {
        &self.config
    }

    pub fn engine(&self) -> &EnrollmentEngine {
        &self.engine
    }

    /// Enroll a candidate now
    pub fn enroll(&self, candidate: &Candidate) -> Result<EnrollOutcome> {
        self.enroll_at(candidate, Utc::now())
    }

    /// Enroll a candidate as of `now`
    ///
    /// Rule rejections come back as `Ok(EnrollOutcome::Rejected)`. An `Err`
    /// means the request was invalid or the result could not be persisted;
    /// in the latter case the in-memory state is unchanged.
    pub fn enroll_at(&self, candidate: &Candidate, now: DateTime<Utc>) -> Result<EnrollOutcome> {
        let _writer = self.lock_writer();

        let (outcome, snapshot) = {
            let mut state = self.write_state();
            let outcome = self.engine.enroll(candidate, &mut state, now)?;
            (outcome, state.clone())
        };

        let Some(participant) = outcome.participant() else {
            return Ok(outcome);
        };

        if let Err(err) = self.store.save(&snapshot) {
            let rolled_back = {
                let mut state = self.write_state();
                state
                    .get_mut(&participant.session_id)
                    .and_then(|s| s.remove(&participant.id));
                state.clone()
            };
            // The local cache already holds the optimistic write, and the
            // durable store may hold part of it.
            self.store.save_local(&rolled_back);
            if let Err(discard_err) = self.store.discard(&participant.id) {
                warn!(
                    "Could not remove {} from durable store: {}",
                    participant.id, discard_err
                );
            }
            warn!(
                "Rolled back {} for {} after failed save: {}",
                participant.id, participant.session_id, err
            );
            return Err(err.with_context(format!(
                "Registration for {} was not saved",
                participant.name
            )));
        }

        info!(
            "{} {} in {}",
            participant.name,
            if outcome.added_to_queue() { "queued" } else { "enrolled" },
            participant.session_id
        );
        Ok(outcome)
    }

    /// Copy of one session's state
    pub fn state(&self, session_id: &SessionId) -> Result<SessionState> {
        self.read_state()
            .get(session_id)
            .cloned()
            .ok_or_else(|| EnrollError::UnknownSession(session_id.to_string()))
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> MultiSessionState {
        self.read_state().clone()
    }

    /// Derived counts for one session
    pub fn stats(&self, session_id: &SessionId) -> Result<SessionStats> {
        let state = self.read_state();
        let session = state
            .get(session_id)
            .ok_or_else(|| EnrollError::UnknownSession(session_id.to_string()))?;
        Ok(SessionStats::compute(session_id, session, &self.config.capacity))
    }

    /// Reload state from persistence
    ///
    /// Returns the layer that served the load, or `None` if another load was
    /// already in progress.
    pub fn refresh(&self) -> Option<Layer> {
        let _loading = LoadGuard::try_acquire(&self.loading)?;
        let _writer = self.lock_writer();

        let loaded = self.store.load();
        info!(
            "Loaded {} records from {} layer",
            loaded.state.record_count(),
            loaded.layer
        );
        *self.write_state() = loaded.state;
        Some(loaded.layer)
    }

    /// Administrative reset of one session, or of every session
    ///
    /// The in-memory state is restored if persisting the reset fails.
    pub fn clear_data(&self, session_id: Option<&SessionId>) -> Result<()> {
        let _writer = self.lock_writer();

        if let Some(id) = session_id {
            if self.read_state().get(id).is_none() {
                return Err(EnrollError::UnknownSession(id.to_string()));
            }
        }

        let previous = {
            let mut state = self.write_state();
            let previous = state.clone();
            match session_id {
                Some(id) => state.clear_session(id),
                None => state.clear_all(),
            }
            previous
        };

        if let Err(err) = self.store.clear(session_id) {
            self.store.save_local(&previous);
            *self.write_state() = previous;
            return Err(err.with_context("Reset was not saved"));
        }

        match session_id {
            Some(id) => info!("Cleared session {}", id),
            None => info!("Cleared all sessions"),
        }
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, MultiSessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, MultiSessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds the in-progress flag of a load; released on drop
struct LoadGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            info!("Load already in progress, skipping");
            return None;
        }
        Some(Self { flag })
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
