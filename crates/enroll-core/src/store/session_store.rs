//! Session state store: layered load, local-first save with durable retries

use super::{FallbackChain, Layer, RetryPolicy, StateRepository};
use crate::error::Result;
use crate::session::MultiSessionState;
use crate::types::{ParticipantId, SessionId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State returned by [`SessionStore::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub state: MultiSessionState,
    /// Layer that produced `state`
    pub layer: Layer,
}

/// Persistence for the multi-session state
///
/// Reads go durable store first, then local cache, then an empty default.
/// Writes always go to the local cache first (best effort), then to the
/// durable store with retries. Without a durable store the local cache is
/// the only copy, so its write errors are returned.
pub struct SessionStore {
    remote: Option<Arc<dyn StateRepository>>,
    local: Arc<dyn StateRepository>,
    retry: RetryPolicy,
    sessions: Vec<SessionId>,
}

impl SessionStore {
    pub fn new(
        remote: Option<Arc<dyn StateRepository>>,
        local: Arc<dyn StateRepository>,
        retry: RetryPolicy,
        sessions: Vec<SessionId>,
    ) -> Self {
        Self {
            remote,
            local,
            retry,
            sessions,
        }
    }

    /// Store with only the local layer
    pub fn local_only(
        local: Arc<dyn StateRepository>,
        retry: RetryPolicy,
        sessions: Vec<SessionId>,
    ) -> Self {
        Self::new(None, local, retry, sessions)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn chain(&self) -> FallbackChain {
        let mut chain = FallbackChain::default();
        match &self.remote {
            Some(remote) => chain.push(Arc::clone(remote)),
            None => debug!("Durable store not configured, reading local cache"),
        }
        chain.push(Arc::clone(&self.local));
        chain
    }

    /// Load the state, never failing
    pub fn load(&self) -> Loaded {
        match self.chain().load() {
            Ok(served) => {
                let mut state = served.value;
                state.ensure_sessions(&self.sessions);
                Loaded {
                    state,
                    layer: served.layer,
                }
            }
            Err(err) => {
                warn!("No persistence layer could be read, starting empty: {}", err);
                Loaded {
                    state: MultiSessionState::with_sessions(&self.sessions),
                    layer: Layer::Default,
                }
            }
        }
    }

    /// Persist the full state
    pub fn save(&self, state: &MultiSessionState) -> Result<()> {
        let local_result = self.local.save(state);

        let Some(remote) = &self.remote else {
            return local_result;
        };
        if let Err(err) = local_result {
            warn!("Local cache write failed: {}", err);
        }

        self.retry.run("Durable store save", || remote.save(state))?;
        info!("Saved {} records to durable store", state.record_count());
        Ok(())
    }

    /// Write the local cache only; failures are logged
    pub fn save_local(&self, state: &MultiSessionState) {
        if let Err(err) = self.local.save(state) {
            warn!("Local cache write failed: {}", err);
        }
    }

    /// Delete one participant from the durable store
    ///
    /// Compensates a save that failed after some collections were already
    /// written. A no-op without a durable store.
    pub fn discard(&self, id: &ParticipantId) -> Result<()> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };
        self.retry.run("Durable store remove", || remote.remove(id))?;
        debug!("Discarded record {} from durable store", id);
        Ok(())
    }

    /// Delete one session's records, or all records, from every layer
    pub fn clear(&self, session: Option<&SessionId>) -> Result<()> {
        let local_result = self.local.clear(session);

        let Some(remote) = &self.remote else {
            return local_result;
        };
        if let Err(err) = local_result {
            warn!("Local cache clear failed: {}", err);
        }

        self.retry.run("Durable store clear", || remote.clear(session))
    }
}
