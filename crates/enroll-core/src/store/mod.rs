//! Persistence abstractions
//!
//! State is persisted through layered repositories. Every layer implements
//! [`StateRepository`]; two adapters build layers from lower-level stores:
//!
//! - [`RecordRepository`] over a [`RecordStore`]: the durable, networked
//!   record collections (`enrolled`, `waiting_queue`).
//! - [`SnapshotRepository`] over a [`BlobStore`]: the local single-blob cache.
//!
//! [`FallbackChain`] reads through the layers in order and reports which one
//! served the request. [`SessionStore`] combines the layers with the save
//! policy: local snapshot first, then the durable store with retries.

mod fallback;
mod repository;
mod retry;
mod session_store;

#[cfg(test)]
pub mod memory;

pub use fallback::{FallbackChain, Served};
pub use repository::{RecordRepository, SnapshotRepository, SNAPSHOT_KEY};
pub use retry::RetryPolicy;
pub use session_store::{Loaded, SessionStore};

use crate::error::Result;
use crate::session::{MultiSessionState, ParticipantRecord};
use crate::types::{ParticipantId, SessionId};
use std::fmt;

/// Which persistence layer served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Durable, networked record store
    Remote,
    /// Local snapshot cache
    Local,
    /// Nothing could be read; empty in-memory state
    Default,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Remote => write!(f, "remote"),
            Layer::Local => write!(f, "local"),
            Layer::Default => write!(f, "default"),
        }
    }
}

/// A persistence layer holding the full multi-session state
pub trait StateRepository: Send + Sync {
    /// Layer this repository represents
    fn layer(&self) -> Layer;

    /// Read the full state
    fn load(&self) -> Result<MultiSessionState>;

    /// Write the full state
    fn save(&self, state: &MultiSessionState) -> Result<()>;

    /// Delete one session's records, or every record when `session` is None
    fn clear(&self, session: Option<&SessionId>) -> Result<()>;

    /// Delete a single participant record wherever it is stored
    ///
    /// Absent records are not an error.
    fn remove(&self, id: &ParticipantId) -> Result<()>;
}

/// Named record collection of the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Enrolled,
    WaitingQueue,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Enrolled, Collection::WaitingQueue];

    /// Collection name in the durable store
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Enrolled => "enrolled",
            Collection::WaitingQueue => "waiting_queue",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Durable record store contract
///
/// Implementations classify failures as [`crate::EnrollError::Network`]
/// (retryable) or [`crate::EnrollError::Backend`].
pub trait RecordStore: Send + Sync {
    /// All records of a collection, ordered by `created_at` ascending
    fn fetch(&self, collection: Collection) -> Result<Vec<ParticipantRecord>>;

    /// Insert or replace records by id
    fn upsert(&self, collection: Collection, records: &[ParticipantRecord]) -> Result<()>;

    /// Delete one session's records, or all records when `session` is None
    fn delete(&self, collection: Collection, session: Option<&SessionId>) -> Result<()>;

    /// Delete one record by id; absent records are not an error
    fn delete_record(&self, collection: Collection, id: &ParticipantId) -> Result<()>;
}

/// Key-value store for serialized blobs
pub trait BlobStore: Send + Sync {
    /// Read a blob, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write a blob, replacing any previous value
    fn write(&self, key: &str, value: &str) -> Result<()>;
}
