//! enroll-storage - Storage library for workshop-enroll
//!
//! This crate provides the concrete stores behind the persistence layers:
//! a file system blob store for the local snapshot cache and an HTTP client
//! for the durable record store.

mod blob_store;
mod rest_store;

pub use blob_store::FileBlobStore;
pub use rest_store::RestRecordStore;

use enroll_core::config::EnrollConfig;
use enroll_core::error::Result;
use enroll_core::store::{
    RecordRepository, RetryPolicy, SessionStore, SnapshotRepository, StateRepository,
};
use std::sync::Arc;
use tracing::info;

/// Build the layered session store described by `config`
///
/// The local cache is always present. The durable store is added only when
/// `store.url` is set.
pub fn open_session_store(config: &EnrollConfig) -> Result<SessionStore> {
    let sessions = config.session_ids();

    let blobs = match &config.store.cache_dir {
        Some(dir) => FileBlobStore::new(dir)?,
        None => FileBlobStore::default_location()?,
    };
    let local: Arc<dyn StateRepository> =
        Arc::new(SnapshotRepository::new(blobs, sessions.clone()));

    let remote: Option<Arc<dyn StateRepository>> = if config.store.is_remote_configured() {
        let records = RestRecordStore::from_config(&config.store)?;
        info!("Using durable store at {}", records.base_url());
        let remote: Arc<dyn StateRepository> =
            Arc::new(RecordRepository::new(records, sessions.clone()));
        Some(remote)
    } else {
        info!("Durable store not configured, using local cache only");
        None
    };

    Ok(SessionStore::new(
        remote,
        local,
        RetryPolicy::from_config(&config.retry),
        sessions,
    ))
}
