//! Session state module
//!
//! A workshop session holds two ordered lists of participants: those
//! enrolled, in admission order, and those waiting, in queue order. This
//! module provides the in-memory model, derived stats, and the persisted
//! record shapes with their schema migration.

pub mod migration;
mod model;
mod stats;

// Re-export public API
pub use migration::{
    DecodedSnapshot, ParticipantRecord, RecordSet, SnapshotFile, SnapshotMigrator, SnapshotShape,
    CURRENT_SCHEMA_VERSION,
};
pub use model::{normalize_name, Candidate, MultiSessionState, Participant, Placement, SessionState};
pub use stats::SessionStats;
