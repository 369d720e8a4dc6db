//! enroll-core - Core library for workshop-enroll
//!
//! This crate provides the business logic for workshop enrollment: the
//! capacity and quota decision engine, the second-session eligibility gate,
//! session state with schema migration, and layered persistence with retries.

pub mod error;
pub mod types;
pub mod config;
pub mod session;
pub mod engine;
pub mod store;
pub mod service;

pub use error::{EnrollError, PersistenceFailure, Result};
pub use service::EnrollmentService;
pub use types::*;
