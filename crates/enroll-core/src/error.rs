//! Error types for workshop-enroll

use thiserror::Error;

/// Main error type for workshop-enroll
///
/// Admission rule rejections are not errors; they are reported through
/// [`crate::engine::EnrollOutcome::Rejected`]. This type covers lookups,
/// validation and persistence failures.
#[derive(Debug, Error)]
pub enum EnrollError {
    /// Durable store unreachable or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Durable store rejected the request (schema, constraint, auth)
    #[error("Backend error: {0}")]
    Backend(String),

    /// A storage layer has no configuration to work with
    #[error("Storage layer not configured: {0}")]
    NotConfigured(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(String),

    /// Session id not present in the configuration
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported snapshot schema version
    #[error("Unsupported schema version: {0}")]
    UnsupportedSchemaVersion(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EnrollError>,
    },
}

impl EnrollError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EnrollError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Strip any context wrappers
    pub fn root(&self) -> &EnrollError {
        match self {
            EnrollError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this failure is network-class (timeouts, unreachable store)
    pub fn is_network(&self) -> bool {
        matches!(self.root(), EnrollError::Network(_))
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        self.is_network()
    }

    /// Persistence failure class shown to callers
    pub fn persistence_class(&self) -> Option<PersistenceFailure> {
        match self.root() {
            EnrollError::Network(_) => Some(PersistenceFailure::Network),
            EnrollError::Backend(_)
            | EnrollError::NotConfigured(_)
            | EnrollError::Io(_)
            | EnrollError::Serde(_) => Some(PersistenceFailure::Backend),
            _ => None,
        }
    }
}

/// Classification of a failed save, so callers can word their message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceFailure {
    /// The store could not be reached; the action was not saved
    Network,
    /// The store answered with an error
    Backend,
}

impl PersistenceFailure {
    /// Human-facing explanation
    pub fn message(&self) -> &'static str {
        match self {
            PersistenceFailure::Network => {
                "Could not reach the enrollment store. Your registration was not saved, please try again."
            }
            PersistenceFailure::Backend => {
                "The enrollment store rejected the request. Your registration was not saved."
            }
        }
    }
}

impl From<toml::de::Error> for EnrollError {
    fn from(err: toml::de::Error) -> Self {
        EnrollError::Toml(err.to_string())
    }
}

/// Result type alias for workshop-enroll
pub type Result<T> = std::result::Result<T, EnrollError>;
