//! Core type definitions for workshop-enroll

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a participant record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Generate a new ParticipantId
    pub fn generate() -> Self {
        ParticipantId(Uuid::new_v4().to_string())
    }

    /// Create from an existing string id
    pub fn from_string(s: impl Into<String>) -> Self {
        ParticipantId(s.into())
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a configured workshop session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create a SessionId, rejecting blank values
    pub fn from_string(s: impl Into<String>) -> crate::Result<Self> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::EnrollError::Validation(
                "Session id must not be empty".to_string(),
            ));
        }
        Ok(SessionId(trimmed.to_string()))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

/// Participant category used by the admission rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Limited-allocation class (quota spots)
    Quota,
    /// Majority-allocation class (non-quota spots)
    NonQuota,
}

impl Category {
    /// Map the stored flag to a category
    pub fn from_flag(needs_quota_category: bool) -> Self {
        if needs_quota_category {
            Category::Quota
        } else {
            Category::NonQuota
        }
    }

    /// Stored flag value
    pub fn is_quota(&self) -> bool {
        matches!(self, Category::Quota)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Quota => write!(f, "quota"),
            Category::NonQuota => write!(f, "non-quota"),
        }
    }
}

/// How a participant attends the workshop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceMode {
    #[default]
    Local,
    Remote,
}

impl std::str::FromStr for AttendanceMode {
    type Err = crate::EnrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AttendanceMode::Local),
            "remote" => Ok(AttendanceMode::Remote),
            other => Err(crate::EnrollError::Validation(format!(
                "Unknown attendance mode: {} (expected local or remote)",
                other
            ))),
        }
    }
}

impl fmt::Display for AttendanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceMode::Local => write!(f, "local"),
            AttendanceMode::Remote => write!(f, "remote"),
        }
    }
}

/// Schema version for persisted snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ProtocolVersion {
    pub const V1_0: Self = Self { major: 1, minor: 0 };
    pub const V2_0: Self = Self { major: 2, minor: 0 };

    /// Parse a `major.minor` string
    pub fn parse(s: &str) -> Option<Self> {
        let (major, minor) = s.split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Check if this version is compatible with another version
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
