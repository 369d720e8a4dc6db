//! Configuration management for workshop-enroll

use crate::error::{EnrollError, Result};
use crate::types::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollConfig {
    /// Capacity and quota limits, applied to every session
    pub capacity: CapacityConfig,
    /// Configured workshop sessions; the first one is the primary session
    pub sessions: SessionsConfig,
    /// Early-registration gate for a later session
    #[serde(default)]
    pub gate: Option<GateConfig>,
    /// Durable store and local cache settings
    pub store: StoreConfig,
    /// Save retry settings
    pub retry: RetryConfig,
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            capacity: CapacityConfig::default(),
            sessions: SessionsConfig::default(),
            gate: Some(GateConfig::default()),
            store: StoreConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl EnrollConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EnrollConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("Failed to load {}", path.display())))
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| EnrollError::Toml(e.to_string()))
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let cap = &self.capacity;
        if cap.max_capacity == 0 {
            return Err(EnrollError::Config("max_capacity must be positive".to_string()));
        }
        if cap.quota_spots + cap.non_quota_spots > cap.max_capacity {
            return Err(EnrollError::Config(format!(
                "quota_spots ({}) + non_quota_spots ({}) exceeds max_capacity ({})",
                cap.quota_spots, cap.non_quota_spots, cap.max_capacity
            )));
        }

        if self.sessions.list.is_empty() {
            return Err(EnrollError::Config("At least one session is required".to_string()));
        }
        let mut seen = HashSet::new();
        for session in &self.sessions.list {
            if session.id.as_str().trim().is_empty() {
                return Err(EnrollError::Config("Session id must not be empty".to_string()));
            }
            if !seen.insert(&session.id) {
                return Err(EnrollError::Config(format!(
                    "Duplicate session id: {}",
                    session.id
                )));
            }
        }

        if let Some(gate) = &self.gate {
            for id in [&gate.session_id, &gate.source_session_id] {
                if !seen.contains(id) {
                    return Err(EnrollError::Config(format!(
                        "Gate references unknown session: {}",
                        id
                    )));
                }
            }
            if gate.session_id == gate.source_session_id {
                return Err(EnrollError::Config(
                    "Gate session and source session must differ".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Ids of all configured sessions, in configuration order
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.list.iter().map(|s| s.id.clone()).collect()
    }

    /// The primary session (legacy records are assigned to it)
    pub fn primary_session(&self) -> Option<&SessionId> {
        self.sessions.list.first().map(|s| &s.id)
    }

    /// Look up a session descriptor
    pub fn session(&self, id: &SessionId) -> Option<&SessionDescriptor> {
        self.sessions.list.iter().find(|s| &s.id == id)
    }
}

/// Capacity and quota limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Total seats per session
    pub max_capacity: usize,
    /// Seats reserved for the quota category
    pub quota_spots: usize,
    /// Seats for the non-quota category
    pub non_quota_spots: usize,
    /// Highest waiting-queue rank that unlocks the gated session early
    pub max_waiting_queue_position: usize,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            max_capacity: 20,
            quota_spots: 3,
            non_quota_spots: 17,
            max_waiting_queue_position: 17,
        }
    }
}

/// Workshop session list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    #[serde(rename = "session")]
    pub list: Vec<SessionDescriptor>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            list: vec![
                SessionDescriptor {
                    id: SessionId::from("session-1"),
                    date: "2025-11-15".to_string(),
                    time_slot: "10:00-13:00".to_string(),
                },
                SessionDescriptor {
                    id: SessionId::from("session-2"),
                    date: "2025-11-29".to_string(),
                    time_slot: "10:00-13:00".to_string(),
                },
            ],
        }
    }
}

/// A scheduled workshop session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// Session identifier
    pub id: SessionId,
    /// Calendar date (YYYY-MM-DD)
    pub date: String,
    /// Time slot label
    pub time_slot: String,
}

/// Early-registration gate for a later session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// The restricted session
    pub session_id: SessionId,
    /// Session whose waiting queue grants eligibility
    pub source_session_id: SessionId,
    /// Instant after which the gate no longer applies
    pub cutoff: DateTime<Utc>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            session_id: SessionId::from("session-2"),
            source_session_id: SessionId::from("session-1"),
            cutoff: DateTime::parse_from_rfc3339("2025-11-22T00:00:00Z")
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }
}

/// Durable store and local cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the durable record store; unset means not configured
    pub url: Option<String>,
    /// API key sent with every durable store request
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Directory for the local snapshot cache
    pub cache_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 5,
            cache_dir: None,
        }
    }
}

impl StoreConfig {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether the durable store has enough settings to be used
    pub fn is_remote_configured(&self) -> bool {
        self.url.as_deref().map(|u| !u.trim().is_empty()).unwrap_or(false)
    }
}

/// Save retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EnrollConfig::default();
        assert_eq!(config.capacity.max_capacity, 20);
        assert_eq!(config.capacity.quota_spots, 3);
        assert_eq!(config.capacity.non_quota_spots, 17);
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.session_ids().len(), 2);
        assert_eq!(config.gate.as_ref().unwrap().session_id.as_str(), "session-2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = EnrollConfig::default();
        let toml = config.to_toml_string().unwrap();
        assert!(toml.contains("[capacity]"));
        assert!(toml.contains("[[sessions.session]]"));

        let config2 = EnrollConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.session_ids(), config2.session_ids());
    }

    #[test]
    fn test_parse_with_gate() {
        let toml = r#"
            [[sessions.session]]
            id = "a"
            date = "2025-01-01"
            time_slot = "morning"

            [[sessions.session]]
            id = "b"
            date = "2025-01-08"
            time_slot = "morning"

            [gate]
            session_id = "b"
            source_session_id = "a"
            cutoff = "2025-01-05T00:00:00Z"
        "#;
        let config = EnrollConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.primary_session().unwrap().as_str(), "a");
        let gate = config.gate.unwrap();
        assert_eq!(gate.session_id.as_str(), "b");
    }

    #[test]
    fn test_missing_gate_section_means_no_gate() {
        let toml = r#"
            [[sessions.session]]
            id = "only"
            date = "2025-01-01"
            time_slot = "evening"
        "#;
        let config = EnrollConfig::from_toml_str(toml).unwrap();
        assert!(config.gate.is_none());
        assert_eq!(config.capacity.max_capacity, 20);
    }

    #[test]
    fn test_validate_rejects_bad_gate() {
        let mut config = EnrollConfig::default();
        config.gate = Some(GateConfig {
            session_id: SessionId::from("session-9"),
            source_session_id: SessionId::from("session-1"),
            cutoff: Utc::now(),
        });
        assert!(matches!(config.validate(), Err(EnrollError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_overcommit() {
        let mut config = EnrollConfig::default();
        config.sessions.list[1].id = SessionId::from("session-1");
        assert!(config.validate().is_err());

        let mut config = EnrollConfig::default();
        config.capacity.quota_spots = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = EnrollConfig::load(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config.capacity.max_capacity, 20);
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = EnrollConfig::default();
        config.store.url = Some("https://store.example".to_string());
        fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = EnrollConfig::load(&path).unwrap();
        assert!(loaded.store.is_remote_configured());
    }
}
