use super::ConcurrencyChecking;
use crate::core::{Result, SyncError};
use serde::{Deserialize, Serialize};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// User recorded on concurrency faults
    pub user: String,

    /// Initial concurrency-checking mode of the session
    pub concurrency_checking: ConcurrencyChecking,

    /// Assert after each synchronizer step that the store and the identity
    /// map agree about the object. Only switch off to diagnose a failure.
    pub strict_agreement: bool,

    /// First value of the transient oid sequence
    pub transient_oid_start: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user: "__system".to_string(),
            concurrency_checking: ConcurrencyChecking::Check,
            strict_agreement: true,
            transient_oid_start: 1,
        }
    }
}

impl SessionConfig {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ..Self::default()
        }
    }

    /// Set the initial concurrency-checking mode
    pub fn concurrency_checking(mut self, mode: ConcurrencyChecking) -> Self {
        self.concurrency_checking = mode;
        self
    }

    /// Enable or disable the store/framework agreement check
    pub fn strict_agreement(mut self, strict: bool) -> Self {
        self.strict_agreement = strict;
        self
    }

    /// Set the first transient sequence value
    pub fn transient_oid_start(mut self, start: u64) -> Self {
        self.transient_oid_start = start;
        self
    }

    /// Parse from JSON; missing fields take their defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use objectsync::session::{ConcurrencyChecking, SessionConfig};
    ///
    /// let config = SessionConfig::from_json(r#"{"user": "ann", "concurrency_checking": "no_check"}"#).unwrap();
    /// assert_eq!(config.user, "ann");
    /// assert_eq!(config.concurrency_checking, ConcurrencyChecking::NoCheck);
    /// assert!(config.strict_agreement);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(SyncError::Config("user must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = SessionConfig::new("bob")
            .concurrency_checking(ConcurrencyChecking::NoCheck)
            .strict_agreement(false)
            .transient_oid_start(100);
        assert_eq!(config.user, "bob");
        assert_eq!(config.concurrency_checking, ConcurrencyChecking::NoCheck);
        assert!(!config.strict_agreement);
        assert_eq!(config.transient_oid_start, 100);
    }

    #[test]
    fn test_from_json_defaults() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            SessionConfig::from_json("{\"user\": 5}"),
            Err(SyncError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json("{\"user\": \"  \"}"),
            Err(SyncError::Config(_))
        ));
    }
}
