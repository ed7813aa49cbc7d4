// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Interception configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorContext, Result};
use crate::protocol::ErrorReason;

/// Interception configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct InterceptConfig {
    /// Reason token sent by both `abort()` and `fail()`
    pub error_reason: ErrorReason,
    /// Status used by `fulfill()` when none is given
    pub default_status: u16,
    /// Log every decision at info level
    pub log_decisions: bool,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            error_reason: ErrorReason::Failed,
            default_status: 200,
            log_decisions: false,
        }
    }
}

impl InterceptConfig {
    /// Create a new config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure reason token
    pub fn error_reason(mut self, reason: ErrorReason) -> Self {
        self.error_reason = reason;
        self
    }

    /// Set the default fulfill status
    pub fn default_status(mut self, status: u16) -> Self {
        self.default_status = status;
        self
    }

    /// Enable/disable info-level decision logs
    pub fn log_decisions(mut self, enabled: bool) -> Self {
        self.log_decisions = enabled;
        self
    }

    /// Check values
    pub fn validate(&self) -> Result<()> {
        if !(100..=599).contains(&self.default_status) {
            return Err(Error::Config(format!(
                "default_status {} is not a valid HTTP status",
                self.default_status
            )));
        }
        Ok(())
    }

    /// Load from a JSON file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).context(&format!("reading {}", path.display()))?;
        let config: InterceptConfig =
            serde_json::from_str(&raw).context(&format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config for scanners that block traffic on the client side
    pub fn for_blocking() -> Self {
        Self {
            error_reason: ErrorReason::BlockedByClient,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_builder() {
        let config = InterceptConfig::new()
            .error_reason(ErrorReason::Aborted)
            .default_status(204)
            .log_decisions(true);

        assert_eq!(config.error_reason, ErrorReason::Aborted);
        assert_eq!(config.default_status, 204);
        assert!(config.log_decisions);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_status_rejected() {
        let config = InterceptConfig::new().default_status(42);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"error_reason": "BlockedByClient"}}"#).unwrap();

        let config = InterceptConfig::from_file(file.path()).unwrap();
        assert_eq!(config.error_reason, ErrorReason::BlockedByClient);
        assert_eq!(config.default_status, 200);
        assert_eq!(config, InterceptConfig::for_blocking());
    }

    #[test]
    fn test_from_file_missing() {
        let err = InterceptConfig::from_file("/nonexistent/intercept.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
