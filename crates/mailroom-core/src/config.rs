//! Configuration for Mailroom
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for Mailroom
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailroomConfig {
    /// Actor system configuration
    #[serde(default)]
    pub system: SystemConfig,

    /// Message board configuration
    #[serde(default)]
    pub board: BoardConfig,
}

impl MailroomConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::invalid_configuration("<json>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_configuration(path.display().to_string(), e.to_string())
        })?;
        Self::from_json_str(&json)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.system.validate()?;
        self.board.validate()?;
        Ok(())
    }
}

/// Actor system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Delay of the default inbound channel (ticks)
    #[serde(default = "default_channel_delay_ticks")]
    pub channel_delay_ticks: u32,

    /// Maximum mailbox depth per actor
    #[serde(default = "default_mailbox_depth")]
    pub mailbox_depth_max: usize,
}

fn default_channel_delay_ticks() -> u32 {
    CHANNEL_DELAY_TICKS_DEFAULT
}

fn default_mailbox_depth() -> usize {
    MAILBOX_DEPTH_MAX
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            channel_delay_ticks: default_channel_delay_ticks(),
            mailbox_depth_max: default_mailbox_depth(),
        }
    }
}

impl SystemConfig {
    fn validate(&self) -> Result<()> {
        if self.channel_delay_ticks > CHANNEL_DELAY_TICKS_MAX {
            return Err(Error::invalid_configuration(
                "system.channel_delay_ticks",
                format!(
                    "{} exceeds limit {}",
                    self.channel_delay_ticks, CHANNEL_DELAY_TICKS_MAX
                ),
            ));
        }

        if self.mailbox_depth_max == 0 || self.mailbox_depth_max > MAILBOX_DEPTH_MAX {
            return Err(Error::invalid_configuration(
                "system.mailbox_depth_max",
                format!("must be in 1..={}", MAILBOX_DEPTH_MAX),
            ));
        }

        Ok(())
    }
}

/// Message board configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of workers spawned by the dispatcher
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Longest accepted message body (characters)
    #[serde(default = "default_body_length_chars_max")]
    pub body_length_chars_max: usize,

    /// Idle ticks before a helper resends its store request
    #[serde(default = "default_helper_idle_ticks_max")]
    pub helper_idle_ticks_max: u32,

    /// Resends before a helper gives up
    #[serde(default = "default_helper_retries_max")]
    pub helper_retries_max: u32,
}

fn default_worker_count() -> usize {
    WORKERS_COUNT_DEFAULT
}

fn default_body_length_chars_max() -> usize {
    USER_MESSAGE_BODY_LENGTH_CHARS_MAX
}

fn default_helper_idle_ticks_max() -> u32 {
    HELPER_IDLE_TICKS_MAX
}

fn default_helper_retries_max() -> u32 {
    HELPER_RETRIES_COUNT_MAX
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            body_length_chars_max: default_body_length_chars_max(),
            helper_idle_ticks_max: default_helper_idle_ticks_max(),
            helper_retries_max: default_helper_retries_max(),
        }
    }
}

impl BoardConfig {
    /// Default configuration with a different worker count
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Self::default()
        }
    }

    /// Validate the board configuration
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 || self.worker_count > WORKERS_COUNT_MAX {
            return Err(Error::invalid_configuration(
                "board.worker_count",
                format!("{} not in 1..={}", self.worker_count, WORKERS_COUNT_MAX),
            ));
        }

        if self.helper_idle_ticks_max == 0 {
            return Err(Error::invalid_configuration(
                "board.helper_idle_ticks_max",
                "must be positive",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MailroomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.board.worker_count, 2);
        assert_eq!(config.board.body_length_chars_max, 10);
        assert_eq!(config.system.channel_delay_ticks, 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config = BoardConfig::with_workers(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("board.worker_count"));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = MailroomConfig::from_json_str(r#"{ "board": { "worker_count": 4 } }"#)
            .unwrap();

        assert_eq!(config.board.worker_count, 4);
        assert_eq!(config.board.helper_retries_max, HELPER_RETRIES_COUNT_MAX);
        assert_eq!(config.system, SystemConfig::default());
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let result = MailroomConfig::from_json_str(r#"{ "system": { "mailbox_depth_max": 0 } }"#);
        assert!(matches!(result, Err(Error::InvalidConfiguration { .. })));

        let result = MailroomConfig::from_json_str("not json");
        assert!(result.is_err());
    }
}
