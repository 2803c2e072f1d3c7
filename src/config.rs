//! TOML configuration for the locker and the harness binary.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LockerError;

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "delayed-locker";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockerConfig {
    /// Worker threads are named `<prefix>-<n>`.
    pub thread_name_prefix: String,
    pub wait_to_obtain_ms: u64,
    pub wait_to_release_ms: u64,
    pub stack_size: Option<usize>,
    pub log_filter: String,
}

impl Default for LockerConfig {
    fn default() -> Self {
        LockerConfig {
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            wait_to_obtain_ms: 0,
            wait_to_release_ms: 0,
            stack_size: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LockerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, LockerError> {
        let config: LockerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, LockerError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), LockerError> {
        if self.thread_name_prefix.trim().is_empty() {
            return Err(LockerError::config("thread_name_prefix must not be empty"));
        }
        // Thread names become C strings.
        if self.thread_name_prefix.contains('\0') {
            return Err(LockerError::config(
                "thread_name_prefix must not contain NUL bytes",
            ));
        }
        if self.stack_size == Some(0) {
            return Err(LockerError::config("stack_size must be greater than 0"));
        }
        Ok(())
    }

    pub fn wait_to_obtain(&self) -> Duration {
        Duration::from_millis(self.wait_to_obtain_ms)
    }

    pub fn wait_to_release(&self) -> Duration {
        Duration::from_millis(self.wait_to_release_ms)
    }
}
