//! Error types for the delayed locker.
//!
//! Lock-acquisition failure is not an error here: it is reported through
//! [`CompletionStatus::LockFailed`](crate::CompletionStatus::LockFailed)
//! after the worker has been joined.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockerError {
    /// The worker thread could not be created. The task record was dropped
    /// together with the rejected closure.
    #[error("failed to spawn worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("worker '{name}' panicked before reporting a status")]
    WorkerPanicked { name: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl LockerError {
    pub fn spawn(name: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True when the failure happened before any worker existed.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }
}
