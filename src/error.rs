//! Error types for the CLI bridge.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while handing a line to the stack worker
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Out of memory while copying command line")]
    OutOfMemory,

    #[error("Command line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("Worker queue is full")]
    QueueFull,

    #[error("Worker is not running")]
    WorkerStopped,

    #[error("Another command is already waiting for the worker")]
    WaiterBusy,

    #[error("Worker did not complete the command within {0:?}")]
    CompletionTimeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Submission failures the console reports as a busy worker.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            BridgeError::OutOfMemory
                | BridgeError::LineTooLong { .. }
                | BridgeError::QueueFull
                | BridgeError::WorkerStopped
                | BridgeError::WaiterBusy
        )
    }
}

impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        BridgeError::ConfigError(err.to_string())
    }
}

/// Command registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Command is empty")]
    EmptyCommand,

    #[error("Command already registered: {0}")]
    AlreadyRegistered(String),

    #[error("{0}")]
    Internal(String),
}
