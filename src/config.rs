//! Configuration System
//!
//! Layered configuration for the console and the stack worker: built-in defaults, a
//! global user file, workspace files, then `CLI_BRIDGE__SECTION__KEY` environment
//! overrides. Validation collects every problem instead of stopping at the first.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Operator console settings
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Stack worker settings
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Operator console configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Lines starting with this token run against the local command table
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Prompt shown while awaiting input
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Maximum accepted line length in bytes
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Number of history entries retained
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    /// Local command name that forwards its arguments to the stack
    #[serde(default = "default_command_name")]
    pub command_name: String,

    /// Force plain line reading even on a terminal
    #[serde(default)]
    pub dumb_mode: bool,
}

fn default_prefix() -> String {
    "esp ".to_string()
}

fn default_prompt() -> String {
    "> ".to_string()
}

fn default_max_line_len() -> usize {
    256
}

fn default_history_len() -> usize {
    100
}

fn default_command_name() -> String {
    "stack".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            prompt: default_prompt(),
            max_line_len: default_max_line_len(),
            history_len: default_history_len(),
            command_name: default_command_name(),
            dumb_mode: false,
        }
    }
}

/// Stack worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Name used in operator messages ("<context> task is busy")
    #[serde(default = "default_context")]
    pub context: String,

    /// Worker thread name
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Bounded queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Prompt the stack prints after each command; filtered from output
    #[serde(default = "default_prompt")]
    pub prompt_token: String,

    /// Upper bound on waiting for a command to complete; unset waits forever
    #[serde(default)]
    pub completion_timeout_ms: Option<u64>,
}

fn default_context() -> String {
    "Network".to_string()
}

fn default_thread_name() -> String {
    "stack-worker".to_string()
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            thread_name: default_thread_name(),
            queue_capacity: default_queue_capacity(),
            prompt_token: default_prompt(),
            completion_timeout_ms: None,
        }
    }
}

impl WorkerConfig {
    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Console(String),
    Worker(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Console(msg) => write!(f, "Console: {}", msg),
            ValidationError::Worker(msg) => write!(f, "Worker: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ConsoleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.prefix.is_empty() {
            return Err("prefix cannot be empty".to_string());
        }
        if self.max_line_len == 0 {
            return Err("max_line_len must be at least 1".to_string());
        }
        if self.prefix.len() >= self.max_line_len {
            return Err(format!(
                "prefix ({} bytes) must be shorter than max_line_len ({})",
                self.prefix.len(),
                self.max_line_len
            ));
        }
        if self.command_name.trim().is_empty() || self.command_name.contains(char::is_whitespace) {
            return Err(format!("invalid command_name '{}'", self.command_name));
        }
        Ok(())
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.queue_capacity == 0 {
            return Err("queue_capacity must be at least 1".to_string());
        }
        if self.thread_name.is_empty() {
            return Err("thread_name cannot be empty".to_string());
        }
        if self.completion_timeout_ms == Some(0) {
            return Err("completion_timeout_ms must be positive when set".to_string());
        }
        Ok(())
    }
}

impl BridgeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.console.validate() {
            errors.push(ValidationError::Console(e));
        }
        if let Err(e) = self.worker.validate() {
            errors.push(ValidationError::Worker(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
