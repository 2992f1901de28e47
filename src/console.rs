//! Operator console
//!
//! Reads lines, routes prefixed ones to the local [`CommandRegistry`] and hands the rest
//! to the stack worker through the [`CliDispatcher`], blocking until the worker is done.

pub mod adapter;
pub mod classify;
pub mod history;
pub mod line_source;
pub mod registry;
pub mod shell;

pub use adapter::{join_bounded, ConsoleAdapter};
pub use classify::{classify, truncate_to, Route};
pub use history::History;
pub use line_source::{LineSource, ReadLine, ReaderLineSource, TerminalLineSource};
pub use registry::{code_name, CommandHandler, CommandRegistry, CommandSpec};
pub use shell::{Console, ConsoleState};

use crate::dispatch::CliDispatcher;
use crate::error::{BridgeError, RegistryError};
use std::io::Write;
use tracing::{debug, warn};

/// What happened to one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Blank line, nothing ran
    Discarded,
    /// The line source was interrupted before producing a line
    Interrupted,
    Local(LocalOutcome),
    Worker(WorkerOutcome),
}

/// Result of a local command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    Success,
    NotFound,
    Empty,
    NonZero(i32),
    Internal(String),
}

/// Result of a worker hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed,
    /// Refused before reaching the worker
    Busy,
    TimedOut,
}

/// Print the operator message for a registry result.
pub(crate) fn report_local(result: Result<i32, RegistryError>, out: &mut dyn Write) -> LocalOutcome {
    let (outcome, message) = match result {
        Ok(0) => return LocalOutcome::Success,
        Ok(code) => (
            LocalOutcome::NonZero(code),
            format!(
                "Command returned non-zero error code: 0x{:x} ({})",
                code,
                code_name(code)
            ),
        ),
        Err(RegistryError::NotFound(name)) => {
            debug!(command = %name, "Unrecognized local command");
            (LocalOutcome::NotFound, "Unrecognized command".to_string())
        }
        Err(RegistryError::EmptyCommand) => (LocalOutcome::Empty, "Command is empty".to_string()),
        Err(e) => {
            let text = e.to_string();
            let message = format!("Internal error: {}", text);
            (LocalOutcome::Internal(text), message)
        }
    };
    if let Err(e) = writeln!(out, "{}", message) {
        warn!("Failed to write console output: {}", e);
    }
    outcome
}

/// Hand `line` to the worker, wait for it, and report a refusal.
pub(crate) fn run_on_worker(
    dispatcher: &CliDispatcher,
    line: &str,
    out: &mut dyn Write,
) -> WorkerOutcome {
    let (outcome, message) = match dispatcher.run_blocking(line) {
        Ok(()) => return WorkerOutcome::Completed,
        Err(BridgeError::CompletionTimeout(timeout)) => (
            WorkerOutcome::TimedOut,
            format!(
                "{} task did not finish within {} ms: {}",
                dispatcher.context(),
                timeout.as_millis(),
                line
            ),
        ),
        Err(e) => {
            if !e.is_busy() {
                warn!(error = %e, "Unexpected worker hand-off failure");
            }
            (WorkerOutcome::Busy, dispatcher.busy_message(line))
        }
    };
    if let Err(e) = writeln!(out, "{}", message) {
        warn!("Failed to write console output: {}", e);
    }
    outcome
}
