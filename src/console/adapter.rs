//! Console adapter: exposes the stack through a local command, and gives programs a
//! direct way to run either kind of command.

use super::classify::truncate_to;
use super::registry::{CommandRegistry, CommandSpec};
use super::{report_local, run_on_worker, Outcome};
use crate::dispatch::CliDispatcher;
use crate::error::RegistryError;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, warn};

/// Join `parts` with single spaces, keeping at most `capacity` bytes.
///
/// Parts are appended in order until the buffer is full; the part that overflows is cut
/// at a character boundary and everything after it is dropped.
pub fn join_bounded(parts: &[&str], capacity: usize) -> String {
    let mut buf = String::with_capacity(capacity.min(1024));
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            if buf.len() == capacity {
                break;
            }
            buf.push(' ');
        }
        let room = capacity - buf.len();
        let piece = truncate_to(part, room);
        buf.push_str(piece);
        if piece.len() < part.len() {
            break;
        }
    }
    buf
}

/// Binds a registry and a dispatcher under one forwarding command name
pub struct ConsoleAdapter {
    registry: Arc<CommandRegistry>,
    dispatcher: Arc<CliDispatcher>,
    command_name: String,
}

impl ConsoleAdapter {
    pub fn new(
        registry: Arc<CommandRegistry>,
        dispatcher: Arc<CliDispatcher>,
        command_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            command_name: command_name.into(),
        }
    }

    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// Register the forwarding command. Its handler always exits 0; refusals are
    /// printed, not returned.
    pub fn register(&self) -> Result<(), RegistryError> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let name = self.command_name.clone();
        let capacity = self.dispatcher.max_line_len().saturating_sub(1);
        let spec = CommandSpec::new(
            self.command_name.clone(),
            format!("Execute `{} ...` to run a stack command", self.command_name),
            move |argv, out| {
                if argv.len() < 2 {
                    if let Err(e) = writeln!(out, "Usage: {} <command> [args...]", name) {
                        warn!("Failed to write console output: {}", e);
                    }
                    return 0;
                }
                let line = join_bounded(&argv[1..], capacity);
                run_on_worker(&dispatcher, &line, out);
                0
            },
        )
        .with_hint("<command> [args...]");
        self.registry.register(spec)
    }

    pub fn unregister(&self) -> Result<(), RegistryError> {
        self.registry.unregister(&self.command_name)
    }

    /// Run `name args...` directly: a registered local command runs through the
    /// registry, anything else goes to the worker.
    pub fn execute(&self, name: &str, args: &[&str], out: &mut dyn Write) -> Outcome {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(name);
        argv.extend_from_slice(args);

        if self.registry.contains(name) {
            debug!(command = %name, "Executing local command");
            let result = self.registry.run_args(&argv, out);
            return Outcome::Local(report_local(result, out));
        }

        let capacity = self.dispatcher.max_line_len().saturating_sub(1);
        let line = join_bounded(&argv, capacity);
        if line.trim().is_empty() {
            return Outcome::Discarded;
        }
        debug!(command = %name, "Executing stack command");
        Outcome::Worker(run_on_worker(&self.dispatcher, &line, out))
    }
}
