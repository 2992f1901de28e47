//! In-process stand-in for the managed network stack.
//!
//! Follows the stack CLI's conventions: a response body, then `Done` or
//! `Error <code>: <name>`, then the prompt.

use super::stack::{OutputSink, StackInterpreter};
use tracing::debug;

/// Device role as reported by `state`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Disabled,
    Detached,
    Leader,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Disabled => "disabled",
            Role::Detached => "detached",
            Role::Leader => "leader",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackError {
    InvalidArgs,
    InvalidState,
    InvalidCommand,
}

impl StackError {
    fn code(self) -> u8 {
        match self {
            StackError::InvalidArgs => 7,
            StackError::InvalidState => 13,
            StackError::InvalidCommand => 35,
        }
    }

    fn name(self) -> &'static str {
        match self {
            StackError::InvalidArgs => "InvalidArgs",
            StackError::InvalidState => "InvalidState",
            StackError::InvalidCommand => "InvalidCommand",
        }
    }
}

const COMMANDS: &[&str] = &["counters", "help", "ifconfig", "state", "thread", "version"];

/// A toy stack with an interface flag, a role and a command counter
#[derive(Debug, Clone)]
pub struct SimulatedStack {
    interface_up: bool,
    role: Role,
    commands_run: u64,
    errors: u64,
}

impl Default for SimulatedStack {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedStack {
    pub fn new() -> Self {
        Self {
            interface_up: false,
            role: Role::Disabled,
            commands_run: 0,
            errors: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn interface_up(&self) -> bool {
        self.interface_up
    }

    fn execute(&mut self, args: &[&str], out: &mut OutputSink) -> Result<(), StackError> {
        match args {
            ["state"] => {
                out.line(self.role.as_str());
                Ok(())
            }
            ["ifconfig"] => {
                out.line(if self.interface_up { "up" } else { "down" });
                Ok(())
            }
            ["ifconfig", "up"] => {
                self.interface_up = true;
                Ok(())
            }
            ["ifconfig", "down"] => {
                self.interface_up = false;
                self.role = Role::Disabled;
                Ok(())
            }
            ["thread", "start"] => {
                if !self.interface_up {
                    return Err(StackError::InvalidState);
                }
                // A lone node promotes itself straight to leader.
                self.role = Role::Leader;
                Ok(())
            }
            ["thread", "stop"] => {
                self.role = if self.interface_up {
                    Role::Detached
                } else {
                    Role::Disabled
                };
                Ok(())
            }
            ["counters"] => {
                out.line(&format!("commands: {}", self.commands_run));
                out.line(&format!("errors: {}", self.errors));
                Ok(())
            }
            ["version"] => {
                out.line(concat!("sim-stack/", env!("CARGO_PKG_VERSION")));
                Ok(())
            }
            ["help"] => {
                for name in COMMANDS {
                    out.line(name);
                }
                Ok(())
            }
            [name, ..] if COMMANDS.contains(name) => Err(StackError::InvalidArgs),
            _ => Err(StackError::InvalidCommand),
        }
    }
}

impl StackInterpreter for SimulatedStack {
    fn input_line(&mut self, line: &str, output: &mut OutputSink) {
        let args: Vec<&str> = line.split_whitespace().collect();
        self.commands_run += 1;
        debug!(command = ?args.first(), "Simulated stack executing");

        match self.execute(&args, output) {
            Ok(()) => output.line("Done"),
            Err(e) => {
                self.errors += 1;
                output.line(&format!("Error {}: {}", e.code(), e.name()));
            }
        }
        output.prompt();
    }
}
