//! Local command table.
//!
//! Maps command names to synchronous handlers. Handlers receive the tokenized argv
//! (argv[0] is the command name) and an output writer, and return an exit code where 0
//! means success.

use crate::error::RegistryError;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

/// Generic failure
pub const ERR_FAIL: i32 = -1;
pub const ERR_NO_MEM: i32 = 0x101;
pub const ERR_INVALID_ARG: i32 = 0x102;
pub const ERR_INVALID_STATE: i32 = 0x103;
pub const ERR_INVALID_SIZE: i32 = 0x104;
pub const ERR_NOT_FOUND: i32 = 0x105;
pub const ERR_NOT_SUPPORTED: i32 = 0x106;
pub const ERR_TIMEOUT: i32 = 0x107;

/// Human-readable name for a handler exit code
pub fn code_name(code: i32) -> &'static str {
    match code {
        0 => "OK",
        ERR_FAIL => "FAIL",
        ERR_NO_MEM => "ERR_NO_MEM",
        ERR_INVALID_ARG => "ERR_INVALID_ARG",
        ERR_INVALID_STATE => "ERR_INVALID_STATE",
        ERR_INVALID_SIZE => "ERR_INVALID_SIZE",
        ERR_NOT_FOUND => "ERR_NOT_FOUND",
        ERR_NOT_SUPPORTED => "ERR_NOT_SUPPORTED",
        ERR_TIMEOUT => "ERR_TIMEOUT",
        _ => "UNKNOWN ERROR",
    }
}

/// Command handler: argv and output in, exit code out
pub type CommandHandler = Arc<dyn Fn(&[&str], &mut dyn Write) -> i32 + Send + Sync>;

/// One entry in the command table
#[derive(Clone)]
pub struct CommandSpec {
    pub name: String,
    pub help: String,
    pub hint: Option<String>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new<F>(name: impl Into<String>, help: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[&str], &mut dyn Write) -> i32 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            help: help.into(),
            hint: None,
            handler: Arc::new(handler),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("hint", &self.hint)
            .finish_non_exhaustive()
    }
}

/// Thread-safe command table with an optional built-in `help`
pub struct CommandRegistry {
    commands: RwLock<BTreeMap<String, CommandSpec>>,
    builtin_help: bool,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Empty registry with the built-in `help` command enabled
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(BTreeMap::new()),
            builtin_help: true,
        }
    }

    /// Empty registry without the built-in `help`
    pub fn without_help() -> Self {
        Self {
            commands: RwLock::new(BTreeMap::new()),
            builtin_help: false,
        }
    }

    /// Register a command. Names must be non-empty, whitespace-free and unique.
    pub fn register(&self, spec: CommandSpec) -> Result<(), RegistryError> {
        if spec.name.is_empty() || spec.name.contains(char::is_whitespace) {
            return Err(RegistryError::Internal(format!(
                "invalid command name '{}'",
                spec.name
            )));
        }
        let mut commands = self.commands.write();
        if commands.contains_key(&spec.name) {
            return Err(RegistryError::AlreadyRegistered(spec.name));
        }
        info!(command = %spec.name, "Registered console command");
        commands.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Remove a command
    pub fn unregister(&self, name: &str) -> Result<(), RegistryError> {
        match self.commands.write().remove(name) {
            Some(_) => {
                info!(command = %name, "Unregistered console command");
                Ok(())
            }
            None => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.read().contains_key(name)
    }

    /// Registered command names, sorted
    pub fn names(&self) -> Vec<String> {
        self.commands.read().keys().cloned().collect()
    }

    /// Tokenize `command_line` with shell quoting rules and run it.
    pub fn run(&self, command_line: &str, out: &mut dyn Write) -> Result<i32, RegistryError> {
        let argv = shlex::split(command_line)
            .ok_or_else(|| RegistryError::Internal("unbalanced quotes".to_string()))?;
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.run_args(&argv, out)
    }

    /// Run an already tokenized command.
    pub fn run_args(&self, argv: &[&str], out: &mut dyn Write) -> Result<i32, RegistryError> {
        let Some(name) = argv.first() else {
            return Err(RegistryError::EmptyCommand);
        };

        // Clone the handler out so it runs without the table lock held.
        let handler = self
            .commands
            .read()
            .get(*name)
            .map(|spec| Arc::clone(&spec.handler));
        let handler = match handler {
            Some(handler) => handler,
            None if self.builtin_help && *name == "help" => return Ok(self.write_help(out)),
            None => return Err(RegistryError::NotFound(name.to_string())),
        };

        debug!(command = %name, argc = argv.len(), "Running console command");
        Ok(handler(argv, out))
    }

    fn write_help(&self, out: &mut dyn Write) -> i32 {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Command", "Arguments", "Description"]);
        table.add_row(vec!["help", "", "Print the list of registered commands"]);
        for spec in self.commands.read().values() {
            table.add_row(vec![
                spec.name.as_str(),
                spec.hint.as_deref().unwrap_or(""),
                spec.help.as_str(),
            ]);
        }
        match writeln!(out, "{table}") {
            Ok(()) => 0,
            Err(_) => ERR_FAIL,
        }
    }
}
