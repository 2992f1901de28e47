//! CLI route: run context and command table. Wires config, worker, dispatcher and
//! console together, then dispatches the parsed subcommand.

use crate::cli::parse::{Commands, ConfigFormat};
use crate::config::{BridgeConfig, ConfigLoader};
use crate::console::{
    CommandRegistry, CommandSpec, Console, ConsoleAdapter, LineSource, LocalOutcome, Outcome,
    ReaderLineSource, TerminalLineSource, WorkerOutcome,
};
use crate::dispatch::CliDispatcher;
use crate::worker::{OutputSink, SimulatedStack, StackInterpreter, Worker};
use anyhow::{anyhow, bail, Context};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Runtime context for CLI execution: loaded config, the running worker and the
/// console services bound to it.
pub struct RunContext {
    config: BridgeConfig,
    registry: Arc<CommandRegistry>,
    dispatcher: Arc<CliDispatcher>,
    adapter: ConsoleAdapter,
    worker: Option<Worker>,
}

impl RunContext {
    /// Load configuration and start the simulated stack.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = load_config(&workspace_root, config_path.as_deref())?;
        let output = OutputSink::stdout(config.worker.prompt_token.clone());
        Self::with_stack(config, SimulatedStack::new(), output)
    }

    /// Validate `config` and start a worker around `stack`.
    pub fn with_stack<S>(config: BridgeConfig, stack: S, output: OutputSink) -> anyhow::Result<Self>
    where
        S: StackInterpreter + Send + 'static,
    {
        if let Err(errors) = config.validate() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("invalid configuration: {}", details.join("; "));
        }

        let worker =
            Worker::spawn(&config.worker, stack, output).context("starting stack worker")?;
        let dispatcher = Arc::new(CliDispatcher::from_config(
            worker.queue(),
            config.console.max_line_len,
            &config.worker,
        ));

        let registry = Arc::new(CommandRegistry::new());
        register_builtin_commands(&registry, &dispatcher)?;
        let adapter = ConsoleAdapter::new(
            Arc::clone(&registry),
            Arc::clone(&dispatcher),
            config.console.command_name.clone(),
        );
        adapter.register()?;

        debug!(commands = ?registry.names(), "Console commands ready");
        Ok(Self {
            config,
            registry,
            dispatcher,
            adapter,
            worker: Some(worker),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<CliDispatcher> {
        &self.dispatcher
    }

    /// Execute a subcommand, returning text for the caller to print.
    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Run => {
                self.run_console();
                Ok(String::new())
            }
            Commands::Exec { words } => self.handle_exec(words, &mut io::stdout()),
            Commands::Config { format } => self.render_config(*format),
        }
    }

    /// Drain the worker queue and stop the worker thread.
    pub fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(worker) = self.worker.take() {
            worker.shutdown().context("stopping stack worker")?;
        }
        Ok(())
    }

    fn run_console(&self) {
        let console = &self.config.console;
        if io::stdin().is_terminal() && !console.dumb_mode {
            info!("Starting console with terminal line editing");
            self.console_over(TerminalLineSource::new()).run();
        } else {
            info!("Starting console in plain line mode");
            let source = ReaderLineSource::stdin().with_max_len(console.max_line_len);
            self.console_over(source).run();
        }
    }

    fn console_over<S: LineSource>(&self, source: S) -> Console<S> {
        Console::new(
            source,
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
            self.config.console.clone(),
        )
    }

    fn handle_exec(&self, words: &[String], out: &mut dyn Write) -> anyhow::Result<String> {
        let (name, args) = words
            .split_first()
            .ok_or_else(|| anyhow!("exec needs a command"))?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match self.adapter.execute(name, &args, out) {
            Outcome::Local(LocalOutcome::Success)
            | Outcome::Worker(WorkerOutcome::Completed)
            | Outcome::Discarded
            | Outcome::Interrupted => Ok(String::new()),
            Outcome::Local(LocalOutcome::NonZero(code)) => {
                bail!("command '{}' exited with code 0x{:x}", name, code)
            }
            Outcome::Local(failure) => bail!("command '{}' failed: {:?}", name, failure),
            Outcome::Worker(WorkerOutcome::Busy) => {
                bail!("{} task is busy", self.dispatcher.context())
            }
            Outcome::Worker(WorkerOutcome::TimedOut) => {
                bail!("{} task did not finish in time", self.dispatcher.context())
            }
        }
    }

    fn render_config(&self, format: ConfigFormat) -> anyhow::Result<String> {
        let text = match format {
            ConfigFormat::Toml => toml::to_string_pretty(&self.config)
                .context("serializing configuration as TOML")?,
            ConfigFormat::Json => serde_json::to_string_pretty(&self.config)
                .context("serializing configuration as JSON")?,
        };
        Ok(text)
    }
}

fn load_config(workspace_root: &Path, config_path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ConfigLoader::load(workspace_root).with_context(|| {
            format!(
                "loading configuration for workspace {}",
                workspace_root.display()
            )
        })?,
    };
    Ok(config)
}

fn register_builtin_commands(
    registry: &CommandRegistry,
    dispatcher: &Arc<CliDispatcher>,
) -> anyhow::Result<()> {
    registry.register(CommandSpec::new(
        "version",
        "Print the bridge version",
        |_, out| {
            match writeln!(
                out,
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ) {
                Ok(()) => 0,
                Err(_) => crate::console::registry::ERR_FAIL,
            }
        },
    ))?;

    let dispatcher = Arc::clone(dispatcher);
    registry.register(CommandSpec::new(
        "queue",
        "Show stack worker queue statistics",
        move |_, out| {
            let stats = dispatcher.queue().stats();
            let written = writeln!(
                out,
                "posted: {}\nprocessed: {}\npending: {}\nrejected: {}\npanicked: {}",
                stats.posted,
                stats.processed,
                stats.pending(),
                stats.rejected,
                stats.panicked
            );
            match written {
                Ok(()) => 0,
                Err(_) => crate::console::registry::ERR_FAIL,
            }
        },
    ))?;
    Ok(())
}
