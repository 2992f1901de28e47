//! Interactive loop.

use super::classify::{classify, truncate_to, Route};
use super::history::History;
use super::line_source::{LineSource, ReadLine};
use super::registry::CommandRegistry;
use super::{report_local, run_on_worker, Outcome};
use crate::config::ConsoleConfig;
use crate::dispatch::CliDispatcher;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    AwaitingInput,
    Classifying,
    RunningLocalCommand,
    AwaitingWorkerCompletion,
}

/// Read-classify-execute loop over a [`LineSource`]
pub struct Console<S> {
    source: S,
    registry: Arc<CommandRegistry>,
    dispatcher: Arc<CliDispatcher>,
    history: History,
    config: ConsoleConfig,
    out: Box<dyn Write + Send>,
    state: ConsoleState,
}

impl<S: LineSource> Console<S> {
    pub fn new(
        source: S,
        registry: Arc<CommandRegistry>,
        dispatcher: Arc<CliDispatcher>,
        config: ConsoleConfig,
    ) -> Self {
        Self {
            source,
            registry,
            dispatcher,
            history: History::new(config.history_len),
            config,
            out: Box::new(io::stdout()),
            state: ConsoleState::AwaitingInput,
        }
    }

    /// Send console messages somewhere other than stdout
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Read and handle one line. `None` once the source is exhausted.
    pub fn step(&mut self) -> Option<Outcome> {
        self.state = ConsoleState::AwaitingInput;
        match self.source.read_line(&self.config.prompt, &self.history) {
            ReadLine::Line(line) => Some(self.handle_line(line)),
            ReadLine::Interrupted => Some(Outcome::Interrupted),
            ReadLine::Eof => None,
        }
    }

    /// Classify and execute one line of operator input.
    pub fn handle_line(&mut self, line: String) -> Outcome {
        self.state = ConsoleState::Classifying;
        let text = truncate_to(&line, self.config.max_line_len);
        if text.len() < line.len() {
            debug!(
                len = line.len(),
                max = self.config.max_line_len,
                "Truncated overlong input line"
            );
        }

        let outcome = match classify(text, &self.config.prefix) {
            Route::Empty => Outcome::Discarded,
            Route::Local(command) => {
                self.history.push(text);
                self.state = ConsoleState::RunningLocalCommand;
                let result = self.registry.run(command, &mut *self.out);
                Outcome::Local(report_local(result, &mut *self.out))
            }
            Route::Worker(command) => {
                self.history.push(text);
                self.state = ConsoleState::AwaitingWorkerCompletion;
                Outcome::Worker(run_on_worker(&self.dispatcher, command, &mut *self.out))
            }
        };
        self.state = ConsoleState::AwaitingInput;
        outcome
    }

    /// Run until the line source reports end of input.
    pub fn run(&mut self) {
        info!(prefix = %self.config.prefix, "Console started");
        let mut lines = 0u64;
        while self.step().is_some() {
            lines += 1;
        }
        info!(lines, "Console input closed");
    }
}
