//! Stack interpreter seam and its output sink.

use std::io::{self, Write};
use tracing::{trace, warn};

/// The command interpreter of the managed network stack.
///
/// Only ever driven from the worker thread, so implementations need not be `Sync`.
pub trait StackInterpreter {
    /// Execute one command line, writing any response to `output`.
    fn input_line(&mut self, line: &str, output: &mut OutputSink);
}

impl<F> StackInterpreter for F
where
    F: FnMut(&str, &mut OutputSink),
{
    fn input_line(&mut self, line: &str, output: &mut OutputSink) {
        self(line, output)
    }
}

/// Where the stack writes its responses.
///
/// The stack prints its own prompt after every command; that prompt is swallowed
/// here so it does not interleave with the operator console's prompt.
pub struct OutputSink {
    writer: Box<dyn Write + Send>,
    prompt_token: String,
    prompts_seen: u64,
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static, prompt_token: impl Into<String>) -> Self {
        Self {
            writer: Box::new(writer),
            prompt_token: prompt_token.into(),
            prompts_seen: 0,
        }
    }

    pub fn stdout(prompt_token: impl Into<String>) -> Self {
        Self::new(io::stdout(), prompt_token)
    }

    /// Write raw text, dropping it if it starts with the prompt token.
    pub fn emit(&mut self, text: &str) {
        if !self.prompt_token.is_empty() && text.starts_with(&self.prompt_token) {
            self.prompts_seen += 1;
            trace!(prompts_seen = self.prompts_seen, "Swallowed stack prompt");
            return;
        }
        if let Err(e) = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush())
        {
            warn!("Failed to write stack output: {}", e);
        }
    }

    /// Write one line terminated by CRLF
    pub fn line(&mut self, text: &str) {
        self.emit(&format!("{}\r\n", text));
    }

    /// Emit the stack prompt (swallowed unless the token is empty)
    pub fn prompt(&mut self) {
        let token = self.prompt_token.clone();
        self.emit(&token);
    }

    /// How many prompts the stack has printed so far
    pub fn prompts_seen(&self) -> u64 {
        self.prompts_seen
    }
}
