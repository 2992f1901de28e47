//! Line sources feeding the interactive loop.

use super::classify::truncate_to;
use super::history::History;
use dialoguer::theme::Theme;
use std::fmt;
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

/// Result of one read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    /// No input this time; prompt again
    Interrupted,
    /// Input is closed for good
    Eof,
}

/// Supplies one line of operator input per call.
///
/// `history` holds the lines the console accepted so far, for sources that offer
/// recall. Recording new lines stays with the console.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str, history: &History) -> ReadLine;
}

/// Plain line reader for pipes, files and terminals without line editing
pub struct ReaderLineSource<R, W> {
    reader: R,
    prompt_out: W,
    max_len: Option<usize>,
}

impl<R: BufRead, W: Write> ReaderLineSource<R, W> {
    pub fn new(reader: R, prompt_out: W) -> Self {
        Self {
            reader,
            prompt_out,
            max_len: None,
        }
    }

    /// Truncate lines longer than `max` bytes, like a line editor with a fixed buffer.
    pub fn with_max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }
}

impl ReaderLineSource<io::StdinLock<'static>, io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> LineSource for ReaderLineSource<R, W> {
    fn read_line(&mut self, prompt: &str, _history: &History) -> ReadLine {
        if let Err(e) = self
            .prompt_out
            .write_all(prompt.as_bytes())
            .and_then(|_| self.prompt_out.flush())
        {
            warn!("Failed to write prompt: {}", e);
        }

        // Invalid UTF-8 decodes to U+FFFD; the line still gets through.
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => ReadLine::Eof,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.trim_end_matches(['\r', '\n']);
                let line = match self.max_len {
                    Some(max) => truncate_to(line, max),
                    None => line,
                };
                ReadLine::Line(line.to_string())
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => ReadLine::Interrupted,
            Err(e) => {
                warn!("Failed to read input line: {}", e);
                ReadLine::Eof
            }
        }
    }
}

/// Renders the configured prompt verbatim
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptTheme;

impl Theme for PromptTheme {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        f.write_str(prompt)
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{}{}", prompt, sel)
    }
}

/// Read-only view of the console history for dialoguer's up/down recall
struct Recall<'a>(&'a History);

impl dialoguer::History<String> for Recall<'_> {
    fn read(&self, pos: usize) -> Option<String> {
        self.0.recent(pos).map(str::to_string)
    }

    fn write(&mut self, _val: &String) {}
}

/// Interactive terminal input through dialoguer, with history recall
#[derive(Debug, Default)]
pub struct TerminalLineSource {
    theme: PromptTheme,
}

impl TerminalLineSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LineSource for TerminalLineSource {
    fn read_line(&mut self, prompt: &str, history: &History) -> ReadLine {
        let mut recall = Recall(history);
        let result = dialoguer::Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .history_with(&mut recall)
            .interact_text();
        match result {
            Ok(line) => ReadLine::Line(line),
            Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => {
                ReadLine::Interrupted
            }
            Err(e) => {
                debug!("Terminal input closed: {}", e);
                ReadLine::Eof
            }
        }
    }
}
