//! Prefix routing: decide where a line goes.

/// Destination of one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Empty or whitespace-only; dropped without a trace
    Empty,
    /// Prefixed line; carries the remainder after the prefix
    Local(&'a str),
    /// Everything else; carries the whole line
    Worker(&'a str),
}

/// Classify `line` against a byte-exact leading `prefix`.
pub fn classify<'a>(line: &'a str, prefix: &str) -> Route<'a> {
    if line.trim().is_empty() {
        return Route::Empty;
    }
    if !prefix.is_empty() && line.as_bytes().starts_with(prefix.as_bytes()) {
        Route::Local(&line[prefix.len()..])
    } else {
        Route::Worker(line)
    }
}

/// Longest prefix of `line` that fits in `max` bytes without splitting a character.
pub fn truncate_to(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}
