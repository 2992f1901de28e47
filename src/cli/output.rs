//! CLI output: error mapping to a stable CLI surface.

/// Render an error and its causes on one line.
pub fn map_error(e: &anyhow::Error) -> String {
    format!("{:#}", e)
}
