//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("console.prefix", "esp ")?
        .set_default("console.prompt", "> ")?
        .set_default("console.max_line_len", 256_i64)?
        .set_default("console.history_len", 100_i64)?
        .set_default("console.command_name", "stack")?
        .set_default("worker.context", "Network")?
        .set_default("worker.thread_name", "stack-worker")?
        .set_default("worker.queue_capacity", 16_i64)
}
