//! cli-bridge: operator console for a single-threaded network stack
//!
//! Lines typed at the console either run against a local command table (when they
//! start with the configured prefix) or are handed to the stack worker thread. A
//! hand-off blocks the console until the worker has executed the line and released it.

pub mod cli;
pub mod completion;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod worker;
