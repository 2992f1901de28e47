//! Shared test utilities for integration tests
//!
//! Environment isolation for configuration tests, plus a simple shared output buffer
//! and worker fixtures.

use cli_bridge::config::WorkerConfig;
use cli_bridge::worker::{OutputSink, StackInterpreter, Worker};
use parking_lot::Mutex as PlMutex;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serializes tests that touch process environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variables the config loader reads
const TRACKED_VARS: &[&str] = &[
    "XDG_CONFIG_HOME",
    "CLI_BRIDGE_ENV",
    "CLI_BRIDGE__CONSOLE__PREFIX",
    "CLI_BRIDGE__CONSOLE__HISTORY_LEN",
    "CLI_BRIDGE__WORKER__CONTEXT",
    "CLI_BRIDGE__WORKER__QUEUE_CAPACITY",
];

/// Run `f` with an isolated XDG config home and a clean set of bridge variables.
///
/// Original values are restored afterwards, even if `f` panics.
pub fn with_isolated_env<F, R>(f: F) -> R
where
    F: FnOnce(&TempDir) -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(&str, Option<String>)> = TRACKED_VARS
        .iter()
        .map(|name| (*name, std::env::var(name).ok()))
        .collect();

    let temp_dir = TempDir::new().unwrap();
    for name in TRACKED_VARS {
        std::env::remove_var(name);
    }
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path().join("xdg"));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(&temp_dir)));

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }

    match result {
        Ok(r) => r,
        Err(e) => std::panic::resume_unwind(e),
    }
}

/// Cloneable in-memory writer
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<PlMutex<Vec<u8>>>);

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn worker_config(capacity: usize) -> WorkerConfig {
    WorkerConfig {
        queue_capacity: capacity,
        thread_name: "integration-worker".to_string(),
        ..WorkerConfig::default()
    }
}

/// Start a worker around `stack`, capturing its output.
pub fn spawn_worker<S>(stack: S, capacity: usize) -> (Worker, SharedBuf)
where
    S: StackInterpreter + Send + 'static,
{
    let output = SharedBuf::default();
    let worker = Worker::spawn(
        &worker_config(capacity),
        stack,
        OutputSink::new(output.clone(), "> "),
    )
    .unwrap();
    (worker, output)
}

/// Start a worker whose stack records every line it receives.
pub fn recording_worker(capacity: usize) -> (Worker, Arc<PlMutex<Vec<String>>>) {
    let seen = Arc::new(PlMutex::new(Vec::new()));
    let stack = {
        let seen = Arc::clone(&seen);
        move |line: &str, _out: &mut OutputSink| seen.lock().push(line.to_string())
    };
    let (worker, _) = spawn_worker(stack, capacity);
    (worker, seen)
}
