//! Integration tests for the console adapter command and direct execution

use super::test_utils::{recording_worker, spawn_worker};
use cli_bridge::console::{
    join_bounded, CommandRegistry, CommandSpec, ConsoleAdapter, LocalOutcome, Outcome,
    WorkerOutcome,
};
use cli_bridge::dispatch::CliDispatcher;
use cli_bridge::error::RegistryError;
use cli_bridge::worker::SimulatedStack;
use std::sync::Arc;

fn adapter_with_recorder(
    max_line_len: usize,
) -> (
    ConsoleAdapter,
    Arc<CommandRegistry>,
    Arc<CliDispatcher>,
    Arc<parking_lot::Mutex<Vec<String>>>,
    cli_bridge::worker::Worker,
) {
    let (worker, seen) = recording_worker(4);
    let dispatcher = Arc::new(CliDispatcher::new(worker.queue(), max_line_len));
    let registry = Arc::new(CommandRegistry::new());
    let adapter = ConsoleAdapter::new(Arc::clone(&registry), Arc::clone(&dispatcher), "stack");
    adapter.register().unwrap();
    (adapter, registry, dispatcher, seen, worker)
}

#[test]
fn test_adapter_command_joins_arguments() {
    let (_adapter, registry, _dispatcher, seen, _worker) = adapter_with_recorder(256);
    let mut out: Vec<u8> = Vec::new();

    let code = registry.run("stack ping 'fd00::1' 64", &mut out).unwrap();
    assert_eq!(code, 0);
    assert_eq!(*seen.lock(), vec!["ping fd00::1 64".to_string()]);
    assert!(out.is_empty());
}

#[test]
fn test_adapter_truncates_to_line_buffer() {
    let (_adapter, registry, _dispatcher, seen, _worker) = adapter_with_recorder(10);
    let mut out: Vec<u8> = Vec::new();

    registry.run("stack abcd efgh ijkl", &mut out).unwrap();
    // Nine bytes fit: max_line_len minus one.
    assert_eq!(*seen.lock(), vec!["abcd efgh".to_string()]);
    assert_eq!(join_bounded(&["abcd", "efgh", "ijkl"], 9), "abcd efgh");
}

#[test]
fn test_adapter_busy_still_exits_zero() {
    let (_adapter, registry, dispatcher, seen, _worker) = adapter_with_recorder(256);
    let held = dispatcher.completion().register_waiter().unwrap();

    let mut out: Vec<u8> = Vec::new();
    let code = registry.run("stack state", &mut out).unwrap();
    dispatcher.completion().clear_waiter(&held);

    assert_eq!(code, 0);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Network task is busy, failed to run command: state\n"
    );
    assert!(seen.lock().is_empty());
}

#[test]
fn test_adapter_without_arguments_prints_usage() {
    let (_adapter, registry, dispatcher, _seen, _worker) = adapter_with_recorder(256);
    let mut out: Vec<u8> = Vec::new();

    assert_eq!(registry.run("stack", &mut out), Ok(0));
    assert!(String::from_utf8(out).unwrap().starts_with("Usage: stack"));
    assert_eq!(dispatcher.queue().stats().posted, 0);
}

#[test]
fn test_unregister_removes_command() {
    let (adapter, registry, _dispatcher, _seen, _worker) = adapter_with_recorder(256);
    adapter.unregister().unwrap();
    assert!(!registry.contains("stack"));
    assert_eq!(
        adapter.unregister(),
        Err(RegistryError::NotFound("stack".to_string()))
    );
    // Registering again after removal works.
    adapter.register().unwrap();
    assert!(registry.contains("stack"));
}

#[test]
fn test_execute_prefers_registered_commands() {
    let (adapter, registry, _dispatcher, seen, _worker) = adapter_with_recorder(256);
    registry
        .register(CommandSpec::new("fail", "Always fails", |_, _| 0x103))
        .unwrap();
    let mut out: Vec<u8> = Vec::new();

    assert_eq!(
        adapter.execute("fail", &[], &mut out),
        Outcome::Local(LocalOutcome::NonZero(0x103))
    );
    assert_eq!(
        adapter.execute("stack", &["ifconfig", "up"], &mut out),
        Outcome::Local(LocalOutcome::Success)
    );
    assert_eq!(
        adapter.execute("thread", &["start"], &mut out),
        Outcome::Worker(WorkerOutcome::Completed)
    );
    assert_eq!(
        *seen.lock(),
        vec!["ifconfig up".to_string(), "thread start".to_string()]
    );
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Command returned non-zero error code: 0x103 (ERR_INVALID_STATE)\n"
    );
}

#[test]
fn test_execute_against_simulated_stack() {
    let (worker, output) = spawn_worker(SimulatedStack::new(), 4);
    let dispatcher = Arc::new(CliDispatcher::new(worker.queue(), 256));
    let adapter = ConsoleAdapter::new(Arc::new(CommandRegistry::new()), dispatcher, "stack");
    let mut out: Vec<u8> = Vec::new();

    assert_eq!(
        adapter.execute("thread", &["start"], &mut out),
        Outcome::Worker(WorkerOutcome::Completed)
    );
    assert_eq!(output.text(), "Error 13: InvalidState\r\n");
}
