//! Integration tests for the interactive console loop

use super::test_utils::{recording_worker, spawn_worker, SharedBuf};
use cli_bridge::config::ConsoleConfig;
use cli_bridge::console::{
    CommandRegistry, CommandSpec, Console, ConsoleAdapter, LocalOutcome, Outcome,
    ReaderLineSource, WorkerOutcome,
};
use cli_bridge::dispatch::CliDispatcher;
use cli_bridge::worker::SimulatedStack;
use std::io::{self, Cursor, Write};
use std::sync::Arc;

fn script(lines: &str) -> ReaderLineSource<Cursor<String>, io::Sink> {
    ReaderLineSource::new(Cursor::new(lines.to_string()), io::sink())
}

#[test]
fn test_session_output_is_strictly_ordered() {
    let (worker, output) = spawn_worker(SimulatedStack::new(), 4);
    let dispatcher = Arc::new(CliDispatcher::new(worker.queue(), 256));
    let registry = Arc::new(CommandRegistry::new());
    registry
        .register(CommandSpec::new("mark", "Print a marker", |argv, out| {
            let _ = writeln!(out, "mark {}", argv[1..].join(" "));
            0
        }))
        .unwrap();

    let mut console = Console::new(
        script("esp mark 1\nifconfig up\nesp mark 2\nthread start\nstate\nesp mark 3\n"),
        Arc::clone(&registry),
        Arc::clone(&dispatcher),
        ConsoleConfig::default(),
    )
    .with_output(output.clone());
    console.run();

    assert_eq!(
        output.text(),
        "mark 1\nDone\r\nmark 2\nDone\r\nleader\r\nDone\r\nmark 3\n"
    );
    assert_eq!(dispatcher.queue().stats().posted, 3);
    assert_eq!(console.history().len(), 6);
}

#[test]
fn test_prefixed_line_never_reaches_worker() {
    let (worker, seen) = recording_worker(4);
    let dispatcher = Arc::new(CliDispatcher::new(worker.queue(), 256));
    let registry = Arc::new(CommandRegistry::new());
    let out = SharedBuf::default();

    let mut console = Console::new(
        script("esp state\n"),
        registry,
        Arc::clone(&dispatcher),
        ConsoleConfig::default(),
    )
    .with_output(out.clone());

    assert_eq!(console.step(), Some(Outcome::Local(LocalOutcome::NotFound)));
    assert_eq!(out.text(), "Unrecognized command\n");
    assert!(seen.lock().is_empty());
    assert_eq!(dispatcher.queue().stats().posted, 0);
    assert_eq!(console.step(), None);
}

#[test]
fn test_custom_prefix_routes_through_adapter() {
    let (worker, seen) = recording_worker(4);
    let dispatcher = Arc::new(CliDispatcher::new(worker.queue(), 256));
    let registry = Arc::new(CommandRegistry::new());
    ConsoleAdapter::new(Arc::clone(&registry), Arc::clone(&dispatcher), "ot")
        .register()
        .unwrap();

    let config = ConsoleConfig {
        prefix: "local ".to_string(),
        ..ConsoleConfig::default()
    };
    let mut console = Console::new(
        script("local ot   dataset   init new\nesp state\n"),
        registry,
        dispatcher,
        config,
    )
    .with_output(io::sink());

    assert_eq!(console.step(), Some(Outcome::Local(LocalOutcome::Success)));
    assert_eq!(
        console.step(),
        Some(Outcome::Worker(WorkerOutcome::Completed))
    );
    assert_eq!(
        *seen.lock(),
        vec!["dataset init new".to_string(), "esp state".to_string()]
    );
}

#[test]
fn test_history_evicts_oldest_after_capacity() {
    let (worker, _seen) = recording_worker(4);
    let dispatcher = Arc::new(CliDispatcher::new(worker.queue(), 256));
    let config = ConsoleConfig {
        history_len: 3,
        ..ConsoleConfig::default()
    };
    let mut console = Console::new(
        script("one\ntwo\n\nthree\nfour\n"),
        Arc::new(CommandRegistry::new()),
        dispatcher,
        config,
    )
    .with_output(io::sink());
    console.run();

    assert_eq!(
        console.history().iter().collect::<Vec<_>>(),
        vec!["two", "three", "four"]
    );
}

#[test]
fn test_busy_worker_message_uses_context_name() {
    let (worker, seen) = recording_worker(4);
    let dispatcher =
        Arc::new(CliDispatcher::new(worker.queue(), 256).with_context("Openthread"));
    let out = SharedBuf::default();
    let mut console = Console::new(
        script("thread start\n"),
        Arc::new(CommandRegistry::new()),
        Arc::clone(&dispatcher),
        ConsoleConfig::default(),
    )
    .with_output(out.clone());

    let held = dispatcher.completion().register_waiter().unwrap();
    assert_eq!(console.step(), Some(Outcome::Worker(WorkerOutcome::Busy)));
    dispatcher.completion().clear_waiter(&held);

    assert_eq!(
        out.text(),
        "Openthread task is busy, failed to run command: thread start\n"
    );
    assert!(seen.lock().is_empty());
}
