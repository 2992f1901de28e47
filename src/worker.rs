//! Stack Worker
//!
//! A single dedicated thread that owns the network-stack interpreter and consumes a
//! bounded FIFO of work items. Anything that wants the stack to do something posts a
//! [`WorkItem`] through a [`TaskQueue`]; the worker runs items one at a time, in order.

pub mod sim;
pub mod stack;

pub use sim::SimulatedStack;
pub use stack::{OutputSink, StackInterpreter};

use crate::config::WorkerConfig;
use crate::error::BridgeError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// What a work item sees while it runs on the worker thread
pub struct StackContext<'a> {
    stack: &'a mut dyn StackInterpreter,
    output: &'a mut OutputSink,
}

impl<'a> StackContext<'a> {
    /// Feed one command line to the stack interpreter
    pub fn input_line(&mut self, line: &str) {
        self.stack.input_line(line, self.output);
    }

    pub fn output(&mut self) -> &mut OutputSink {
        self.output
    }
}

type Job = Box<dyn FnOnce(&mut StackContext<'_>) + Send + 'static>;

/// Handler function paired with an owned payload
pub type Handler<P> = fn(&mut StackContext<'_>, P);

/// A handler bound to the payload it will consume on the worker thread
pub struct WorkItem {
    job: Job,
}

impl WorkItem {
    /// Pair `handler` with `payload`. The payload moves to the worker and is
    /// dropped there once the handler returns.
    pub fn new<P: Send + 'static>(handler: Handler<P>, payload: P) -> Self {
        Self {
            job: Box::new(move |ctx: &mut StackContext<'_>| handler(ctx, payload)),
        }
    }

    fn run(self, ctx: &mut StackContext<'_>) {
        (self.job)(ctx)
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem").finish_non_exhaustive()
    }
}

enum Message {
    Run(WorkItem),
    Shutdown,
}

#[derive(Debug, Default)]
struct Counters {
    posted: AtomicU64,
    processed: AtomicU64,
    rejected: AtomicU64,
    panicked: AtomicU64,
}

/// Queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Items accepted by the queue
    pub posted: u64,
    /// Items the worker has finished running
    pub processed: u64,
    /// Items refused because the queue was full or the worker gone
    pub rejected: u64,
    /// Items whose handler panicked
    pub panicked: u64,
}

impl QueueStats {
    /// Items accepted but not yet finished
    pub fn pending(&self) -> u64 {
        self.posted.saturating_sub(self.processed)
    }
}

/// Producer side of the worker queue
#[derive(Clone)]
pub struct TaskQueue {
    sender: SyncSender<Message>,
    counters: Arc<Counters>,
}

impl TaskQueue {
    /// Post a work item without blocking.
    ///
    /// A refused item is dropped here together with its payload.
    pub fn post(&self, item: WorkItem) -> Result<(), BridgeError> {
        match self.sender.try_send(Message::Run(item)) {
            Ok(()) => {
                self.counters.posted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_rejected)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(pending = self.stats().pending(), "Worker queue full, rejecting item");
                Err(BridgeError::QueueFull)
            }
            Err(TrySendError::Disconnected(_rejected)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Worker stopped, rejecting item");
                Err(BridgeError::WorkerStopped)
            }
        }
    }

    /// Convenience for `post(WorkItem::new(handler, payload))`
    pub fn post_with<P: Send + 'static>(
        &self,
        handler: Handler<P>,
        payload: P,
    ) -> Result<(), BridgeError> {
        self.post(WorkItem::new(handler, payload))
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            posted: self.counters.posted.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Handle to the running worker thread
pub struct Worker {
    queue: TaskQueue,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl Worker {
    /// Start the worker thread with exclusive ownership of `stack` and `output`.
    pub fn spawn<S>(config: &WorkerConfig, stack: S, output: OutputSink) -> Result<Self, BridgeError>
    where
        S: StackInterpreter + Send + 'static,
    {
        if config.queue_capacity == 0 {
            return Err(BridgeError::ConfigError(
                "worker.queue_capacity must be at least 1".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::sync_channel(config.queue_capacity);
        let counters = Arc::new(Counters::default());

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn({
                let counters = Arc::clone(&counters);
                move || worker_loop(receiver, stack, output, counters)
            })?;

        info!(
            thread = %config.thread_name,
            capacity = config.queue_capacity,
            "Stack worker started"
        );

        Ok(Self {
            queue: TaskQueue { sender, counters },
            handle: Some(handle),
            name: config.thread_name.clone(),
        })
    }

    /// A producer handle for this worker's queue
    pub fn queue(&self) -> TaskQueue {
        self.queue.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run everything already queued, then stop the thread and wait for it.
    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<(), BridgeError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // Blocking send: shutdown waits behind queued items.
        if self.queue.sender.send(Message::Shutdown).is_err() {
            debug!("Worker already gone before shutdown");
        }
        handle.join().map_err(|_| BridgeError::WorkerStopped)?;
        info!(thread = %self.name, "Stack worker stopped");
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.stop_and_join() {
                error!("Failed to stop stack worker: {}", e);
            }
        }
    }
}

fn worker_loop<S: StackInterpreter>(
    receiver: Receiver<Message>,
    mut stack: S,
    mut output: OutputSink,
    counters: Arc<Counters>,
) {
    for message in receiver.iter() {
        let item = match message {
            Message::Run(item) => item,
            Message::Shutdown => break,
        };

        let mut ctx = StackContext {
            stack: &mut stack,
            output: &mut output,
        };
        if catch_unwind(AssertUnwindSafe(|| item.run(&mut ctx))).is_err() {
            counters.panicked.fetch_add(1, Ordering::Relaxed);
            error!("Work item panicked on stack worker");
        }
        counters.processed.fetch_add(1, Ordering::Relaxed);
    }
    debug!("Stack worker loop exited");
}
