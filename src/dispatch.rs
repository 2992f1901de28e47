//! CLI Dispatcher
//!
//! Hands operator command lines to the stack worker. Each line is copied into an owned
//! [`InputLine`] that moves into the work item; the worker drops it once the stack has
//! finished with it and only then fires the completion signal.

use crate::completion::{CompletionChannel, CompletionNotifier, Waiter};
use crate::config::WorkerConfig;
use crate::error::BridgeError;
use crate::worker::{StackContext, TaskQueue};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Owned copy of one command line, moved from the console to the worker
#[derive(PartialEq, Eq)]
pub struct InputLine(String);

impl InputLine {
    /// Copy `line` into a fresh buffer. Allocation failure is reported, not aborted on.
    pub fn copy_from(line: &str) -> Result<Self, BridgeError> {
        let mut buf = String::new();
        buf.try_reserve_exact(line.len())
            .map_err(|_| BridgeError::OutOfMemory)?;
        buf.push_str(line);
        Ok(Self(buf))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for InputLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InputLine").field(&self.0).finish()
    }
}

/// Payload of the execute-and-free work item
struct LineJob<L = InputLine> {
    line: L,
    notifier: Option<CompletionNotifier>,
}

/// Runs on the worker: execute the line, free it, then signal.
fn execute_line<L: AsRef<str>>(ctx: &mut StackContext<'_>, job: LineJob<L>) {
    let LineJob { line, notifier } = job;
    ctx.input_line(line.as_ref());
    drop(line);
    if let Some(notifier) = notifier {
        notifier.notify();
    }
}

/// Routes lines to the worker queue and owns the completion channel
pub struct CliDispatcher {
    queue: TaskQueue,
    completion: Arc<CompletionChannel>,
    max_line_len: usize,
    completion_timeout: Option<Duration>,
    context: String,
}

impl CliDispatcher {
    pub fn new(queue: TaskQueue, max_line_len: usize) -> Self {
        Self {
            queue,
            completion: Arc::new(CompletionChannel::new()),
            max_line_len,
            completion_timeout: None,
            context: "Network".to_string(),
        }
    }

    /// Build a dispatcher using the worker section of the config
    pub fn from_config(queue: TaskQueue, max_line_len: usize, config: &WorkerConfig) -> Self {
        Self::new(queue, max_line_len)
            .with_context(config.context.clone())
            .with_completion_timeout(config.completion_timeout())
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn completion(&self) -> &Arc<CompletionChannel> {
        &self.completion
    }

    /// Post `line` to the worker without waiting for it.
    pub fn submit(&self, line: &str) -> Result<(), BridgeError> {
        self.post_line(line, None)
    }

    /// Register the calling thread as waiter and post `line`.
    ///
    /// The waiter is published before the post, so a worker that finishes before the
    /// caller reaches [`Pending::wait`] is still observed. If the post fails the
    /// registration is withdrawn before returning. While an earlier line is still on
    /// the worker this fails with [`BridgeError::WaiterBusy`], even if its caller
    /// stopped waiting.
    pub fn submit_tracked(&self, line: &str) -> Result<Pending<'_>, BridgeError> {
        let waiter = self.completion.register_waiter()?;
        let notifier = CompletionNotifier::new(Arc::clone(&self.completion), waiter);

        if let Err(e) = self.post_line(line, Some(notifier)) {
            self.completion.clear_waiter(&waiter);
            return Err(e);
        }

        Ok(Pending {
            completion: &self.completion,
            waiter,
            timeout: self.completion_timeout,
            done: false,
        })
    }

    /// Post `line` and block until the worker has finished it.
    pub fn run_blocking(&self, line: &str) -> Result<(), BridgeError> {
        self.submit_tracked(line)?.wait()
    }

    /// Operator-facing message for a refused submission
    pub fn busy_message(&self, line: &str) -> String {
        format!(
            "{} task is busy, failed to run command: {}",
            self.context, line
        )
    }

    fn post_line(&self, line: &str, notifier: Option<CompletionNotifier>) -> Result<(), BridgeError> {
        if line.len() > self.max_line_len {
            return Err(BridgeError::LineTooLong {
                len: line.len(),
                max: self.max_line_len,
            });
        }
        let line = InputLine::copy_from(line)?;
        let len = line.len();

        // A refused job is dropped inside `post`, line and notifier included. The
        // notifier's drop-signal lands on a registration the caller withdraws next.
        let waiter = notifier.as_ref().map(|n| n.waiter().id().as_u64());
        let result = self
            .queue
            .post_with(execute_line::<InputLine>, LineJob { line, notifier });

        match &result {
            Ok(()) => debug!(len, waiter_id = ?waiter, "Line posted to worker"),
            Err(e) => warn!(len, error = %e, "Failed to post line to worker"),
        }
        result
    }
}

/// A submission in flight. Waiting consumes it; dropping it abandons the registration,
/// which keeps further submissions out until the worker finishes this one.
#[must_use = "a pending submission must be waited on"]
pub struct Pending<'a> {
    completion: &'a CompletionChannel,
    waiter: Waiter,
    timeout: Option<Duration>,
    done: bool,
}

impl Pending<'_> {
    pub fn waiter(&self) -> Waiter {
        self.waiter
    }

    /// Block until the worker signals, or until the configured timeout.
    pub fn wait(mut self) -> Result<(), BridgeError> {
        let result = match self.timeout {
            None => {
                self.completion.wait_for_signal(&self.waiter);
                Ok(())
            }
            Some(timeout) => {
                if self.completion.wait_for_signal_timeout(&self.waiter, timeout) {
                    Ok(())
                } else {
                    warn!(
                        waiter_id = self.waiter.id().as_u64(),
                        ?timeout,
                        "Gave up waiting for worker completion"
                    );
                    Err(BridgeError::CompletionTimeout(timeout))
                }
            }
        };
        if result.is_ok() {
            self.completion.clear_waiter(&self.waiter);
        } else {
            self.completion.abandon_waiter(&self.waiter);
        }
        self.done = true;
        result
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.completion.abandon_waiter(&self.waiter);
        }
    }
}
