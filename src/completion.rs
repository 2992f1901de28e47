//! Completion Signal Channel
//!
//! One-slot, single-waiter rendezvous between the console thread and the stack worker.
//! The console registers itself before posting a line, the worker signals once it has
//! finished that line, and the console blocks until the signal for *its* registration
//! arrives. Signals are latched per registration: one that lands before the wait is
//! still observed, and one that matches no registration is dropped.
//!
//! A caller that stops waiting early abandons its registration instead of clearing it.
//! The slot stays taken until the worker's signal for that registration arrives, so
//! at most one line is ever outstanding on the worker.

use crate::error::BridgeError;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Identifier of a single waiter registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(u64);

impl WaiterId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        WaiterId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Handle of the caller currently registered to receive a completion signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    id: WaiterId,
    thread: ThreadId,
}

impl Waiter {
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// Thread that registered this waiter
    pub fn thread(&self) -> ThreadId {
        self.thread
    }
}

#[derive(Debug)]
struct Slot {
    waiter: Waiter,
    signaled: bool,
    abandoned: bool,
}

/// Single-slot completion channel
#[derive(Debug, Default)]
pub struct CompletionChannel {
    slot: Mutex<Option<Slot>>,
    cond: Condvar,
}

impl CompletionChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the calling thread as the sole waiter.
    ///
    /// Fails with [`BridgeError::WaiterBusy`] while another registration is active;
    /// the existing registration is left untouched.
    pub fn register_waiter(&self) -> Result<Waiter, BridgeError> {
        let mut slot = self.slot.lock();
        if let Some(current) = slot.as_ref() {
            warn!(
                waiter_id = current.waiter.id.as_u64(),
                "Rejecting waiter registration, slot already taken"
            );
            return Err(BridgeError::WaiterBusy);
        }
        let waiter = Waiter {
            id: WaiterId::next(),
            thread: std::thread::current().id(),
        };
        *slot = Some(Slot {
            waiter,
            signaled: false,
            abandoned: false,
        });
        trace!(waiter_id = waiter.id.as_u64(), "Waiter registered");
        Ok(waiter)
    }

    /// Block until `waiter` has been signalled. No timeout.
    pub fn wait_for_signal(&self, waiter: &Waiter) {
        let mut slot = self.slot.lock();
        loop {
            match slot.as_ref() {
                Some(s) if s.waiter.id == waiter.id => {
                    if s.signaled {
                        return;
                    }
                }
                // Registration was cleared underneath us; nothing left to wait for.
                _ => return,
            }
            self.cond.wait(&mut slot);
        }
    }

    /// Bounded variant of [`wait_for_signal`](Self::wait_for_signal).
    ///
    /// Returns `true` if the signal arrived before `timeout` elapsed.
    pub fn wait_for_signal_timeout(&self, waiter: &Waiter, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        loop {
            match slot.as_ref() {
                Some(s) if s.waiter.id == waiter.id => {
                    if s.signaled {
                        return true;
                    }
                }
                _ => return false,
            }
            if self.cond.wait_until(&mut slot, deadline).timed_out() {
                return slot
                    .as_ref()
                    .map(|s| s.waiter.id == waiter.id && s.signaled)
                    .unwrap_or(false);
            }
        }
    }

    /// Wake `waiter` if it is the registered, still-pending waiter.
    ///
    /// A signal for an abandoned registration frees the slot. Returns whether the
    /// signal was delivered; anything else is a silent no-op.
    pub fn signal(&self, waiter: &Waiter) -> bool {
        let mut slot = self.slot.lock();
        let delivered = match slot.as_mut() {
            Some(s) if s.waiter.id == waiter.id && !s.signaled => {
                if s.abandoned {
                    *slot = None;
                    debug!(
                        waiter_id = waiter.id.as_u64(),
                        "Late completion released abandoned registration"
                    );
                } else {
                    s.signaled = true;
                }
                true
            }
            _ => false,
        };
        drop(slot);

        if delivered {
            self.cond.notify_all();
            trace!(waiter_id = waiter.id.as_u64(), "Waiter signalled");
        } else {
            debug!(
                waiter_id = waiter.id.as_u64(),
                "Dropping completion signal with no matching waiter"
            );
        }
        delivered
    }

    /// Deregister `waiter`. Leaves a different registration in place.
    pub fn clear_waiter(&self, waiter: &Waiter) {
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|s| s.waiter.id) == Some(waiter.id) {
            *slot = None;
            drop(slot);
            // Wake anyone still parked on this registration.
            self.cond.notify_all();
        }
    }

    /// Stop waiting for `waiter` without giving up the slot.
    ///
    /// The registration is released by the worker's signal, or right away if that
    /// signal has already landed.
    pub fn abandon_waiter(&self, waiter: &Waiter) {
        let mut slot = self.slot.lock();
        match slot.as_mut() {
            Some(s) if s.waiter.id == waiter.id => {
                if s.signaled {
                    *slot = None;
                } else {
                    s.abandoned = true;
                    debug!(
                        waiter_id = waiter.id.as_u64(),
                        "Registration abandoned while the worker is still busy"
                    );
                }
            }
            _ => {}
        }
    }

    /// Whether the registered waiter was abandoned and is waiting on the worker
    pub fn is_abandoned(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|s| s.abandoned)
    }

    /// Whether a waiter is currently registered
    pub fn has_waiter(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Currently registered waiter, if any
    pub fn current_waiter(&self) -> Option<Waiter> {
        self.slot.lock().as_ref().map(|s| s.waiter)
    }
}

/// Worker-side half of a registration: fires the completion signal exactly once.
///
/// Dropping an un-fired notifier signals as well, so a handler that unwinds never
/// leaves its caller blocked.
#[derive(Debug)]
pub struct CompletionNotifier {
    channel: Arc<CompletionChannel>,
    waiter: Waiter,
    fired: bool,
}

impl CompletionNotifier {
    pub fn new(channel: Arc<CompletionChannel>, waiter: Waiter) -> Self {
        Self {
            channel,
            waiter,
            fired: false,
        }
    }

    pub fn waiter(&self) -> Waiter {
        self.waiter
    }

    /// Signal completion to the registered waiter
    pub fn notify(mut self) -> bool {
        self.fired = true;
        self.channel.signal(&self.waiter)
    }
}

impl Drop for CompletionNotifier {
    fn drop(&mut self) {
        if !self.fired {
            debug!(
                waiter_id = self.waiter.id.as_u64(),
                "Completion notifier dropped before notify, signalling anyway"
            );
            self.channel.signal(&self.waiter);
        }
    }
}
