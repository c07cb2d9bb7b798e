//! Flush Scheduling
//!
//! A write never runs effects itself. It queues them and, for the first
//! write after a drain, asks the host for a flush through the [`Scheduler`]
//! the runtime was built with. When and where that flush happens is the
//! host's decision:
//!
//! - [`ImmediateScheduler`] flushes synchronously inside the write.
//! - [`ManualScheduler`] keeps a FIFO of requests, drained by the host at a
//!   point of its choosing (the end of an event-loop turn, a frame, a test
//!   step).
//! - [`TokioScheduler`] spawns the flush on the current `LocalSet`, so it runs
//!   once the running task yields.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use super::runtime::{Runtime, RuntimeInner};
use crate::error::Result;
use crate::graph::EffectId;

/// Host-side strategy deciding when a requested flush runs.
pub trait Scheduler {
    /// Called once per batch, on the first write after the previous drain.
    fn request_flush(&self, handle: FlushHandle);
}

/// Lets a scheduler run the flush it was asked for.
///
/// Holds the runtime weakly; a flush after the runtime is gone does nothing.
#[derive(Clone)]
pub struct FlushHandle {
    runtime: Weak<RuntimeInner>,
}

impl FlushHandle {
    pub(crate) fn new(runtime: Weak<RuntimeInner>) -> Self {
        Self { runtime }
    }

    pub fn flush(&self) -> Result<FlushReport> {
        match self.runtime.upgrade() {
            Some(inner) => Runtime::from_inner(inner).flush(),
            None => {
                debug!("flush requested after runtime was dropped");
                Ok(FlushReport::default())
            }
        }
    }
}

impl std::fmt::Debug for FlushHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushHandle")
            .field("alive", &(self.runtime.strong_count() > 0))
            .finish()
    }
}

/// Outcome of one or more flush passes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Passes executed. A pass drains the queue as it was when it started.
    pub passes: usize,
    /// Effects that ran to completion.
    pub ran: usize,
    /// Queued effects that were disposed before their turn.
    pub skipped: usize,
    /// Effects whose body panicked (only with failure isolation on).
    pub failed: Vec<EffectId>,
}

impl FlushReport {
    pub(crate) fn absorb(&mut self, other: FlushReport) {
        self.passes += other.passes;
        self.ran += other.ran;
        self.skipped += other.skipped;
        self.failed.extend(other.failed);
    }
}

/// Flushes synchronously inside the write that requested it.
///
/// Handy for tests and for hosts without an event loop. Batching still
/// applies to writes made while a flush is already running.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn request_flush(&self, handle: FlushHandle) {
        if let Err(err) = handle.flush() {
            error!(%err, "immediate flush failed");
        }
    }
}

/// Queues flush requests until the host drains them.
///
/// Clones share the same request queue, so the host can keep one clone and
/// hand the other to [`Runtime::new`].
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    requests: Rc<RefCell<VecDeque<FlushHandle>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flush requests waiting to be drained.
    pub fn pending_requests(&self) -> usize {
        self.requests.borrow().len()
    }

    /// Run requested flushes until none are left, including requests made by
    /// the flushes themselves.
    ///
    /// Stops at the first failed flush; later requests stay queued.
    pub fn run_until_idle(&self) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        loop {
            let Some(handle) = self.requests.borrow_mut().pop_front() else {
                break;
            };
            report.absorb(handle.flush()?);
        }
        Ok(report)
    }
}

impl Scheduler for ManualScheduler {
    fn request_flush(&self, handle: FlushHandle) {
        self.requests.borrow_mut().push_back(handle);
    }
}

/// Defers each flush to a task on the current [`tokio::task::LocalSet`].
///
/// The runtime is not `Send`, so flushes are spawned with
/// [`tokio::task::spawn_local`]; requesting one outside a `LocalSet` panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn request_flush(&self, handle: FlushHandle) {
        tokio::task::spawn_local(async move {
            if let Err(err) = handle.flush() {
                error!(%err, "deferred flush failed");
            }
        });
    }
}
