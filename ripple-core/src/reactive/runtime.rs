//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals and effects.
//! It owns the dependency graph, the pending queue, the context stack and the
//! host scheduler, and every signal and effect handle points back at it.
//!
//! # How It Works
//!
//! 1. When an effect is created, the runtime stores its body in the graph and
//!    runs it once, synchronously.
//!
//! 2. When an effect reads a signal, the runtime records the edge in both
//!    directions (at most once per execution).
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Queues every subscriber, deduplicated, in subscription order
//!    b. Asks the scheduler for a flush if none is pending
//!    c. Runs nothing yet
//!
//! 4. The flush takes the queue and re-runs each effect once. Every run
//!    starts by dropping the effect's old edges and running its cleanups.
//!
//! # Threading
//!
//! A runtime is single-threaded (`!Send`). Hosts that want several threads
//! create one runtime per thread.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use super::context::{ContextStack, ReactiveContext};
use super::effect::Effect;
use super::flush::{FlushHandle, FlushReport, Scheduler};
use super::signal::Signal;
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};
use crate::graph::{CleanupFn, EffectBody, EffectId, Graph, SignalId, UpdateQueue};

pub(crate) struct RuntimeInner {
    graph: RefCell<Graph>,
    queue: RefCell<UpdateQueue>,
    context: RefCell<ContextStack>,
    scheduler: Box<dyn Scheduler>,
    config: RuntimeConfig,
    /// A pass is executing.
    flushing: Cell<bool>,
    /// A flush was requested while a pass was executing.
    flush_again: Cell<bool>,
    /// Consecutive cascading passes so far.
    cascade_depth: Cell<usize>,
}

/// Handle to a reactive runtime. Clones share the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Resets the `flushing` flag even when an effect panics out of the pass.
struct FlushingGuard<'a>(&'a Cell<bool>);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Puts an effect body back in its slot once the execution ends, normally or
/// by unwinding.
struct BodySlot<'a> {
    runtime: &'a Runtime,
    effect: EffectId,
    body: Option<EffectBody>,
}

impl Drop for BodySlot<'_> {
    fn drop(&mut self) {
        let Some(body) = self.body.take() else {
            return;
        };
        let (orphan, rerun) = {
            let mut graph = self.runtime.inner.graph.borrow_mut();
            match graph.effect_mut(self.effect) {
                Some(node) => {
                    node.body = Some(body);
                    (None, std::mem::take(&mut node.rerun_requested))
                }
                // Disposed while running.
                None => (Some(body), false),
            }
        };
        drop(orphan);
        if rerun {
            self.runtime.schedule(self.effect);
        }
    }
}

impl Runtime {
    /// Create a runtime that requests flushes from `scheduler`.
    pub fn new(scheduler: impl Scheduler + 'static) -> Self {
        Self::with_config(scheduler, RuntimeConfig::default())
    }

    pub fn with_config(scheduler: impl Scheduler + 'static, config: RuntimeConfig) -> Self {
        debug!(?config, "creating reactive runtime");
        Self {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(Graph::new()),
                queue: RefCell::new(UpdateQueue::new()),
                context: RefCell::new(ContextStack::new()),
                scheduler: Box::new(scheduler),
                config,
                flushing: Cell::new(false),
                flush_again: Cell::new(false),
                cascade_depth: Cell::new(0),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RuntimeInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Create a signal holding `value`.
    pub fn signal<T: 'static>(&self, value: T) -> Signal<T> {
        let id = self.inner.graph.borrow_mut().insert_signal();
        trace!(?id, "signal created");
        Signal::new(self.downgrade(), id, value)
    }

    /// Create an effect and run it once, synchronously.
    ///
    /// A panic in this first run propagates to the caller; the effect stays
    /// registered with whatever it read before the panic.
    pub fn effect<F>(&self, body: F) -> Effect
    where
        F: FnMut() + 'static,
    {
        let id = self.inner.graph.borrow_mut().insert_effect(Box::new(body));
        debug!(?id, "effect created");
        self.run_effect(id);
        Effect::new(self.downgrade(), id)
    }

    /// Register `cleanup` with the executing effect.
    ///
    /// It runs once, right before the effect's next execution or on disposal,
    /// after cleanups registered earlier in the same execution.
    pub fn on_cleanup<F>(&self, cleanup: F) -> Result<()>
    where
        F: FnOnce() + 'static,
    {
        // Untracked regions still belong to the effect around them.
        let Some(current) = self.inner.context.borrow().executing() else {
            return Err(ReactiveError::NoActiveEffect);
        };
        let mut graph = self.inner.graph.borrow_mut();
        let node = graph
            .effect_mut(current)
            .ok_or(ReactiveError::StaleEffect(current))?;
        node.cleanups.push(Box::new(cleanup));
        Ok(())
    }

    /// Run `f` without subscribing the executing effect to anything it reads.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let _ctx = ReactiveContext::untracked(&self.inner.context);
        f()
    }

    // ------------------------------------------------------------------
    // Tracking and propagation
    // ------------------------------------------------------------------

    /// Subscribe the executing effect, if any, to `signal`.
    pub(crate) fn track_read(&self, signal: SignalId) {
        let Some(current) = self.current_effect() else {
            return;
        };
        if self.inner.graph.borrow_mut().subscribe(signal, current) {
            trace!(?signal, effect = ?current, "subscribed");
        }
    }

    /// Queue every subscriber of `signal`.
    pub(crate) fn notify_write(&self, signal: SignalId) {
        let subscribers = self.inner.graph.borrow().subscribers(signal);
        trace!(?signal, subscribers = subscribers.len(), "signal changed");
        for effect in subscribers {
            self.schedule(effect);
        }
    }

    /// Queue `effect` and request a flush if none is pending.
    pub(crate) fn schedule(&self, effect: EffectId) {
        let during_execution =
            self.inner.flushing.get() || self.inner.context.borrow().is_executing();
        let request = self.inner.queue.borrow_mut().push(effect, during_execution);
        trace!(?effect, "scheduled");
        if request {
            self.inner
                .scheduler
                .request_flush(FlushHandle::new(self.downgrade()));
        }
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    /// Run every pending effect once, in enqueue order.
    ///
    /// Normally called by the scheduler through a [`FlushHandle`]. Calling it
    /// while a pass is running (a synchronous scheduler reacting to a write
    /// made by an effect) does not nest: the running call performs another
    /// pass once the current one ends.
    pub fn flush(&self) -> Result<FlushReport> {
        if self.inner.flushing.get() {
            self.inner.flush_again.set(true);
            return Ok(FlushReport::default());
        }
        // Left over only if a previous pass was aborted.
        self.inner.flush_again.set(false);
        let mut report = FlushReport::default();
        loop {
            report.absorb(self.flush_pass()?);
            if !self.inner.flush_again.replace(false) {
                break;
            }
        }
        Ok(report)
    }

    fn flush_pass(&self) -> Result<FlushReport> {
        let _flushing = {
            self.inner.flushing.set(true);
            FlushingGuard(&self.inner.flushing)
        };

        let batch = self.inner.queue.borrow_mut().take();
        let depth = if batch.cascade {
            self.inner.cascade_depth.get() + 1
        } else {
            0
        };
        self.inner.cascade_depth.set(depth);

        if let Some(limit) = self.inner.config.max_cascade_depth {
            if depth > limit {
                warn!(
                    depth,
                    dropped = batch.effects.len(),
                    "flush cascade limit exceeded, dropping pending effects"
                );
                self.inner.queue.borrow_mut().clear();
                self.inner.cascade_depth.set(0);
                return Err(ReactiveError::CascadeLimit { limit });
            }
        }

        debug!(effects = batch.effects.len(), depth, "flush pass");
        let mut report = FlushReport {
            passes: 1,
            ..Default::default()
        };
        for effect in batch.effects {
            if !self.inner.graph.borrow().contains_effect(effect) {
                report.skipped += 1;
                continue;
            }
            if !self.inner.config.isolate_failures {
                if self.run_effect(effect) {
                    report.ran += 1;
                }
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| self.run_effect(effect))) {
                Ok(true) => report.ran += 1,
                Ok(false) => {}
                Err(payload) => {
                    error!(?effect, reason = panic_message(&*payload), "effect panicked");
                    report.failed.push(effect);
                }
            }
        }
        // Nothing was queued by this pass, so the chain ends here.
        if self.inner.queue.borrow().is_empty() {
            self.inner.cascade_depth.set(0);
        }
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Effect lifecycle
    // ------------------------------------------------------------------

    /// Execute an effect: cleanup phase, then the body with the effect as the
    /// active subscriber.
    ///
    /// A panicking cleanup does not stop the other cleanups or the body; the
    /// panic is resumed once the body has returned.
    ///
    /// Returns `false` if the effect did not start: it is gone, or it is
    /// still executing further down the stack, in which case it is re-run as
    /// soon as that execution returns.
    pub(crate) fn run_effect(&self, effect: EffectId) -> bool {
        let (body, cleanups) = {
            let mut graph = self.inner.graph.borrow_mut();
            let Some(node) = graph.effect_mut(effect) else {
                return false;
            };
            if node.is_running() {
                node.rerun_requested = true;
                return false;
            }
            node.run_count += 1;
            let taken = (node.body.take(), std::mem::take(&mut node.cleanups));
            graph.clear_dependencies(effect);
            taken
        };
        let mut slot = BodySlot {
            runtime: self,
            effect,
            body,
        };
        let cleanup_panic = self.run_cleanups(cleanups);

        {
            let _ctx = ReactiveContext::enter(&self.inner.context, effect);
            if let Some(body) = slot.body.as_mut() {
                body();
            }
        }
        if let Some(payload) = cleanup_panic {
            drop(slot);
            panic::resume_unwind(payload);
        }
        true
    }

    /// Final cleanup phase. The effect leaves the graph and the queue.
    pub(crate) fn dispose_effect(&self, effect: EffectId) -> Result<()> {
        let removed = self
            .inner
            .graph
            .borrow_mut()
            .remove_effect(effect)
            .ok_or(ReactiveError::StaleEffect(effect))?;
        self.inner.queue.borrow_mut().remove(effect);
        debug!(?effect, "effect disposed");
        let cleanup_panic = self.run_cleanups(removed.cleanups);
        drop(removed.body);
        if let Some(payload) = cleanup_panic {
            panic::resume_unwind(payload);
        }
        Ok(())
    }

    /// Dispose every live effect.
    ///
    /// Effect bodies often capture a clone of the runtime; disposing drops
    /// those bodies so the runtime itself can be freed.
    pub fn dispose_all(&self) {
        let effects = self.inner.graph.borrow().effect_ids();
        for effect in effects {
            // Earlier cleanups may already have disposed later effects.
            let _ = self.dispose_effect(effect);
        }
    }

    /// Run `cleanups` in registration order with tracking suspended.
    ///
    /// Every callback runs even if an earlier one panics. The first panic is
    /// handed back to the caller; later ones are only logged.
    fn run_cleanups(&self, cleanups: Vec<CleanupFn>) -> Option<PanicPayload> {
        if cleanups.is_empty() {
            return None;
        }
        let _untracked = ReactiveContext::untracked(&self.inner.context);
        let mut first: Option<PanicPayload> = None;
        for cleanup in cleanups {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                if first.is_some() {
                    error!(reason = panic_message(&*payload), "cleanup panicked");
                } else {
                    first = Some(payload);
                }
            }
        }
        first
    }

    pub(crate) fn release_signal(&self, signal: SignalId) {
        self.inner.graph.borrow_mut().remove_signal(signal);
        trace!(?signal, "signal released");
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// The effect that reads are currently attributed to.
    pub fn current_effect(&self) -> Option<EffectId> {
        self.inner.context.borrow().current()
    }

    /// Whether a signal read right now would subscribe an effect.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.borrow().is_tracking()
    }

    /// Number of effects waiting for the next flush.
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.inner.queue.borrow().is_scheduled()
    }

    pub fn signal_count(&self) -> usize {
        self.inner.graph.borrow().signal_count()
    }

    pub fn effect_count(&self) -> usize {
        self.inner.graph.borrow().effect_count()
    }

    /// Effects subscribed to `signal`, in the order they will be queued.
    pub fn subscribers_of(&self, signal: SignalId) -> Vec<EffectId> {
        self.inner.graph.borrow().subscribers(signal).into_vec()
    }

    /// Signals `effect` read during its last execution.
    pub fn dependencies_of(&self, effect: EffectId) -> Vec<SignalId> {
        self.inner.graph.borrow().dependencies(effect).into_vec()
    }

    pub(crate) fn effect_run_count(&self, effect: EffectId) -> Option<usize> {
        self.inner
            .graph
            .borrow()
            .effect(effect)
            .map(|node| node.run_count())
    }

    pub(crate) fn contains_effect(&self, effect: EffectId) -> bool {
        self.inner.graph.borrow().contains_effect(effect)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("signals", &self.signal_count())
            .field("effects", &self.effect_count())
            .field("pending", &self.pending_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

type PanicPayload = Box<dyn Any + Send>;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::flush::{ImmediateScheduler, ManualScheduler};

    #[test]
    fn effect_runs_on_creation() {
        let rt = Runtime::new(ManualScheduler::new());
        let runs = Rc::new(Cell::new(0));

        let counter = runs.clone();
        let effect = rt.effect(move || counter.set(counter.get() + 1));

        assert_eq!(runs.get(), 1);
        assert_eq!(effect.run_count(), 1);
        assert_eq!(rt.effect_count(), 1);
    }

    #[test]
    fn write_queues_without_running() {
        let scheduler = ManualScheduler::new();
        let rt = Runtime::new(scheduler.clone());
        let count = rt.signal(0);
        let runs = Rc::new(Cell::new(0));

        let (c, r) = (count.clone(), runs.clone());
        rt.effect(move || {
            c.get();
            r.set(r.get() + 1);
        });

        count.set(1);
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.pending_count(), 1);
        assert!(rt.is_flush_scheduled());
        assert_eq!(scheduler.pending_requests(), 1);

        let report = scheduler.run_until_idle().unwrap();
        assert_eq!(report.ran, 1);
        assert_eq!(runs.get(), 2);
        assert!(!rt.is_flush_scheduled());
    }

    #[test]
    fn on_cleanup_outside_effect_is_an_error() {
        let rt = Runtime::new(ManualScheduler::new());
        let err = rt.on_cleanup(|| {}).unwrap_err();
        assert!(matches!(err, ReactiveError::NoActiveEffect));
    }

    #[test]
    fn on_cleanup_inside_untrack_registers_with_effect() {
        let scheduler = ManualScheduler::new();
        let rt = Runtime::new(scheduler.clone());
        let count = rt.signal(0);
        let cleaned = Rc::new(Cell::new(0));

        let (c, done, runtime) = (count.clone(), cleaned.clone(), rt.clone());
        rt.effect(move || {
            c.get();
            let done = done.clone();
            let registered = runtime.untrack(|| {
                runtime.on_cleanup(move || done.set(done.get() + 1))
            });
            assert!(registered.is_ok());
        });

        assert_eq!(cleaned.get(), 0);
        count.set(1);
        scheduler.run_until_idle().unwrap();
        assert_eq!(cleaned.get(), 1);
        rt.dispose_all();
    }

    #[test]
    fn untrack_skips_subscription() {
        let rt = Runtime::new(ManualScheduler::new());
        let tracked = rt.signal(1);
        let hidden = rt.signal(2);

        let (t, h, runtime) = (tracked.clone(), hidden.clone(), rt.clone());
        let effect = rt.effect(move || {
            t.get();
            runtime.untrack(|| h.get());
        });

        assert_eq!(rt.dependencies_of(effect.id()), vec![tracked.id()]);
        assert_eq!(hidden.subscriber_count(), 0);
        rt.dispose_all();
    }

    #[test]
    fn reentrant_flush_runs_follow_up_pass() {
        let rt = Runtime::new(ImmediateScheduler);
        let source = rt.signal(0);
        let mirror = rt.signal(0);
        let seen = Rc::new(Cell::new(0));

        let (s, m) = (source.clone(), mirror.clone());
        rt.effect(move || { m.set(s.get()); });

        let (m, out) = (mirror.clone(), seen.clone());
        rt.effect(move || out.set(m.get()));

        source.set(7);
        assert_eq!(seen.get(), 7);
        assert!(!rt.is_flush_scheduled());
    }

    #[test]
    fn flush_without_pending_is_empty_pass() {
        let rt = Runtime::new(ManualScheduler::new());
        let report = rt.flush().unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.ran, 0);
    }
}
