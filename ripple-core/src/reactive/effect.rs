//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued for the next flush.
//!
//! 3. Before re-running, the effect drops its old dependencies and runs the
//!    cleanups registered during the previous run, then tracks new
//!    dependencies during execution.
//!
//! # Cleanup
//!
//! A body registers cleanups with [`Runtime::on_cleanup`]. They run before
//! the next execution and on disposal, in registration order, each once.
//!
//! # Lifetime
//!
//! The body is owned by the runtime, not by this handle. Dropping an
//! `Effect` leaves it running; call [`Effect::dispose`] to stop it.

use std::rc::Weak;

use super::runtime::{Runtime, RuntimeInner};
use crate::graph::EffectId;

/// Handle to an effect created with [`Runtime::effect`].
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ripple_core::{ManualScheduler, Runtime};
///
/// let scheduler = ManualScheduler::new();
/// let rt = Runtime::new(scheduler.clone());
/// let count = rt.signal(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let effect = rt.effect({
///     let (count, seen) = (count.clone(), seen.clone());
///     move || seen.set(count.get())
/// });
///
/// count.set(5);
/// scheduler.run_until_idle().unwrap();
/// assert_eq!(seen.get(), 5);
///
/// effect.dispose();
/// count.set(6);
/// scheduler.run_until_idle().unwrap();
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    id: EffectId,
    runtime: Weak<RuntimeInner>,
}

impl Effect {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, id: EffectId) -> Self {
        Self { id, runtime }
    }

    /// Get the effect's graph handle.
    pub fn id(&self) -> EffectId {
        self.id
    }

    fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade().map(Runtime::from_inner)
    }

    /// Dispose of the effect.
    ///
    /// Removes it from every subscriber set and from the pending queue, then
    /// runs its outstanding cleanups. Disposing twice is a no-op.
    pub fn dispose(&self) {
        if let Some(runtime) = self.runtime() {
            // Already disposed.
            let _ = runtime.dispose_effect(self.id);
        }
    }

    /// Check if the effect has been disposed (or its runtime dropped).
    pub fn is_disposed(&self) -> bool {
        self.runtime()
            .map(|runtime| !runtime.contains_effect(self.id))
            .unwrap_or(true)
    }

    /// Number of times the effect has started executing. Zero once disposed.
    pub fn run_count(&self) -> usize {
        self.runtime()
            .and_then(|runtime| runtime.effect_run_count(self.id))
            .unwrap_or(0)
    }

    /// Number of signals read during the last execution.
    pub fn dependency_count(&self) -> usize {
        self.runtime()
            .map(|runtime| runtime.dependencies_of(self.id).len())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
