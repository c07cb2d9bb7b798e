//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which effects depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is executing, the signal
//!    registers that effect as a subscriber (once, however often it is read).
//!
//! 2. When a signal's value changes, all subscribers are queued for the next
//!    flush. Nothing runs during the write itself.
//!
//! 3. Writing a value equal to the current one is a no-op.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A graph handle (8 bytes)
//! - The value, in a `RefCell` shared by all clones of the handle
//! - A weak reference to the runtime
//!
//! The subscriber set lives in the runtime's graph. Dropping the last
//! clone frees the graph slot.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use super::runtime::{Runtime, RuntimeInner};
use crate::graph::SignalId;

struct SignalInner<T> {
    id: SignalId,
    value: RefCell<T>,
    runtime: Weak<RuntimeInner>,
}

impl<T> SignalInner<T> {
    fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade().map(Runtime::from_inner)
    }
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime() {
            runtime.release_signal(self.id);
        }
    }
}

/// A reactive signal holding a value of type T.
///
/// Created with [`Runtime::signal`]. Clones share the same value.
///
/// # Example
///
/// ```rust
/// use ripple_core::{ManualScheduler, Runtime};
///
/// let rt = Runtime::new(ManualScheduler::new());
/// let count = rt.signal(0);
///
/// assert_eq!(count.get(), 0);
/// assert!(count.set(5));
/// assert!(!count.set(5));
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    pub(crate) fn new(runtime: Weak<RuntimeInner>, id: SignalId, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id,
                value: RefCell::new(value),
                runtime,
            }),
        }
    }

    /// Get the signal's graph handle.
    pub fn id(&self) -> SignalId {
        self.inner.id
    }

    /// Borrow the current value.
    ///
    /// Subscribes the executing effect. The value stays borrowed while `f`
    /// runs, so `f` must not write to this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Mutate the value in place and notify subscribers.
    ///
    /// No equality check is made: an in-place mutation always counts as a
    /// change.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.value.borrow_mut());
        self.notify();
    }

    /// Number of effects currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .runtime()
            .map(|runtime| runtime.subscribers_of(self.inner.id).len())
            .unwrap_or(0)
    }

    fn track(&self) {
        if let Some(runtime) = self.inner.runtime() {
            runtime.track_read(self.inner.id);
        }
    }

    fn notify(&self) {
        if let Some(runtime) = self.inner.runtime() {
            runtime.notify_write(self.inner.id);
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Get the current value.
    ///
    /// If called while an effect is executing, this also registers that
    /// effect as a subscriber.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Set a new value and queue subscribers.
    ///
    /// Returns `false` without notifying anyone if `value` equals the current
    /// value.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify();
        true
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with_untracked(|value| {
            f.debug_struct("Signal")
                .field("id", &self.inner.id)
                .field("value", value)
                .field("subscriber_count", &self.subscriber_count())
                .finish()
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
