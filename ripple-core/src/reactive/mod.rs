//! Reactive Primitives
//!
//! This module implements the core reactive system: signals and effects,
//! plus the runtime that connects them and the strategies for scheduling
//! its flushes.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an effect is executing, the signal automatically registers that
//! effect as a dependent. When the signal's value changes, all dependents are
//! queued to re-run.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects are used to synchronize reactive state with
//! external systems, such as updating a view or logging.
//!
//! ## Flushes
//!
//! Writes are batched. Any number of writes made before the host runs the
//! requested flush cause each affected effect to run once, in the order it
//! was first queued.
//!
//! # Implementation Notes
//!
//! Dependency tracking goes through a context stack owned by the runtime.
//! When a signal is read, we check whether an effect is on top of the stack
//! and, if so, record the edge. Nested effects push their own entry, so
//! their reads never leak into the effect that created them.

mod context;
mod effect;
mod flush;
mod runtime;
mod signal;

pub use context::{ContextStack, ReactiveContext};
pub use effect::Effect;
pub use flush::{
    FlushHandle, FlushReport, ImmediateScheduler, ManualScheduler, Scheduler, TokioScheduler,
};
pub use runtime::Runtime;
pub use signal::Signal;
