//! Ripple Core
//!
//! This crate provides a fine-grained reactive engine. It implements:
//!
//! - Signals: state cells that record who reads them
//! - Effects: computations that re-run when what they read changes
//! - A batched flush: many writes, one re-run per affected effect
//! - Cleanup callbacks and disposal
//!
//! The engine never decides on its own when a flush happens. The host passes
//! a [`Scheduler`] to the [`Runtime`] and the runtime asks it for a flush
//! whenever a write queues the first effect of a new batch.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Node arenas, dependency edges and the pending queue
//! - `reactive`: The runtime, signal and effect handles, and schedulers
//! - `config`: Runtime configuration
//! - `error`: The crate's error type
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{ManualScheduler, Runtime};
//!
//! let scheduler = ManualScheduler::new();
//! let rt = Runtime::new(scheduler.clone());
//!
//! // Create a signal
//! let count = rt.signal(0);
//!
//! // Create an effect
//! let c = count.clone();
//! rt.effect(move || {
//!     println!("Count: {}", c.get());
//! });
//!
//! // Several writes, one re-run
//! count.set(1);
//! count.set(5);
//! let report = scheduler.run_until_idle().unwrap();
//! assert_eq!(report.ran, 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::RuntimeConfig;
pub use error::{ReactiveError, Result};
pub use graph::{EffectId, SignalId};
pub use reactive::{
    Effect, FlushHandle, FlushReport, ImmediateScheduler, ManualScheduler, Runtime, Scheduler,
    Signal, TokioScheduler,
};
