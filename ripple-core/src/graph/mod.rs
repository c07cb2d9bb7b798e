//! Dependency Graph
//!
//! This module implements the graph that tracks relationships between
//! signals and the effects reading them.
//!
//! # Overview
//!
//! - Nodes are signals (sources) or effects (leaves).
//! - An edge from a signal to an effect means the effect read the signal
//!   during its last execution.
//!
//! Edges are created lazily on read and torn down in bulk before each
//! re-run, so after every execution an effect's edges are exactly the
//! signals it read.
//!
//! # Design Decisions
//!
//! 1. Nodes live in slot arenas owned by the runtime. Edges store
//!    generation-checked handles, never references, so the
//!    signal -> effect -> signal cycle needs no manual management.
//!
//! 2. Subscriber sets are insertion-ordered. Iteration order decides the
//!    order effects run in, which has to be reproducible.
//!
//! 3. We maintain both forward (dependencies) and reverse (subscribers)
//!    edges so that unsubscribing an effect does not scan every signal.

mod arena;
mod node;
mod scheduler;

pub use arena::{Graph, RemovedEffect};
pub use node::{CleanupFn, EffectBody, EffectId, EffectNode, SignalId, SignalNode};
pub use scheduler::{Batch, UpdateQueue};
