//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//!
//! Both node kinds are stored in slot arenas and addressed by
//! generation-checked handles. Edges are stored as handles on both ends, so
//! the graph never holds a direct reference from one node to another.

use indexmap::IndexSet;
use slotmap::new_key_type;
use smallvec::SmallVec;

new_key_type! {
    /// Handle to a signal slot in the dependency graph.
    pub struct SignalId;

    /// Handle to an effect slot in the dependency graph.
    pub struct EffectId;
}

/// The effect body. Re-runnable, so `FnMut`.
pub type EffectBody = Box<dyn FnMut()>;

/// A callback registered with `on_cleanup`, invoked at most once.
pub type CleanupFn = Box<dyn FnOnce()>;

/// A source node (signal). These are the roots of the graph.
///
/// The value itself lives in the [`Signal`](crate::reactive::Signal) handle;
/// the graph only needs to know who is listening.
#[derive(Debug, Default)]
pub struct SignalNode {
    /// Effects currently depending on this signal, in subscription order.
    subscribers: IndexSet<EffectId>,
}

impl SignalNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn add_subscriber(&mut self, effect: EffectId) -> bool {
        self.subscribers.insert(effect)
    }

    /// Remove a subscriber, keeping the order of the remaining ones.
    pub fn remove_subscriber(&mut self, effect: EffectId) -> bool {
        self.subscribers.shift_remove(&effect)
    }

    pub fn subscribers(&self) -> &IndexSet<EffectId> {
        &self.subscribers
    }
}

/// An effect node. These are leaves of the graph.
pub struct EffectNode {
    /// The body. `None` while the body is executing.
    pub(crate) body: Option<EffectBody>,

    /// Signals read during the last execution (dependency records).
    pub(crate) dependencies: SmallVec<[SignalId; 4]>,

    /// Callbacks to run before the next execution or on disposal.
    pub(crate) cleanups: Vec<CleanupFn>,

    /// Number of executions started, including failed ones.
    pub(crate) run_count: usize,

    /// Set when a write targets this effect while it is executing.
    pub(crate) rerun_requested: bool,
}

impl EffectNode {
    pub fn new(body: EffectBody) -> Self {
        Self {
            body: Some(body),
            dependencies: SmallVec::new(),
            cleanups: Vec::new(),
            run_count: 0,
            rerun_requested: false,
        }
    }

    /// Whether the body is currently checked out for execution.
    pub fn is_running(&self) -> bool {
        self.body.is_none()
    }

    pub fn dependencies(&self) -> &[SignalId] {
        &self.dependencies
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }
}

impl std::fmt::Debug for EffectNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectNode")
            .field("running", &self.is_running())
            .field("dependencies", &self.dependencies)
            .field("cleanups", &self.cleanups.len())
            .field("run_count", &self.run_count)
            .finish()
    }
}
