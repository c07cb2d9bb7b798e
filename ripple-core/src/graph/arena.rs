//! Node Arena
//!
//! Owns every signal and effect node and maintains the edges between them.
//! Edges are kept in both directions: a signal knows its subscribers and an
//! effect knows which signals it is subscribed to (its dependency records).
//! The two directions are only ever changed together.

use slotmap::SlotMap;
use smallvec::SmallVec;

use super::node::{CleanupFn, EffectBody, EffectId, EffectNode, SignalId, SignalNode};

/// What is left of an effect after it leaves the arena.
///
/// Closures are handed back instead of dropped in place: dropping a body can
/// drop signal handles, and those call back into the graph.
pub struct RemovedEffect {
    pub body: Option<EffectBody>,
    pub cleanups: Vec<CleanupFn>,
}

/// The dependency graph.
#[derive(Debug, Default)]
pub struct Graph {
    signals: SlotMap<SignalId, SignalNode>,
    effects: SlotMap<EffectId, EffectNode>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_signal(&mut self) -> SignalId {
        self.signals.insert(SignalNode::new())
    }

    /// Remove a signal and drop it from every subscriber's dependency records.
    pub fn remove_signal(&mut self, signal: SignalId) {
        let Some(node) = self.signals.remove(signal) else {
            return;
        };
        for effect in node.subscribers() {
            if let Some(effect) = self.effects.get_mut(*effect) {
                effect.dependencies.retain(|dep| *dep != signal);
            }
        }
    }

    pub fn insert_effect(&mut self, body: EffectBody) -> EffectId {
        self.effects.insert(EffectNode::new(body))
    }

    /// Remove an effect and all of its edges.
    pub fn remove_effect(&mut self, effect: EffectId) -> Option<RemovedEffect> {
        self.clear_dependencies(effect);
        self.effects.remove(effect).map(|node| RemovedEffect {
            body: node.body,
            cleanups: node.cleanups,
        })
    }

    pub fn contains_signal(&self, signal: SignalId) -> bool {
        self.signals.contains_key(signal)
    }

    pub fn contains_effect(&self, effect: EffectId) -> bool {
        self.effects.contains_key(effect)
    }

    pub fn effect(&self, effect: EffectId) -> Option<&EffectNode> {
        self.effects.get(effect)
    }

    pub fn effect_mut(&mut self, effect: EffectId) -> Option<&mut EffectNode> {
        self.effects.get_mut(effect)
    }

    /// Record that `effect` read `signal`.
    ///
    /// Membership is checked on the signal's subscriber set, so repeated reads
    /// within one execution add a single edge. Returns `true` if a new edge
    /// was created.
    pub fn subscribe(&mut self, signal: SignalId, effect: EffectId) -> bool {
        let (Some(source), Some(target)) =
            (self.signals.get_mut(signal), self.effects.get_mut(effect))
        else {
            return false;
        };
        if !source.add_subscriber(effect) {
            return false;
        }
        target.dependencies.push(signal);
        true
    }

    /// Remove `effect` from every subscriber set it is recorded in and empty
    /// its dependency records. Returns the number of edges removed.
    pub fn clear_dependencies(&mut self, effect: EffectId) -> usize {
        let Some(node) = self.effects.get_mut(effect) else {
            return 0;
        };
        let dependencies = std::mem::take(&mut node.dependencies);
        for signal in &dependencies {
            if let Some(source) = self.signals.get_mut(*signal) {
                source.remove_subscriber(effect);
            }
        }
        dependencies.len()
    }

    /// Subscribers of `signal` in subscription order.
    pub fn subscribers(&self, signal: SignalId) -> SmallVec<[EffectId; 8]> {
        self.signals
            .get(signal)
            .map(|node| node.subscribers().iter().copied().collect())
            .unwrap_or_default()
    }

    /// Dependency records of `effect` in read order.
    pub fn dependencies(&self, effect: EffectId) -> SmallVec<[SignalId; 4]> {
        self.effects
            .get(effect)
            .map(|node| node.dependencies.clone())
            .unwrap_or_default()
    }

    pub fn effect_ids(&self) -> Vec<EffectId> {
        self.effects.keys().collect()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }
}
