//! Update Queue
//!
//! The queue holds the effects waiting for the next flush. It is ordered by
//! first enqueue and never holds the same effect twice, so a batch runs each
//! effect exactly once no matter how many writes reached it.
//!
//! # Lifecycle
//!
//! 1. A write pushes every subscriber of the written signal.
//! 2. The first push after a drain sets the `scheduled` flag, which tells the
//!    runtime to request a flush from the host.
//! 3. The flush takes the whole queue at once. The flag is cleared as part of
//!    the take, so pushes made while the batch runs land in a fresh queue and
//!    request a new flush instead of extending the current one.

use indexmap::IndexSet;

use super::node::EffectId;

/// A drained batch, in enqueue order.
#[derive(Debug, Default)]
pub struct Batch {
    pub effects: Vec<EffectId>,
    /// Whether any entry was queued while effects were executing.
    pub cascade: bool,
}

/// Pending effects plus the "flush is scheduled" flag.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    pending: IndexSet<EffectId>,
    scheduled: bool,
    cascade: bool,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an effect.
    ///
    /// Returns `true` when the caller must request a flush, i.e. this push
    /// flipped the scheduled flag.
    pub fn push(&mut self, effect: EffectId, during_execution: bool) -> bool {
        self.pending.insert(effect);
        self.cascade |= during_execution;
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    /// Take the entire queue and clear the scheduled flag.
    pub fn take(&mut self) -> Batch {
        self.scheduled = false;
        let cascade = std::mem::take(&mut self.cascade);
        Batch {
            effects: std::mem::take(&mut self.pending).into_iter().collect(),
            cascade,
        }
    }

    pub fn remove(&mut self, effect: EffectId) -> bool {
        self.pending.shift_remove(&effect)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.cascade = false;
    }

    #[cfg(test)]
    pub fn contains(&self, effect: EffectId) -> bool {
        self.pending.contains(&effect)
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
