//! Reactive Context
//!
//! The reactive context tracks which effect is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current effect as a dependent.
//!
//! # Implementation
//!
//! Each runtime owns a stack of entries. Running an effect pushes its id;
//! when the body returns, the entry is popped and the previous effect (if any)
//! becomes current again. This is what keeps a nested effect's reads from
//! being attributed to the effect that created it.
//!
//! An entry may also be `None`, which marks an untracked region: reads inside
//! it subscribe nothing even when an effect is running further down the stack.

use std::cell::RefCell;

use crate::graph::EffectId;

/// The per-runtime context stack.
#[derive(Debug, Default)]
pub struct ContextStack {
    entries: Vec<Option<EffectId>>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The effect that reads are currently attributed to.
    pub fn current(&self) -> Option<EffectId> {
        self.entries.last().copied().flatten()
    }

    /// Whether a read right now would subscribe anything.
    pub fn is_tracking(&self) -> bool {
        self.current().is_some()
    }

    /// The innermost executing effect, looking through untracked regions.
    pub fn executing(&self) -> Option<EffectId> {
        self.entries.iter().rev().find_map(|entry| *entry)
    }

    /// Whether any effect body is executing, tracked or not.
    pub fn is_executing(&self) -> bool {
        self.executing().is_some()
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, entry: Option<EffectId>) {
        self.entries.push(entry);
    }

    fn pop(&mut self) -> Option<Option<EffectId>> {
        self.entries.pop()
    }
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the effect body panics.
pub struct ReactiveContext<'a> {
    stack: &'a RefCell<ContextStack>,
    entry: Option<EffectId>,
}

impl<'a> ReactiveContext<'a> {
    /// Make `effect` the active subscriber until the guard is dropped.
    pub fn enter(stack: &'a RefCell<ContextStack>, effect: EffectId) -> Self {
        Self::push(stack, Some(effect))
    }

    /// Suspend tracking until the guard is dropped.
    pub fn untracked(stack: &'a RefCell<ContextStack>) -> Self {
        Self::push(stack, None)
    }

    fn push(stack: &'a RefCell<ContextStack>, entry: Option<EffectId>) -> Self {
        stack.borrow_mut().push(entry);
        Self { stack, entry }
    }
}

impl Drop for ReactiveContext<'_> {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();

        // Verify we're popping the right context.
        debug_assert_eq!(
            popped,
            Some(self.entry),
            "ReactiveContext mismatch: expected {:?}, got {:?}",
            self.entry,
            popped
        );
    }
}
