//! Error types for the reactive engine.

use thiserror::Error;

use crate::graph::EffectId;

/// Errors reported by the runtime.
///
/// A panicking effect body is not an error value: with failure isolation on
/// it is logged and listed in [`FlushReport::failed`](crate::FlushReport),
/// otherwise it unwinds to whoever ran the flush.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// `on_cleanup` was called while no effect was executing.
    #[error("on_cleanup called outside of an executing effect")]
    NoActiveEffect,

    /// The effect handle refers to a disposed effect.
    #[error("effect {0:?} has been disposed")]
    StaleEffect(EffectId),

    /// Effects kept re-scheduling each other for more consecutive flush
    /// passes than the configured limit. The pending batch was dropped.
    #[error("flush cascade exceeded {limit} consecutive passes")]
    CascadeLimit { limit: usize },

    /// The runtime configuration could not be parsed.
    #[error("invalid runtime config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
