//! Errors surfaced by the case-based model.
//!
//! All of them are local and recoverable: a caller can drop the sample, grow
//! the model, or treat a state as unknown and carry on.

use crate::case::Action;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Every arena slot is populated and the transition is not a duplicate.
    #[error("case store is full ({capacity} cases)")]
    CapacityExceeded { capacity: usize },

    /// No populated case lies within the influence radius of the query point.
    #[error("no case within influence radius of the query state")]
    NoNeighboursFound,

    #[error("expected a {expected}-dimensional state, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("action {action} out of range for {num_actions} actions")]
    ActionOutOfRange { action: Action, num_actions: usize },

    /// Ingested transitions must say whether they are internal, goal or out of bounds.
    #[error("transition exit kind must be specified")]
    UnspecifiedExit,

    #[error("non-finite value in {0}")]
    NonFiniteValue(&'static str),

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),
}
