//! Build errors for state tree construction.

use thiserror::Error;

/// Errors surfaced by [`StateMachineBuilder::build`](super::StateMachineBuilder::build).
///
/// Structural misuse recorded while declaring the tree is reported here;
/// the first problem encountered wins.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No root state was declared.
    #[error("no root state was declared")]
    MissingRoot,

    /// `root` was called more than once.
    #[error("a root state was already declared")]
    DuplicateRoot,

    /// A state was given a behavior twice.
    #[error("state '{state}' was given a behavior twice")]
    DuplicateBehavior { state: String },

    /// A `StateId` from another builder (or none at all) was used.
    #[error("state id {0} does not belong to this builder")]
    ForeignState(usize),
}
