//! Core state machine types.
//!
//! This module contains the leaf building blocks of the machine:
//! - The state tree arena and the `Behavior` hook trait
//! - The activity lifecycle and its cancellation signal
//! - Immutable transition history

mod activity;
mod history;
mod state;

pub use activity::{Activity, ActivityMode, CancelSignal, DelayActivity, InstantActivity, Progress};
pub use history::{TransitionHistory, TransitionRecord};
pub use state::{Behavior, StateId, StateTree};
