//! Choreo: a hierarchical state machine with choreographed transitions.
//!
//! Most state machines switch states instantaneously. Choreo's transitions
//! are *choreographed*: moving between states runs a two-phase, possibly
//! multi-tick sequence that first deactivates the activities of the branch
//! being left, then performs the structural swap, then activates the
//! activities of the branch being entered. Requests arriving mid-flight are
//! coalesced into a single pending slot (last request wins), and each new
//! transition cancels the previous one's shared cancellation signal.
//!
//! Everything runs single-threaded and cooperatively from one external
//! [`tick`](StateMachine::tick) call per frame — activity operations are
//! poll-based, never backed by threads or executors.
//!
//! # Core Concepts
//!
//! - **State tree**: a fixed, single-rooted arena of states; exactly one
//!   root-to-leaf path is active at a time ([`StateTree`], [`Behavior`])
//! - **Activity**: a capability attached to a state with its own
//!   `Inactive → Activating → Active → Deactivating` lifecycle ([`Activity`])
//! - **Sequences**: strategies that drive a phase's operations to
//!   completion, sequentially or in parallel ([`Sequence`])
//! - **Sequencer**: owns the in-flight transition, the pending-request slot,
//!   and the cancellation signal ([`TransitionSequencer`])
//!
//! # Example
//!
//! ```rust
//! use choreo::{Behavior, StateId, StateMachineBuilder};
//!
//! // Caller-owned context threaded through every hook.
//! struct Oven { temperature: f32, door_open: bool }
//!
//! struct RootState { idle: StateId }
//! impl Behavior<Oven> for RootState {
//!     fn initial_child(&self) -> Option<StateId> { Some(self.idle) }
//! }
//!
//! struct IdleState { heating: StateId }
//! impl Behavior<Oven> for IdleState {
//!     fn transition(&mut self, oven: &mut Oven) -> Option<StateId> {
//!         (oven.temperature < 180.0 && !oven.door_open).then_some(self.heating)
//!     }
//! }
//!
//! let mut builder = StateMachineBuilder::new();
//! let root = builder.root("Root");
//! let idle = builder.child(root, "Idle");
//! let heating = builder.child(root, "Heating");
//! builder.behavior(root, RootState { idle });
//! builder.behavior(idle, IdleState { heating });
//!
//! let mut machine = builder.build().expect("tree is well formed");
//! let mut oven = Oven { temperature: 20.0, door_open: false };
//!
//! machine.start(&mut oven);
//! assert_eq!(machine.leaf(), idle);
//!
//! // Idle requests Heating; the transition completes across ticks.
//! for _ in 0..3 {
//!     machine.tick(&mut oven, 0.016);
//! }
//! assert_eq!(machine.leaf(), heating);
//! ```

pub mod builder;
pub mod core;
pub mod machine;
pub mod sequence;
pub mod snapshot;

// Re-export commonly used types
pub use builder::{BuildError, StateMachineBuilder};
pub use core::{
    Activity, ActivityMode, Behavior, CancelSignal, DelayActivity, InstantActivity, Progress,
    StateId, StateTree, TransitionHistory, TransitionRecord,
};
pub use machine::{SequenceStyle, StateMachine, TransitionSequencer};
pub use sequence::{NoopPhase, ParallelPhase, PhaseOp, PhaseStep, Sequence, SequentialPhase};
pub use snapshot::{Snapshot, SnapshotError};
