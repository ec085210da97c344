//! The state machine: one tree, one sequencer, one tick entry point.

mod sequencer;

pub use sequencer::{SequenceStyle, TransitionSequencer};

use crate::core::{StateId, StateTree, TransitionHistory};
use crate::snapshot::{self, Snapshot, SnapshotError};
use tracing::debug;

/// Hierarchical state machine driven by one external tick call per frame.
///
/// Owns the root state tree and exactly one [`TransitionSequencer`]. The
/// caller owns the context `C` and timing; everything in the machine runs
/// single-threaded and cooperatively from [`tick`](StateMachine::tick).
///
/// Built through [`StateMachineBuilder`](crate::builder::StateMachineBuilder);
/// see the crate-level docs for a complete example.
pub struct StateMachine<C> {
    tree: StateTree<C>,
    sequencer: TransitionSequencer<C>,
    started: bool,
}

impl<C> StateMachine<C> {
    pub(crate) fn from_tree(tree: StateTree<C>, style: SequenceStyle) -> Self {
        Self {
            tree,
            sequencer: TransitionSequencer::new(style),
            started: false,
        }
    }

    /// Enter the root and its initial-child chain. Idempotent — only the
    /// first call does anything. No activity phases run here; activities
    /// first activate when a transition's enter chain covers their state.
    pub fn start(&mut self, ctx: &mut C) {
        if self.started {
            return;
        }
        self.started = true;
        debug!(root = self.tree.name(self.tree.root()), "machine started");
        let root = self.tree.root();
        self.tree.enter(root, ctx);
    }

    /// Advance the machine by one frame. Auto-starts on the first call,
    /// then delegates entirely to the sequencer. `dt` is the caller-owned
    /// elapsed time, non-negative.
    pub fn tick(&mut self, ctx: &mut C, dt: f32) {
        debug_assert!(dt >= 0.0, "delta time must be non-negative");
        if !self.started {
            self.start(ctx);
        }
        self.sequencer.tick(&mut self.tree, ctx, dt);
    }

    /// The structural-only swap primitive: exit up to the shared ancestor,
    /// enter down to the target, no activity work. No-op on equal endpoints.
    pub fn change_state(&mut self, ctx: &mut C, from: StateId, to: StateId) {
        self.tree.change_state(from, to, ctx);
    }

    /// Request a choreographed transition, exactly as a state's transition
    /// predicate would. Ignored on a self-target; buffered (last request
    /// wins) while a transition is in flight.
    pub fn request_transition(&mut self, from: StateId, to: StateId) {
        self.sequencer.request_transition(&mut self.tree, from, to);
    }

    /// Deepest currently-active state.
    pub fn leaf(&self) -> StateId {
        self.tree.leaf(self.tree.root())
    }

    /// Active path from the root to its leaf.
    pub fn active_path(&self) -> Vec<StateId> {
        self.tree.active_path()
    }

    /// Whether a transition is currently in flight.
    pub fn is_transitioning(&self) -> bool {
        self.sequencer.is_transitioning()
    }

    /// Whether [`start`](StateMachine::start) has run.
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Read access to the state tree.
    pub fn tree(&self) -> &StateTree<C> {
        &self.tree
    }

    /// Completed transitions, oldest first.
    pub fn history(&self) -> &TransitionHistory {
        self.sequencer.history()
    }

    /// Capture the active path and activity modes for diagnostics or
    /// persistence.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Re-arm the machine from a snapshot: validates the snapshot against
    /// this tree, restores the active path structurally (no hooks run,
    /// activity modes are not restored), resets the sequencer, and marks
    /// the machine started. Intended for process-restart resume, before
    /// ticking.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        snapshot::apply(self, snapshot)
    }

    pub(crate) fn tree_mut(&mut self) -> &mut StateTree<C> {
        &mut self.tree
    }

    pub(crate) fn sequencer_mut(&mut self) -> &mut TransitionSequencer<C> {
        &mut self.sequencer
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }
}
