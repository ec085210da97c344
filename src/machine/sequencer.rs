//! The transition sequencer: owns the in-flight transition.
//!
//! A transition runs as two phases. Phase 1 deactivates every `Active`
//! activity on the exit chain; when it completes, the structural swap moves
//! the active path to the target, and phase 2 activates every `Inactive`
//! activity on the enter chain. While a phase is mid-flight the normal tree
//! update is frozen; on the tick a phase completes, the tree update still
//! runs afterward.
//!
//! Requests arriving mid-flight land in a single pending slot — last request
//! wins, nothing queues. A pending request abandons the in-flight transition
//! at the next phase boundary: buffered during phase 1, the abandoned target
//! is never entered. The pending transition then begins from the machine's
//! live leaf.

use crate::core::{
    ActivityMode, CancelSignal, StateId, StateTree, TransitionHistory, TransitionRecord,
};
use crate::sequence::{NoopPhase, ParallelPhase, PhaseOp, PhaseStep, Sequence, SequentialPhase};
use chrono::Utc;
use tracing::debug;

/// Strategy used to drive each transition phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceStyle {
    /// Operations run one at a time, in gather order.
    Sequential,
    /// All operations start together and settle independently.
    Parallel,
}

/// The swap and phase-2 work captured when a transition begins, applied once
/// phase 1 completes.
struct PendingSwap {
    from: StateId,
    to: StateId,
    enter_chain: Vec<StateId>,
}

/// Drives transitions for one machine; exactly one per machine.
pub struct TransitionSequencer<C> {
    style: SequenceStyle,
    sequence: Option<Box<dyn Sequence<C>>>,
    enter_swap: Option<PendingSwap>,
    pending: Option<(StateId, StateId)>,
    active: Option<(StateId, StateId)>,
    coalesced: bool,
    cancel: Option<CancelSignal>,
    history: TransitionHistory,
}

impl<C> TransitionSequencer<C> {
    pub(crate) fn new(style: SequenceStyle) -> Self {
        Self {
            style,
            sequence: None,
            enter_swap: None,
            pending: None,
            active: None,
            coalesced: false,
            cancel: None,
            history: TransitionHistory::new(),
        }
    }

    /// Whether a transition is currently in flight.
    pub fn is_transitioning(&self) -> bool {
        self.sequence.is_some()
    }

    /// Completed transitions, oldest first.
    pub fn history(&self) -> &TransitionHistory {
        &self.history
    }

    /// Request a transition. Ignored on a self-target. If a transition is
    /// already in flight the request overwrites any previously buffered one;
    /// otherwise it begins immediately.
    pub(crate) fn request_transition(
        &mut self,
        tree: &mut StateTree<C>,
        from: StateId,
        to: StateId,
    ) {
        if from == to {
            return;
        }
        if self.sequence.is_some() {
            debug!(
                from = tree.name(from),
                to = tree.name(to),
                "transition request buffered"
            );
            self.pending = Some((from, to));
            return;
        }
        self.begin_transition(tree, from, to, false);
    }

    /// Advance the machine by one tick.
    ///
    /// Polls the running sequence first; while it is mid-flight nothing else
    /// happens this tick. Once a phase completes, the transition advances or
    /// finishes, and the normal tree walk runs afterward. A request surfaced
    /// by the walk is fed straight back in.
    pub(crate) fn tick(&mut self, tree: &mut StateTree<C>, ctx: &mut C, dt: f32) {
        if self.sequence.is_some() {
            let done = match self.sequence.as_mut() {
                Some(sequence) => sequence.update(tree),
                None => true,
            };
            if !done {
                return;
            }
            self.advance(tree, ctx);
        }
        if let Some((from, to)) = tree.update(ctx, dt) {
            self.request_transition(tree, from, to);
        }
    }

    /// A phase just completed: redirect to a pending request, run the swap
    /// into phase 2, or finish the transition.
    fn advance(&mut self, tree: &mut StateTree<C>, ctx: &mut C) {
        if let Some((_, to)) = self.pending.take() {
            // Abandon the in-flight transition. If phase 1 was still
            // running, the swap never happens and its target is never
            // entered; the pending transition starts from the live leaf.
            let aborted = self.enter_swap.take().is_some();
            self.finish(tree, aborted);
            let from = tree.leaf(tree.root());
            if from != to {
                self.begin_transition(tree, from, to, true);
            }
            return;
        }

        if let Some(swap) = self.enter_swap.take() {
            tree.change_state(swap.from, swap.to, ctx);
            let steps = gather_steps(tree, &swap.enter_chain, PhaseOp::Activate);
            let cancel = self.current_cancel();
            let mut sequence = spawn_sequence(self.style, steps, cancel);
            sequence.start(tree);
            self.sequence = Some(sequence);
            return;
        }

        self.finish(tree, false);
    }

    /// Cancel the prior signal, issue a fresh one, and start phase 1.
    fn begin_transition(
        &mut self,
        tree: &mut StateTree<C>,
        from: StateId,
        to: StateId,
        coalesced: bool,
    ) {
        if let Some(prior) = self.cancel.take() {
            prior.cancel();
        }
        let cancel = CancelSignal::new();
        self.cancel = Some(cancel.clone());

        let lca = tree.lca(from, to);
        let exit_chain = tree.exit_chain(from, lca);
        let enter_chain = tree.enter_chain(to, lca);
        debug!(
            from = tree.name(from),
            to = tree.name(to),
            lca = ?lca.map(|id| tree.name(id)),
            "transition begun"
        );

        let steps = gather_steps(tree, &exit_chain, PhaseOp::Deactivate);
        let mut sequence = spawn_sequence(self.style, steps, cancel);
        sequence.start(tree);
        self.sequence = Some(sequence);
        self.enter_swap = Some(PendingSwap {
            from,
            to,
            enter_chain,
        });
        self.active = Some((from, to));
        self.coalesced = coalesced;
    }

    /// Tear down the in-flight transition; completed transitions are
    /// recorded, abandoned ones are not.
    fn finish(&mut self, tree: &StateTree<C>, aborted: bool) {
        self.sequence = None;
        if let Some((from, to)) = self.active.take() {
            if aborted {
                debug!(
                    from = tree.name(from),
                    to = tree.name(to),
                    "transition abandoned for coalesced request"
                );
            } else {
                debug!(
                    from = tree.name(from),
                    to = tree.name(to),
                    "transition complete"
                );
                let record = TransitionRecord {
                    from: tree.name(from).to_string(),
                    to: tree.name(to).to_string(),
                    timestamp: Utc::now(),
                    coalesced: self.coalesced,
                };
                self.history = self.history.record(record);
            }
        }
    }

    /// Drop any in-flight transition and pending request, cancelling their
    /// signal. Used by snapshot restore.
    pub(crate) fn reset(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.sequence = None;
        self.enter_swap = None;
        self.pending = None;
        self.active = None;
        self.coalesced = false;
    }

    fn current_cancel(&self) -> CancelSignal {
        self.cancel.clone().unwrap_or_default()
    }
}

/// Collect one operation per eligible activity along a chain: `Active`
/// activities for a deactivation phase, `Inactive` for an activation phase.
/// Everything else is already settled (or mid-flight under a cancelled
/// transition) and is skipped.
fn gather_steps<C>(tree: &StateTree<C>, chain: &[StateId], op: PhaseOp) -> Vec<PhaseStep> {
    let mut steps = Vec::new();
    for &state in chain {
        for (index, activity) in tree.activities(state).iter().enumerate() {
            let eligible = match op {
                PhaseOp::Deactivate => activity.mode() == ActivityMode::Active,
                PhaseOp::Activate => activity.mode() == ActivityMode::Inactive,
            };
            if !eligible {
                continue;
            }
            debug!(
                state = tree.name(state),
                activity = activity.name(),
                mode = ?activity.mode(),
                op = ?op,
                "phase step gathered"
            );
            steps.push(PhaseStep::new(state, index, op));
        }
    }
    steps
}

fn spawn_sequence<C>(
    style: SequenceStyle,
    steps: Vec<PhaseStep>,
    cancel: CancelSignal,
) -> Box<dyn Sequence<C>> {
    if steps.is_empty() {
        return Box::new(NoopPhase::new());
    }
    match style {
        SequenceStyle::Sequential => Box::new(SequentialPhase::new(steps, cancel)),
        SequenceStyle::Parallel => Box::new(ParallelPhase::new(steps, cancel)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Behavior, DelayActivity, Progress};

    #[derive(Default)]
    struct Probe {
        entered: Vec<&'static str>,
        exited: Vec<&'static str>,
    }

    struct Noted {
        tag: &'static str,
        initial: Option<StateId>,
    }

    impl Behavior<Probe> for Noted {
        fn initial_child(&self) -> Option<StateId> {
            self.initial
        }

        fn on_enter(&mut self, probe: &mut Probe) {
            probe.entered.push(self.tag);
        }

        fn on_exit(&mut self, probe: &mut Probe) {
            probe.exited.push(self.tag);
        }
    }

    /// Root → { W, X, Y, Z }, initial W; X carries one delay activity.
    fn flat_tree(delay: u32) -> (StateTree<Probe>, [StateId; 5]) {
        let mut tree = StateTree::with_root("Root".to_string());
        let root = tree.root();
        let w = tree.add_child(root, "W".to_string());
        let x = tree.add_child(root, "X".to_string());
        let y = tree.add_child(root, "Y".to_string());
        let z = tree.add_child(root, "Z".to_string());

        tree.set_behavior(
            root,
            Box::new(Noted {
                tag: "root",
                initial: Some(w),
            }),
        );
        tree.set_behavior(w, Box::new(Noted { tag: "w", initial: None }));
        tree.set_behavior(x, Box::new(Noted { tag: "x", initial: None }));
        tree.set_behavior(y, Box::new(Noted { tag: "y", initial: None }));
        tree.set_behavior(z, Box::new(Noted { tag: "z", initial: None }));
        tree.add_activity(x, Box::new(DelayActivity::new("x-fx", delay)));

        (tree, [root, w, x, y, z])
    }

    fn force_active(tree: &mut StateTree<Probe>, state: StateId, index: usize) {
        let signal = CancelSignal::new();
        tree.activity_mut(state, index).activate(&signal);
        while tree.activity_mut(state, index).poll(&signal) == Progress::Pending {}
    }

    #[test]
    fn transition_runs_across_phase_boundary_ticks() {
        let (mut tree, [root, w, x, _, _]) = flat_tree(0);
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        sequencer.request_transition(&mut tree, w, x);
        assert!(sequencer.is_transitioning());
        assert_eq!(tree.leaf(root), w);

        // Phase 1 (no eligible steps) observed done; swap runs; phase 2 set up.
        sequencer.tick(&mut tree, &mut probe, 0.016);
        assert_eq!(tree.leaf(root), x);
        assert!(sequencer.is_transitioning());

        // The swap exited W and entered X.
        assert_eq!(probe.exited, vec!["w"]);
        assert!(probe.entered.contains(&"x"));

        // Phase 2 observed done; transition ends.
        sequencer.tick(&mut tree, &mut probe, 0.016);
        assert!(!sequencer.is_transitioning());
        assert_eq!(sequencer.history().records().len(), 1);
        assert_eq!(sequencer.history().records()[0].from, "W");
        assert_eq!(sequencer.history().records()[0].to, "X");
    }

    #[test]
    fn self_target_requests_are_ignored() {
        let (mut tree, [root, w, _, _, _]) = flat_tree(0);
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        sequencer.request_transition(&mut tree, w, w);
        assert!(!sequencer.is_transitioning());
    }

    #[test]
    fn phase_one_deactivates_only_active_activities_on_the_exit_chain() {
        let (mut tree, [root, w, x, y, _]) = flat_tree(2);
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        // Put the machine on X with its activity active.
        tree.change_state(w, x, &mut probe);
        force_active(&mut tree, x, 0);

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        sequencer.request_transition(&mut tree, x, y);
        assert_eq!(tree.activity_modes(x)[0], ActivityMode::Deactivating);

        sequencer.tick(&mut tree, &mut probe, 0.016);
        assert_eq!(tree.activity_modes(x)[0], ActivityMode::Deactivating);
        assert_eq!(tree.leaf(root), x);

        // The poll that observes phase 1 done also runs the swap.
        sequencer.tick(&mut tree, &mut probe, 0.016);
        assert_eq!(tree.activity_modes(x)[0], ActivityMode::Inactive);
        assert_eq!(tree.leaf(root), y);
    }

    #[test]
    fn coalesced_request_overwrites_and_skips_the_abandoned_target() {
        let (mut tree, [root, w, x, y, z]) = flat_tree(3);
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        tree.change_state(w, x, &mut probe);
        force_active(&mut tree, x, 0);
        probe.entered.clear();

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        // X → Y begins; phase 1 deactivates X's activity over three ticks.
        sequencer.request_transition(&mut tree, x, y);
        sequencer.tick(&mut tree, &mut probe, 0.016);

        // Y → Z arrives mid-phase-1 and lands in the pending slot.
        sequencer.request_transition(&mut tree, y, z);
        for _ in 0..8 {
            sequencer.tick(&mut tree, &mut probe, 0.016);
        }

        assert!(!sequencer.is_transitioning());
        assert_eq!(tree.leaf(root), z);
        // Y was never entered; the buffered request overwrote, not chained.
        assert!(!probe.entered.contains(&"y"));
        assert!(probe.entered.contains(&"z"));

        // Only the redirected transition completed and was recorded.
        let records = sequencer.history().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, "X");
        assert_eq!(records[0].to, "Z");
        assert!(records[0].coalesced);
    }

    #[test]
    fn last_pending_request_wins() {
        let (mut tree, [root, w, x, y, z]) = flat_tree(3);
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        tree.change_state(w, x, &mut probe);
        force_active(&mut tree, x, 0);
        probe.entered.clear();

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        sequencer.request_transition(&mut tree, x, y);
        sequencer.tick(&mut tree, &mut probe, 0.016);

        // Two buffered requests: only the later one survives.
        sequencer.request_transition(&mut tree, x, w);
        sequencer.request_transition(&mut tree, x, z);
        for _ in 0..8 {
            sequencer.tick(&mut tree, &mut probe, 0.016);
        }

        assert_eq!(tree.leaf(root), z);
        assert!(!probe.entered.contains(&"w"));
        assert!(!probe.entered.contains(&"y"));
    }

    #[test]
    fn activities_at_or_above_the_lca_are_untouched() {
        let (mut tree, [root, w, x, y, _]) = flat_tree(1);
        tree.add_activity(root, Box::new(DelayActivity::new("root-fx", 1)));
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        tree.change_state(w, x, &mut probe);
        force_active(&mut tree, x, 0);
        force_active(&mut tree, root, 0);

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        sequencer.request_transition(&mut tree, x, y);
        for _ in 0..6 {
            sequencer.tick(&mut tree, &mut probe, 0.016);
        }

        assert!(!sequencer.is_transitioning());
        assert_eq!(tree.leaf(root), y);
        // Root sits at the LCA; its activity was never deactivated.
        assert_eq!(tree.activity_modes(root)[0], ActivityMode::Active);
        assert_eq!(tree.activity_modes(x)[0], ActivityMode::Inactive);
    }

    #[test]
    fn enter_phase_activates_inactive_activities_on_the_enter_chain() {
        let (mut tree, [root, w, x, _, _]) = flat_tree(2);
        let mut probe = Probe::default();
        tree.enter(root, &mut probe);

        let mut sequencer = TransitionSequencer::new(SequenceStyle::Parallel);
        sequencer.request_transition(&mut tree, w, x);

        // Tick 1: empty phase 1 done, swap, phase 2 begins X's activity.
        sequencer.tick(&mut tree, &mut probe, 0.016);
        assert_eq!(tree.leaf(root), x);
        assert_eq!(tree.activity_modes(x)[0], ActivityMode::Activating);

        sequencer.tick(&mut tree, &mut probe, 0.016);
        sequencer.tick(&mut tree, &mut probe, 0.016);
        assert!(!sequencer.is_transitioning());
        assert_eq!(tree.activity_modes(x)[0], ActivityMode::Active);
    }

    #[test]
    fn exit_and_enter_chains_for_the_player_scenario() {
        // Root → { Grounded → { Idle, Move }, Airborne }
        let mut tree: StateTree<Probe> = StateTree::with_root("Root".to_string());
        let root = tree.root();
        let grounded = tree.add_child(root, "Grounded".to_string());
        let _idle = tree.add_child(grounded, "Idle".to_string());
        let mv = tree.add_child(grounded, "Move".to_string());
        let airborne = tree.add_child(root, "Airborne".to_string());

        let lca = tree.lca(mv, airborne);
        assert_eq!(lca, Some(root));
        assert_eq!(tree.exit_chain(mv, lca), vec![mv, grounded]);
        assert_eq!(tree.enter_chain(airborne, lca), vec![airborne]);
    }
}
