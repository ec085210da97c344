//! The state tree: a single-rooted, acyclic arena of states.
//!
//! Each state owns zero or more activities and at most one currently-active
//! child; exactly one root-to-leaf path is active at a time. The tree's
//! topology is fixed once built — only the active-child links and activity
//! modes mutate at runtime.

use super::activity::{Activity, ActivityMode};
use std::collections::HashSet;

/// Handle to a state in a [`StateTree`].
///
/// An arena index, fixed at construction. Parent back-references are plain
/// indices too, so the tree never forms a reference cycle. Handles are only
/// meaningful for the tree that issued them; using a foreign handle is a
/// programming error, not a recoverable runtime condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    /// Position of the state in its arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Polymorphic hooks implemented per concrete state variant.
///
/// `C` is the caller-owned context threaded `&mut` through every hook; a
/// transition predicate may read and mutate it (for example, consuming a
/// one-shot input flag). Hooks must not assume exactly-once evaluation: a
/// coalesced pending transition can cause the predicate to run again.
///
/// All hooks have no-op defaults, and `()` implements the trait with every
/// default — states that are pure structure need no behavior at all.
///
/// # Example
///
/// ```rust
/// use choreo::{Behavior, StateId};
///
/// struct Door { open: bool }
///
/// struct Closed { open_state: StateId }
///
/// impl Behavior<Door> for Closed {
///     fn transition(&mut self, door: &mut Door) -> Option<StateId> {
///         door.open.then_some(self.open_state)
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Behavior<C>: Send {
    /// The child to auto-enter when this state becomes active; `None` marks
    /// a leaf.
    fn initial_child(&self) -> Option<StateId> {
        None
    }

    /// Evaluated once per tick while no transition is in flight; a `Some`
    /// result is a request to move to the returned target.
    fn transition(&mut self, ctx: &mut C) -> Option<StateId> {
        None
    }

    /// Invoked when the state becomes active.
    fn on_enter(&mut self, ctx: &mut C) {}

    /// Invoked when the state stops being active.
    fn on_exit(&mut self, ctx: &mut C) {}

    /// Invoked once per tick while active, after the active child's update.
    fn on_update(&mut self, ctx: &mut C, dt: f32) {}
}

impl<C> Behavior<C> for () {}

struct Node<C> {
    name: String,
    parent: Option<StateId>,
    children: Vec<StateId>,
    active_child: Option<StateId>,
    behavior: Box<dyn Behavior<C>>,
    activities: Vec<Box<dyn Activity>>,
}

impl<C> Node<C> {
    fn new(name: String, parent: Option<StateId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            active_child: None,
            behavior: Box::new(()),
            activities: Vec::new(),
        }
    }
}

/// Arena owning every state of one machine.
///
/// Built through [`StateMachineBuilder`](crate::builder::StateMachineBuilder);
/// children are only ever created under an existing parent, so the tree is
/// single-rooted and acyclic by construction.
pub struct StateTree<C> {
    nodes: Vec<Node<C>>,
    root: StateId,
}

impl<C> StateTree<C> {
    pub(crate) fn with_root(name: String) -> Self {
        Self {
            nodes: vec![Node::new(name, None)],
            root: StateId(0),
        }
    }

    pub(crate) fn add_child(&mut self, parent: StateId, name: String) -> StateId {
        let id = StateId(self.nodes.len());
        self.nodes.push(Node::new(name, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn set_behavior(&mut self, id: StateId, behavior: Box<dyn Behavior<C>>) {
        self.nodes[id.0].behavior = behavior;
    }

    pub(crate) fn add_activity(&mut self, id: StateId, activity: Box<dyn Activity>) {
        self.nodes[id.0].activities.push(activity);
    }

    /// The root state.
    pub fn root(&self) -> StateId {
        self.root
    }

    /// Number of states in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every state, in arena order.
    pub fn states(&self) -> impl Iterator<Item = StateId> {
        (0..self.nodes.len()).map(StateId)
    }

    /// Display name given at build time.
    pub fn name(&self, id: StateId) -> &str {
        &self.nodes[id.0].name
    }

    /// Fixed parent back-reference; `None` for the root.
    pub fn parent(&self, id: StateId) -> Option<StateId> {
        self.nodes[id.0].parent
    }

    /// Children in declaration order.
    pub fn children(&self, id: StateId) -> &[StateId] {
        &self.nodes[id.0].children
    }

    /// The currently-active child, if any.
    pub fn active_child(&self, id: StateId) -> Option<StateId> {
        self.nodes[id.0].active_child
    }

    /// First state with the given name, in arena order.
    pub fn state_named(&self, name: &str) -> Option<StateId> {
        self.states().find(|&id| self.nodes[id.0].name == name)
    }

    /// Deepest currently-active descendant (the leaf of the active path).
    pub fn leaf(&self, id: StateId) -> StateId {
        let mut state = id;
        while let Some(child) = self.nodes[state.0].active_child {
            state = child;
        }
        state
    }

    /// Active path from the root to its leaf, in root-to-leaf order.
    pub fn active_path(&self) -> Vec<StateId> {
        let mut path = vec![self.root];
        let mut state = self.root;
        while let Some(child) = self.nodes[state.0].active_child {
            path.push(child);
            state = child;
        }
        path
    }

    /// Lazy walk from a state up to the root: self, parent, …, root.
    ///
    /// The iterator is finite and restartable — call again for a fresh walk.
    pub fn path_to_root(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        std::iter::successors(Some(id), move |&state| self.parent(state))
    }

    /// Lowest common ancestor of two states.
    ///
    /// Walks `a`'s ancestor chain into a set, then returns the first member
    /// of `b`'s chain found in it — O(depth). `None` only if the states
    /// share no root, which cannot occur within one tree.
    pub fn lca(&self, a: StateId, b: StateId) -> Option<StateId> {
        let ancestors: HashSet<StateId> = self.path_to_root(a).collect();
        self.path_to_root(b).find(|id| ancestors.contains(id))
    }

    /// Modes of the state's activities, in declaration order.
    pub fn activity_modes(&self, id: StateId) -> Vec<ActivityMode> {
        self.nodes[id.0]
            .activities
            .iter()
            .map(|activity| activity.mode())
            .collect()
    }

    pub(crate) fn activities(&self, id: StateId) -> &[Box<dyn Activity>] {
        &self.nodes[id.0].activities
    }

    pub(crate) fn activity_mut(&mut self, id: StateId, index: usize) -> &mut dyn Activity {
        &mut *self.nodes[id.0].activities[index]
    }

    /// States to exit when leaving `from`: `from` up through its ancestors,
    /// stopping before the LCA, in leaf-to-root order.
    pub(crate) fn exit_chain(&self, from: StateId, lca: Option<StateId>) -> Vec<StateId> {
        let mut chain = Vec::new();
        let mut state = Some(from);
        while let Some(id) = state {
            if Some(id) == lca {
                break;
            }
            chain.push(id);
            state = self.parent(id);
        }
        chain
    }

    /// States to enter when arriving at `to`: the same walk, reversed into
    /// root-to-leaf order.
    pub(crate) fn enter_chain(&self, to: StateId, lca: Option<StateId>) -> Vec<StateId> {
        let mut chain = self.exit_chain(to, lca);
        chain.reverse();
        chain
    }

    /// Register with the parent and run the enter hook, without descending.
    fn enter_node(&mut self, id: StateId, ctx: &mut C) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].active_child = Some(id);
        }
        self.nodes[id.0].behavior.on_enter(ctx);
    }

    /// Enter a state and descend its initial-child chain, root-to-leaf.
    pub(crate) fn enter(&mut self, id: StateId, ctx: &mut C) {
        self.enter_node(id, ctx);
        let mut current = id;
        while let Some(next) = self.nodes[current.0].behavior.initial_child() {
            self.enter_node(next, ctx);
            current = next;
        }
    }

    /// Exit a state: active child first (leaf-to-root order), then clear the
    /// link and run the exit hook.
    pub(crate) fn exit(&mut self, id: StateId, ctx: &mut C) {
        if let Some(child) = self.nodes[id.0].active_child {
            self.exit(child, ctx);
        }
        self.nodes[id.0].active_child = None;
        self.nodes[id.0].behavior.on_exit(ctx);
    }

    /// Walk the active tree for one tick, starting at the root.
    ///
    /// Each active state evaluates its transition predicate first; a `Some`
    /// result is returned as a `(from, target)` request and short-circuits
    /// the rest of that subtree's update for this tick. Otherwise the active
    /// child updates before the state's own update hook.
    pub(crate) fn update(&mut self, ctx: &mut C, dt: f32) -> Option<(StateId, StateId)> {
        let root = self.root;
        self.update_walk(root, ctx, dt)
    }

    fn update_walk(&mut self, id: StateId, ctx: &mut C, dt: f32) -> Option<(StateId, StateId)> {
        if let Some(target) = self.nodes[id.0].behavior.transition(ctx) {
            return Some((id, target));
        }
        let request = match self.nodes[id.0].active_child {
            Some(child) => self.update_walk(child, ctx, dt),
            None => None,
        };
        self.nodes[id.0].behavior.on_update(ctx, dt);
        request
    }

    /// Structural swap from `from` to `to`: exit up to the shared ancestor,
    /// then enter down to the target. No activity work — topology and
    /// enter/exit hooks only. No-op on equal endpoints.
    ///
    /// Each exit-chain state exits exactly once: the topmost chain state's
    /// recursive exit already covers everything beneath it. On the way down,
    /// only the final enter-chain state descends its initial-child chain —
    /// the chain itself dictates the deeper child for the intermediates.
    pub(crate) fn change_state(&mut self, from: StateId, to: StateId, ctx: &mut C) {
        if from == to {
            return;
        }
        let lca = self.lca(from, to);
        let exit_chain = self.exit_chain(from, lca);
        if let Some(&top) = exit_chain.last() {
            self.exit(top, ctx);
        }
        let enter_chain = self.enter_chain(to, lca);
        if let Some((&target, intermediates)) = enter_chain.split_last() {
            for &state in intermediates {
                self.enter_node(state, ctx);
            }
            self.enter(target, ctx);
        }
    }

    /// Re-arm the active-child links along a root-to-leaf path, clearing all
    /// others. No hooks run. Used by snapshot restore.
    pub(crate) fn force_active_path(&mut self, path: &[StateId]) {
        for node in &mut self.nodes {
            node.active_child = None;
        }
        for pair in path.windows(2) {
            self.nodes[pair[0].0].active_child = Some(pair[1]);
        }
    }
}
