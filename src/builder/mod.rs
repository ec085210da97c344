//! Builder for constructing state machines.
//!
//! The tree is declared explicitly: reserve ids with [`root`] and [`child`]
//! first, then attach behaviors and activities to the ids, then build.
//! Because children are only ever declared under an existing parent, every
//! state is registered exactly once, reachable from the root, and the tree
//! cannot form a cycle — no runtime discovery pass is needed.
//!
//! [`root`]: StateMachineBuilder::root
//! [`child`]: StateMachineBuilder::child

pub mod error;

pub use error::BuildError;

use crate::core::{Activity, Behavior, StateId, StateTree};
use crate::machine::{SequenceStyle, StateMachine};

/// Fluent builder producing a [`StateMachine`].
///
/// States never given a behavior keep the no-op default, which suits pure
/// container leaves. Structural misuse (a foreign id, a second root, a
/// duplicate behavior) is recorded and reported by [`build`], first problem
/// wins.
///
/// [`build`]: StateMachineBuilder::build
///
/// # Example
///
/// ```rust
/// use choreo::{SequenceStyle, StateMachineBuilder};
///
/// let mut builder = StateMachineBuilder::<()>::new();
/// let root = builder.root("Root");
/// let on = builder.child(root, "On");
/// let _off = builder.child(root, "Off");
/// builder.sequence_style(SequenceStyle::Sequential);
///
/// let machine = builder.build().unwrap();
/// assert_eq!(machine.tree().children(root).len(), 2);
/// # let _ = on;
/// ```
pub struct StateMachineBuilder<C> {
    tree: Option<StateTree<C>>,
    defined: Vec<bool>,
    style: SequenceStyle,
    error: Option<BuildError>,
}

impl<C> StateMachineBuilder<C> {
    pub fn new() -> Self {
        Self {
            tree: None,
            defined: Vec::new(),
            style: SequenceStyle::Parallel,
            error: None,
        }
    }

    /// Declare the root state. Must be called exactly once, before any
    /// children.
    pub fn root(&mut self, name: impl Into<String>) -> StateId {
        if let Some(tree) = &self.tree {
            let id = tree.root();
            self.record(BuildError::DuplicateRoot);
            return id;
        }
        let tree = StateTree::with_root(name.into());
        let id = tree.root();
        self.tree = Some(tree);
        self.defined.push(false);
        id
    }

    /// Declare a state under an existing parent.
    pub fn child(&mut self, parent: StateId, name: impl Into<String>) -> StateId {
        if !self.knows(parent) {
            self.record(BuildError::ForeignState(parent.index()));
            return parent;
        }
        if let Some(tree) = self.tree.as_mut() {
            let id = tree.add_child(parent, name.into());
            self.defined.push(false);
            return id;
        }
        parent
    }

    /// Attach the state's behavior. At most once per state.
    pub fn behavior(&mut self, id: StateId, behavior: impl Behavior<C> + 'static) {
        if !self.knows(id) {
            self.record(BuildError::ForeignState(id.index()));
            return;
        }
        if self.defined[id.index()] {
            let state = self.name_of(id);
            self.record(BuildError::DuplicateBehavior { state });
            return;
        }
        self.defined[id.index()] = true;
        if let Some(tree) = self.tree.as_mut() {
            tree.set_behavior(id, Box::new(behavior));
        }
    }

    /// Attach an activity to a state. Activities keep declaration order and
    /// the list is fixed after build.
    pub fn activity(&mut self, id: StateId, activity: impl Activity + 'static) {
        if !self.knows(id) {
            self.record(BuildError::ForeignState(id.index()));
            return;
        }
        if let Some(tree) = self.tree.as_mut() {
            tree.add_activity(id, Box::new(activity));
        }
    }

    /// Strategy used to drive each transition phase. Defaults to
    /// [`SequenceStyle::Parallel`].
    pub fn sequence_style(&mut self, style: SequenceStyle) {
        self.style = style;
    }

    /// Build the machine. Reports the first structural problem recorded
    /// while declaring the tree.
    pub fn build(self) -> Result<StateMachine<C>, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let tree = self.tree.ok_or(BuildError::MissingRoot)?;
        Ok(StateMachine::from_tree(tree, self.style))
    }

    fn knows(&self, id: StateId) -> bool {
        self.tree
            .as_ref()
            .is_some_and(|tree| id.index() < tree.len())
    }

    fn name_of(&self, id: StateId) -> String {
        self.tree
            .as_ref()
            .map(|tree| tree.name(id).to_string())
            .unwrap_or_default()
    }

    fn record(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl<C> Default for StateMachineBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}
