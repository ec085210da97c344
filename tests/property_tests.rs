//! Property-based tests for the state tree and transition machinery.
//!
//! These tests use proptest to verify structural properties over many
//! randomly generated trees and request sequences.

use choreo::{
    Activity, ActivityMode, Behavior, CancelSignal, DelayActivity, Progress, StateId,
    StateMachine, StateMachineBuilder,
};
use proptest::prelude::*;

/// Behavior that descends into a fixed child on enter, requests nothing.
struct Descend {
    child: Option<StateId>,
}

impl Behavior<()> for Descend {
    fn initial_child(&self) -> Option<StateId> {
        self.child
    }
}

/// Random tree shape as a parent vector: `parents[i]` is the parent of
/// state `i + 1` and always precedes it, so the shape is a tree by
/// construction.
fn tree_shape() -> impl Strategy<Value = Vec<usize>> {
    (2usize..10).prop_flat_map(|n| {
        (1..n)
            .map(|i| (0..i).boxed())
            .collect::<Vec<BoxedStrategy<usize>>>()
    })
}

/// Build a machine from a parent vector. Every state descends into its
/// first declared child; even-indexed states carry a delay activity.
fn build_machine(parents: &[usize]) -> (StateMachine<()>, Vec<StateId>) {
    let mut builder = StateMachineBuilder::new();
    let root = builder.root("S0");
    let mut ids = vec![root];
    for (i, &parent) in parents.iter().enumerate() {
        let id = builder.child(ids[parent], format!("S{}", i + 1));
        ids.push(id);
    }

    let mut first_child: Vec<Option<StateId>> = vec![None; ids.len()];
    for (i, &parent) in parents.iter().enumerate() {
        if first_child[parent].is_none() {
            first_child[parent] = Some(ids[i + 1]);
        }
    }

    for (i, &id) in ids.iter().enumerate() {
        builder.behavior(id, Descend {
            child: first_child[i],
        });
        if i % 2 == 0 {
            builder.activity(id, DelayActivity::new(format!("fx{i}"), (i % 3) as u32));
        }
    }

    let machine = builder.build().expect("generated tree builds");
    (machine, ids)
}

/// The active path must be contiguous: rooted at the root, every link a
/// declared parent/child edge, ending at the leaf.
fn assert_contiguous_active_path(machine: &StateMachine<()>) {
    let path = machine.active_path();
    assert_eq!(path[0], machine.tree().root());
    for pair in path.windows(2) {
        assert!(machine.tree().children(pair[0]).contains(&pair[1]));
    }
    assert_eq!(*path.last().expect("path is never empty"), machine.leaf());
}

proptest! {
    #[test]
    fn lca_is_symmetric(parents in tree_shape(), a in 0usize..16, b in 0usize..16) {
        let (machine, ids) = build_machine(&parents);
        let a = ids[a % ids.len()];
        let b = ids[b % ids.len()];

        prop_assert_eq!(machine.tree().lca(a, b), machine.tree().lca(b, a));
    }

    #[test]
    fn lca_is_reflexive(parents in tree_shape(), a in 0usize..16) {
        let (machine, ids) = build_machine(&parents);
        let a = ids[a % ids.len()];

        prop_assert_eq!(machine.tree().lca(a, a), Some(a));
    }

    #[test]
    fn lca_with_the_root_is_the_root(parents in tree_shape(), a in 0usize..16) {
        let (machine, ids) = build_machine(&parents);
        let root = machine.tree().root();
        let a = ids[a % ids.len()];

        prop_assert_eq!(machine.tree().lca(root, a), Some(root));
    }

    #[test]
    fn lca_lies_on_both_ancestor_chains(parents in tree_shape(), a in 0usize..16, b in 0usize..16) {
        let (machine, ids) = build_machine(&parents);
        let a = ids[a % ids.len()];
        let b = ids[b % ids.len()];

        let lca = machine.tree().lca(a, b).expect("single-rooted tree");
        let a_chain: Vec<StateId> = machine.tree().path_to_root(a).collect();
        let b_chain: Vec<StateId> = machine.tree().path_to_root(b).collect();
        prop_assert!(a_chain.contains(&lca));
        prop_assert!(b_chain.contains(&lca));
    }

    #[test]
    fn leaf_after_start_is_the_initial_child_fixpoint(parents in tree_shape()) {
        let (mut machine, _ids) = build_machine(&parents);
        let mut ctx = ();
        machine.start(&mut ctx);

        // Follow first declared children from the root by hand.
        let mut expected = machine.tree().root();
        loop {
            match machine.tree().children(expected).first() {
                Some(&child) => expected = child,
                None => break,
            }
        }

        prop_assert_eq!(machine.leaf(), expected);
    }

    #[test]
    fn delay_activity_modes_progress_monotonically(ticks in 0u32..6) {
        let signal = CancelSignal::new();
        let mut activity = DelayActivity::new("probe", ticks);
        let mut observed = vec![activity.mode()];

        activity.activate(&signal);
        observed.push(activity.mode());
        while activity.poll(&signal) == Progress::Pending {
            observed.push(activity.mode());
        }
        observed.push(activity.mode());

        activity.deactivate(&signal);
        observed.push(activity.mode());
        while activity.poll(&signal) == Progress::Pending {
            observed.push(activity.mode());
        }
        observed.push(activity.mode());

        // Modes only ever step forward through the cycle, never skipping.
        let legal = |from: ActivityMode, to: ActivityMode| {
            from == to
                || matches!(
                    (from, to),
                    (ActivityMode::Inactive, ActivityMode::Activating)
                        | (ActivityMode::Activating, ActivityMode::Active)
                        | (ActivityMode::Active, ActivityMode::Deactivating)
                        | (ActivityMode::Deactivating, ActivityMode::Inactive)
                )
        };
        for pair in observed.windows(2) {
            prop_assert!(legal(pair[0], pair[1]), "illegal step {:?} -> {:?}", pair[0], pair[1]);
        }
        prop_assert_eq!(*observed.first().unwrap(), ActivityMode::Inactive);
        prop_assert_eq!(*observed.last().unwrap(), ActivityMode::Inactive);
    }

    #[test]
    fn request_storms_leave_a_contiguous_active_path(
        parents in tree_shape(),
        ops in prop::collection::vec((0usize..16, 0usize..16, 0usize..4), 1..8),
    ) {
        let (mut machine, ids) = build_machine(&parents);
        let mut ctx = ();
        machine.start(&mut ctx);

        for (from, to, ticks) in ops {
            let from = ids[from % ids.len()];
            let to = ids[to % ids.len()];
            machine.request_transition(from, to);
            for _ in 0..ticks {
                machine.tick(&mut ctx, 0.016);
            }
        }

        // Let every in-flight and pending transition settle.
        for _ in 0..100 {
            machine.tick(&mut ctx, 0.016);
        }

        prop_assert!(!machine.is_transitioning());
        assert_contiguous_active_path(&machine);
    }
}
