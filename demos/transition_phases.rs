//! Transition Phases
//!
//! This example contrasts the two phase strategies. A `Prep` state carries
//! three delay activities; transitioning into it activates them, and
//! transitioning out deactivates them. Run sequentially the operations
//! settle one after another; run in parallel they all start together.
//!
//! Run with: cargo run --example transition_phases

use choreo::{
    ActivityMode, Behavior, DelayActivity, SequenceStyle, StateId, StateMachine,
    StateMachineBuilder,
};

struct Descend {
    child: StateId,
}

impl Behavior<()> for Descend {
    fn initial_child(&self) -> Option<StateId> {
        Some(self.child)
    }
}

fn build(style: SequenceStyle) -> (StateMachine<()>, [StateId; 3]) {
    let mut builder = StateMachineBuilder::new();
    let root = builder.root("Root");
    let boot = builder.child(root, "Boot");
    let prep = builder.child(root, "Prep");
    let run = builder.child(root, "Run");

    builder.behavior(root, Descend { child: boot });
    builder.activity(prep, DelayActivity::new("cache", 2));
    builder.activity(prep, DelayActivity::new("audio", 1));
    builder.activity(prep, DelayActivity::new("shaders", 3));
    builder.sequence_style(style);

    let machine = builder.build().expect("phase tree builds");
    (machine, [boot, prep, run])
}

fn mode_tag(mode: ActivityMode) -> &'static str {
    match mode {
        ActivityMode::Inactive => "inactive",
        ActivityMode::Activating => "activating",
        ActivityMode::Active => "active",
        ActivityMode::Deactivating => "deactivating",
    }
}

fn drive(style: SequenceStyle) {
    println!("--- {style:?} ---");
    let (mut machine, [boot, prep, run]) = build(style);
    let mut ctx = ();
    machine.start(&mut ctx);

    machine.request_transition(boot, prep);
    let mut tick = 0;
    while machine.is_transitioning() {
        machine.tick(&mut ctx, 1.0 / 60.0);
        tick += 1;
        let modes = machine
            .tree()
            .activity_modes(prep)
            .into_iter()
            .map(mode_tag)
            .collect::<Vec<_>>()
            .join(", ");
        println!("tick {tick:2} (enter): {modes}");
    }

    machine.request_transition(prep, run);
    while machine.is_transitioning() {
        machine.tick(&mut ctx, 1.0 / 60.0);
        tick += 1;
        let modes = machine
            .tree()
            .activity_modes(prep)
            .into_iter()
            .map(mode_tag)
            .collect::<Vec<_>>()
            .join(", ");
        println!("tick {tick:2} (exit):  {modes}");
    }

    println!("settled after {tick} ticks\n");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("=== Transition Phases ===\n");
    drive(SequenceStyle::Sequential);
    drive(SequenceStyle::Parallel);

    // A snapshot captures where the machine ended up.
    let (mut machine, [boot, prep, _]) = build(SequenceStyle::Parallel);
    let mut ctx = ();
    machine.start(&mut ctx);
    machine.request_transition(boot, prep);
    for _ in 0..12 {
        machine.tick(&mut ctx, 1.0 / 60.0);
    }
    let snapshot = machine.snapshot();
    println!("snapshot:\n{}", snapshot.to_json().expect("snapshot encodes"));
}
