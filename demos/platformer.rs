//! Scripted Platformer
//!
//! This example drives the classic platformer tree
//! `Root → { Grounded → { Idle, Move }, Airborne }` with a scripted input
//! feed instead of a real input device.
//!
//! Key concepts:
//! - Transition predicates reading and mutating a caller-owned context
//! - One-shot input flags consumed inside a predicate
//! - Activities activating and deactivating along transition chains
//!
//! Run with: cargo run --example platformer

use choreo::{Behavior, DelayActivity, InstantActivity, StateId, StateMachineBuilder};

#[derive(Default)]
struct PlayerContext {
    move_x: f32,
    velocity_x: f32,
    grounded: bool,
    jump_pressed: bool,
    move_speed: f32,
    accel: f32,
}

struct PlayerRoot {
    grounded: StateId,
}

impl Behavior<PlayerContext> for PlayerRoot {
    fn initial_child(&self) -> Option<StateId> {
        Some(self.grounded)
    }
}

struct Grounded {
    idle: StateId,
    airborne: StateId,
}

impl Behavior<PlayerContext> for Grounded {
    fn initial_child(&self) -> Option<StateId> {
        Some(self.idle)
    }

    fn transition(&mut self, ctx: &mut PlayerContext) -> Option<StateId> {
        if ctx.jump_pressed {
            // One-shot input: consumed here, safe to re-observe if a
            // coalesced request re-evaluates the predicate.
            ctx.jump_pressed = false;
            return Some(self.airborne);
        }
        (!ctx.grounded).then_some(self.airborne)
    }
}

struct Idle {
    mv: StateId,
}

impl Behavior<PlayerContext> for Idle {
    fn transition(&mut self, ctx: &mut PlayerContext) -> Option<StateId> {
        (ctx.move_x.abs() > 0.01).then_some(self.mv)
    }

    fn on_enter(&mut self, ctx: &mut PlayerContext) {
        ctx.velocity_x = 0.0;
    }
}

struct Move {
    idle: StateId,
}

impl Behavior<PlayerContext> for Move {
    fn transition(&mut self, ctx: &mut PlayerContext) -> Option<StateId> {
        (ctx.move_x.abs() <= 0.01).then_some(self.idle)
    }

    fn on_update(&mut self, ctx: &mut PlayerContext, dt: f32) {
        let target = ctx.move_x * ctx.move_speed;
        ctx.velocity_x = move_towards(ctx.velocity_x, target, ctx.accel * dt);
    }
}

struct Airborne {
    grounded: StateId,
}

impl Behavior<PlayerContext> for Airborne {
    fn transition(&mut self, ctx: &mut PlayerContext) -> Option<StateId> {
        ctx.grounded.then_some(self.grounded)
    }
}

fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut builder = StateMachineBuilder::new();
    let root = builder.root("Root");
    let grounded = builder.child(root, "Grounded");
    let idle = builder.child(grounded, "Idle");
    let mv = builder.child(grounded, "Move");
    let airborne = builder.child(root, "Airborne");

    builder.behavior(root, PlayerRoot { grounded });
    builder.behavior(grounded, Grounded { idle, airborne });
    builder.behavior(idle, Idle { mv });
    builder.behavior(mv, Move { idle });
    builder.behavior(airborne, Airborne { grounded });

    builder.activity(grounded, InstantActivity::new("ground-tint"));
    builder.activity(airborne, DelayActivity::new("wind-up", 2));

    let mut machine = builder.build().expect("player tree builds");
    let mut ctx = PlayerContext {
        grounded: true,
        move_speed: 6.0,
        accel: 40.0,
        ..PlayerContext::default()
    };

    println!("=== Scripted Platformer ===\n");

    let mut last_path = String::new();
    for frame in 0..48 {
        // Scripted input feed.
        match frame {
            6 => ctx.move_x = 1.0,
            18 => ctx.grounded = false,
            30 => ctx.grounded = true,
            38 => {
                ctx.move_x = 0.0;
                ctx.jump_pressed = true;
            }
            _ => {}
        }

        machine.tick(&mut ctx, 1.0 / 60.0);

        let path = machine
            .active_path()
            .into_iter()
            .map(|id| machine.tree().name(id).to_string())
            .collect::<Vec<_>>()
            .join(" > ");
        if path != last_path {
            println!("frame {frame:2}: {path}  (vx = {:.2})", ctx.velocity_x);
            last_path = path;
        }
    }

    println!("\ntransitions completed: {}", machine.history().records().len());
    println!("history path: {:?}", machine.history().path());
}
