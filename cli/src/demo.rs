//! Bundled demo host and suites for `tickbridge run`.
//!
//! `DemoWorld` is a tiny tick-driven simulation. It holds an `Rc`, so it is
//! not `Send` and can only live on the host loop thread that built it.

use std::rc::Rc;
use std::thread::{self, ThreadId};

use tickbridge_core::{BootError, Host};
use tickbridge_runner::{SuiteRegistry, TestSuite};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: u32,
    pub kind: String,
    pub x: i64,
    pub velocity: i64,
}

#[derive(Debug)]
pub struct DemoWorld {
    tick: u64,
    next_id: u32,
    entities: Vec<Entity>,
    args: Vec<String>,
    owner: Rc<ThreadId>,
}

impl DemoWorld {
    /// Load the world with the arguments given after `run --`.
    pub fn boot(args: Vec<String>) -> Result<Self, BootError> {
        let owner = thread::current().id();
        tracing::info!(thread = ?thread::current().name(), ?args, "Demo world loaded");
        Ok(Self {
            tick: 0,
            next_id: 1,
            entities: Vec::new(),
            args,
            owner: Rc::new(owner),
        })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn spawn(&mut self, kind: &str, velocity: i64) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(Entity {
            id,
            kind: kind.to_string(),
            x: 0,
            velocity,
        });
        id
    }

    pub fn despawn(&mut self, id: u32) -> bool {
        let before = self.entities.len();
        self.entities.retain(|entity| entity.id != id);
        self.entities.len() != before
    }

    pub fn entity(&self, id: u32) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn find_kind(&self, kind: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.kind == kind)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn owner(&self) -> ThreadId {
        *self.owner
    }
}

impl Host for DemoWorld {
    fn tick(&mut self) {
        self.tick += 1;
        for entity in &mut self.entities {
            entity.x += entity.velocity;
        }
    }

    fn shutdown(&mut self) {
        tracing::info!(
            ticks = self.tick,
            entities = self.entities.len(),
            "Demo world saved"
        );
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), String> {
    if condition { Ok(()) } else { Err(message()) }
}

/// Demo suites. `offline_checks` carries a foreign marker and is listed but
/// never run on the host loop.
pub fn suites() -> anyhow::Result<SuiteRegistry<DemoWorld>> {
    let mut registry = SuiteRegistry::new();

    registry.register(
        TestSuite::new("world_basics")?
            .case("loop_has_ticked", |world: &mut DemoWorld| {
                ensure(world.tick_count() > 0, || {
                    "host loop has not ticked yet".to_string()
                })
            })?
            .case("spawn_and_despawn", |world: &mut DemoWorld| {
                let before = world.entity_count();
                let id = world.spawn("marker", 0);
                ensure(world.entity_count() == before + 1, || {
                    format!("expected {} entities", before + 1)
                })?;
                ensure(world.despawn(id), || format!("entity {id} was not removed"))
            })?,
    )?;

    registry.register(
        TestSuite::new("entity_motion")?
            .case("tick_applies_velocity", |world: &mut DemoWorld| {
                let id = world.spawn("probe", 3);
                world.tick();
                let x = world.entity(id).map_or(0, |entity| entity.x);
                world.despawn(id);
                ensure(x == 3, || format!("expected x = 3 after one tick, got {x}"))
            })?
            .case("spawn_runner", |world: &mut DemoWorld| {
                world.spawn("runner", 1);
                Ok(())
            })?
            .case("runner_moved_between_cases", |world: &mut DemoWorld| {
                let x = world.find_kind("runner").map_or(0, |entity| entity.x);
                ensure(x > 0, || "runner did not move between cases".to_string())
            })?,
    )?;

    registry.register(
        TestSuite::new("thread_affinity")?.case(
            "runs_on_host_loop_thread",
            |world: &mut DemoWorld| {
                let current = thread::current();
                ensure(current.name() == Some("host-loop"), || {
                    format!("ran on thread {:?}", current.name())
                })?;
                ensure(current.id() == world.owner(), || {
                    "ran on a different thread than the one that built the world".to_string()
                })
            },
        )?,
    )?;

    registry.register(
        TestSuite::new("offline_checks")?
            .with_marker("plain")?
            .case("not_run_on_host_loop", |_: &mut DemoWorld| {
                Err("suites with a foreign marker must not run on the host loop".to_string())
            })?,
    )?;

    Ok(registry)
}
