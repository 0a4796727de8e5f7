// Shared simulation state: the authoritative world, pending commands and
// the connected sinks

use log::debug;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::physics::PhysicsWorld;
use crate::config::CommandMode;
use crate::core::sync::lock;
use crate::net::broadcast::{BroadcastReport, Broadcaster};
use crate::net::command::{self, Command, CommandOutcome};
use crate::net::snapshot::Snapshot;

/// State shared between the driver loop and every connection task.
///
/// The world and the sink set each sit behind their own lock; neither is
/// held across an await point.
pub struct Simulation {
    world: Mutex<PhysicsWorld>,
    pending: Mutex<VecDeque<Command>>,
    mode: CommandMode,
    broadcaster: Broadcaster,
}

impl Simulation {
    pub fn new(world: PhysicsWorld, mode: CommandMode) -> Self {
        Self {
            world: Mutex::new(world),
            pending: Mutex::new(VecDeque::new()),
            mode,
            broadcaster: Broadcaster::new(),
        }
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Lock the world for inspection or direct mutation
    pub fn world(&self) -> MutexGuard<'_, PhysicsWorld> {
        lock(&self.world)
    }

    /// Decode a raw sink message and submit it. Malformed messages are
    /// dropped.
    pub fn handle_message(&self, text: &str) -> Option<CommandOutcome> {
        match Command::decode(text) {
            Ok(command) => self.submit(command),
            Err(err) => {
                debug!("Dropping inbound message: {}", err);
                None
            }
        }
    }

    /// Apply a command now, or queue it for the next tick in buffered
    /// mode (returns `None` when queued)
    pub fn submit(&self, command: Command) -> Option<CommandOutcome> {
        match self.mode {
            CommandMode::Immediate => Some(command::apply(&mut self.world(), command)),
            CommandMode::Buffered => {
                lock(&self.pending).push_back(command);
                None
            }
        }
    }

    /// Number of queued commands waiting for the next tick
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Run one tick: drain queued commands, step, then publish the new
    /// state to every sink
    pub fn tick(&self) -> BroadcastReport {
        let commands: Vec<Command> = lock(&self.pending).drain(..).collect();

        let snapshot = {
            let mut world = self.world();
            for queued in commands {
                if let CommandOutcome::Rejected(err) = command::apply(&mut world, queued) {
                    debug!("Queued command rejected: {}", err);
                }
            }
            world.step_fixed();
            Snapshot::capture(&world)
        };

        self.broadcaster.publish(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::physics::WorldConfig;
    use crate::net::broadcast::ChannelSink;
    use serde_json::Value;

    fn simulation(mode: CommandMode) -> Simulation {
        let world = PhysicsWorld::from_config(&WorldConfig::default()).unwrap();
        Simulation::new(world, mode)
    }

    #[test]
    fn test_immediate_spawn_applies_at_once() {
        let sim = simulation(CommandMode::Immediate);
        let before = sim.world().len();

        let outcome = sim.handle_message(r#"{"type":"spawn","x":10,"y":10}"#);

        assert!(matches!(outcome, Some(CommandOutcome::Spawned(_))));
        assert_eq!(sim.world().len(), before + 1);
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn test_buffered_spawn_waits_for_tick() {
        let sim = simulation(CommandMode::Buffered);
        let before = sim.world().len();

        assert!(sim.handle_message(r#"{"type":"spawn","x":10,"y":10}"#).is_none());
        assert_eq!(sim.world().len(), before);
        assert_eq!(sim.pending(), 1);

        sim.tick();
        assert_eq!(sim.world().len(), before + 1);
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn test_malformed_message_is_dropped() {
        let sim = simulation(CommandMode::Immediate);
        let before = Snapshot::capture(&sim.world());

        assert!(sim.handle_message("{\"type\":\"teleport\"}").is_none());
        assert!(sim.handle_message("garbage").is_none());
        assert!(sim
            .handle_message(r#"{"type":"force","id":"<nonexistent>","fx":100,"fy":0}"#)
            .is_none());

        assert_eq!(Snapshot::capture(&sim.world()), before);
    }

    #[test]
    fn test_tick_publishes_state() {
        let sim = simulation(CommandMode::Immediate);
        let (sink, mut rx) = ChannelSink::new(4);
        sim.broadcaster().connect(Box::new(sink));

        let report = sim.tick();
        assert_eq!(report.delivered, 1);

        let payload = rx.try_recv().unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["state"].as_array().unwrap().len(), 1);
        // One step of gravity has been applied
        assert!(value["state"][0]["vy"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_tick_survives_failing_sink() {
        let sim = simulation(CommandMode::Immediate);
        let (dead, rx) = ChannelSink::new(4);
        drop(rx);
        let dead_id = sim.broadcaster().connect(Box::new(dead));
        let (live, mut live_rx) = ChannelSink::new(4);
        sim.broadcaster().connect(Box::new(live));

        let report = sim.tick();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.pruned, 1);
        assert!(!sim.broadcaster().is_connected(dead_id));
        assert!(live_rx.try_recv().is_ok());
    }
}
