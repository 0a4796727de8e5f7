// Simulation driver loop
//
// Ticks the shared simulation at a fixed rate and publishes a snapshot
// after every step. The loop runs until the shutdown signal flips.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::simulation::Simulation;

/// Default tick rate (30 updates per second)
pub const DEFAULT_TICK_HZ: f32 = 30.0;

/// Log a summary every this many ticks
const SUMMARY_INTERVAL: u64 = 300;

/// Wall-clock period for a timestep, falling back to the default rate
/// when the timestep does not map to a non-zero `Duration`
pub fn tick_period(timestep: f32) -> Duration {
    Duration::try_from_secs_f32(timestep)
        .ok()
        .filter(|period| !period.is_zero())
        .unwrap_or_else(|| Duration::from_secs_f32(1.0 / DEFAULT_TICK_HZ))
}

/// Fixed-rate driver for a shared simulation
pub struct GameLoop {
    sim: Arc<Simulation>,

    /// Wall-clock time between ticks
    tick_interval: Duration,

    /// Total ticks executed
    tick_count: u64,

    /// Sinks pruned over the loop's lifetime
    pruned_total: u64,
}

impl GameLoop {
    /// Create a loop ticking at the world's own timestep
    pub fn new(sim: Arc<Simulation>) -> Self {
        let tick_interval = tick_period(sim.world().timestep());
        Self {
            sim,
            tick_interval,
            tick_count: 0,
            pruned_total: 0,
        }
    }

    /// Wall-clock interval between ticks
    #[cfg(test)]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Total number of ticks executed
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Execute one tick immediately
    pub fn tick(&mut self) {
        let report = self.sim.tick();
        self.tick_count += 1;
        self.pruned_total += report.pruned as u64;

        if self.tick_count % SUMMARY_INTERVAL == 0 {
            debug!(
                "Tick {}: {} bodies, {} sink(s), {} pruned so far",
                self.tick_count,
                self.sim.world().len(),
                self.sim.broadcaster().len(),
                self.pruned_total
            );
        }
    }

    /// Tick until `shutdown` becomes true or its sender is dropped.
    /// Returns the loop so callers can inspect its counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Self {
        info!(
            "Simulation loop started ({:.1} Hz)",
            1.0 / self.tick_interval.as_secs_f32()
        );

        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => self.tick(),
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Simulation loop stopped");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandMode;
    use crate::engine::physics::{PhysicsWorld, WorldConfig};
    use crate::net::broadcast::ChannelSink;

    fn shared() -> Arc<Simulation> {
        let world = PhysicsWorld::from_config(&WorldConfig::default()).unwrap();
        Arc::new(Simulation::new(world, CommandMode::Immediate))
    }

    #[test]
    fn test_tick_interval_matches_timestep() {
        let game_loop = GameLoop::new(shared());
        let expected = Duration::from_secs_f32(1.0 / 30.0);
        assert_eq!(game_loop.tick_interval(), expected);
        assert_eq!(game_loop.tick_count(), 0);
    }

    #[test]
    fn test_manual_ticks_advance_world() {
        let sim = shared();
        let mut game_loop = GameLoop::new(Arc::clone(&sim));
        for _ in 0..3 {
            game_loop.tick();
        }
        assert_eq!(game_loop.tick_count(), 3);
        let ball = sim.world().dynamic_bodies().next().unwrap().position;
        assert!(ball.y > 50.0);
    }

    #[test]
    fn test_tick_period_falls_back_to_default_rate() {
        let default = Duration::from_secs_f32(1.0 / DEFAULT_TICK_HZ);
        assert_eq!(tick_period(1.0 / 60.0), Duration::from_secs_f32(1.0 / 60.0));
        for timestep in [1e-10, 0.0, -1.0, f32::NAN, f32::INFINITY, 1e30] {
            assert_eq!(tick_period(timestep), default, "timestep {timestep}");
        }
    }

    #[tokio::test]
    async fn test_run_survives_sub_nanosecond_timestep() {
        let world = PhysicsWorld::new(WorldConfig::default().gravity, 1e-10);
        let sim = Arc::new(Simulation::new(world, CommandMode::Immediate));
        let game_loop = GameLoop::new(sim);
        assert_eq!(
            game_loop.tick_interval(),
            Duration::from_secs_f32(1.0 / DEFAULT_TICK_HZ)
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(game_loop.run(shutdown_rx));
        time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let finished = time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop stops after shutdown")
            .expect("loop does not panic");
        assert!(finished.tick_count() >= 1);
    }

    #[tokio::test]
    async fn test_run_publishes_until_shutdown() {
        let sim = shared();
        let (sink, mut rx) = ChannelSink::new(64);
        sim.broadcaster().connect(Box::new(sink));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(GameLoop::new(Arc::clone(&sim)).run(shutdown_rx));

        let first = time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("snapshot within timeout")
            .expect("sink still connected");
        assert!(first.starts_with(r#"{"type":"state""#));

        shutdown_tx.send(true).unwrap();
        let finished = time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop stops after shutdown")
            .unwrap();
        assert!(finished.tick_count() >= 1);
    }

    #[tokio::test]
    async fn test_run_stops_when_sender_dropped() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(GameLoop::new(shared()).run(shutdown_rx));
        drop(shutdown_tx);

        let result = time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok());
    }
}
