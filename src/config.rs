// Command-line configuration

use clap::{Parser, ValueEnum};
use glam::Vec2;
use std::net::SocketAddr;
use std::time::Duration;

use crate::engine::physics::WorldConfig;

/// When inbound commands touch the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CommandMode {
    /// Apply each command as soon as it arrives, interleaved with ticks
    Immediate,

    /// Queue commands and apply them all right before the next step
    Buffered,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Tick rate must be finite and positive, got {0}")]
    InvalidTickRate(f32),

    #[error("Tick rate {0} Hz is too high for a non-zero tick period")]
    TickRateTooHigh(f32),

    #[error("Outbox capacity must be at least 1")]
    ZeroOutbox,

    #[error("Gravity must be finite, got {0}")]
    InvalidGravity(f32),
}

/// Server settings
#[derive(Debug, Clone, Parser)]
#[command(name = "rusted-sandbox", version, about = "Real-time 2D physics sandbox server")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub addr: SocketAddr,

    /// Simulation ticks per second (also the snapshot rate)
    #[arg(long, default_value_t = 30.0)]
    pub tick_hz: f32,

    /// Snapshots a client may have queued before it is dropped
    #[arg(long, default_value_t = 1)]
    pub outbox_capacity: usize,

    /// How client commands are ordered against ticks
    #[arg(long, value_enum, default_value_t = CommandMode::Immediate)]
    pub command_mode: CommandMode,

    /// Downward gravity in units per second squared
    #[arg(long, default_value_t = 900.0)]
    pub gravity_y: f32,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tick_hz.is_finite() && self.tick_hz > 0.0) {
            return Err(ConfigError::InvalidTickRate(self.tick_hz));
        }
        match Duration::try_from_secs_f32(1.0 / self.tick_hz) {
            Ok(period) if !period.is_zero() => {}
            _ => return Err(ConfigError::TickRateTooHigh(self.tick_hz)),
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::ZeroOutbox);
        }
        if !self.gravity_y.is_finite() {
            return Err(ConfigError::InvalidGravity(self.gravity_y));
        }
        Ok(())
    }

    /// Scene configuration derived from the command line
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            gravity: Vec2::new(0.0, self.gravity_y),
            timestep: 1.0 / self.tick_hz,
            ..WorldConfig::default()
        }
    }
}
