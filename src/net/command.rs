// Inbound client commands: decoding and application to the world

use glam::Vec2;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::physics::{BodyId, PhysicsError, PhysicsWorld};

/// Spawn position used when a spawn request omits a coordinate
pub const DEFAULT_SPAWN: Vec2 = Vec2::new(100.0, 100.0);

/// A validated client command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Spawn a ball with the default radius and mass
    Spawn { x: f32, y: f32 },

    /// Apply an impulse (body-local frame) at the body origin
    ApplyImpulse { body_id: BodyId, impulse: Vec2 },
}

/// Reasons an inbound message is dropped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Missing or non-string body id")]
    MissingId,

    #[error("Invalid body id: {0}")]
    InvalidId(String),

    #[error("Non-finite value for {0}")]
    NonFinite(&'static str),
}

/// Raw shape of an inbound message. Field values stay untyped so that
/// non-numeric coordinates fall back to defaults instead of failing.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireCommand {
    Spawn {
        x: Option<Value>,
        y: Option<Value>,
    },
    Force {
        id: Option<Value>,
        fx: Option<Value>,
        fy: Option<Value>,
    },
}

fn number_or(value: Option<&Value>, default: f32, field: &'static str) -> Result<f32, CommandError> {
    let number = match value.and_then(Value::as_f64) {
        Some(number) => number as f32,
        None => default,
    };
    if number.is_finite() {
        Ok(number)
    } else {
        Err(CommandError::NonFinite(field))
    }
}

impl Command {
    /// Decode a text message from a sink
    pub fn decode(text: &str) -> Result<Self, CommandError> {
        let wire: WireCommand =
            serde_json::from_str(text).map_err(|e| CommandError::Malformed(e.to_string()))?;

        match wire {
            WireCommand::Spawn { x, y } => Ok(Command::Spawn {
                x: number_or(x.as_ref(), DEFAULT_SPAWN.x, "x")?,
                y: number_or(y.as_ref(), DEFAULT_SPAWN.y, "y")?,
            }),
            WireCommand::Force { id, fx, fy } => {
                let raw = id
                    .as_ref()
                    .and_then(Value::as_str)
                    .ok_or(CommandError::MissingId)?;
                let body_id = raw
                    .parse::<BodyId>()
                    .map_err(|_| CommandError::InvalidId(raw.to_string()))?;
                let impulse = Vec2::new(
                    number_or(fx.as_ref(), 0.0, "fx")?,
                    number_or(fy.as_ref(), 0.0, "fy")?,
                );
                Ok(Command::ApplyImpulse { body_id, impulse })
            }
        }
    }
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Spawned(BodyId),
    ImpulseApplied(BodyId),

    /// The id named no dynamic body; nothing changed
    UnknownBody(BodyId),

    /// The world refused the command's values
    Rejected(PhysicsError),
}

/// Apply a command to the world immediately
pub fn apply(world: &mut PhysicsWorld, command: Command) -> CommandOutcome {
    match command {
        Command::Spawn { x, y } => match world.spawn_circle(x, y) {
            Ok(id) => CommandOutcome::Spawned(id),
            Err(err) => CommandOutcome::Rejected(err),
        },
        Command::ApplyImpulse { body_id, impulse } => match world.apply_impulse(&body_id, impulse) {
            Ok(true) => CommandOutcome::ImpulseApplied(body_id),
            Ok(false) => {
                debug!("Ignoring impulse for unknown body {}", body_id);
                CommandOutcome::UnknownBody(body_id)
            }
            Err(err) => CommandOutcome::Rejected(err),
        },
    }
}
