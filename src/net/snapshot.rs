// Point-in-time world state sent to every connected sink

use serde::Serialize;

use crate::engine::physics::{Body, BodyId, PhysicsWorld};

/// Kinematic state of one dynamic body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyState {
    pub id: BodyId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub vx: f32,
    pub vy: f32,
}

impl From<&Body> for BodyState {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id(),
            x: body.position.x,
            y: body.position.y,
            angle: body.angle,
            vx: body.velocity.x,
            vy: body.velocity.y,
        }
    }
}

/// Outbound message envelope
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ServerMessage<'a> {
    State { state: &'a [BodyState] },
}

/// Ordered sequence of body states, in registry order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub bodies: Vec<BodyState>,
}

impl Snapshot {
    /// Capture every dynamic body. Static geometry is not part of the
    /// snapshot.
    pub fn capture(world: &PhysicsWorld) -> Self {
        Self {
            bodies: world.dynamic_bodies().map(BodyState::from).collect(),
        }
    }

    /// Encode as `{"type": "state", "state": [...]}`
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&ServerMessage::State {
            state: &self.bodies,
        })
    }
}
