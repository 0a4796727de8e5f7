// Rigid-body physics: fixed-step integration and contact response

pub mod body;
mod collision;
mod registry;
mod world;

pub use body::Body;
pub use registry::BodyId;
pub use world::{PhysicsWorld, WorldConfig};

/// Physics errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("Invalid mass: {0} (must be finite and positive)")]
    InvalidMass(f32),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Non-finite {field}")]
    NonFinite { field: &'static str },
}
