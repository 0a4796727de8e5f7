use glam::Vec2;

use super::registry::BodyId;
use super::PhysicsError;
use crate::core::math::{cross, local_to_world};

/// How a body participates in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    /// Affected by gravity, impulses and contacts
    Dynamic,

    /// Infinite mass, never moves (floors, walls)
    Static,
}

/// Collision geometry in the body's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Solid disk centered on the body origin
    Circle { radius: f32 },

    /// Line segment with a rounding radius (`thickness`)
    Segment {
        point_a: Vec2,
        point_b: Vec2,
        thickness: f32,
    },
}

impl Shape {
    /// Moment of inertia of this shape for the given mass.
    ///
    /// Circles use the solid disk formula `m * r^2 / 2`. Segments only
    /// ever belong to static bodies, so their moment is infinite.
    pub fn moment_for_mass(&self, mass: f32) -> f32 {
        match *self {
            Shape::Circle { radius } => mass * radius * radius / 2.0,
            Shape::Segment { .. } => f32::INFINITY,
        }
    }

    fn validate(&self) -> Result<(), PhysicsError> {
        match *self {
            Shape::Circle { radius } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "circle radius must be finite and positive, got {radius}"
                    )));
                }
            }
            Shape::Segment {
                point_a,
                point_b,
                thickness,
            } => {
                if !point_a.is_finite() || !point_b.is_finite() {
                    return Err(PhysicsError::InvalidShape(
                        "segment endpoints must be finite".to_string(),
                    ));
                }
                if !(thickness.is_finite() && thickness >= 0.0) {
                    return Err(PhysicsError::InvalidShape(format!(
                        "segment thickness must be finite and non-negative, got {thickness}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Shape plus surface material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    pub shape: Shape,

    /// Friction coefficient, conventionally in [0, 1]
    pub friction: f32,
}

/// A rigid body owned by the physics world
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    id: BodyId,
    body_type: BodyType,
    inv_mass: f32,
    inv_moment: f32,
    collider: Collider,

    /// World position of the body origin
    pub position: Vec2,

    /// Linear velocity (units per second)
    pub velocity: Vec2,

    /// Rotation angle (radians)
    pub angle: f32,

    /// Angular velocity (radians per second)
    pub angular_velocity: f32,
}

impl Body {
    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Inverse mass (zero for static bodies)
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    pub fn inv_moment(&self) -> f32 {
        self.inv_moment
    }

    pub fn shape(&self) -> &Shape {
        &self.collider.shape
    }

    pub fn friction(&self) -> f32 {
        self.collider.friction
    }

    /// Convert a point from the body's local frame to world space
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + local_to_world(local, self.angle)
    }

    /// Apply an impulse at `offset` (world-space vector from the body origin
    /// to the application point). No-op on static bodies.
    pub fn apply_impulse_at_offset(&mut self, impulse: Vec2, offset: Vec2) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_moment * cross(offset, impulse);
    }

    /// Apply an impulse expressed in the body's local (rotated) frame at a
    /// local point
    pub fn apply_impulse_at_local_point(&mut self, impulse: Vec2, point: Vec2) {
        let world_impulse = local_to_world(impulse, self.angle);
        let offset = local_to_world(point, self.angle);
        self.apply_impulse_at_offset(world_impulse, offset);
    }

    /// Semi-implicit Euler: velocity first, then position from the new velocity
    pub(super) fn integrate(&mut self, gravity: Vec2, dt: f32) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity += gravity * dt;
        self.position += self.velocity * dt;
        self.angle += self.angular_velocity * dt;
    }

    /// True when every piece of kinematic state is finite
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.angle.is_finite()
            && self.angular_velocity.is_finite()
    }
}

/// Builder for creating rigid bodies with common configurations
pub struct BodyBuilder {
    body_type: BodyType,
    position: Vec2,
    mass: f32,
}

impl BodyBuilder {
    /// Create a new dynamic body (affected by gravity and collisions)
    pub fn new_dynamic() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            position: Vec2::ZERO,
            mass: 1.0,
        }
    }

    /// Create a new static body (completely immovable)
    pub fn new_static() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            mass: f32::INFINITY,
        }
    }

    /// Set the initial position of the body
    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    /// Set the mass. Ignored for static bodies.
    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Build the body, deriving its moment of inertia from the collider
    pub fn build(self, id: BodyId, collider: Collider) -> Result<Body, PhysicsError> {
        collider.shape.validate()?;
        if !self.position.is_finite() {
            return Err(PhysicsError::NonFinite { field: "position" });
        }

        let (inv_mass, inv_moment) = match self.body_type {
            BodyType::Dynamic => {
                if !(self.mass.is_finite() && self.mass > 0.0) {
                    return Err(PhysicsError::InvalidMass(self.mass));
                }
                let moment = collider.shape.moment_for_mass(self.mass);
                if !(moment.is_finite() && moment > 0.0) {
                    return Err(PhysicsError::InvalidShape(
                        "dynamic bodies need a shape with finite, positive moment".to_string(),
                    ));
                }
                (1.0 / self.mass, 1.0 / moment)
            }
            BodyType::Static => (0.0, 0.0),
        };

        Ok(Body {
            id,
            body_type: self.body_type,
            inv_mass,
            inv_moment,
            collider,
            position: self.position,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
        })
    }
}

/// Builder for creating colliders with common configurations
pub struct ColliderBuilder2D {
    shape: Shape,
    friction: f32,
}

impl ColliderBuilder2D {
    /// Create a circle-shaped collider
    pub fn circle(radius: f32) -> Self {
        Self {
            shape: Shape::Circle { radius },
            friction: 0.5,
        }
    }

    /// Create a segment collider with a rounding radius
    pub fn segment(point_a: Vec2, point_b: Vec2, thickness: f32) -> Self {
        Self {
            shape: Shape::Segment {
                point_a,
                point_b,
                thickness,
            },
            friction: 0.5,
        }
    }

    /// Set friction coefficient (0.0 = no friction, 1.0 = high friction)
    pub fn friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    /// Build the collider
    pub fn build(self) -> Collider {
        Collider {
            shape: self.shape,
            friction: self.friction,
        }
    }
}

/// Common body configurations for the sandbox
pub mod presets {
    use super::*;

    /// A dynamic ball resting at (x, y) with zero velocity and angle
    pub fn ball_body(x: f32, y: f32, mass: f32) -> BodyBuilder {
        BodyBuilder::new_dynamic().position(x, y).mass(mass)
    }

    pub fn ball_collider(radius: f32, friction: f32) -> Collider {
        ColliderBuilder2D::circle(radius).friction(friction).build()
    }

    /// Static geometry lives at the world origin; segment endpoints are
    /// given directly in world coordinates
    pub fn static_geometry_body() -> BodyBuilder {
        BodyBuilder::new_static()
    }

    pub fn segment_collider(point_a: Vec2, point_b: Vec2, thickness: f32, friction: f32) -> Collider {
        ColliderBuilder2D::segment(point_a, point_b, thickness)
            .friction(friction)
            .build()
    }
}
