// Math utilities and helper functions

use glam::Vec2;

/// Rotate a vector expressed in a body's local frame into world space
pub fn local_to_world(local: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(local)
}

/// 2D cross product of two vectors (z component of the 3D cross product)
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Cross product of a scalar angular velocity with a vector (w x r)
pub fn cross_scalar(w: f32, r: Vec2) -> Vec2 {
    Vec2::new(-w * r.y, w * r.x)
}
