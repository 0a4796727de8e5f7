use glam::Vec2;
use parry2d::math::Point;
use parry2d::query::PointQuery;
use parry2d::shape::Segment;

use super::body::Body;
use crate::core::math::{cross, cross_scalar};

/// Below this center-to-segment distance the contact normal is taken from
/// the segment orientation instead of the center offset
const DEGENERATE_DISTANCE: f32 = 1e-6;

/// Static segment geometry in world space, extracted once per step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticSegment {
    pub point_a: Vec2,
    pub point_b: Vec2,
    pub thickness: f32,
    pub friction: f32,
}

/// A circle penetrating a static segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the segment towards the circle center
    pub normal: Vec2,

    /// Penetration depth (positive when overlapping)
    pub depth: f32,
}

/// Friction used for a contact between two surfaces: the product of the
/// two coefficients
pub fn combine_friction(a: f32, b: f32) -> f32 {
    a * b
}

/// Compute the contact between a circle and a rounded segment.
///
/// `up` orients the normal when the circle center lies exactly on the
/// segment; it should point against gravity.
pub fn circle_segment_contact(
    center: Vec2,
    radius: f32,
    segment: &StaticSegment,
    up: Vec2,
) -> Option<Contact> {
    let shape = Segment::new(
        Point::new(segment.point_a.x, segment.point_a.y),
        Point::new(segment.point_b.x, segment.point_b.y),
    );
    let projection = shape.project_local_point(&Point::new(center.x, center.y), true);
    let closest = Vec2::new(projection.point.x, projection.point.y);

    let offset = center - closest;
    let distance = offset.length();
    let reach = radius + segment.thickness;
    if distance >= reach {
        return None;
    }

    let normal = if distance > DEGENERATE_DISTANCE {
        offset / distance
    } else {
        let perp = (segment.point_b - segment.point_a).perp().normalize_or_zero();
        if perp == Vec2::ZERO {
            up
        } else if perp.dot(up) < 0.0 {
            -perp
        } else {
            perp
        }
    };

    Some(Contact {
        normal,
        depth: reach - distance,
    })
}

/// Resolve a circle body against a static contact.
///
/// The circle is pushed out along the normal. If the contact point is
/// approaching the surface, the normal velocity is removed (restitution 0)
/// and a Coulomb friction impulse, bounded by `friction * jn`, opposes the
/// slip at the contact point.
pub fn resolve_circle_contact(body: &mut Body, radius: f32, contact: &Contact, friction: f32) {
    let normal = contact.normal;
    body.position += normal * contact.depth;

    // Offset from center to contact point
    let r = -normal * radius;

    let v_contact = body.velocity + cross_scalar(body.angular_velocity, r);
    let vn = v_contact.dot(normal);
    if vn >= 0.0 {
        return;
    }

    let rn = cross(r, normal);
    let k_normal = body.inv_mass() + body.inv_moment() * rn * rn;
    let jn = -vn / k_normal;
    body.apply_impulse_at_offset(normal * jn, r);

    let tangent = normal.perp();
    let v_contact = body.velocity + cross_scalar(body.angular_velocity, r);
    let vt = v_contact.dot(tangent);
    let rt = cross(r, tangent);
    let k_tangent = body.inv_mass() + body.inv_moment() * rt * rt;
    let max_friction = friction * jn;
    let jt = (-vt / k_tangent).clamp(-max_friction, max_friction);
    body.apply_impulse_at_offset(tangent * jt, r);
}
