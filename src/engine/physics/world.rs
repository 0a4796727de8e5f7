use glam::Vec2;
use log::{debug, warn};

use super::body::{presets, Body, BodyBuilder, Collider, Shape};
use super::collision::{
    circle_segment_contact, combine_friction, resolve_circle_contact, StaticSegment,
};
use super::registry::{BodyHandle, BodyId, BodyRegistry};
use super::PhysicsError;

/// Scene setup and default parameters for spawned bodies
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    /// Constant acceleration applied to dynamic bodies (y points down)
    pub gravity: Vec2,

    /// Fixed integration step in seconds
    pub timestep: f32,

    /// Floor segment endpoints
    pub floor: (Vec2, Vec2),
    pub floor_thickness: f32,
    pub floor_friction: f32,

    /// Defaults for balls spawned by clients
    pub ball_radius: f32,
    pub ball_mass: f32,
    pub ball_friction: f32,

    /// Balls present before any client connects
    pub initial_balls: Vec<Vec2>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 900.0),
            timestep: 1.0 / 30.0,
            floor: (Vec2::new(0.0, 500.0), Vec2::new(10000.0, 500.0)),
            floor_thickness: 0.0,
            floor_friction: 1.0,
            ball_radius: 20.0,
            ball_mass: 1.0,
            ball_friction: 0.6,
            initial_balls: vec![Vec2::new(500.0, 50.0)],
        }
    }
}

/// Pose captured before a step, used to recover from non-finite state
#[derive(Clone, Copy)]
struct Pose {
    position: Vec2,
    angle: f32,
}

/// Physics world that owns every body and advances the simulation
pub struct PhysicsWorld {
    /// Gravity vector
    gravity: Vec2,

    /// Fixed timestep used by `step_fixed`
    timestep: f32,

    /// All bodies, dynamic and static, indexed by `BodyHandle`
    bodies: Vec<Body>,

    /// External id -> handle mapping
    registry: BodyRegistry,

    ball_radius: f32,
    ball_mass: f32,
    ball_friction: f32,
}

impl PhysicsWorld {
    /// Create an empty world with the default ball parameters
    pub fn new(gravity: Vec2, timestep: f32) -> Self {
        let defaults = WorldConfig::default();
        Self {
            gravity,
            timestep,
            bodies: Vec::new(),
            registry: BodyRegistry::new(),
            ball_radius: defaults.ball_radius,
            ball_mass: defaults.ball_mass,
            ball_friction: defaults.ball_friction,
        }
    }

    /// Build the configured scene: floor segment plus the initial balls
    pub fn from_config(config: &WorldConfig) -> Result<Self, PhysicsError> {
        let mut world = Self::new(config.gravity, config.timestep);
        world.ball_radius = config.ball_radius;
        world.ball_mass = config.ball_mass;
        world.ball_friction = config.ball_friction;

        let (a, b) = config.floor;
        world.add_static_segment(a, b, config.floor_thickness, config.floor_friction)?;
        for ball in &config.initial_balls {
            world.spawn_circle(ball.x, ball.y)?;
        }
        Ok(world)
    }

    fn insert(&mut self, builder: BodyBuilder, collider: Collider) -> Result<BodyId, PhysicsError> {
        let id = self.registry.fresh_id();
        let body = builder.build(id, collider)?;
        let handle = BodyHandle::new(self.bodies.len());
        self.bodies.push(body);
        self.registry.register(id, handle);
        Ok(id)
    }

    /// Spawn a dynamic ball with the default radius and mass
    pub fn spawn_circle(&mut self, x: f32, y: f32) -> Result<BodyId, PhysicsError> {
        self.spawn_circle_with(x, y, self.ball_radius, self.ball_mass)
    }

    /// Spawn a dynamic ball at rest with zero angle
    pub fn spawn_circle_with(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        mass: f32,
    ) -> Result<BodyId, PhysicsError> {
        let id = self.insert(
            presets::ball_body(x, y, mass),
            presets::ball_collider(radius, self.ball_friction),
        )?;
        debug!("Spawned ball {} at ({:.1}, {:.1})", id, x, y);
        Ok(id)
    }

    /// Add an immovable segment to the world's fixed geometry
    pub fn add_static_segment(
        &mut self,
        point_a: Vec2,
        point_b: Vec2,
        thickness: f32,
        friction: f32,
    ) -> Result<BodyId, PhysicsError> {
        self.insert(
            presets::static_geometry_body(),
            presets::segment_collider(point_a, point_b, thickness, friction),
        )
    }

    /// Apply an impulse in the body's local frame at its origin.
    ///
    /// Returns `Ok(false)` when the id is unknown or names a static body;
    /// nothing changes in that case.
    pub fn apply_impulse(&mut self, id: &BodyId, impulse: Vec2) -> Result<bool, PhysicsError> {
        if !impulse.is_finite() {
            return Err(PhysicsError::NonFinite { field: "impulse" });
        }
        let Some(body) = self.body_mut(id) else {
            return Ok(false);
        };
        if !body.is_dynamic() {
            return Ok(false);
        }
        body.apply_impulse_at_local_point(impulse, Vec2::ZERO);
        Ok(true)
    }

    /// Step the simulation forward by the configured fixed timestep
    pub fn step_fixed(&mut self) {
        self.step(self.timestep);
    }

    /// Advance the simulation by exactly `dt` seconds.
    ///
    /// Every dynamic body is integrated first, then dynamic circles are
    /// resolved against all static segments.
    pub fn step(&mut self, dt: f32) {
        let poses: Vec<Pose> = self
            .bodies
            .iter()
            .map(|body| Pose {
                position: body.position,
                angle: body.angle,
            })
            .collect();

        for body in self.bodies.iter_mut() {
            body.integrate(self.gravity, dt);
        }

        let segments = self.static_segments();
        let up = self.up();
        for body in self.bodies.iter_mut().filter(|body| body.is_dynamic()) {
            let Shape::Circle { radius } = *body.shape() else {
                continue;
            };
            for segment in &segments {
                if let Some(contact) = circle_segment_contact(body.position, radius, segment, up) {
                    let friction = combine_friction(body.friction(), segment.friction);
                    resolve_circle_contact(body, radius, &contact, friction);
                }
            }
        }

        for (body, pose) in self.bodies.iter_mut().zip(poses) {
            if !body.is_finite() {
                warn!(
                    "Body {} reached non-finite state, restoring previous pose",
                    body.id()
                );
                body.position = pose.position;
                body.angle = pose.angle;
                body.velocity = Vec2::ZERO;
                body.angular_velocity = 0.0;
            }
        }
    }

    /// World-space static segments
    fn static_segments(&self) -> Vec<StaticSegment> {
        self.bodies
            .iter()
            .filter(|body| !body.is_dynamic())
            .filter_map(|body| match *body.shape() {
                Shape::Segment {
                    point_a,
                    point_b,
                    thickness,
                } => Some(StaticSegment {
                    point_a: body.world_point(point_a),
                    point_b: body.world_point(point_b),
                    thickness,
                    friction: body.friction(),
                }),
                Shape::Circle { .. } => None,
            })
            .collect()
    }

    /// Direction opposing gravity (screen up when gravity is zero)
    fn up(&self) -> Vec2 {
        let up = -self.gravity.normalize_or_zero();
        if up == Vec2::ZERO {
            Vec2::NEG_Y
        } else {
            up
        }
    }

    /// Get a body by its external id
    #[cfg(test)]
    pub fn body(&self, id: &BodyId) -> Option<&Body> {
        self.registry
            .resolve(id)
            .and_then(|handle| self.bodies.get(handle.index()))
    }

    fn body_mut(&mut self, id: &BodyId) -> Option<&mut Body> {
        self.registry
            .resolve(id)
            .and_then(|handle| self.bodies.get_mut(handle.index()))
    }

    /// Bodies in registry order
    pub fn bodies(&self) -> impl Iterator<Item = &Body> + '_ {
        self.registry
            .ids()
            .filter_map(|id| self.registry.resolve(id))
            .filter_map(|handle| self.bodies.get(handle.index()))
    }

    /// Dynamic bodies in registry order
    pub fn dynamic_bodies(&self) -> impl Iterator<Item = &Body> + '_ {
        self.bodies().filter(|body| body.is_dynamic())
    }

    /// Total number of bodies, static geometry included
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Get the fixed timestep
    pub fn timestep(&self) -> f32 {
        self.timestep
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(WorldConfig::default().gravity, WorldConfig::default().timestep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scene() -> (PhysicsWorld, BodyId) {
        let config = WorldConfig {
            initial_balls: Vec::new(),
            ..WorldConfig::default()
        };
        let mut world = PhysicsWorld::from_config(&config).unwrap();
        let ball = world.spawn_circle(500.0, 50.0).unwrap();
        (world, ball)
    }

    fn kinematics(world: &PhysicsWorld) -> Vec<(Vec2, Vec2, f32, f32)> {
        world
            .bodies()
            .map(|b| (b.position, b.velocity, b.angle, b.angular_velocity))
            .collect()
    }

    #[test]
    fn test_default_scene() {
        let world = PhysicsWorld::from_config(&WorldConfig::default()).unwrap();
        assert_eq!(world.len(), 2);
        assert_eq!(world.dynamic_bodies().count(), 1);

        let ball = world.dynamic_bodies().next().unwrap();
        assert_eq!(ball.position, Vec2::new(500.0, 50.0));
        assert_eq!(ball.inv_mass(), 1.0);
        assert_eq!(ball.inv_moment(), 1.0 / 200.0);
        assert_eq!(ball.friction(), 0.6);
    }

    #[test]
    fn test_spawn_circle_starts_at_rest() {
        let (world, id) = scene();
        let body = world.body(&id).unwrap();
        assert_eq!(body.velocity, Vec2::ZERO);
        assert_eq!(body.angle, 0.0);
        assert_eq!(body.angular_velocity, 0.0);
        assert_eq!(body.id(), id);
    }

    #[test]
    fn test_spawn_rejects_invalid_parameters() {
        let mut world = PhysicsWorld::default();
        assert!(world.spawn_circle_with(0.0, 0.0, 20.0, 0.0).is_err());
        assert!(world.spawn_circle_with(0.0, 0.0, -1.0, 1.0).is_err());
        assert!(world.spawn_circle(f32::INFINITY, 0.0).is_err());
        assert_eq!(world.len(), 0);
    }

    #[test]
    fn test_step_is_deterministic() {
        let (mut a, _) = scene();
        let mut b = PhysicsWorld::from_config(&WorldConfig {
            initial_balls: Vec::new(),
            ..WorldConfig::default()
        })
        .unwrap();
        b.spawn_circle(500.0, 50.0).unwrap();

        for _ in 0..200 {
            a.step(1.0 / 30.0);
            b.step(1.0 / 30.0);
            assert_eq!(kinematics(&a), kinematics(&b));
        }
    }

    #[test]
    fn test_free_fall_one_step() {
        let (mut world, id) = scene();
        world.step(1.0 / 30.0);
        let body = world.body(&id).unwrap();
        assert_abs_diff_eq!(body.velocity.y, 30.0, epsilon = 1e-4);
        assert_abs_diff_eq!(body.position.y, 51.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ball_comes_to_rest_on_floor() {
        let (mut world, id) = scene();
        for _ in 0..150 {
            world.step_fixed();
        }
        let body = world.body(&id).unwrap();
        assert_abs_diff_eq!(body.position.y, 480.0, epsilon = 1.0);
        assert_abs_diff_eq!(body.velocity.y, 0.0, epsilon = 1.0);
        assert_abs_diff_eq!(body.position.x, 500.0, epsilon = 1e-3);
    }

    #[test]
    fn test_resting_contact_is_stable() {
        let (mut world, id) = scene();
        for _ in 0..150 {
            world.step_fixed();
        }
        for _ in 0..300 {
            world.step_fixed();
            let body = world.body(&id).unwrap();
            let penetration = 480.0 - body.position.y;
            assert!(penetration.abs() < 0.5, "penetration {penetration}");
            assert!(body.velocity.y.abs() < 1.0);
        }
    }

    #[test]
    fn test_static_bodies_never_move() {
        let (mut world, _) = scene();
        let before: Vec<_> = world
            .bodies()
            .filter(|b| !b.is_dynamic())
            .map(|b| b.position)
            .collect();
        for _ in 0..30 {
            world.step_fixed();
        }
        let after: Vec<_> = world
            .bodies()
            .filter(|b| !b.is_dynamic())
            .map(|b| b.position)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_apply_impulse_changes_velocity() {
        let (mut world, id) = scene();
        assert!(world.apply_impulse(&id, Vec2::new(100.0, 0.0)).unwrap());
        assert_eq!(world.body(&id).unwrap().velocity, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_unknown_id_is_a_no_op() {
        let (mut world, _) = scene();
        world.step_fixed();
        let before = kinematics(&world);

        let applied = world
            .apply_impulse(&BodyId::generate(), Vec2::new(100.0, 0.0))
            .unwrap();

        assert!(!applied);
        assert_eq!(kinematics(&world), before);
    }

    #[test]
    fn test_impulse_on_static_body_is_ignored() {
        let (mut world, _) = scene();
        let floor = world.bodies().find(|b| !b.is_dynamic()).unwrap().id();
        assert!(!world.apply_impulse(&floor, Vec2::new(5.0, 5.0)).unwrap());
        assert_eq!(world.body(&floor).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_non_finite_impulse_is_rejected() {
        let (mut world, id) = scene();
        let result = world.apply_impulse(&id, Vec2::new(f32::NAN, 0.0));
        assert_eq!(result, Err(PhysicsError::NonFinite { field: "impulse" }));
        assert_eq!(world.body(&id).unwrap().velocity, Vec2::ZERO);
    }

    #[test]
    fn test_non_finite_state_is_recovered() {
        let (mut world, id) = scene();
        world.apply_impulse(&id, Vec2::new(f32::MAX, 0.0)).unwrap();
        world.apply_impulse(&id, Vec2::new(f32::MAX, 0.0)).unwrap();

        world.step_fixed();

        let body = world.body(&id).unwrap();
        assert!(body.is_finite());
        assert_eq!(body.position, Vec2::new(500.0, 50.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_rolling_ball_spins() {
        let (mut world, id) = scene();
        for _ in 0..150 {
            world.step_fixed();
        }
        world.apply_impulse(&id, Vec2::new(200.0, 0.0)).unwrap();
        for _ in 0..10 {
            world.step_fixed();
        }
        let body = world.body(&id).unwrap();
        assert!(body.velocity.x > 0.0);
        assert!(body.angular_velocity > 0.0);
        assert!(body.angle > 0.0);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut world = PhysicsWorld::default();
        let ids: std::collections::HashSet<_> = (0..500)
            .map(|i| world.spawn_circle(i as f32, 0.0).unwrap())
            .collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(world.len(), 500);
    }
}
