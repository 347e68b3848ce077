/*
 * Boid Module
 *
 * This module defines the Boid struct and its per-tick update.
 * A tick runs in a fixed order:
 * 1. Reset the acceleration accumulator
 * 2. Accumulate weighted flocking, goal, evasion and avoidance forces
 * 3. Integrate velocity and clamp it to max speed
 * 4. Integrate position
 * 5. Apply the boundary policy
 *
 * Force accumulation only reads the previous tick's state of other agents,
 * through `Kinematics` snapshots, so it can run for every agent in parallel
 * before any of them integrates.
 */

use std::f32::consts::TAU;

use nannou::prelude::*;
use rand::Rng;

use crate::config::{validate_field_of_view, AgentConfig, Bounds};
use crate::error::ConfigError;
use crate::flocking::{align, cohesion, separate};
use crate::obstacle::Obstacle;
use crate::params::{BehaviorMode, BoundaryPolicy, FlockPolicy, FULL_CIRCLE};
use crate::steering::{
    avoid_obstacles, evade, flee, follow_flow_field, seek, wander_at_phase, wander_jitter,
};
use crate::vector::VectorExt;

// Identity of an agent: which group it belongs to and its slot in that group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AgentId {
    pub group: u32,
    pub index: u32,
}

impl AgentId {
    pub fn new(group: u32, index: u32) -> Self {
        Self { group, index }
    }
}

/// Anything the neighbour rules can look at: boids, snapshots of boids and
/// obstacles all expose a position, and a velocity where they have one.
pub trait Neighbor {
    fn id(&self) -> Option<AgentId> {
        None
    }

    fn position(&self) -> Vec2;

    fn velocity(&self) -> Vec2 {
        Vec2::ZERO
    }
}

/// Read-only kinematic state of one agent as of the end of the previous tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    pub id: Option<AgentId>,
    pub position: Vec2,
    pub velocity: Vec2,
    pub max_speed: f32,
    pub max_force: f32,
    pub field_of_view: f32,
}

impl Kinematics {
    // Anonymous state that sees in every direction
    pub fn new(position: Vec2, velocity: Vec2, max_speed: f32, max_force: f32) -> Self {
        Self {
            id: None,
            position,
            velocity,
            max_speed,
            max_force,
            field_of_view: FULL_CIRCLE,
        }
    }

    pub fn with_id(self, id: AgentId) -> Self {
        Self { id: Some(id), ..self }
    }

    pub fn with_field_of_view(self, field_of_view: f32) -> Self {
        Self { field_of_view, ..self }
    }
}

impl Neighbor for Kinematics {
    fn id(&self) -> Option<AgentId> {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

/// Per-tick inputs shared by every agent of a group. Replaces any ambient
/// "current target" state: everything a tick depends on is passed in here.
#[derive(Clone, Copy, Debug)]
pub struct StepContext<'a> {
    pub target: Option<Vec2>,
    /// Point to flee from, typically the rival group's centre of mass.
    pub evade_point: Option<Vec2>,
    /// Rival group snapshot for cross-group separation.
    pub rivals: Option<&'a [Kinematics]>,
    pub obstacles: &'a [Obstacle],
}

impl<'a> StepContext<'a> {
    pub fn new(obstacles: &'a [Obstacle]) -> Self {
        Self {
            target: None,
            evade_point: None,
            rivals: None,
            obstacles,
        }
    }

    pub fn with_target(self, target: Option<Vec2>) -> Self {
        Self { target, ..self }
    }

    pub fn with_evade_point(self, evade_point: Option<Vec2>) -> Self {
        Self { evade_point, ..self }
    }

    pub fn with_rivals(self, rivals: Option<&'a [Kinematics]>) -> Self {
        Self { rivals, ..self }
    }
}

// Per-agent decisions made by the group coordinator before forces are computed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orders {
    /// Whether this agent seeks the target in chase mode.
    pub seeks_target: bool,
    /// Wander phase increment drawn for this tick.
    pub wander_jitter: f32,
    /// Scale of the group-level flee from the evasion point, 0 when inactive.
    pub group_evasion: f32,
}

impl Default for Orders {
    fn default() -> Self {
        Self {
            seeks_target: true,
            wander_jitter: 0.0,
            group_evasion: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Boid {
    pub id: AgentId,
    pub position: Point2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub max_speed: f32,
    pub max_force: f32,
    pub radius: f32,
    pub field_of_view: f32,
    pub wander_phase: f32,
    pub bounds: Bounds,
}

impl Boid {
    /// Builds an agent with fixed kinematic limits, rejecting invalid ones.
    /// The initial velocity is clamped to `max_speed`.
    pub fn configure(id: AgentId, config: &AgentConfig, position: Vec2, velocity: Vec2) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id,
            position,
            velocity: velocity.limit(config.max_speed),
            acceleration: Vec2::ZERO,
            max_speed: config.max_speed,
            max_force: config.max_force,
            radius: config.radius,
            field_of_view: config.field_of_view,
            wander_phase: 0.0,
            bounds: config.bounds,
        })
    }

    // Random heading, random speed up to max, random wander phase
    pub fn spawn(id: AgentId, config: &AgentConfig, position: Vec2, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        config.validate()?;
        let angle = rng.gen_range(0.0..TAU);
        let speed = rng.gen_range(0.0..config.max_speed);
        let velocity = vec2(angle.cos(), angle.sin()) * speed;

        let mut boid = Self::configure(id, config, position, velocity)?;
        boid.wander_phase = rng.gen_range(0.0..TAU);
        Ok(boid)
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    // Orientation for rendering, derived from velocity
    pub fn heading_angle(&self) -> f32 {
        self.velocity.heading()
    }

    pub fn set_field_of_view(&mut self, field_of_view: f32) -> Result<(), ConfigError> {
        validate_field_of_view(field_of_view)?;
        self.field_of_view = field_of_view;
        Ok(())
    }

    // Copy of the state other agents may read during a tick
    pub fn kinematics(&self) -> Kinematics {
        Kinematics {
            id: Some(self.id),
            position: self.position,
            velocity: self.velocity,
            max_speed: self.max_speed,
            max_force: self.max_force,
            field_of_view: self.field_of_view,
        }
    }

    // Apply a force to the boid
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    /// Resets the accumulator and sums every weighted force for this tick.
    ///
    /// `own_group` holds the candidate neighbours from the agent's own group
    /// (the agent itself may be among them, it is skipped by identity).
    /// Only `self.acceleration` and `self.wander_phase` are written.
    pub fn accumulate(&mut self, own_group: &[&Kinematics], ctx: &StepContext, policy: &FlockPolicy, orders: Orders) {
        self.acceleration = Vec2::ZERO;

        let me = self.kinematics();
        let weights = &policy.weights;
        let radii = &policy.radii;
        let steering = &policy.steering;
        let neighbors = || own_group.iter().copied();

        let separation = separate(&me, neighbors(), radii.separation);
        let alignment = align(&me, neighbors(), radii.alignment);
        let cohesion = cohesion(&me, neighbors(), radii.cohesion, steering.slowing_radius);
        self.apply_force(
            separation * weights.separation + alignment * weights.alignment + cohesion * weights.cohesion,
        );

        if let Some(rivals) = ctx.rivals {
            self.apply_force(separate(&me, rivals.iter(), radii.rival_separation) * weights.rival_separation);
        }

        let goal = match policy.mode {
            BehaviorMode::Drift => Vec2::ZERO,
            BehaviorMode::Chase => match ctx.target {
                Some(target) if orders.seeks_target => seek(&me, target, steering.slowing_radius) * weights.seek,
                Some(_) => Vec2::ZERO,
                None => self.wander(&me, orders.wander_jitter, policy) * weights.wander,
            },
            BehaviorMode::Wander => self.wander(&me, orders.wander_jitter, policy) * weights.wander,
            BehaviorMode::FlowField => follow_flow_field(&me, steering.flow_scale) * weights.flow_field,
        };
        self.apply_force(goal);

        if let Some(threat) = ctx.evade_point {
            self.apply_force(evade(&me, threat, steering.evasion_radius) * weights.evasion);
            if orders.group_evasion > 0.0 {
                self.apply_force(flee(&me, threat) * orders.group_evasion);
            }
        }

        if !ctx.obstacles.is_empty() {
            // Clearance is measured from the agent's body, not its centre
            let clearance = steering.obstacle_margin + self.radius;
            let avoidance = avoid_obstacles(&me, ctx.obstacles, clearance);
            self.apply_force(avoidance * weights.obstacle_avoidance);
        }
    }

    fn wander(&mut self, me: &Kinematics, jitter: f32, policy: &FlockPolicy) -> Vec2 {
        self.wander_phase += jitter;
        wander_at_phase(me, self.wander_phase, &policy.steering)
    }

    // Update the boid's position based on its velocity and acceleration
    pub fn update(&mut self) {
        self.velocity += self.acceleration;
        self.velocity = self.velocity.limit(self.max_speed);
        self.position += self.velocity;
        self.acceleration = Vec2::ZERO;
    }

    pub fn apply_boundary(&mut self, policy: BoundaryPolicy) {
        match policy {
            BoundaryPolicy::Reflect => self.reflect_edges(),
            BoundaryPolicy::TurnBack { margin, strength } => self.turn_back(margin, strength),
        }
    }

    // Bounce off the world edges by inverting the outgoing velocity component
    pub fn reflect_edges(&mut self) {
        let Bounds { width, height } = self.bounds;

        // Only flip while still heading outward, so an agent outside the
        // edge does not oscillate on the next tick
        if (self.position.x < 0.0 && self.velocity.x < 0.0) || (self.position.x > width && self.velocity.x > 0.0) {
            self.velocity.x = -self.velocity.x;
        }
        if (self.position.y < 0.0 && self.velocity.y < 0.0) || (self.position.y > height && self.velocity.y > 0.0) {
            self.velocity.y = -self.velocity.y;
        }
    }

    // Near an edge, bias the velocity back toward the interior
    pub fn turn_back(&mut self, margin: f32, strength: f32) {
        let Bounds { width, height } = self.bounds;
        let mut bias = Vec2::ZERO;

        if self.position.x < margin {
            bias.x += strength;
        } else if self.position.x > width - margin {
            bias.x -= strength;
        }
        if self.position.y < margin {
            bias.y += strength;
        } else if self.position.y > height - margin {
            bias.y -= strength;
        }

        self.velocity = (self.velocity + bias).limit(self.max_speed);
    }

    /// One full tick for a single agent against its own group and the context.
    pub fn step(
        &mut self,
        own_group: &[Kinematics],
        ctx: &StepContext,
        policy: &FlockPolicy,
        rng: &mut impl Rng,
    ) {
        let neighbors: Vec<&Kinematics> = own_group.iter().collect();
        let orders = Orders {
            wander_jitter: wander_jitter(&policy.steering, rng),
            ..Orders::default()
        };
        self.accumulate(&neighbors, ctx, policy, orders);
        self.update();
        self.apply_boundary(policy.boundary);
    }
}

impl Neighbor for Boid {
    fn id(&self) -> Option<AgentId> {
        Some(self.id)
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn velocity(&self) -> Vec2 {
        self.velocity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> AgentConfig {
        AgentConfig::default()
    }

    fn boid_at(position: Vec2, velocity: Vec2) -> Boid {
        Boid::configure(AgentId::new(0, 0), &config(), position, velocity).unwrap()
    }

    fn drift_policy() -> FlockPolicy {
        FlockPolicy {
            mode: BehaviorMode::Drift,
            ..FlockPolicy::default()
        }
    }

    #[test]
    fn configure_rejects_invalid_limits() {
        let bad = AgentConfig { max_speed: -1.0, ..config() };
        let result = Boid::configure(AgentId::new(0, 0), &bad, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(result.unwrap_err(), ConfigError::InvalidMaxSpeed(-1.0));
    }

    #[test]
    fn configure_clamps_initial_velocity() {
        let boid = boid_at(Vec2::ZERO, vec2(30.0, 40.0));
        assert_relative_eq!(boid.velocity.length(), config().max_speed, epsilon = 1e-5);
    }

    #[test]
    fn spawn_respects_speed_limit() {
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..100 {
            let boid = Boid::spawn(AgentId::new(0, i), &config(), vec2(10.0, 10.0), &mut rng).unwrap();
            assert!(boid.velocity.length() <= config().max_speed + 1e-6);
        }
    }

    #[test]
    fn update_clamps_speed_and_resets_acceleration() {
        let mut boid = boid_at(vec2(100.0, 100.0), vec2(2.0, 0.0));
        boid.apply_force(vec2(5.0, 0.0));
        boid.update();
        assert_relative_eq!(boid.velocity.length(), boid.max_speed, epsilon = 1e-5);
        assert_relative_eq!(boid.position.x, 100.0 + boid.max_speed, epsilon = 1e-4);
        assert_eq!(boid.acceleration, Vec2::ZERO);
    }

    #[test]
    fn accumulate_starts_from_zero() {
        let mut boid = boid_at(vec2(100.0, 100.0), vec2(1.0, 0.0));
        boid.acceleration = vec2(9.0, 9.0);
        boid.accumulate(&[], &StepContext::new(&[]), &drift_policy(), Orders::default());
        assert_eq!(boid.acceleration, Vec2::ZERO);
    }

    #[test]
    fn reflect_flips_outgoing_component_only() {
        let mut boid = boid_at(vec2(801.0, 300.0), vec2(2.0, 0.0));
        boid.reflect_edges();
        assert_eq!(boid.velocity, vec2(-2.0, 0.0));

        // Already heading back in: leave it alone
        boid.reflect_edges();
        assert_eq!(boid.velocity, vec2(-2.0, 0.0));

        let mut low = boid_at(vec2(50.0, -3.0), vec2(0.5, -1.0));
        low.reflect_edges();
        assert_eq!(low.velocity, vec2(0.5, 1.0));
    }

    #[test]
    fn turn_back_nudges_inward_near_edges() {
        let mut boid = boid_at(vec2(5.0, 590.0), vec2(-1.0, 1.0));
        boid.turn_back(20.0, 0.2);
        assert_relative_eq!(boid.velocity.x, -0.8, epsilon = 1e-6);
        assert_relative_eq!(boid.velocity.y, 0.8, epsilon = 1e-6);

        let mut centred = boid_at(vec2(400.0, 300.0), vec2(1.0, 1.0));
        centred.turn_back(20.0, 0.2);
        assert_eq!(centred.velocity, vec2(1.0, 1.0));
    }

    #[test]
    fn chase_without_target_wanders_and_advances_phase() {
        let mut boid = boid_at(vec2(400.0, 300.0), vec2(1.0, 0.0));
        let policy = FlockPolicy {
            mode: BehaviorMode::Chase,
            ..FlockPolicy::default()
        };
        let orders = Orders { wander_jitter: 0.25, ..Orders::default() };
        boid.accumulate(&[], &StepContext::new(&[]), &policy, orders);
        assert_relative_eq!(boid.wander_phase, 0.25);
        assert!(boid.acceleration.length() > 0.0);
    }

    #[test]
    fn non_seeking_member_ignores_target() {
        let mut boid = boid_at(vec2(400.0, 300.0), vec2(1.0, 0.0));
        let policy = FlockPolicy {
            mode: BehaviorMode::Chase,
            ..FlockPolicy::default()
        };
        let orders = Orders { seeks_target: false, wander_jitter: 0.25, ..Orders::default() };
        let ctx = StepContext::new(&[]).with_target(Some(vec2(0.0, 0.0)));
        boid.accumulate(&[], &ctx, &policy, orders);
        assert_eq!(boid.acceleration, Vec2::ZERO);
        assert_eq!(boid.wander_phase, 0.0);
    }

    #[test]
    fn rival_separation_uses_its_own_weight() {
        let me = boid_at(vec2(100.0, 100.0), vec2(1.0, 0.0));
        let rival = Kinematics::new(vec2(110.0, 100.0), vec2(-1.0, 0.0), 2.5, 0.1).with_id(AgentId::new(1, 0));
        let rivals = [rival];
        let policy = drift_policy();

        let mut boid = me.clone();
        boid.accumulate(&[], &StepContext::new(&[]).with_rivals(Some(&rivals)), &policy, Orders::default());
        assert!(boid.acceleration.x < 0.0);
        assert_relative_eq!(
            boid.acceleration.length(),
            boid.max_force * policy.weights.rival_separation,
            epsilon = 1e-5
        );
    }

    #[test]
    fn larger_agents_keep_further_from_obstacles() {
        let obstacles = [Obstacle::new(vec2(100.0, 100.0), 20.0)];
        let ctx = StepContext::new(&obstacles);
        // 90 from the centre: outside 20 + 50 for a point agent, inside it for a 40-wide one
        let position = vec2(190.0, 100.0);

        let mut small = Boid::configure(AgentId::new(0, 0), &AgentConfig { radius: 0.0, ..config() }, position, Vec2::ZERO).unwrap();
        let mut large = Boid::configure(AgentId::new(0, 1), &AgentConfig { radius: 40.0, ..config() }, position, Vec2::ZERO).unwrap();
        small.accumulate(&[], &ctx, &drift_policy(), Orders::default());
        large.accumulate(&[], &ctx, &drift_policy(), Orders::default());

        assert_eq!(small.acceleration, Vec2::ZERO);
        assert!(large.acceleration.x > 0.0);
        assert_relative_eq!(large.acceleration.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn heading_angle_follows_velocity() {
        let boid = boid_at(vec2(0.0, 0.0), vec2(0.0, -1.0));
        assert_relative_eq!(boid.heading_angle(), -std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn set_field_of_view_validates() {
        let mut boid = boid_at(Vec2::ZERO, Vec2::ZERO);
        assert!(boid.set_field_of_view(0.0).is_err());
        assert!(boid.set_field_of_view(120.0_f32.to_radians()).is_ok());
    }
}
