/*
 * Steering Module
 *
 * Stateless steering behaviours. Each takes the agent's kinematic state plus
 * some context and returns a force no longer than the agent's max force:
 * the clamp happens here, never in the caller.
 *
 * All follow Reynolds: Steering = Desired - Velocity, except wander, which
 * returns the projected wander direction itself.
 */

use std::f32::consts::TAU;

use nannou::prelude::*;
use rand::Rng;

use crate::boid::Kinematics;
use crate::obstacle::Obstacle;
use crate::params::SteeringParams;
use crate::vector::{unit_from_angle, VectorExt, DEFAULT_HEADING, EPSILON};

/// Desired velocity toward `target`: full speed outside `slowing_radius`,
/// scaled down linearly inside it so the agent arrives instead of
/// overshooting. Zero when already at the target.
pub fn arrival_velocity(agent: &Kinematics, target: Vec2, slowing_radius: f32) -> Vec2 {
    let offset = target - agent.position;
    let distance = offset.length();
    if distance <= EPSILON {
        return Vec2::ZERO;
    }

    let speed = if distance < slowing_radius {
        agent.max_speed * (distance / slowing_radius)
    } else {
        agent.max_speed
    };
    offset / distance * speed
}

// Steer toward a target, decelerating inside the slowing radius
pub fn seek(agent: &Kinematics, target: Vec2, slowing_radius: f32) -> Vec2 {
    if agent.position.distance(target) <= EPSILON {
        return Vec2::ZERO;
    }
    let desired = arrival_velocity(agent, target, slowing_radius);
    (desired - agent.velocity).limit(agent.max_force)
}

// Steer directly away from a threat at full speed
pub fn flee(agent: &Kinematics, threat: Vec2) -> Vec2 {
    let away = agent.position - threat;
    if away.is_degenerate() {
        return Vec2::ZERO;
    }
    let desired = away.with_length(agent.max_speed);
    (desired - agent.velocity).limit(agent.max_force)
}

/// Flee scaled by proximity: full strength at the threat, fading linearly to
/// nothing at `radius`. Zero outside the radius.
pub fn evade(agent: &Kinematics, threat: Vec2, radius: f32) -> Vec2 {
    let distance = agent.position.distance(threat);
    if radius <= 0.0 || distance >= radius {
        return Vec2::ZERO;
    }
    flee(agent, threat) * (1.0 - distance / radius)
}

// Random increment for the wander phase
pub fn wander_jitter(params: &SteeringParams, rng: &mut impl Rng) -> f32 {
    if params.wander_jitter > 0.0 {
        rng.gen_range(-params.wander_jitter..=params.wander_jitter)
    } else {
        0.0
    }
}

/// Advances `phase` by a small random step and returns the wander force.
///
/// The phase is persistent per agent, so successive calls drift smoothly
/// instead of jittering.
pub fn wander(agent: &Kinematics, phase: &mut f32, params: &SteeringParams, rng: &mut impl Rng) -> Vec2 {
    *phase += wander_jitter(params, rng);
    wander_at_phase(agent, *phase, params)
}

// Wander force for an already advanced phase
pub fn wander_at_phase(agent: &Kinematics, phase: f32, params: &SteeringParams) -> Vec2 {
    let heading = agent.velocity.unit_or(DEFAULT_HEADING);
    let circle_center = heading * params.wander_distance;
    let displacement = unit_from_angle(phase) * params.wander_radius;
    (circle_center + displacement).limit(agent.max_force)
}

// Heading of the flow field at a world position
pub fn flow_field_angle(position: Vec2, scale: f32) -> f32 {
    (position.x * scale).sin() * (position.y * scale).cos() * TAU
}

pub fn follow_flow_field(agent: &Kinematics, scale: f32) -> Vec2 {
    let desired = unit_from_angle(flow_field_angle(agent.position, scale)) * agent.max_speed;
    (desired - agent.velocity).limit(agent.max_force)
}

/// Pushes away from every obstacle closer than its radius plus `margin`.
/// Callers fold the agent's own radius into `margin`.
///
/// Each push is weighted by overlap depth, `(radius + margin) - distance`, so
/// deeper intrusions push harder. The summed push becomes a full-speed
/// desired velocity. Zero when nothing is in range.
pub fn avoid_obstacles(agent: &Kinematics, obstacles: &[Obstacle], margin: f32) -> Vec2 {
    let mut push = Vec2::ZERO;

    for obstacle in obstacles {
        let away = agent.position - obstacle.position;
        let distance = away.length();
        let safe_radius = obstacle.radius + margin;
        if distance >= safe_radius {
            continue;
        }

        // Sitting on the centre gives no direction: back off along the reverse heading
        let fallback = -agent.velocity.unit_or(DEFAULT_HEADING);
        push += away.unit_or(fallback) * (safe_radius - distance);
    }

    if push.is_degenerate() {
        return Vec2::ZERO;
    }
    (push.with_length(agent.max_speed) - agent.velocity).limit(agent.max_force)
}
