/*
 * Flocking Module
 *
 * The three neighbour rules:
 * 1. Separation: Avoid crowding neighbors
 * 2. Alignment: Steer towards the average heading of neighbors
 * 3. Cohesion: Steer towards the average position of neighbors
 *
 * Each rule scans a candidate set, drops the querying agent itself, drops
 * candidates outside the agent's field of view, keeps those strictly inside
 * the rule's radius, and reduces what is left to one steering force.
 * Candidates at exactly the agent's position contribute nothing.
 */

use nannou::prelude::*;

use crate::boid::{Kinematics, Neighbor};
use crate::steering::seek;
use crate::vector::{VectorExt, DEFAULT_HEADING};

/// Whether `point` lies inside the agent's vision cone: within half the
/// field of view of its heading. An agent with no velocity looks along +x.
pub fn is_visible(agent: &Kinematics, point: Vec2) -> bool {
    let to_point = point - agent.position;
    if to_point.is_degenerate() {
        return true;
    }
    let heading = agent.velocity.unit_or(DEFAULT_HEADING);
    heading.angle_to(to_point) <= agent.field_of_view / 2.0
}

// Candidates that pass self-exclusion, the vision cone and the radius, with their distance
fn qualifying<'a, N, I>(agent: &Kinematics, candidates: I, radius: f32) -> impl Iterator<Item = (&'a N, f32)>
where
    N: Neighbor + ?Sized + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let agent = *agent;
    candidates.into_iter().filter_map(move |other| {
        if agent.id.is_some() && other.id() == agent.id {
            return None;
        }
        let distance = agent.position.distance(other.position());
        if distance > 0.0 && distance < radius && is_visible(&agent, other.position()) {
            Some((other, distance))
        } else {
            None
        }
    })
}

pub fn separate<'a, N, I>(agent: &Kinematics, candidates: I, desired_separation: f32) -> Vec2
where
    N: Neighbor + ?Sized + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let mut steering = Vec2::ZERO;
    let mut count = 0;

    for (other, distance) in qualifying(agent, candidates, desired_separation) {
        // Weight by distance: closer neighbours push harder
        let away = (agent.position - other.position()).unit_or_zero();
        steering += away / distance;
        count += 1;
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    steering /= count as f32;

    // Pushes from opposite sides can cancel out
    if steering.is_degenerate() {
        return Vec2::ZERO;
    }
    (steering.with_length(agent.max_speed) - agent.velocity).limit(agent.max_force)
}

pub fn align<'a, N, I>(agent: &Kinematics, candidates: I, neighbor_radius: f32) -> Vec2
where
    N: Neighbor + ?Sized + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let mut average = Vec2::ZERO;
    let mut count = 0;

    for (other, _) in qualifying(agent, candidates, neighbor_radius) {
        average += other.velocity();
        count += 1;
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    average /= count as f32;

    let desired = average.with_length(agent.max_speed);
    (desired - agent.velocity).limit(agent.max_force)
}

/// Seeks the average position of visible neighbours. Going through `seek`
/// keeps its arrival slowdown, so agents ease into the centre of mass
/// rather than overshooting it.
pub fn cohesion<'a, N, I>(agent: &Kinematics, candidates: I, neighbor_radius: f32, slowing_radius: f32) -> Vec2
where
    N: Neighbor + ?Sized + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let mut center = Vec2::ZERO;
    let mut count = 0;

    for (other, _) in qualifying(agent, candidates, neighbor_radius) {
        center += other.position();
        count += 1;
    }

    if count == 0 {
        return Vec2::ZERO;
    }
    seek(agent, center / count as f32, slowing_radius)
}
